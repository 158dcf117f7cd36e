//! Progress-driven cover-fit frame renderer.

use anyhow::Context;
use fast_image_resize as fir;
use image::RgbaImage;
use tracing::{trace, warn};

use crate::error::{Error, Result};
use crate::processing::layout::{CoverRect, cover_fit};
use crate::render::surface::DisplaySurface;
use crate::store::{FrameStore, frame_index};

/// Parameters of the last successful draw, in surface pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawParams {
    /// 0-based frame number that was drawn.
    pub frame: usize,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub scale: f32,
}

impl DrawParams {
    fn new(frame: usize, rect: CoverRect) -> Self {
        Self {
            frame,
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
            scale: rect.scale,
        }
    }
}

/// Owns the display surface and draws whichever frame the progress selects.
///
/// Every precondition miss (out-of-range index, frame not loaded, zero-sized
/// frame or surface) leaves the previous frame on screen.
pub struct Renderer {
    surface: DisplaySurface,
    last_progress: f32,
    last_draw: Option<DrawParams>,
    resizer: fir::Resizer,
}

impl Renderer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            surface: DisplaySurface::new(width, height),
            last_progress: 0.0,
            last_draw: None,
            resizer: fir::Resizer::new(),
        }
    }

    pub fn surface(&self) -> &DisplaySurface {
        &self.surface
    }

    pub fn last_draw(&self) -> Option<DrawParams> {
        self.last_draw
    }

    /// Draws the frame nearest to `progress`. Returns the draw parameters of
    /// the frame now on screen, or `None` if nothing was drawn.
    pub fn render(&mut self, progress: f32, store: &FrameStore) -> Option<DrawParams> {
        self.last_progress = progress;
        let frame = frame_index(progress)?;
        if let Some(last) = self.last_draw
            && last.frame == frame
        {
            return Some(last);
        }

        let asset = store.frame(frame)?;
        let image = asset.image()?;
        let (src_w, src_h) = asset.dimensions()?;
        let (canvas_w, canvas_h) = self.surface.dimensions();
        let rect = cover_fit(canvas_w, canvas_h, src_w, src_h)?;

        match self.draw_cover(image, rect) {
            Ok(pixels) => {
                self.surface.present(pixels);
                let params = DrawParams::new(frame, rect);
                trace!(frame, scale = params.scale, "frame drawn");
                self.last_draw = Some(params);
                Some(params)
            }
            Err(err) => {
                warn!(frame, error = %err, "failed to draw frame; keeping previous frame");
                None
            }
        }
    }

    /// Re-derives the surface from the viewport and redraws the last progress.
    pub fn resize(&mut self, width: u32, height: u32, store: &FrameStore) -> Option<DrawParams> {
        self.surface.resize(width, height);
        self.last_draw = None;
        self.render(self.last_progress, store)
    }

    fn draw_cover(&mut self, source: &RgbaImage, rect: CoverRect) -> Result<RgbaImage> {
        let (canvas_w, canvas_h) = self.surface.dimensions();
        let src_view = fir::images::ImageRef::new(
            source.width(),
            source.height(),
            source.as_raw(),
            fir::PixelType::U8x4,
        )
        .context("failed to create source view for frame")
        .map_err(Error::Render)?;
        let mut dst_image = fir::images::Image::new(canvas_w, canvas_h, fir::PixelType::U8x4);
        let (left, top, width, height) = rect.visible_source(canvas_w, canvas_h);
        let (src_w, src_h) = (f64::from(source.width()), f64::from(source.height()));
        let (left, top) = (left.clamp(0.0, src_w), top.clamp(0.0, src_h));
        let (width, height) = (width.min(src_w - left), height.min(src_h - top));
        let options = fir::ResizeOptions::new()
            .resize_alg(fir::ResizeAlg::Convolution(fir::FilterType::Bilinear))
            .crop(left, top, width, height);
        self.resizer
            .resize(&src_view, &mut dst_image, Some(&options))
            .context("frame resize failed")
            .map_err(Error::Render)?;
        RgbaImage::from_raw(canvas_w, canvas_h, dst_image.into_vec())
            .ok_or_else(|| Error::Render(anyhow::anyhow!("resized frame has the wrong length")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn store_with(frames: &[Option<RgbaImage>]) -> FrameStore {
        let mut store = FrameStore::new(frames.len(), |i| format!("{i}.png"));
        for (i, frame) in frames.iter().enumerate() {
            if let Some(img) = frame {
                store.mark_loaded(i + 1, img.clone());
            }
        }
        store
    }

    fn solid(w: u32, h: u32, v: u8) -> RgbaImage {
        RgbaImage::from_pixel(w, h, Rgba([v, v, v, 255]))
    }

    fn assert_gray(r: &Renderer, x: u32, y: u32, v: u8) {
        let px = r.surface().pixels().get_pixel(x, y).0;
        for (c, expected) in px.iter().zip([v, v, v, 255]) {
            assert!(c.abs_diff(expected) <= 1, "pixel {px:?} is not gray {v}");
        }
    }

    #[test]
    fn draws_nearest_frame_cover_fit() {
        let store = store_with(&[Some(solid(40, 20, 10)), Some(solid(40, 20, 200))]);
        let mut r = Renderer::new(20, 20);
        let params = r.render(0.6, &store).unwrap();
        assert_eq!(params.frame, 1);
        assert!((params.scale - 1.0).abs() < 1e-6);
        assert!((params.x + 10.0).abs() < 1e-6);
        assert_eq!(params.y, 0.0);
        assert_gray(&r, 10, 10, 200);
    }

    #[test]
    fn same_progress_twice_yields_same_params() {
        let store = store_with(&[Some(solid(64, 48, 90))]);
        let mut r = Renderer::new(32, 32);
        let a = r.render(0.2, &store);
        let b = r.render(0.2, &store);
        assert!(a.is_some());
        assert_eq!(a, b);
    }

    #[test]
    fn keeps_previous_frame_when_target_is_not_ready() {
        let store = store_with(&[Some(solid(8, 8, 50)), None]);
        let mut r = Renderer::new(8, 8);
        r.render(0.0, &store).unwrap();
        assert!(r.render(1.0, &store).is_none());
        assert!(r.render(7.0, &store).is_none());
        assert!(r.render(-3.0, &store).is_none());
        assert_gray(&r, 4, 4, 50);
        assert_eq!(r.last_draw().unwrap().frame, 0);
    }

    #[test]
    fn resize_before_any_load_leaves_surface_blank() {
        let store = store_with(&[None, None]);
        let mut r = Renderer::new(0, 0);
        assert!(r.resize(640, 360, &store).is_none());
        assert!(r.resize(640, 360, &store).is_none());
        assert_eq!(r.surface().dimensions(), (640, 360));
        assert!(r.surface().is_blank());
    }

    #[test]
    fn resize_redraws_last_progress() {
        let store = store_with(&[Some(solid(10, 10, 1)), Some(solid(10, 10, 2))]);
        let mut r = Renderer::new(10, 10);
        r.render(1.0, &store).unwrap();
        let params = r.resize(30, 15, &store).unwrap();
        assert_eq!(params.frame, 1);
        assert!((params.scale - 3.0).abs() < 1e-6);
        assert_gray(&r, 15, 7, 2);
    }
}
