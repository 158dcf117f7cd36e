//! Fixed-size RGBA8 display surface the renderer draws into.

use image::RgbaImage;

use crate::placement::{PixelSource, SampleError};

#[derive(Debug, Clone)]
pub struct DisplaySurface {
    pixels: RgbaImage,
}

impl DisplaySurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            pixels: RgbaImage::new(width, height),
        }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Reallocates to the new size. Like a canvas, the contents are cleared
    /// even when the size is unchanged.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.pixels = RgbaImage::new(width, height);
    }

    /// Whether every pixel is transparent black.
    pub fn is_blank(&self) -> bool {
        self.pixels.as_raw().iter().all(|b| *b == 0)
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Replaces the contents with a buffer of the same size.
    pub(crate) fn present(&mut self, frame: RgbaImage) {
        debug_assert_eq!(frame.dimensions(), self.pixels.dimensions());
        self.pixels = frame;
    }
}

impl PixelSource for DisplaySurface {
    fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    fn read_block(&self, x: u32, y: u32, size: u32) -> Result<Vec<u8>, SampleError> {
        if self.is_empty() {
            return Err(SampleError::EmptySurface);
        }
        let mut out = vec![0u8; (size as usize) * (size as usize) * 4];
        let (w, h) = self.pixels.dimensions();
        for dy in 0..size {
            let sy = y.saturating_add(dy);
            if sy >= h {
                break;
            }
            for dx in 0..size {
                let sx = x.saturating_add(dx);
                if sx >= w {
                    break;
                }
                let dst = ((dy * size + dx) as usize) * 4;
                out[dst..dst + 4].copy_from_slice(&self.pixels.get_pixel(sx, sy).0);
            }
        }
        Ok(out)
    }
}
