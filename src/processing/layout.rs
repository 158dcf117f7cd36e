/// Placement of a scaled asset on a surface, in surface pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoverRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub scale: f32,
}

impl CoverRect {
    /// Region of the source image that lands on the surface, as
    /// `(left, top, width, height)` in source pixels.
    pub fn visible_source(&self, canvas_w: u32, canvas_h: u32) -> (f64, f64, f64, f64) {
        let scale = f64::from(self.scale);
        (
            f64::from(-self.x) / scale,
            f64::from(-self.y) / scale,
            f64::from(canvas_w) / scale,
            f64::from(canvas_h) / scale,
        )
    }
}

/// Scales `src` to fill the whole canvas, preserving aspect ratio, centered.
///
/// Returns `None` when either side of the canvas or source is zero.
pub fn cover_fit(canvas_w: u32, canvas_h: u32, src_w: u32, src_h: u32) -> Option<CoverRect> {
    if canvas_w == 0 || canvas_h == 0 || src_w == 0 || src_h == 0 {
        return None;
    }
    let (cw, ch) = (canvas_w as f32, canvas_h as f32);
    let (iw, ih) = (src_w as f32, src_h as f32);
    let scale = (cw / iw).max(ch / ih);
    let width = iw * scale;
    let height = ih * scale;
    Some(CoverRect {
        x: cw / 2.0 - width / 2.0,
        y: ch / 2.0 - height / 2.0,
        width,
        height,
        scale,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() <= 1e-3
    }

    #[test]
    fn wide_source_crops_left_and_right() {
        // 1920x1080 source on a 1000x1000 surface: height limits, scale = 1000/1080
        let r = cover_fit(1000, 1000, 1920, 1080).unwrap();
        assert!(close(r.scale, 1000.0 / 1080.0));
        assert!(close(r.height, 1000.0));
        assert!(close(r.width, 1920.0 * 1000.0 / 1080.0));
        assert!(close(r.y, 0.0));
        assert!(close(r.x, 500.0 - r.width / 2.0));
        assert!(r.x < 0.0);
    }

    #[test]
    fn tall_source_crops_top_and_bottom() {
        let r = cover_fit(1920, 1080, 1000, 2000).unwrap();
        assert!(close(r.scale, 1.92));
        assert!(close(r.width, 1920.0));
        assert!(close(r.height, 3840.0));
        assert!(close(r.x, 0.0));
        assert!(close(r.y, 540.0 - 1920.0));
    }

    #[test]
    fn upscales_small_sources() {
        let r = cover_fit(800, 600, 400, 300).unwrap();
        assert!(close(r.scale, 2.0));
        assert_eq!((r.x, r.y), (0.0, 0.0));
    }

    #[test]
    fn visible_source_matches_surface_aspect() {
        let r = cover_fit(1000, 1000, 1920, 1080).unwrap();
        let (left, top, w, h) = r.visible_source(1000, 1000);
        assert!((w - 1080.0).abs() < 1e-2);
        assert!((h - 1080.0).abs() < 1e-2);
        assert!(top.abs() < 1e-6);
        assert!((left - 420.0).abs() < 1e-2);
    }

    #[test]
    fn zero_dimensions_are_rejected() {
        assert!(cover_fit(0, 10, 10, 10).is_none());
        assert!(cover_fit(10, 10, 0, 10).is_none());
    }
}
