/// Rec. 601 luma of one pixel, in 0..=255.
#[inline]
pub fn luma(r: u8, g: u8, b: u8) -> f32 {
    0.299 * f32::from(r) + 0.587 * f32::from(g) + 0.114 * f32::from(b)
}

/// Mean luma over an RGBA8 buffer. Alpha is ignored, so transparent black
/// counts as black. An empty buffer scores 0.
pub fn mean_luma(rgba: &[u8]) -> f32 {
    let mut total = 0f64;
    let mut n = 0u64;
    for px in rgba.chunks_exact(4) {
        total += f64::from(luma(px[0], px[1], px[2]));
        n += 1;
    }
    if n == 0 {
        return 0.0;
    }
    (total / n as f64) as f32
}
