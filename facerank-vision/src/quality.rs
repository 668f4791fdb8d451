use image::GrayImage;

use crate::face::DetectedFace;
use crate::luma::PixelRect;

/// Face side length (pixels) at which the size half of the score saturates.
const FULL_SIZE: f32 = 112.0;
/// Laplacian variance at which the sharpness half of the score saturates.
const FULL_SHARPNESS: f32 = 400.0;

/// Quality score 0-100: half face size, half sharpness of the face crop.
pub fn quality_score(gray: &GrayImage, face: &DetectedFace) -> u8 {
    let size = (face.bbox.short_side() / FULL_SIZE).clamp(0.0, 1.0);

    let sharpness = PixelRect::clipped(
        gray,
        face.bbox.x,
        face.bbox.y,
        face.bbox.x + face.bbox.width,
        face.bbox.y + face.bbox.height,
    )
    .map(|rect| (laplacian_variance(gray, rect) / FULL_SHARPNESS).clamp(0.0, 1.0))
    .unwrap_or(0.0);

    (size * 50.0 + sharpness * 50.0).round() as u8
}

/// Variance of the 4-neighbour Laplacian over the interior of `rect`.
fn laplacian_variance(gray: &GrayImage, rect: PixelRect) -> f32 {
    if rect.width() < 3 || rect.height() < 3 {
        return 0.0;
    }
    let px = |x: u32, y: u32| gray.get_pixel(x, y)[0] as f64;

    let mut sum = 0.0;
    let mut sum_sq = 0.0;
    let mut n = 0usize;
    for y in (rect.y0 + 1)..(rect.y1 - 1) {
        for x in (rect.x0 + 1)..(rect.x1 - 1) {
            let lap = 4.0 * px(x, y) - px(x - 1, y) - px(x + 1, y) - px(x, y - 1) - px(x, y + 1);
            sum += lap;
            sum_sq += lap * lap;
            n += 1;
        }
    }
    let mean = sum / n as f64;
    (sum_sq / n as f64 - mean * mean) as f32
}
