use image::GrayImage;

use crate::face::Point;

/// Pixel rectangle, `x0..x1` and `y0..y1` half-open, already clipped to an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl PixelRect {
    /// Clip float bounds to the image. Returns `None` when nothing is left.
    pub fn clipped(img: &GrayImage, x0: f32, y0: f32, x1: f32, y1: f32) -> Option<Self> {
        let (w, h) = img.dimensions();
        let x0 = x0.floor().max(0.0) as u32;
        let y0 = y0.floor().max(0.0) as u32;
        let x1 = (x1.ceil().max(0.0) as u32).min(w);
        let y1 = (y1.ceil().max(0.0) as u32).min(h);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(Self { x0, y0, x1, y1 })
    }

    /// Bounds of a set of points, clipped.
    pub fn around(img: &GrayImage, points: &[Point], pad_x: f32, pad_y: f32) -> Option<Self> {
        let first = points.first()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for p in points {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Self::clipped(img, min_x - pad_x, min_y - pad_y, max_x + pad_x, max_y + pad_y)
    }

    pub fn width(&self) -> u32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> u32 {
        self.y1 - self.y0
    }
}

pub fn mean_luma(img: &GrayImage, rect: PixelRect) -> f32 {
    let mut sum = 0u64;
    for y in rect.y0..rect.y1 {
        for x in rect.x0..rect.x1 {
            sum += img.get_pixel(x, y)[0] as u64;
        }
    }
    sum as f32 / (rect.width() * rect.height()) as f32
}
