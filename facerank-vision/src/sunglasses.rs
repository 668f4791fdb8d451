//! Pixel-brightness sunglasses heuristic.
//!
//! Compares the eye regions of the 68-point landmark set against the skin
//! band between the eyes and the bottom of the nose. Dark lenses make the
//! eye regions much darker than the skin below them.

use image::GrayImage;
use serde::{Deserialize, Serialize};

use crate::face::DetectedFace;
use crate::luma::{mean_luma, PixelRect};

const EYES: std::ops::Range<usize> = 36..48;
const LEFT_EYE_OUTER: usize = 36;
const RIGHT_EYE_OUTER: usize = 45;
const NOSE_BRIDGE: usize = 29;
const NOSE_BASE: usize = 33;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SunglassesConfig {
    /// Eye-to-skin brightness ratio below which lenses are assumed
    pub dark_ratio: f32,
    /// Eye regions brighter than this are never treated as lenses
    pub max_eye_luma: f32,
}

impl Default for SunglassesConfig {
    fn default() -> Self {
        Self {
            dark_ratio: 0.55,
            max_eye_luma: 80.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SunglassesCheck {
    pub has_sunglasses: bool,
    /// 0.0 - 1.0
    pub confidence: f32,
}

impl SunglassesCheck {
    pub const NONE: Self = Self {
        has_sunglasses: false,
        confidence: 0.0,
    };
}

pub fn detect_sunglasses(
    gray: &GrayImage,
    face: &DetectedFace,
    cfg: &SunglassesConfig,
) -> SunglassesCheck {
    if !face.has_full_landmarks() {
        return SunglassesCheck::NONE;
    }
    let lm = &face.landmarks;

    let eye_points = &lm[EYES];
    let eye_span_y = eye_points
        .iter()
        .map(|p| p.y)
        .fold(f32::MIN, f32::max)
        - eye_points.iter().map(|p| p.y).fold(f32::MAX, f32::min);
    let pad_y = eye_span_y.max(1.0);
    let Some(eye_rect) = PixelRect::around(gray, eye_points, 0.0, pad_y) else {
        return SunglassesCheck::NONE;
    };

    let Some(skin_rect) = PixelRect::clipped(
        gray,
        lm[LEFT_EYE_OUTER].x,
        lm[NOSE_BRIDGE].y,
        lm[RIGHT_EYE_OUTER].x,
        lm[NOSE_BASE].y,
    ) else {
        return SunglassesCheck::NONE;
    };

    let eyes = mean_luma(gray, eye_rect);
    let skin = mean_luma(gray, skin_rect);
    if skin <= 0.0 {
        return SunglassesCheck::NONE;
    }

    let ratio = eyes / skin;
    let has_sunglasses = ratio < cfg.dark_ratio && eyes < cfg.max_eye_luma;
    let confidence = if has_sunglasses {
        (1.0 - ratio / cfg.dark_ratio).clamp(0.0, 1.0)
    } else {
        0.0
    };
    log::trace!(
        "sunglasses check: eyes {:.1} skin {:.1} ratio {:.3} -> {}",
        eyes,
        skin,
        ratio,
        has_sunglasses
    );

    SunglassesCheck {
        has_sunglasses,
        confidence,
    }
}
