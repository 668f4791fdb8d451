use anyhow::{Context, Result};
use image::{DynamicImage, GrayImage};
use std::path::Path;

use crate::detections::DetectionFile;
use crate::face::DetectedFace;
use crate::quality::quality_score;
use crate::sunglasses::{detect_sunglasses, SunglassesConfig};

/// Attach the sunglasses flag and quality score computed from the image.
///
/// A flag already set by the detector is kept; the heuristic can only add one.
pub fn annotate_face(gray: &GrayImage, face: &DetectedFace, cfg: &SunglassesConfig) -> DetectedFace {
    let check = detect_sunglasses(gray, face, cfg);
    let quality = face.quality.unwrap_or_else(|| quality_score(gray, face));
    face.clone()
        .with_sunglasses(face.has_sunglasses || check.has_sunglasses)
        .with_quality(Some(quality))
}

pub fn annotate_faces(img: &DynamicImage, faces: &[DetectedFace], cfg: &SunglassesConfig) -> Vec<DetectedFace> {
    let gray = img.to_luma8();
    faces.iter().map(|f| annotate_face(&gray, f, cfg)).collect()
}

/// Load the image referenced by a detection file and annotate its faces.
///
/// Files without an image are returned unchanged. Relative image paths are
/// resolved against the directory holding the detection file.
pub fn annotate_file(file: DetectionFile, file_path: &Path, cfg: &SunglassesConfig) -> Result<DetectionFile> {
    let Some(image_path) = file.image.as_ref() else {
        log::warn!("{}: no image attached, skipping heuristics", file.source);
        return Ok(file);
    };
    let image_path = match file_path.parent() {
        Some(dir) if image_path.is_relative() => dir.join(image_path),
        _ => image_path.clone(),
    };
    let img = image::open(&image_path)
        .with_context(|| format!("opening image {}", image_path.display()))?;
    let faces = annotate_faces(&img, &file.faces, cfg);
    Ok(DetectionFile { faces, ..file })
}
