use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::face::DetectedFace;

/// Detector output for one image, as exchanged with the external detector.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionFile {
    /// Original filename or URL of the image
    pub source: String,
    /// Local copy of the image, needed only for the pixel heuristics
    #[serde(default)]
    pub image: Option<PathBuf>,
    #[serde(default)]
    pub faces: Vec<DetectedFace>,
}

impl DetectionFile {
    /// All descriptors in one file must share a length, otherwise distances
    /// between them are meaningless.
    pub fn validate(&self) -> Result<()> {
        let Some(first) = self.faces.first() else {
            return Ok(());
        };
        let expected = first.descriptor.len();
        for (i, face) in self.faces.iter().enumerate() {
            if face.descriptor.len() != expected {
                anyhow::bail!(
                    "face {} in {} has a {}-element descriptor, expected {}",
                    i,
                    self.source,
                    face.descriptor.len(),
                    expected
                );
            }
        }
        Ok(())
    }
}

pub fn load_detection_file(path: &Path) -> Result<DetectionFile> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading detections at {}", path.display()))?;
    let file: DetectionFile = serde_json::from_str(&raw)
        .with_context(|| format!("parsing detections {}", path.display()))?;
    file.validate()?;
    log::debug!("{}: {} face(s)", file.source, file.faces.len());
    Ok(file)
}

pub fn save_detection_file(file: &DetectionFile, path: &Path) -> Result<()> {
    let data = serde_json::to_string_pretty(file)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, data).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}
