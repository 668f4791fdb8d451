use anyhow::{Context, Result};
use directories::ProjectDirs;
use facerank_vision::SunglassesConfig;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::matcher::AggregationMethod;

static PROJECT_DIRS: Lazy<Option<ProjectDirs>> = Lazy::new(|| ProjectDirs::from("", "", "facerank"));

pub static CONFIG_PATH: Lazy<PathBuf> = Lazy::new(|| match option_env!("FACERANK_CONFIG_PATH") {
    Some(p) => PathBuf::from(p),
    None => PROJECT_DIRS
        .as_ref()
        .map(|d| d.config_dir().join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("facerank.toml")),
});

pub static REFERENCE_STORE_PREFIX: Lazy<PathBuf> =
    Lazy::new(|| match option_env!("FACERANK_STORE_PREFIX") {
        Some(p) => PathBuf::from(p),
        None => PROJECT_DIRS
            .as_ref()
            .map(|d| d.data_dir().join("references"))
            .unwrap_or_else(|| PathBuf::from("references")),
    });

/// Similarity band boundaries in descriptor-distance units.
///
/// Must be strictly increasing: `very_high < high < good < low`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    pub very_high: f64,
    pub high: f64,
    pub good: f64,
    pub low: f64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            very_high: 0.4,
            high: 0.5,
            good: 0.6,
            low: 0.7,
        }
    }
}

impl ThresholdConfig {
    pub fn validate(&self) -> Result<()> {
        let bounds = [self.very_high, self.high, self.good, self.low];
        if bounds.iter().any(|b| !b.is_finite()) {
            anyhow::bail!("threshold boundaries must be finite, got {:?}", bounds);
        }
        if !bounds.windows(2).all(|w| w[0] < w[1]) {
            anyhow::bail!(
                "threshold boundaries must be strictly increasing (very_high < high < good < low), got {:?}",
                bounds
            );
        }
        Ok(())
    }

    /// Every boundary shifted by `adjust`.
    pub fn shifted(&self, adjust: f64) -> Self {
        Self {
            very_high: self.very_high + adjust,
            high: self.high + adjust,
            good: self.good + adjust,
            low: self.low + adjust,
        }
    }
}

/// Everything the scoring core needs, injected by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Added to every boundary when either face wears sunglasses
    pub sunglasses_adjustment: f64,
    pub default_method: AggregationMethod,
    pub thresholds: ThresholdConfig,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            sunglasses_adjustment: 0.1,
            default_method: AggregationMethod::Average,
            thresholds: ThresholdConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Overrides the platform data directory for enrolled references
    pub store_dir: Option<PathBuf>,
    pub scoring: ScoringConfig,
    pub sunglasses: SunglassesConfig,
}

impl Config {
    pub fn store_dir(&self) -> &Path {
        self.store_dir
            .as_deref()
            .unwrap_or(REFERENCE_STORE_PREFIX.as_path())
    }
}

pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = path.unwrap_or(CONFIG_PATH.as_path());
    if !path.exists() {
        return Ok(Config::default());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading config at {}", path.display()))?;
    let cfg: Config =
        toml::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))?;
    cfg.scoring
        .thresholds
        .validate()
        .with_context(|| format!("invalid thresholds in {}", path.display()))?;
    if !cfg.scoring.sunglasses_adjustment.is_finite() {
        anyhow::bail!("sunglasses_adjustment in {} must be finite", path.display());
    }
    Ok(cfg)
}

pub fn save_config(cfg: &Config, path: Option<&Path>) -> Result<()> {
    let path = path.unwrap_or(CONFIG_PATH.as_path());
    let data = toml::to_string_pretty(cfg)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, data)?;
    Ok(())
}
