//! Tunable constants for every pipeline stage.
//!
//! All thresholds live here rather than in control flow so they can be held
//! fixed by tests and overridden from a TOML file:
//!
//! ```toml
//! [detection]
//! min_area = 1500.0
//!
//! [ocr]
//! min_confidence = 0.6
//!
//! [pipeline]
//! timeout = "30s"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::detect::ClassificationRule;

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read file: {0}")]
    Read(#[from] std::io::Error),
    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub loader: LoaderConfig,
    pub preprocess: PreprocessConfig,
    pub ocr: OcrConfig,
    pub detection: DetectionConfig,
    pub matching: MatchingConfig,
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Images wider than this are scaled down proportionally; 0 disables.
    pub max_width: u32,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self { max_width: 800 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Tiles per axis for local histogram equalization.
    pub clahe_tiles: u32,
    pub clahe_clip_limit: f32,
    /// Filter strength for non-local means.
    pub denoise_strength: f32,
    pub denoise_patch_radius: u32,
    pub denoise_search_radius: u32,
    /// Neighborhood radius for the adaptive threshold (block = 2r + 1).
    pub threshold_block_radius: u32,
    /// Pixel must be this much darker than its local mean to be foreground.
    pub threshold_bias: i32,
    /// Structuring element radius for closing (1 => 3x3).
    pub morph_radius: u8,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            clahe_tiles: 8,
            clahe_clip_limit: 2.0,
            denoise_strength: 10.0,
            denoise_patch_radius: 1,
            denoise_search_radius: 3,
            threshold_block_radius: 5,
            threshold_bias: 2,
            morph_radius: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Detections below this confidence are dropped.
    pub min_confidence: f32,
    /// Passed through to the engine.
    pub paragraph: bool,
    pub text_threshold: f32,
    pub link_threshold: f32,
    pub batch_size: usize,
    pub language: String,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.7,
            paragraph: false,
            text_threshold: 0.7,
            link_threshold: 0.4,
            batch_size: 1,
            language: "eng".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    pub blur_sigma: f32,
    pub canny_low: f32,
    pub canny_high: f32,
    /// Closing radius applied to the edge map before contour tracing.
    pub edge_close_radius: u8,
    /// Regions with contour area below this are noise.
    pub min_area: f64,
    /// Aspect ratios outside [1/max_ratio, max_ratio] are slivers.
    pub max_ratio: f64,
    /// Evaluated top to bottom; first match wins.
    pub rules: Vec<ClassificationRule>,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            blur_sigma: 1.1,
            canny_low: 50.0,
            canny_high: 150.0,
            edge_close_radius: 1,
            min_area: 1000.0,
            max_ratio: 5.0,
            rules: ClassificationRule::default_table(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchStrategy {
    /// Indexed when compiled in, brute force otherwise.
    #[default]
    Auto,
    Indexed,
    BruteForce,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    pub strategy: MatchStrategy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    /// Render the annotated preview on success.
    pub preview: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            preview: true,
        }
    }
}

impl Config {
    /// Priority: explicit path > central config file > defaults.
    pub fn load(path: Option<&Path>) -> Result<Config, ConfigLoadError> {
        let candidate = match path {
            Some(p) => Some(p.to_path_buf()),
            None => Self::central_config_path().filter(|p| p.exists()),
        };
        match candidate {
            Some(p) => Self::from_file(&p),
            None => Ok(Config::default()),
        }
    }

    pub fn from_file(path: &Path) -> Result<Config, ConfigLoadError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Config, ConfigLoadError> {
        Ok(toml::from_str(raw)?)
    }

    /// `$XDG_CONFIG_HOME/m2c/config.toml`, falling back to `~/.config`.
    pub fn central_config_path() -> Option<PathBuf> {
        if let Some(dir) = std::env::var_os("XDG_CONFIG_HOME").filter(|d| !d.is_empty()) {
            return Some(PathBuf::from(dir).join("m2c").join("config.toml"));
        }
        std::env::var_os("HOME")
            .filter(|h| !h.is_empty())
            .map(|home| {
                PathBuf::from(home)
                    .join(".config")
                    .join("m2c")
                    .join("config.toml")
            })
    }

    pub fn validate(&self) -> Result<(), String> {
        let p = &self.preprocess;
        if p.clahe_tiles == 0 {
            return Err("preprocess.clahe_tiles must be at least 1".to_string());
        }
        if p.clahe_clip_limit <= 0.0 {
            return Err("preprocess.clahe_clip_limit must be positive".to_string());
        }
        if p.denoise_strength < 0.0 {
            return Err("preprocess.denoise_strength must not be negative".to_string());
        }
        if p.threshold_block_radius == 0 {
            return Err("preprocess.threshold_block_radius must be at least 1".to_string());
        }

        let o = &self.ocr;
        if !(0.0..=1.0).contains(&o.min_confidence) {
            return Err(format!(
                "ocr.min_confidence must be within [0, 1], got {}",
                o.min_confidence
            ));
        }
        if o.batch_size == 0 {
            return Err("ocr.batch_size must be at least 1".to_string());
        }

        let d = &self.detection;
        if d.canny_low > d.canny_high {
            return Err(format!(
                "detection.canny_low ({}) must not exceed detection.canny_high ({})",
                d.canny_low, d.canny_high
            ));
        }
        if d.blur_sigma <= 0.0 {
            return Err("detection.blur_sigma must be positive".to_string());
        }
        if d.max_ratio < 1.0 {
            return Err(format!(
                "detection.max_ratio must be >= 1.0, got {}",
                d.max_ratio
            ));
        }
        if d.min_area < 0.0 {
            return Err("detection.min_area must not be negative".to_string());
        }

        if self.pipeline.timeout.is_zero() {
            return Err("pipeline.timeout must be greater than zero".to_string());
        }
        Ok(())
    }
}
