use std::path::Path;
use std::time::Duration;

use m2c_lib::{Config, M2cError};

/// Tracks which CLI flags were explicitly provided vs. defaulted.
#[derive(Debug, Default)]
pub struct FlagSources {
    pub max_width: bool,
    pub timeout: bool,
}

impl FlagSources {
    pub fn from_args(args: &[String]) -> Self {
        Self {
            max_width: flag_present(args, "--max-width"),
            timeout: flag_present(args, "--timeout"),
        }
    }
}

/// Checks if a flag was present in the command-line arguments.
pub fn flag_present(args: &[String], flag: &str) -> bool {
    args.iter()
        .any(|arg| arg == flag || arg.starts_with(&format!("{flag}=")))
}

/// Merge CLI arguments into the loaded config, preferring CLI when flags
/// are present. `timeout` is `None` for commands without a timeout flag.
pub fn apply_overrides(
    mut config: Config,
    cli_max_width: u32,
    cli_timeout_secs: Option<u64>,
    flags: &FlagSources,
) -> Result<Config, M2cError> {
    if flags.max_width {
        config.loader.max_width = cli_max_width;
    }
    if let Some(secs) = cli_timeout_secs.filter(|_| flags.timeout) {
        config.pipeline.timeout = Duration::from_secs(secs);
    }
    config
        .validate()
        .map_err(|e| M2cError::Config(format!("Invalid settings: {e}")))?;
    Ok(config)
}

/// Load config from a TOML file, central config, or return defaults.
/// Priority: explicit path > ~/.config/m2c/config.toml > defaults
pub fn load_config(path: Option<&Path>) -> Result<Config, M2cError> {
    let cfg = Config::load(path).map_err(|e| {
        let loc = path
            .map(|p| p.display().to_string())
            .or_else(|| Config::central_config_path().map(|p| p.display().to_string()))
            .unwrap_or_else(|| "defaults".to_string());
        M2cError::Config(format!("Failed to read config {}: {}", loc, e))
    })?;

    cfg.validate().map_err(|e| {
        let prefix = path
            .map(|p| format!("Invalid config ({}): {}", p.display(), e))
            .unwrap_or_else(|| format!("Invalid config: {}", e));
        M2cError::Config(prefix)
    })?;
    Ok(cfg)
}

/// Format effective config as a single-line string.
pub fn format_effective_config(config: &Config, config_source: Option<&Path>) -> String {
    let source = config_source
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "defaults".to_string());
    format!(
        "Effective config [{source}]: max_width={}, timeout={}s, min_confidence={:.2}, min_area={:.0}, max_ratio={:.1}, canny={}/{}, rules={}, matching={:?}, preview={}",
        config.loader.max_width,
        config.pipeline.timeout.as_secs(),
        config.ocr.min_confidence,
        config.detection.min_area,
        config.detection.max_ratio,
        config.detection.canny_low,
        config.detection.canny_high,
        config.detection.rules.len(),
        config.matching.strategy,
        config.pipeline.preview,
    )
}
