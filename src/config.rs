//! Editor configuration module.
//!
//! Handles loading, validating, and merging `retouch.toml`. Stock defaults are
//! serialized to a TOML table and the user's file is merged on top, so a
//! config file only needs the keys it wants to change.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [output]
//! format = "PNG"            # Default encode/export format
//! jpeg_quality = 90         # JPEG quality (1-100)
//! save_dir = "saved"        # Where `save` writes when no path is given
//!
//! [logging]
//! level = "info"            # Default filter when RUST_LOG is unset
//!
//! [processing]
//! max_processes = 4         # Max parallel workers (omit for auto = CPU cores)
//!
//! [background_removal]
//! tolerance = 48            # Color distance still counted as background
//! fill = [255, 255, 255]    # Replacement color (RGB)
//!
//! [super_resolution]
//! scale = 4                 # Integer upscale factor (2-8)
//!
//! [limits]
//! max_pixels = 40000000     # Cap for decoded images, resize targets and upscales
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::{OutputFormat, Quality, RustCodec};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name looked up when no config path is given.
pub const CONFIG_FILE: &str = "retouch.toml";

const LOG_LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "error", "off"];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Editor configuration loaded from `retouch.toml`.
///
/// All fields have defaults; unknown keys are rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EditorConfig {
    pub output: OutputConfig,
    pub logging: LoggingConfig,
    pub processing: ProcessingConfig,
    pub background_removal: BackgroundRemovalConfig,
    pub super_resolution: SuperResolutionConfig,
    pub limits: LimitsConfig,
}

impl EditorConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.output.jpeg_quality) {
            return Err(ConfigError::Validation(
                "output.jpeg_quality must be 1-100".into(),
            ));
        }
        if self.output.save_dir.trim().is_empty() {
            return Err(ConfigError::Validation(
                "output.save_dir must not be empty".into(),
            ));
        }
        if !LOG_LEVELS.contains(&self.logging.level.to_ascii_lowercase().as_str()) {
            return Err(ConfigError::Validation(format!(
                "logging.level must be one of {}",
                LOG_LEVELS.join(", ")
            )));
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        if !(2..=8).contains(&self.super_resolution.scale) {
            return Err(ConfigError::Validation(
                "super_resolution.scale must be 2-8".into(),
            ));
        }
        if self.limits.max_pixels == 0 {
            return Err(ConfigError::Validation(
                "limits.max_pixels must be non-zero".into(),
            ));
        }
        Ok(())
    }

    /// Codec configured with the output quality and decode limit.
    pub fn codec(&self) -> RustCodec {
        RustCodec::new(
            Quality::new(self.output.jpeg_quality),
            self.limits.max_pixels,
        )
    }
}

/// Output encoding settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Format used when a command does not name one.
    pub format: OutputFormat,
    /// JPEG encoding quality (1 = worst, 100 = best).
    pub jpeg_quality: u32,
    /// Directory `save` writes into when no path is given.
    pub save_dir: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Png,
            jpeg_quality: 90,
            save_dir: "saved".to_string(),
        }
    }
}

impl OutputConfig {
    pub fn save_dir(&self) -> PathBuf {
        PathBuf::from(&self.save_dir)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is not set.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel edit workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

/// Local background removal settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackgroundRemovalConfig {
    /// Euclidean color distance from the border color still treated as background.
    pub tolerance: u8,
    /// Replacement color as `[r, g, b]`.
    pub fill: [u8; 3],
}

impl Default for BackgroundRemovalConfig {
    fn default() -> Self {
        Self {
            tolerance: 48,
            fill: [255, 255, 255],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SuperResolutionConfig {
    pub scale: u32,
}

impl Default for SuperResolutionConfig {
    fn default() -> Self {
        Self { scale: 4 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LimitsConfig {
    /// Pixel cap for decoded images, resize targets and upscaled output.
    pub max_pixels: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_pixels: 40_000_000,
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the base layer user overrides are merged onto.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(EditorConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<EditorConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: EditorConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from the file at `path`, falling back to stock defaults when
/// it does not exist.
pub fn load_config(path: &Path) -> Result<EditorConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(path)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `retouch.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Retouch Configuration
# =====================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Output encoding
# ---------------------------------------------------------------------------
[output]
# Format used when a command does not name one: PNG, JPEG, WEBP, TIFF or BMP.
format = "PNG"

# JPEG encoding quality (1 = worst, 100 = best).
jpeg_quality = 90

# Directory `retouch save` writes into when --save-path is not given.
save_dir = "saved"

# ---------------------------------------------------------------------------
# Logging
# ---------------------------------------------------------------------------
[logging]
# trace, debug, info, warn, error or off. RUST_LOG takes precedence.
level = "info"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel edit workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4

# ---------------------------------------------------------------------------
# Background removal
# ---------------------------------------------------------------------------
[background_removal]
# Color distance from the border color still counted as background (0-255).
tolerance = 48

# Replacement color as [r, g, b].
fill = [255, 255, 255]

# ---------------------------------------------------------------------------
# Super-resolution
# ---------------------------------------------------------------------------
[super_resolution]
# Integer upscale factor (2-8).
scale = 4

# ---------------------------------------------------------------------------
# Limits
# ---------------------------------------------------------------------------
[limits]
# Decoded images, resize targets and upscaled results above this many
# pixels are rejected.
max_pixels = 40000000
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_values() {
        let config = EditorConfig::default();
        assert_eq!(config.output.format, OutputFormat::Png);
        assert_eq!(config.output.jpeg_quality, 90);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.background_removal.tolerance, 48);
        assert_eq!(config.background_removal.fill, [255, 255, 255]);
        assert_eq!(config.super_resolution.scale, 4);
        assert_eq!(config.limits.max_pixels, 40_000_000);
    }

    #[test]
    fn parse_partial_config() {
        let toml = r#"
[output]
format = "jpeg"
"#;
        let config: EditorConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.output.format, OutputFormat::Jpeg);
        // Defaults preserved
        assert_eq!(config.output.jpeg_quality, 90);
        assert_eq!(config.super_resolution.scale, 4);
    }

    #[test]
    fn unsupported_format_rejected() {
        let toml = r#"
[output]
format = "gif"
"#;
        let result: Result<EditorConfig, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    // =========================================================================
    // load_config tests
    // =========================================================================

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(&tmp.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(config, EditorConfig::default());
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILE);
        fs::write(
            &path,
            r#"
[background_removal]
fill = [0, 0, 0]

[super_resolution]
scale = 2
"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.background_removal.fill, [0, 0, 0]);
        assert_eq!(config.super_resolution.scale, 2);
        // Unspecified values should be defaults
        assert_eq!(config.background_removal.tolerance, 48);
        assert_eq!(config.output.format, OutputFormat::Png);
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILE);
        fs::write(&path, "this is not valid toml [[[").unwrap();
        assert!(matches!(load_config(&path), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn load_config_validates_values() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILE);
        fs::write(
            &path,
            r#"
[super_resolution]
scale = 16
"#,
        )
        .unwrap();
        assert!(matches!(load_config(&path), Err(ConfigError::Validation(_))));
    }

    // =========================================================================
    // processing tests
    // =========================================================================

    #[test]
    fn effective_threads_auto() {
        let config = ProcessingConfig {
            max_processes: None,
        };
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        assert_eq!(effective_threads(&config), cores);
    }

    #[test]
    fn effective_threads_clamped_to_cores() {
        let config = ProcessingConfig {
            max_processes: Some(99999),
        };
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        assert_eq!(effective_threads(&config), cores);
    }

    #[test]
    fn effective_threads_user_constrains_down() {
        let config = ProcessingConfig {
            max_processes: Some(1),
        };
        assert_eq!(effective_threads(&config), 1);
    }

    // =========================================================================
    // merge_toml tests
    // =========================================================================

    #[test]
    fn merge_toml_scalar_override() {
        let base: toml::Value = toml::from_str(r#"scale = 4"#).unwrap();
        let overlay: toml::Value = toml::from_str(r#"scale = 2"#).unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged.get("scale").unwrap().as_integer(), Some(2));
    }

    #[test]
    fn merge_toml_preserves_base_keys() {
        let base: toml::Value = toml::from_str(
            r#"
[output]
format = "PNG"
jpeg_quality = 90
"#,
        )
        .unwrap();
        let overlay: toml::Value = toml::from_str(
            r#"
[output]
jpeg_quality = 70
"#,
        )
        .unwrap();
        let merged = merge_toml(base, overlay);
        let output = merged.get("output").unwrap();
        assert_eq!(output.get("format").unwrap().as_str(), Some("PNG"));
        assert_eq!(output.get("jpeg_quality").unwrap().as_integer(), Some(70));
    }

    // =========================================================================
    // Unknown key rejection
    // =========================================================================

    #[test]
    fn unknown_key_rejected() {
        let toml_str = r#"
[output]
formt = "PNG"
"#;
        let result: Result<EditorConfig, _> = toml::from_str(toml_str);
        let err = result.unwrap_err().to_string();
        assert!(err.contains("unknown field"));
    }

    #[test]
    fn unknown_section_rejected() {
        let toml_str = r#"
[outputs]
format = "PNG"
"#;
        let result: Result<EditorConfig, _> = toml::from_str(toml_str);
        assert!(result.is_err());
    }

    // =========================================================================
    // Validation
    // =========================================================================

    #[test]
    fn validate_default_config_passes() {
        assert!(EditorConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_out_of_range_values() {
        let mut config = EditorConfig::default();
        config.output.jpeg_quality = 0;
        assert!(config.validate().is_err());

        let mut config = EditorConfig::default();
        config.super_resolution.scale = 1;
        assert!(config.validate().is_err());

        let mut config = EditorConfig::default();
        config.logging.level = "loud".into();
        assert!(config.validate().is_err());

        let mut config = EditorConfig::default();
        config.processing.max_processes = Some(0);
        assert!(config.validate().is_err());

        let mut config = EditorConfig::default();
        config.limits.max_pixels = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_accepts_uppercase_log_level() {
        let mut config = EditorConfig::default();
        config.logging.level = "DEBUG".into();
        assert!(config.validate().is_ok());
    }

    // =========================================================================
    // stock config
    // =========================================================================

    #[test]
    fn stock_config_toml_roundtrips_to_defaults() {
        let config: EditorConfig = toml::from_str(stock_config_toml()).unwrap();
        assert_eq!(config, EditorConfig::default());
    }

    #[test]
    fn stock_config_toml_contains_all_sections() {
        let content = stock_config_toml();
        for section in [
            "[output]",
            "[logging]",
            "[processing]",
            "[background_removal]",
            "[super_resolution]",
            "[limits]",
        ] {
            assert!(content.contains(section), "missing {section}");
        }
    }

    #[test]
    fn stock_defaults_value_has_all_sections() {
        let val = stock_defaults_value().unwrap();
        assert!(val.is_table());
        for key in ["output", "logging", "processing", "background_removal", "super_resolution", "limits"] {
            assert!(val.get(key).is_some(), "missing {key}");
        }
    }
}
