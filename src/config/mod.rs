// Configuration module

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::batch::ProcessingMode;
use crate::constants::{DEFAULT_MAX_IMAGE_PIXELS, DEFAULT_MAX_WORKERS, DEFAULT_OUTPUT_DIR};
use crate::logging::LogOptions;
use crate::watermark::WatermarkSettings;

/// Levels accepted by `logging.level`.
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Runtime configuration. Every field has a default, so an empty file is valid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub processing: ProcessingConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Log output configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Level for this crate when RUST_LOG is unset (default: info)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Emit JSON lines instead of human-readable output (default: false)
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_max_workers() -> usize {
    DEFAULT_MAX_WORKERS
}

/// Scheduling of the files in a submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingConfig {
    /// Process files of one submission concurrently (default: false)
    #[serde(default)]
    pub parallel: bool,
    /// Upper bound on concurrent files when parallel (default: 4)
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            parallel: false,
            max_workers: default_max_workers(),
        }
    }
}

fn default_max_image_pixels() -> u64 {
    DEFAULT_MAX_IMAGE_PIXELS // 100 megapixels
}

/// Input limits; anything over them is passed through unstamped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Largest upload that is watermarked, in bytes (default: no limit)
    #[serde(default)]
    pub max_file_size_bytes: Option<usize>,
    /// Largest image that is decoded, in pixels (default: 100 MP)
    #[serde(default = "default_max_image_pixels")]
    pub max_image_pixels: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_file_size_bytes: None,
            max_image_pixels: default_max_image_pixels(),
        }
    }
}

fn default_output_directory() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_DIR)
}

/// Where the CLI writes attachments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Output directory (default: ./watermarked)
    #[serde(default = "default_output_directory")]
    pub directory: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_directory(),
        }
    }
}

impl Config {
    pub fn from_yaml_with_env(yaml: &str) -> Result<Self, String> {
        // Replace ${VAR_NAME} with environment variable values
        let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").map_err(|e| e.to_string())?;

        // The first unset variable is reported after the pass
        let mut missing = None;
        let substituted = re.replace_all(yaml, |caps: &regex::Captures| {
            let var_name = &caps[1];
            match std::env::var(var_name) {
                Ok(value) => value,
                Err(_) => {
                    missing.get_or_insert_with(|| var_name.to_string());
                    String::new()
                }
            }
        });

        if let Some(var_name) = missing {
            return Err(format!(
                "Environment variable '{}' is referenced but not set",
                var_name
            ));
        }

        // An empty or comment-only file is a null document
        let is_null_document = substituted
            .lines()
            .map(str::trim)
            .all(|line| line.is_empty() || line.starts_with('#') || line == "---");
        if is_null_document {
            return Ok(Config::default());
        }

        let config: Option<Config> =
            serde_yaml::from_str(&substituted).map_err(|e| e.to_string())?;
        Ok(config.unwrap_or_default())
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;
        Self::from_yaml_with_env(&yaml)
    }

    pub fn validate(&self) -> Result<(), String> {
        if !LOG_LEVELS.contains(&self.logging.level.to_ascii_lowercase().as_str()) {
            return Err(format!(
                "logging.level '{}' is not one of {}",
                self.logging.level,
                LOG_LEVELS.join(", ")
            ));
        }

        if self.processing.max_workers == 0 {
            return Err("processing.max_workers must be greater than 0".to_string());
        }

        if self.limits.max_file_size_bytes == Some(0) {
            return Err("limits.max_file_size_bytes must be greater than 0".to_string());
        }

        if self.limits.max_image_pixels == 0 {
            return Err("limits.max_image_pixels must be greater than 0".to_string());
        }

        if self.output.directory.as_os_str().is_empty() {
            return Err("output.directory cannot be empty".to_string());
        }

        Ok(())
    }

    /// Engine limits derived from this configuration.
    pub fn watermark_settings(&self) -> WatermarkSettings {
        WatermarkSettings {
            max_file_size_bytes: self.limits.max_file_size_bytes,
            max_image_pixels: self.limits.max_image_pixels,
        }
    }

    /// Batch scheduling derived from this configuration.
    pub fn processing_mode(&self) -> ProcessingMode {
        ProcessingMode::from_flags(self.processing.parallel, self.processing.max_workers)
    }

    /// Subscriber options derived from this configuration.
    pub fn log_options(&self) -> LogOptions {
        LogOptions {
            level: self.logging.level.clone(),
            json: self.logging.json,
        }
    }
}
