//! Application configuration.
//!
//! Settings are loaded from an optional config file (TOML, YAML, or JSON,
//! auto-detected by extension) and then overridden by environment
//! variables, matching the precedence original FOIA tooling has always
//! used: file for defaults, environment for per-deployment overrides.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

fn default_db_path() -> PathBuf {
    PathBuf::from("foia.db")
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_max_retries() -> u32 {
    3
}

fn default_backoff_factor() -> f64 {
    2.0
}

fn default_rate_limit() -> f64 {
    2.0
}

fn default_user_agent() -> String {
    "EpsteinDocScraper/1.0 (Academic Research)".to_string()
}

fn default_max_file_size() -> u64 {
    524_288_000 // 500 MiB
}

fn default_min_chars_per_page() -> usize {
    50
}

fn default_ocr_dpi() -> u32 {
    300
}

fn default_tesseract_lang() -> String {
    "eng".to_string()
}

fn default_max_ocr_pages() -> u32 {
    50
}

fn default_true() -> bool {
    true
}

/// Top-level download tuning shared by every adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub backoff_factor: f64,
    pub default_rate_limit: f64,
    pub user_agent: String,
    pub max_file_size: u64,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            backoff_factor: default_backoff_factor(),
            default_rate_limit: default_rate_limit(),
            user_agent: default_user_agent(),
            max_file_size: default_max_file_size(),
        }
    }
}

/// Text extraction tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub min_chars_per_page: usize,
    pub ocr_dpi: u32,
    pub tesseract_lang: String,
    pub max_ocr_pages: u32,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_chars_per_page: default_min_chars_per_page(),
            ocr_dpi: default_ocr_dpi(),
            tesseract_lang: default_tesseract_lang(),
            max_ocr_pages: default_max_ocr_pages(),
        }
    }
}

/// Per-source overrides. Any field left unset falls back to the
/// download-level default.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub enabled: bool,
    pub rate_limit: Option<f64>,
    pub description: String,
    pub api_token: Option<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            rate_limit: None,
            description: String::new(),
            api_token: None,
        }
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    pub download: DownloadConfig,
    pub extraction: ExtractionConfig,
    pub sources: std::collections::HashMap<String, SourceConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            data_dir: default_data_dir(),
            log_dir: default_log_dir(),
            download: DownloadConfig::default(),
            extraction: ExtractionConfig::default(),
            sources: std::collections::HashMap::new(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    Read(PathBuf, std::io::Error),
    #[error("unrecognized config file extension: {0}")]
    UnknownFormat(PathBuf),
    #[error("failed to parse TOML config: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("failed to parse YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("failed to parse JSON config: {0}")]
    Json(#[from] serde_json::Error),
}

impl Config {
    /// Load configuration from a file, auto-detecting TOML/YAML/JSON by
    /// extension, then apply environment variable overrides.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            Self::load_file(path)?
        } else {
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Ok(toml::from_str(&contents)?),
            Some("yaml") | Some("yml") => Ok(serde_yaml::from_str(&contents)?),
            Some("json") => Ok(serde_json::from_str(&contents)?),
            _ => Err(ConfigError::UnknownFormat(path.to_path_buf())),
        }
    }

    /// Override fields from the environment, matching the catalog's
    /// published environment-variable contract.
    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("SQLITE_DB_PATH") {
            self.db_path = PathBuf::from(path);
        }
        if let Ok(path) = std::env::var("DATA_DIR") {
            self.data_dir = PathBuf::from(path);
        }
    }

    /// The directory holding extracted-text output, derived from
    /// `data_dir`.
    pub fn extracted_dir(&self) -> PathBuf {
        self.data_dir.join("extracted_text")
    }

    /// Per-source rate limit in seconds, falling back to the download
    /// default when a source has no override configured.
    pub fn rate_limit_for(&self, source: &str) -> f64 {
        self.sources
            .get(source)
            .and_then(|s| s.rate_limit)
            .unwrap_or(self.download.default_rate_limit)
    }

    /// Whether a source is enabled. Sources not mentioned in config are
    /// enabled by default.
    pub fn source_enabled(&self, source: &str) -> bool {
        self.sources.get(source).map(|s| s.enabled).unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.db_path, PathBuf::from("foia.db"));
        assert_eq!(config.download.max_retries, 3);
        assert_eq!(config.extraction.max_ocr_pages, 50);
    }

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let config = Config::load(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.download.default_rate_limit, 2.0);
    }

    #[test]
    fn test_toml_round_trip() {
        let toml_str = r#"
            db_path = "custom.db"
            data_dir = "custom_data"
            log_dir = "custom_logs"

            [download]
            timeout_secs = 60
            max_retries = 5
            backoff_factor = 2.0
            default_rate_limit = 1.0
            user_agent = "Test/1.0"
            max_file_size = 1000

            [extraction]
            enabled = true
            min_chars_per_page = 50
            ocr_dpi = 300
            tesseract_lang = "eng"
            max_ocr_pages = 50

            [sources.doj]
            enabled = true
            rate_limit = 3.0
            description = "Department of Justice document releases"
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.db_path, PathBuf::from("custom.db"));
        assert_eq!(config.log_dir, PathBuf::from("custom_logs"));
        assert_eq!(config.download.timeout_secs, 60);
        assert_eq!(config.rate_limit_for("doj"), 3.0);
        assert_eq!(config.rate_limit_for("fbi_vault"), 1.0);
        assert!(config.source_enabled("doj"));
    }
}
