//! Configuration file support
//!
//! Settings are read from a TOML file and merged with command-line flags,
//! flags taking precedence.
//!
//! # Search order
//!
//! 1. `./watermark-remover.toml`
//! 2. `<config_dir>/pdf-watermark-remover/config.toml`
//!
//! # Example
//!
//! ```toml
//! [clean]
//! keywords = ["CONFIDENTIAL DRAFT"]
//! header_height = 0
//! footer_height = 25
//! match_case = false
//!
//! [detect]
//! max_pages = 5
//!
//! [server]
//! port = 8000
//! bind = "127.0.0.1"
//! upload_limit_mb = 100
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cleaner::CleanParams;
use crate::detector::{DetectorOptions, DEFAULT_MAX_PAGES, DEFAULT_MIN_BLOCK_CHARS};

/// Config file name looked up in the working directory
pub const LOCAL_CONFIG_FILE: &str = "watermark-remover.toml";

/// Directory under the user config dir
pub const CONFIG_DIR_NAME: &str = "pdf-watermark-remover";

/// Default server port
pub const DEFAULT_PORT: u16 = 8000;

/// Default bind address
pub const DEFAULT_BIND: &str = "127.0.0.1";

/// Default upload limit in megabytes
pub const DEFAULT_UPLOAD_LIMIT_MB: usize = 100;

// ============================================================
// Error Types
// ============================================================

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to write config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

// ============================================================
// Sections
// ============================================================

/// `[detect]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectSection {
    pub max_pages: usize,
    pub min_block_chars: usize,
}

impl Default for DetectSection {
    fn default() -> Self {
        Self {
            max_pages: DEFAULT_MAX_PAGES,
            min_block_chars: DEFAULT_MIN_BLOCK_CHARS,
        }
    }
}

impl DetectSection {
    pub fn to_options(&self) -> DetectorOptions {
        DetectorOptions::builder()
            .max_pages(self.max_pages)
            .min_block_chars(self.min_block_chars)
            .build()
    }
}

/// `[server]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub port: u16,
    pub bind: String,
    pub upload_limit_mb: usize,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: DEFAULT_BIND.to_string(),
            upload_limit_mb: DEFAULT_UPLOAD_LIMIT_MB,
        }
    }
}

impl ServerSection {
    pub fn upload_limit_bytes(&self) -> usize {
        self.upload_limit_mb.saturating_mul(1024 * 1024)
    }
}

/// Complete configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub clean: CleanParams,
    pub detect: DetectSection,
    pub server: ServerSection,
}

impl Config {
    /// Load from the first config file found, or defaults when there is none
    pub fn load() -> Result<Self> {
        match Self::search_paths().into_iter().find(|p| p.is_file()) {
            Some(path) => Self::load_from_path(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load from a specific file
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&text)?;
        tracing::debug!(path = %path.display(), "Loaded config file");
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Candidate config file locations, in priority order
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(LOCAL_CONFIG_FILE)];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join(CONFIG_DIR_NAME).join("config.toml"));
        }
        paths
    }

    /// Clean params from this file with command-line overrides applied
    pub fn merge_with_cli(&self, cli: &CliOverrides) -> CleanParams {
        let mut builder = CleanParams::builder()
            .keywords(self.clean.keywords.iter().cloned())
            .header_height(self.clean.header_height)
            .footer_height(self.clean.footer_height)
            .match_case(self.clean.match_case);

        if let Some(keywords) = &cli.keywords {
            builder = builder.keywords(keywords.iter().cloned());
        }
        if let Some(height) = cli.header_height {
            builder = builder.header_height(height);
        }
        if let Some(height) = cli.footer_height {
            builder = builder.footer_height(height);
        }
        if let Some(match_case) = cli.match_case {
            builder = builder.match_case(match_case);
        }
        builder.build()
    }
}

// ============================================================
// CLI Overrides
// ============================================================

/// Values given on the command line; `None` keeps the file value
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CliOverrides {
    pub keywords: Option<Vec<String>>,
    pub header_height: Option<f32>,
    pub footer_height: Option<f32>,
    pub match_case: Option<bool>,
}

impl CliOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_keywords(mut self, keywords: Vec<String>) -> Self {
        self.keywords = Some(keywords);
        self
    }

    #[must_use]
    pub fn with_header_height(mut self, height: f32) -> Self {
        self.header_height = Some(height);
        self
    }

    #[must_use]
    pub fn with_footer_height(mut self, height: f32) -> Self {
        self.footer_height = Some(height);
        self
    }

    #[must_use]
    pub fn with_match_case(mut self, match_case: bool) -> Self {
        self.match_case = Some(match_case);
        self
    }
}
