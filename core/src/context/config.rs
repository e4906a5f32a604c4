//! Loader configuration read from TOML.

use std::io;
use std::path::{Path, PathBuf};

use encoding_rs::Encoding;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::combat_log::TokenizerOptions;
use crate::loading::{LoadOptions, default_workers};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("unknown encoding label {0:?}")]
    UnknownEncoding(String),
    #[error("{field} must be at least 1")]
    Zero { field: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    pub workers: usize,
    pub chunks: usize,
    /// Files with fewer lines are parsed on the calling thread.
    pub parallel_threshold_lines: usize,
    pub multiple_logs: bool,
    /// Largest accepted field in bytes.
    pub max_field_size: usize,
    /// WHATWG encoding label.
    pub encoding: String,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        let load = LoadOptions::default();
        Self {
            workers: default_workers(),
            chunks: load.chunks,
            parallel_threshold_lines: load.parallel_threshold_lines,
            multiple_logs: load.multiple_logs,
            max_field_size: load.tokenizer.max_field_size,
            encoding: "utf-8".to_string(),
        }
    }
}

/// `<config dir>/aegis/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("aegis").join("config.toml"))
}

impl LoaderConfig {
    /// Read a config file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        Self::from_toml(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Read the config from its default location, if there is one.
    pub fn load_default() -> Result<Self, ConfigError> {
        Self::load_optional(default_config_path().as_deref())
    }

    fn load_optional(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn from_toml(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    pub fn encoding(&self) -> Result<&'static Encoding, ConfigError> {
        Encoding::for_label(self.encoding.trim().as_bytes())
            .ok_or_else(|| ConfigError::UnknownEncoding(self.encoding.clone()))
    }

    pub fn load_options(&self) -> Result<LoadOptions, ConfigError> {
        for (field, value) in [
            ("workers", self.workers),
            ("chunks", self.chunks),
            ("max_field_size", self.max_field_size),
        ] {
            if value == 0 {
                return Err(ConfigError::Zero { field });
            }
        }
        Ok(LoadOptions {
            workers: self.workers,
            chunks: self.chunks,
            parallel_threshold_lines: self.parallel_threshold_lines,
            multiple_logs: self.multiple_logs,
            tokenizer: TokenizerOptions {
                max_field_size: self.max_field_size,
                encoding: self.encoding()?,
                ..TokenizerOptions::default()
            },
        })
    }
}
