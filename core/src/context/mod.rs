mod config;

pub use config::{ConfigError, LoaderConfig, default_config_path};
