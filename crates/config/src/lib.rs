//! Status tracker configuration
use std::path::PathBuf;

use clap::{Parser, ValueEnum};

mod file;

pub use file::{
    ConfigError, DEFAULT_FEED_URL, DEFAULT_PROVIDER_NAME, ProviderConfig, Settings, TrackerConfig,
};

/// Default port of the health/status server
pub const DEFAULT_HEALTH_PORT: u16 = 10000;

/// How incident notifications are rendered on stdout
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable colored blocks
    #[default]
    Pretty,
    /// One JSON object per line
    Json,
}

/// Health server configuration options
#[derive(Debug, Clone, Parser)]
pub struct HealthOpts {
    /// Port the health/status server listens on
    #[clap(long, env = "PORT", default_value_t = DEFAULT_HEALTH_PORT)]
    pub port: u16,
    /// If set, do not start the health/status server
    #[clap(long, env = "DISABLE_HEALTH_SERVER")]
    pub disable_health_server: bool,
}

/// CLI options for the status tracker
#[derive(Debug, Clone, Parser)]
#[clap(version, about = "Watches status-page feeds and reports new incidents")]
pub struct Opts {
    /// Path to the YAML configuration file
    #[clap(long, env = "STATUS_TRACKER_CONFIG", default_value = "config.yaml")]
    pub config: PathBuf,

    /// Log level, overrides `settings.log_level` from the configuration file
    #[clap(long, env = "LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Output format for incident notifications
    #[clap(long, env = "OUTPUT_FORMAT", value_enum, default_value_t = OutputFormat::Pretty)]
    pub output: OutputFormat,

    /// Health server configuration
    #[clap(flatten)]
    pub health: HealthOpts,
}

impl Opts {
    /// Load the configuration file named by `--config` and apply CLI overrides.
    pub fn load_config(&self) -> Result<TrackerConfig, ConfigError> {
        let mut config = TrackerConfig::load(&self.config)?;
        if let Some(level) = &self.log_level {
            config.settings.log_level = level.clone();
        }
        Ok(config)
    }
}
