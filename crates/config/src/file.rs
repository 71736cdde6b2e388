use std::{collections::HashSet, path::Path, time::Duration};

use feed::FeedType;
use serde::Deserialize;
use url::Url;

/// Provider monitored when the configuration names none
pub const DEFAULT_PROVIDER_NAME: &str = "OpenAI";
/// Feed of the default provider
pub const DEFAULT_FEED_URL: &str = "https://status.openai.com/history.atom";

const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;

/// Errors raised while loading or validating the configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// Path of the configuration file
        path: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
    /// The file is not valid YAML for the expected schema.
    #[error("invalid configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),
    /// A value is syntactically valid but unusable.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Immutable description of one status-page provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    /// Display name, unique across providers
    pub name: String,
    /// Feed location
    pub feed_url: Url,
    /// Feed dialect
    pub feed_type: FeedType,
    /// Delay between polls while healthy
    pub poll_interval: Duration,
}

impl ProviderConfig {
    /// The provider monitored when none are configured.
    pub fn default_provider() -> Self {
        Self {
            name: DEFAULT_PROVIDER_NAME.to_owned(),
            feed_url: Url::parse(DEFAULT_FEED_URL).expect("default feed url is valid"),
            feed_type: FeedType::Atom,
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
        }
    }
}

/// Global tracker settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Fallback log filter when `RUST_LOG` is unset
    pub log_level: String,
    /// Consecutive failures tolerated before a provider is considered exhausted
    pub max_retries: u32,
    /// Wait after the first failure, doubled on each further failure
    pub base_backoff: Duration,
    /// Upper bound of any backoff wait
    pub max_backoff: Duration,
    /// Emit the most recent incidents once on the first successful poll
    pub show_historical: bool,
    /// How many incidents to emit as history
    pub max_historical: usize,
    /// Timeout of a single feed request
    pub request_timeout: Duration,
    /// How long a monitor waits to hand an event to the notifier
    pub notify_timeout: Duration,
    /// How long shutdown waits for monitors before aborting them
    pub shutdown_grace: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: "INFO".to_owned(),
            max_retries: 5,
            base_backoff: Duration::from_secs(2),
            max_backoff: Duration::from_secs(300),
            show_historical: true,
            max_historical: 10,
            request_timeout: Duration::from_secs(15),
            notify_timeout: Duration::from_secs(5),
            shutdown_grace: Duration::from_secs(5),
        }
    }
}

/// Providers plus global settings, as loaded from the YAML file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerConfig {
    /// Providers in configuration order
    pub providers: Vec<ProviderConfig>,
    /// Global settings
    pub settings: Settings,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self { providers: vec![ProviderConfig::default_provider()], settings: Settings::default() }
    }
}

impl TrackerConfig {
    /// Load the configuration from `path`, falling back to defaults when the
    /// file does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.display().to_string(), source })?;
        Self::from_yaml(&raw)
    }

    /// Parse and validate a YAML document.
    pub fn from_yaml(raw: &str) -> Result<Self, ConfigError> {
        let file: RawConfig = serde_yaml::from_str(raw)?;
        let file = file.unwrap_or_default();

        let mut providers = Vec::new();
        let mut names = HashSet::new();
        for entry in file.providers.unwrap_or_default() {
            if entry.name.trim().is_empty() {
                return Err(ConfigError::Invalid("provider name must not be empty".to_owned()));
            }
            if !names.insert(entry.name.clone()) {
                return Err(ConfigError::Invalid(format!("duplicate provider `{}`", entry.name)));
            }
            if entry.poll_interval == 0 {
                return Err(ConfigError::Invalid(format!(
                    "provider `{}`: poll_interval must be positive",
                    entry.name
                )));
            }
            providers.push(ProviderConfig {
                name: entry.name,
                feed_url: entry.feed_url,
                feed_type: entry.feed_type,
                poll_interval: Duration::from_secs(entry.poll_interval),
            });
        }
        if providers.is_empty() {
            providers.push(ProviderConfig::default_provider());
        }

        let settings = file.settings.unwrap_or_default().into_settings()?;
        Ok(Self { providers, settings })
    }
}

type RawConfig = Option<RawFile>;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawFile {
    providers: Option<Vec<RawProvider>>,
    settings: Option<RawSettings>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawProvider {
    name: String,
    feed_url: Url,
    #[serde(default)]
    feed_type: FeedType,
    #[serde(default = "default_poll_interval")]
    poll_interval: u64,
}

const fn default_poll_interval() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

/// Durations are whole seconds.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawSettings {
    log_level: String,
    max_retries: u32,
    base_backoff: u64,
    max_backoff: u64,
    show_historical: bool,
    max_historical: usize,
    request_timeout: u64,
    notify_timeout: u64,
    shutdown_grace: u64,
}

impl Default for RawSettings {
    fn default() -> Self {
        let d = Settings::default();
        Self {
            log_level: d.log_level,
            max_retries: d.max_retries,
            base_backoff: d.base_backoff.as_secs(),
            max_backoff: d.max_backoff.as_secs(),
            show_historical: d.show_historical,
            max_historical: d.max_historical,
            request_timeout: d.request_timeout.as_secs(),
            notify_timeout: d.notify_timeout.as_secs(),
            shutdown_grace: d.shutdown_grace.as_secs(),
        }
    }
}

impl RawSettings {
    fn into_settings(self) -> Result<Settings, ConfigError> {
        if self.base_backoff == 0 {
            return Err(ConfigError::Invalid("base_backoff must be positive".to_owned()));
        }
        if self.max_backoff < self.base_backoff {
            return Err(ConfigError::Invalid(
                "max_backoff must not be smaller than base_backoff".to_owned(),
            ));
        }
        if self.request_timeout == 0 {
            return Err(ConfigError::Invalid("request_timeout must be positive".to_owned()));
        }
        Ok(Settings {
            log_level: self.log_level,
            max_retries: self.max_retries,
            base_backoff: Duration::from_secs(self.base_backoff),
            max_backoff: Duration::from_secs(self.max_backoff),
            show_historical: self.show_historical,
            max_historical: self.max_historical,
            request_timeout: Duration::from_secs(self.request_timeout),
            notify_timeout: Duration::from_secs(self.notify_timeout),
            shutdown_grace: Duration::from_secs(self.shutdown_grace),
        })
    }
}
