//! Bot configuration, loaded from a YAML file.
//!
//! Every section has defaults, so a file naming just the watched routes is
//! enough. Secrets are never read from the file; see `Secrets`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::cache::CacheConfig;
use crate::messages::{MessageTemplates, TemplateConfig, TemplateError, TownRegistry};
use crate::rtt::DEFAULT_BASE_URL;
use crate::watch::{WatchList, WatchedRoute};

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "TRAIN_BOT_CONFIG";

/// Config file used when neither an argument nor `TRAIN_BOT_CONFIG` is given.
pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";

/// Upper bound on `poll.late_grace_mins`: one day.
pub const MAX_LATE_GRACE_MINS: i64 = 24 * 60;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub poll: PollConfig,
    pub routes: Vec<WatchedRoute>,
    /// Town names keyed by CRS code, TIPLOC or location name. A `null`
    /// value posts the `passing_without_town` message at that station.
    pub towns: HashMap<String, Option<String>>,
    pub templates: TemplateConfig,
    pub rtt: RttSettings,
    pub publish: PublishConfig,
    pub status: StatusConfig,
}

/// Poll loop timing.
#[derive(Debug, Clone, Deserialize)]
pub struct PollConfig {
    /// Seconds between poll passes (default: 60)
    #[serde(default = "PollConfig::default_interval_secs")]
    pub interval_secs: u64,
    /// How long search results stay cached (default: 600)
    #[serde(default = "PollConfig::default_search_ttl_secs")]
    pub search_ttl_secs: u64,
    /// How late a message may be and still be sent (default: 10)
    #[serde(default = "PollConfig::default_late_grace_mins")]
    pub late_grace_mins: i64,
    /// Service fetches in flight at once during a pass (default: 4)
    #[serde(default = "PollConfig::default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_secs: Self::default_interval_secs(),
            search_ttl_secs: Self::default_search_ttl_secs(),
            late_grace_mins: Self::default_late_grace_mins(),
            max_concurrent_fetches: Self::default_max_concurrent_fetches(),
        }
    }
}

impl PollConfig {
    fn default_interval_secs() -> u64 {
        60
    }
    fn default_search_ttl_secs() -> u64 {
        600
    }
    fn default_late_grace_mins() -> i64 {
        10
    }
    fn default_max_concurrent_fetches() -> usize {
        4
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn late_grace(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.late_grace_mins.clamp(0, MAX_LATE_GRACE_MINS))
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            ttl: Duration::from_secs(self.search_ttl_secs),
            ..CacheConfig::default()
        }
    }
}

/// RTT API connection settings. Credentials come from the environment.
#[derive(Debug, Clone, Deserialize)]
pub struct RttSettings {
    #[serde(default = "RttSettings::default_base_url")]
    pub base_url: String,
    #[serde(default = "RttSettings::default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "RttSettings::default_max_concurrent")]
    pub max_concurrent: usize,
}

impl Default for RttSettings {
    fn default() -> Self {
        Self {
            base_url: Self::default_base_url(),
            timeout_secs: Self::default_timeout_secs(),
            max_concurrent: Self::default_max_concurrent(),
        }
    }
}

impl RttSettings {
    fn default_base_url() -> String {
        DEFAULT_BASE_URL.to_string()
    }
    fn default_timeout_secs() -> u64 {
        30
    }
    fn default_max_concurrent() -> usize {
        4
    }
}

/// Where messages go.
#[derive(Debug, Clone, Deserialize)]
pub struct PublishConfig {
    /// Log messages instead of posting them (default: true)
    #[serde(default = "PublishConfig::default_dry_run")]
    pub dry_run: bool,
    #[serde(default)]
    pub mastodon: Option<MastodonSettings>,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            dry_run: Self::default_dry_run(),
            mastodon: None,
        }
    }
}

impl PublishConfig {
    fn default_dry_run() -> bool {
        true
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MastodonSettings {
    pub base_url: String,
}

/// Optional status HTTP endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusConfig {
    /// Address to serve on, e.g. "127.0.0.1:8080". Disabled when unset.
    pub bind: Option<String>,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Read {
            path: path.as_ref().to_path_buf(),
            message: e.to_string(),
        })?;

        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Check the things serde can't: at least one route, templates that
    /// parse, and nonzero timings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.routes.is_empty() {
            return Err(ConfigError::Invalid("no routes configured".into()));
        }
        if let Some(route) = self
            .routes
            .iter()
            .find(|r| r.from.trim().is_empty() || r.to.trim().is_empty())
        {
            return Err(ConfigError::Invalid(format!(
                "route {:?} -> {:?} has an empty station",
                route.from, route.to
            )));
        }
        if self.poll.interval_secs == 0 {
            return Err(ConfigError::Invalid("poll.interval_secs must be positive".into()));
        }
        if !(0..=MAX_LATE_GRACE_MINS).contains(&self.poll.late_grace_mins) {
            return Err(ConfigError::Invalid(format!(
                "poll.late_grace_mins must be between 0 and {MAX_LATE_GRACE_MINS}"
            )));
        }
        if !self.publish.dry_run && self.publish.mastodon.is_none() {
            return Err(ConfigError::Invalid(
                "publish.dry_run is off but no platform is configured".into(),
            ));
        }
        self.message_templates()?;
        Ok(())
    }

    pub fn watch_list(&self) -> WatchList {
        WatchList::from_routes(self.routes.iter().cloned())
    }

    pub fn town_registry(&self) -> TownRegistry {
        TownRegistry::new(
            self.towns
                .iter()
                .map(|(key, town)| (key.as_str(), town.as_deref())),
        )
    }

    pub fn message_templates(&self) -> Result<MessageTemplates, ConfigError> {
        Ok(MessageTemplates::from_config(&self.templates)?)
    }
}

/// Config file path: the first argument, else `TRAIN_BOT_CONFIG`, else
/// `config.yaml`.
pub fn config_path(arg: Option<String>, env: Option<String>) -> PathBuf {
    arg.or(env)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Credentials, read from the environment.
#[derive(Clone, Default)]
pub struct Secrets {
    pub rtt_username: String,
    pub rtt_password: String,
    pub mastodon_token: Option<String>,
}

impl Secrets {
    pub fn from_env() -> Result<Self, ConfigError> {
        let require = |name: &'static str| {
            std::env::var(name).map_err(|_| ConfigError::MissingEnv(name))
        };
        Ok(Self {
            rtt_username: require("RTT_USERNAME")?,
            rtt_password: require("RTT_PASSWORD")?,
            mastodon_token: std::env::var("MASTODON_ACCESS_TOKEN").ok(),
        })
    }
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets")
            .field("rtt_username", &self.rtt_username)
            .field("rtt_password", &"***")
            .field("mastodon_token", &self.mastodon_token.as_ref().map(|_| "***"))
            .finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {message}", path.display())]
    Read { path: PathBuf, message: String },
    #[error("Failed to parse config: {0}")]
    Parse(String),
    #[error("Invalid config: {0}")]
    Invalid(String),
    #[error("Invalid template: {0}")]
    Template(#[from] TemplateError),
    #[error("Environment variable {0} is not set")]
    MissingEnv(&'static str),
}
