use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_PENDING_NAMESPACE: &str = "time_tracking.pending_updates";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {var}")]
    InvalidValue { var: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub cache_ttl: Duration,
    pub debounce: Duration,
    pub tick_interval: Duration,
    pub pending_namespace: String,
    pub user_entries_limit: u32,
    pub data_dir: PathBuf,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(5 * 60),
            debounce: Duration::from_secs(1),
            tick_interval: Duration::from_secs(1),
            pending_namespace: DEFAULT_PENDING_NAMESPACE.to_string(),
            user_entries_limit: 50,
            data_dir: PathBuf::from(".time_sessions"),
        }
    }
}

impl SessionConfig {
    /// Defaults overridden by `TIME_SESSIONS_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(secs) = parse::<u64>(&lookup, "TIME_SESSIONS_CACHE_TTL_SECS")? {
            config.cache_ttl = Duration::from_secs(secs);
        }
        if let Some(ms) = parse::<u64>(&lookup, "TIME_SESSIONS_DEBOUNCE_MS")? {
            config.debounce = Duration::from_millis(ms);
        }
        if let Some(ms) = parse::<u64>(&lookup, "TIME_SESSIONS_TICK_MS")? {
            if ms == 0 {
                return Err(ConfigError::InvalidValue {
                    var: "TIME_SESSIONS_TICK_MS",
                    value: ms.to_string(),
                });
            }
            config.tick_interval = Duration::from_millis(ms);
        }
        if let Some(namespace) = lookup("TIME_SESSIONS_PENDING_NAMESPACE") {
            config.pending_namespace = namespace;
        }
        if let Some(limit) = parse::<u32>(&lookup, "TIME_SESSIONS_USER_ENTRIES_LIMIT")? {
            config.user_entries_limit = limit;
        }
        if let Some(dir) = lookup("TIME_SESSIONS_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        Ok(config)
    }
}

fn parse<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<T>, ConfigError> {
    lookup(var)
        .map(|value| {
            value
                .trim()
                .parse::<T>()
                .map_err(|_| ConfigError::InvalidValue { var, value })
        })
        .transpose()
}
