use std::{env, str::FromStr, time::Duration};

use super::env::{
    AppConfig, ClassifierConfig, ConfigError, DirectoryConfig, LoggingConfig, SiteConfig,
    WorkerConfig,
};

/// Ceiling for `MAX_CONCURRENT_EVENTS`.
pub const MAX_CONCURRENT_EVENTS_CAP: usize = 1024;
/// Ceiling for `SHUTDOWN_TIMEOUT_SECS`.
pub const SHUTDOWN_TIMEOUT_CAP_SECS: u64 = 3600;

pub fn load_config() -> Result<AppConfig, ConfigError> {
    AppConfig::from_lookup(|key| env::var(key).ok())
}

impl AppConfig {
    /// Builds the configuration from any key lookup; `load_config` passes the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let homepage = var("SITE_HOMEPAGE").ok_or(ConfigError::Missing("SITE_HOMEPAGE"))?;

        let classifier = ClassifierConfig {
            scheme: var("CLASSIFIER_SCHEME").unwrap_or_else(|| "https".to_string()),
            host: var("CLASSIFIER_HOST").unwrap_or_else(|| "rest.example.com".to_string()),
            api_version: var("CLASSIFIER_API_VERSION").unwrap_or_else(|| "1.1".to_string()),
            timeout: Duration::from_millis(parse_or(var("CLASSIFIER_TIMEOUT_MS"), 10_000)),
        };

        let site = SiteConfig {
            homepage,
            language: var("SITE_LANGUAGE"),
            charset: Some(var("SITE_CHARSET").unwrap_or_else(|| "UTF-8".to_string())),
        };

        let worker = WorkerConfig {
            max_concurrent_events: parse_or::<usize>(var("MAX_CONCURRENT_EVENTS"), 8)
                .clamp(1, MAX_CONCURRENT_EVENTS_CAP),
            shutdown_timeout: Duration::from_secs(
                parse_or::<u64>(var("SHUTDOWN_TIMEOUT_SECS"), 5).min(SHUTDOWN_TIMEOUT_CAP_SECS),
            ),
        };

        let directories = DirectoryConfig {
            logs_dir: var("LOGS_DIR").unwrap_or_else(|| "logs".to_string()),
        };

        let logging = LoggingConfig {
            level: var("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        };

        Ok(Self {
            classifier,
            site,
            worker,
            directories,
            logging,
        })
    }
}

fn parse_or<T: FromStr>(value: Option<String>, default: T) -> T {
    value
        .and_then(|value| value.parse::<T>().ok())
        .unwrap_or(default)
}
