use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub classifier: ClassifierConfig,
    pub site: SiteConfig,
    pub worker: WorkerConfig,
    pub directories: DirectoryConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    pub scheme: String,
    pub host: String,
    pub api_version: String,
    pub timeout: Duration,
}

/// Site-wide values sent along with every classification request.
#[derive(Debug, Clone)]
pub struct SiteConfig {
    pub homepage: String,
    pub language: Option<String>,
    pub charset: Option<String>,
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub max_concurrent_events: usize,
    pub shutdown_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    pub logs_dir: String,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    Missing(&'static str),
}
