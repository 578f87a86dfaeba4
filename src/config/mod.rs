pub mod env;
mod loader;

pub use env::{
    AppConfig, ClassifierConfig, ConfigError, DirectoryConfig, LoggingConfig, SiteConfig,
    WorkerConfig,
};
pub use loader::load_config;
