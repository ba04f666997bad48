pub mod config;
pub mod errors;
pub mod logging;

pub use config::{AppConfig, EngineConfig, LoggingConfig, StorageConfig};
pub use errors::{FreshdError, FreshdResult};
pub use logging::init_logging;
