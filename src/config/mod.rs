mod config;

pub use config::{Config, ConfigCreationError, DEFAULT_CONFIG_FILE_NAME};
