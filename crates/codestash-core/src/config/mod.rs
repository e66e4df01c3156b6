//! Configuration loading and management

mod loader;

pub use loader::{AppConfig, CONFIG_FILE_NAME};
