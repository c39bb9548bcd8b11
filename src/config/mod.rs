//! Configuration management.
//!
//! The gateway is configured once at startup from a TOML file. The
//! configuration value is constructed explicitly and passed by reference into
//! the pipeline builder; there are no ambient global lookups.

pub mod bytes;
pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::AppConfig;
