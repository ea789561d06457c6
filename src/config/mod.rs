//! Configuration module for crxpack
//!
//! Provides types and parsing for `crxpack.toml` project configuration and
//! the build mode flags.

pub mod env;
pub mod loader;
pub mod schema;

pub use env::*;
pub use loader::{default_config, load_config, ConfigError};
pub use schema::*;
