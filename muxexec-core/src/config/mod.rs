//! Configuration management for muxexec
//!
//! Settings are read once per process from TOML and then overridden by
//! whatever the caller passes explicitly (CLI flags, library options).

mod defaults;
mod loader;
mod schema;

pub use defaults::DEFAULT_CONFIG_TOML;
pub use loader::ConfigLoader;
pub use schema::*;
