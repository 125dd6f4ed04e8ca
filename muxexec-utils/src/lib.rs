//! muxexec-utils: Common utilities shared across muxexec crates
//!
//! This crate provides:
//! - Unified error types ([`MuxexecError`], [`Result`])
//! - Logging infrastructure ([`init_logging_with_config`], [`LogConfig`])
//! - XDG-compliant path utilities ([`paths`] module)

pub mod error;
pub mod logging;
pub mod paths;

// Re-export main types at crate root for convenience
pub use error::{MuxexecError, Result};
pub use logging::{init_logging_with_config, LogConfig, LogOutput};

// Re-export commonly used path functions
pub use paths::{
    config_dir, config_file, ensure_dir, invocations_dir, lock_dir, log_dir, runtime_dir,
    state_dir,
};
