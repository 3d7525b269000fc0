//! Configuration Module
//!
//! Handles configuration loading, validation, and command-line overrides.

pub mod manager;
pub mod types;

pub use manager::{parse_identity_list, validate_secret, CliOverrides, ConfigManager};
pub use types::*;
