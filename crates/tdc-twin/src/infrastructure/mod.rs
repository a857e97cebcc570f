//! Infrastructure Layer - External Technology Stack
//!
//! Concrete integrations that depend on external formats.
//!
//! # Responsibilities
//! - TOML persistence of [`TdcConfig`](crate::domain::TdcConfig)

pub mod config_file;

pub use config_file::{load_config, save_config, ConfigFileError};
