// src/config/mod.rs
//! Configuration management for the miner
//!
//! This module handles all configuration-related functionality including:
//! - Loading and parsing configuration files
//! - Validating values before mining starts
//! - Generating configuration templates
//!
//! The configuration uses TOML format.

/// Core configuration implementation
///
/// Contains the [`Config`] struct and related types that define
/// the miner's configuration structure and behavior.
pub mod config;

// Re-export key items for easy access
pub use config::{Config, PRIVATE_KEY_ENV, MiningConfig, StatsConfig, SubmissionConfig, default_worker_count};

use crate::utils::error::MinerError;
use std::path::PathBuf;

/// Loads and validates miner configuration from a TOML file
///
/// # Returns
/// * `Ok(Config)` - Successfully loaded, valid configuration
/// * `Err(MinerError)` - If the file couldn't be read, parsed or validated
pub fn load(path: impl Into<PathBuf>) -> Result<Config, MinerError> {
    let mut config = Config::load(path)?;
    config.resolve_identity()?;
    config.validate()?;
    Ok(config)
}

/// Generates a commented configuration template
pub fn generate_template() -> String {
    Config::generate_template()
}
