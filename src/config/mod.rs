//! Configuration module for Sumi-Relay
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use sumi_relay::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("relay.toml")).unwrap();
//! println!("Scheduler polls every {}ms", config.pipeline.poll_interval_ms);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, PipelineConfig, ServerConfig, StorageConfig, UserAgentConfig};

// Re-export parser functions
pub use parser::{load_config, parse_config};
pub use validation::validate;
