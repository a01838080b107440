//! Configuration module for Callboard
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use callboard::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("callboard.toml")).unwrap();
//! println!("Fetch retries: {}", config.fetch.max_retries);
//! ```

mod parser;
mod types;
mod validation;

pub use types::{
    Config, FetchConfig, SchedulerConfig, SourceEntry, StorageConfig, UserAgentConfig,
};

pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::parse_time_of_day;
