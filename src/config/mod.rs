//! Configuration module for Robocop
//!
//! Settings come from an optional TOML file and are then overridden by
//! command-line flags. Every field has a default so an empty file is valid.
//!
//! # Example
//!
//! ```no_run
//! use robocop::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("robocop.toml")).unwrap();
//! println!("Crawling {} with {} visits", config.crawler.host, config.crawler.max_visits);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlerConfig, OutputConfig, UserAgentConfig};

// Re-export parser functions
pub use parser::{load_config, parse_config};
pub use validation::validate;
