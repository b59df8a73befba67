//! Configuration parsing for altshift
//!
//! This crate holds the key combos and layout commands the daemon runs with,
//! and parses them from KDL configuration files.

mod error;
mod model;
mod parser;

pub use error::ConfigError;
pub use model::*;
pub use parser::{parse_config, parse_config_str};
