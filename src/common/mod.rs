//! Shared infrastructure: errors, logging, configuration, paths

pub mod config;
pub mod error;
pub mod logging;
pub mod paths;

pub use error::{Error, Result};
