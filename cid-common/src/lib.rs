//! Shared types for ColonyID services
//!
//! Holds the common error taxonomy and TOML/environment configuration
//! loading used by every ColonyID module.

pub mod config;
pub mod error;

pub use error::{Error, Result};
