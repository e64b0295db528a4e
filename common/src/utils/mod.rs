//! Utility functions and helpers.

pub mod env;

// Re-export commonly used helpers
pub use env::{env_or, env_parse_or, to_boolean};
