//! Shared building blocks for the application bootstrap.
//!
//! - [`config`]: environment-driven application and database settings
//! - [`errors`]: the error type shared by every startup stage and handler
//! - [`models`]: database configuration records and model definitions
//! - [`response`]: the JSON envelope returned by HTTP handlers

pub mod config;
pub mod errors;
pub mod models;
pub mod response;
pub mod utils;
