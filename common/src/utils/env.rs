//! Environment variable helpers.

use std::str::FromStr;

/// Values accepted as `true` by [`to_boolean`], compared case-insensitively.
const TRUTHY: [&str; 4] = ["true", "1", "yes", "on"];

/// Interprets a loosely written flag value.
///
/// Anything outside the accepted truthy spellings is `false`, so
/// `INITIALIZE_DB = false` really means false.
pub fn to_boolean(value: &str) -> bool {
    let value = value.trim();
    TRUTHY.iter().any(|t| t.eq_ignore_ascii_case(value))
}

/// Reads an environment variable, falling back to `default` when unset.
pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Reads and parses an environment variable, falling back to `default`
/// when unset or unparseable.
pub fn env_parse_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
