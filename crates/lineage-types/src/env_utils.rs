//! Environment variable parsing utilities.
//!
//! Replaces the repeated
//!
//! ```ignore
//! std::env::var("VAR_NAME")
//!     .ok()
//!     .and_then(|v| v.parse::<u64>().ok())
//!     .unwrap_or(default_value)
//! ```
//!
//! pattern used by catalog configuration.
//!
//! # Example
//!
//! ```
//! use lineage_types::env_utils::{env_var, env_var_or};
//!
//! let timeout: u64 = env_var_or("LINEAGE_TIMEOUT_SECS", 30);
//! let custom: Option<u64> = env_var("LINEAGE_REQUEST_INTERVAL_MS");
//! ```

use std::str::FromStr;

/// Parse an environment variable into a type that implements `FromStr`.
///
/// Returns `None` if the variable is not set or cannot be parsed.
pub fn env_var<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// Parse an environment variable with a default value.
pub fn env_var_or<T: FromStr>(key: &str, default: T) -> T {
    env_var(key).unwrap_or(default)
}

/// Check if an environment variable is set to a truthy value.
///
/// Returns `true` for "1", "true", "yes", or "on" (case-insensitive).
pub fn env_bool(key: &str) -> bool {
    std::env::var(key)
        .ok()
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

/// Get an environment variable as a string with a default value.
///
/// An empty value counts as unset.
pub fn env_string_or(key: &str, default: &str) -> String {
    match std::env::var(key) {
        Ok(v) if !v.trim().is_empty() => v,
        _ => default.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_var_parsing() {
        std::env::set_var("LINEAGE_TEST_U64", " 42 ");
        let val: Option<u64> = env_var("LINEAGE_TEST_U64");
        assert_eq!(val, Some(42));

        let missing: Option<u64> = env_var("LINEAGE_NONEXISTENT_12345");
        assert_eq!(missing, None);

        std::env::remove_var("LINEAGE_TEST_U64");
    }

    #[test]
    fn test_env_var_or() {
        std::env::set_var("LINEAGE_TEST_DEFAULT", "not-a-number");
        let val: u64 = env_var_or("LINEAGE_TEST_DEFAULT", 50);
        assert_eq!(val, 50);
        std::env::remove_var("LINEAGE_TEST_DEFAULT");
    }

    #[test]
    fn test_env_bool() {
        std::env::set_var("LINEAGE_TEST_BOOL_YES", "YES");
        std::env::set_var("LINEAGE_TEST_BOOL_NO", "0");

        assert!(env_bool("LINEAGE_TEST_BOOL_YES"));
        assert!(!env_bool("LINEAGE_TEST_BOOL_NO"));
        assert!(!env_bool("LINEAGE_NONEXISTENT_12347"));

        std::env::remove_var("LINEAGE_TEST_BOOL_YES");
        std::env::remove_var("LINEAGE_TEST_BOOL_NO");
    }

    #[test]
    fn test_env_string_or() {
        std::env::set_var("LINEAGE_TEST_STRING", "TNG50-1");
        std::env::set_var("LINEAGE_TEST_EMPTY", "  ");
        assert_eq!(env_string_or("LINEAGE_TEST_STRING", "TNG100-1"), "TNG50-1");
        assert_eq!(env_string_or("LINEAGE_TEST_EMPTY", "TNG100-1"), "TNG100-1");
        std::env::remove_var("LINEAGE_TEST_STRING");
        std::env::remove_var("LINEAGE_TEST_EMPTY");
    }
}
