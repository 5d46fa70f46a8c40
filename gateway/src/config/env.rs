//! Environment variable helpers.

use std::str::FromStr;

use super::ConfigError;

/// Read a variable, treating empty values as unset.
pub(super) fn var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Read and parse a variable.
pub(super) fn parse<T>(name: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match var(name) {
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidValue {
                name,
                reason: format!("{raw:?}: {e}"),
            }),
        None => Ok(None),
    }
}
