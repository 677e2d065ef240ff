use std::str::FromStr;

use thiserror::Error;

/// An environment variable required by the application is not set.
#[derive(Debug, Error)]
#[error("Missing environment variable: {0}")]
pub struct MissingEnvVarError(pub String);

/// An environment variable is set but its value could not be parsed.
#[derive(Debug, Error)]
#[error("Environment variable {name} has an invalid value {value:?}: {reason}")]
pub struct InvalidEnvVarError {
    pub name: String,
    pub value: String,
    pub reason: String,
}

/// Reads an environment variable, returning a structured error if it's missing.
///
/// Empty values are treated the same as unset ones, so `FOO= cmd` does not
/// silently hand an empty credential to a provider.
///
/// # Arguments
/// * `name` - The name of the environment variable to read.
pub fn get_env_var(name: &str) -> Result<String, MissingEnvVarError> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(MissingEnvVarError(name.to_string())),
    }
}

/// Reads and parses an optional environment variable.
///
/// Returns `Ok(None)` when the variable is unset or empty.
pub fn parse_env_var<T>(name: &str) -> Result<Option<T>, InvalidEnvVarError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let Ok(value) = get_env_var(name) else {
        return Ok(None);
    };
    value
        .trim()
        .parse::<T>()
        .map(Some)
        .map_err(|e| InvalidEnvVarError {
            name: name.to_string(),
            value,
            reason: e.to_string(),
        })
}
