// Error handling utilities for consistent error messages and exit codes

use crate::error::TrackerError;
use crate::models::Flag;
use crate::store::parse_flag_value;
use std::process;

/// Exit with a user error (exit code 1)
/// User errors are for invalid input, unknown tasks or flags, etc.
pub fn user_error(message: &str) -> ! {
    eprintln!("Error: {}", message);
    process::exit(1);
}

/// Whether an error should be reported as internal (exit code 2).
///
/// Typed tracker errors are always user errors; anything else is classified
/// by its message chain.
pub fn is_internal(err: &anyhow::Error) -> bool {
    if err.downcast_ref::<TrackerError>().is_some() {
        return false;
    }
    if err.downcast_ref::<rusqlite::Error>().is_some() {
        return true;
    }
    let error_str = format!("{:#}", err);
    error_str.contains("database")
        || error_str.contains("constraint")
        || error_str.contains("corruption")
        || error_str.contains("SQLite")
        || error_str.contains("Failed to")
}

/// Parse a flag name argument
pub fn validate_flag_name(name: &str) -> Result<Flag, TrackerError> {
    Flag::from_key(name).ok_or_else(|| TrackerError::UnknownFlag(name.to_string()))
}

/// Parse an optional flag value argument; absent means true
pub fn validate_flag_value(value: Option<&str>) -> Result<bool, TrackerError> {
    match value {
        None => Ok(true),
        Some(v) => parse_flag_value(v).ok_or_else(|| TrackerError::InvalidFlagValue(v.to_string())),
    }
}

/// Validate a poll interval in milliseconds
pub fn validate_interval_ms(ms: u64) -> Result<u64, String> {
    if ms == 0 {
        Err("Interval must be at least 1 ms".to_string())
    } else {
        Ok(ms)
    }
}
