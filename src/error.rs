use thiserror::Error;

/// Typed failures the CLI reports as user errors (exit code 1).
///
/// Everything else (database, I/O) travels as `anyhow::Error` and is
/// reported as an internal error.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TrackerError {
    #[error("Unknown task '{0}'. Known tasks: {1}")]
    UnknownTask(String, String),

    #[error("Task '{input}' is ambiguous. Did you mean {candidates}?")]
    AmbiguousTask { input: String, candidates: String },

    #[error("Unknown flag '{0}'. Known flags: companyProfileDone, entityCreated, entityVerified")]
    UnknownFlag(String),

    #[error("Invalid flag value '{0}'. Use true or false.")]
    InvalidFlagValue(String),

    #[error("Invalid configuration at line {line}: {message}")]
    InvalidConfig { line: usize, message: String },
}
