use snafu::Snafu;
use std::path::PathBuf;

use crate::drive::constants::RETRYABLE_STATUS_CODES;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("Missing GOOGLE_APPLICATION_CREDENTIALS path"))]
    MissingCredentials,

    #[snafu(display("Retry bound must be at least 1, got {value}"))]
    InvalidRetryBound { value: String },

    #[snafu(display("Invalid value for '{key}': {value}"))]
    InvalidConfigValue { key: String, value: String },

    #[snafu(display("File not found: {}", path.display()))]
    LocalFileNotFound { path: PathBuf },

    #[snafu(display("Transfer did not complete: {detail}"))]
    TransferFailed { detail: String },

    #[snafu(display("Drive API returned status {status}: {message}"))]
    Api { status: u16, message: String },

    #[snafu(display("Drive API error ({context}): {source}"))]
    Operation { context: String, source: Box<Error> },

    #[snafu(display("Drive API failed after {attempts} attempts ({context}): {source}"))]
    RetriesExhausted {
        context: String,
        attempts: u32,
        source: Box<Error>,
    },

    #[snafu(display("Failed to load credentials from '{}': {source}", path.display()))]
    Credentials {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Authentication failed: {message}"))]
    Auth { message: String },

    #[snafu(display("HTTP transport error: {source}"))]
    Http { source: reqwest::Error },

    #[snafu(display("IO error: {source}"))]
    Io { source: std::io::Error },
}

impl Error {
    /// HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => Some(*status),
            Error::Http { source } => source.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Whether the error indicates a transient provider failure eligible
    /// for another attempt. Errors without a status code never qualify.
    pub fn is_retryable(&self) -> bool {
        self.status()
            .is_some_and(|status| RETRYABLE_STATUS_CODES.contains(&status))
    }
}

impl From<reqwest::Error> for Error {
    fn from(error: reqwest::Error) -> Self {
        Error::Http { source: error }
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Error::Io { source: error }
    }
}
