use thiserror::Error;

/// Errors that stop a scan before (or instead of) producing output.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Missing {0}")]
    MissingField(&'static str),

    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Scan ID \"{0}\" is already in use. Please use a unique ID.")]
    JobIdInUse(String),

    #[error("scan {0} was cancelled")]
    Cancelled(String),

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("failed to write CSV: {0}")]
    Csv(#[from] csv::Error),
}

/// A page could not be retrieved. Recorded and skipped, never fatal.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },
}

/// The external grammar service call failed. Logged and skipped.
#[derive(Debug, Error)]
pub enum LintError {
    #[error("grammar service request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("grammar service answered with HTTP {0}")]
    Status(u16),
}
