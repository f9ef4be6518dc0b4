//! Error types for the scanner.
//!
//! Adapters surface [`ScanError`] so the orchestrator can log one concise reason
//! per failed exchange. Application code above the library boundary uses
//! `anyhow` and attaches context.

use thiserror::Error;

/// Errors raised while fetching, parsing or reporting a scan.
#[derive(Debug, Error)]
pub enum ScanError {
    /// Invalid configuration, detected before any network call.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Transport-level failure (DNS, connect, timeout, body read).
    #[error("HTTP error for {exchange}: {source}")]
    Http {
        exchange: String,
        #[source]
        source: reqwest::Error,
    },

    /// The exchange answered with a non-success status.
    #[error("{exchange} returned HTTP {status}: {body}")]
    Status {
        exchange: String,
        status: u16,
        body: String,
    },

    /// The body did not match the configured response shape.
    #[error("Failed to parse {exchange} response: {reason}")]
    Parse { exchange: String, reason: String },

    /// Writing the snapshot or history failed.
    #[error("Report error: {0}")]
    Report(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScanError {
    pub fn parse(exchange: &str, reason: impl Into<String>) -> Self {
        Self::Parse {
            exchange: exchange.to_string(),
            reason: reason.into(),
        }
    }
}
