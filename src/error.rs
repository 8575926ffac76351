// src/error.rs
//! Error taxonomy for the intake core.
//!
//! Per-item failures (`InvalidUrl`, `UnparsableDate`, `SchemaViolation`) drop a
//! single item and the run continues. Store and sink failures are run-fatal.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("invalid url `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("unparsable date `{0}`")]
    UnparsableDate(String),

    #[error("schema violation: {0}")]
    SchemaViolation(String),

    #[error("dedupe store: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("dedupe store file: {0}")]
    StoreIo(#[from] std::io::Error),

    #[error("sink append failed: {0:#}")]
    Sink(anyhow::Error),
}

impl IntakeError {
    pub(crate) fn invalid_url(url: &str, reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            url: url.to_string(),
            reason: reason.into(),
        }
    }

    /// True for errors that must abort the whole run.
    pub fn is_run_fatal(&self) -> bool {
        matches!(self, Self::Store(_) | Self::StoreIo(_) | Self::Sink(_))
    }
}

pub type Result<T, E = IntakeError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_item_errors_are_not_fatal() {
        assert!(!IntakeError::invalid_url("x", "no scheme").is_run_fatal());
        assert!(!IntakeError::UnparsableDate("soon".into()).is_run_fatal());
        assert!(!IntakeError::SchemaViolation("width".into()).is_run_fatal());
    }

    #[test]
    fn store_and_sink_errors_are_fatal() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk");
        assert!(IntakeError::from(io).is_run_fatal());
        assert!(IntakeError::Sink(anyhow::anyhow!("quota")).is_run_fatal());
    }

    #[test]
    fn invalid_url_message_names_input() {
        let e = IntakeError::invalid_url("ftp://x", "unsupported scheme");
        assert_eq!(e.to_string(), "invalid url `ftp://x`: unsupported scheme");
    }
}
