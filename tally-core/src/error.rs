//! Error taxonomy shared by the pipeline and its collaborators.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum Error {
    /// Missing credential or an unusable model/provider selection.
    /// Raised before any network activity.
    #[error("configuration error: {0}")]
    Config(String),

    /// Non-success response from the ledger or a model backend.
    /// Recovered per transaction by the orchestrator.
    #[error("transport error: {body}")]
    Transport { status: Option<u16>, body: String },

    /// Cooperative cancellation observed at a checkpoint.
    #[error("run cancelled")]
    Cancelled,
}

impl Error {
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config(message.into())
    }

    pub fn transport(status: Option<u16>, body: impl Into<String>) -> Self {
        Error::Transport {
            status,
            body: body.into(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_display_includes_body() {
        let err = Error::transport(Some(502), "bad gateway");
        assert_eq!(err.to_string(), "transport error: bad gateway");
    }

    #[test]
    fn test_is_cancelled() {
        assert!(Error::Cancelled.is_cancelled());
        assert!(!Error::config("no key").is_cancelled());
    }
}
