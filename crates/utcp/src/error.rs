//! UTCP error types.

use thiserror::Error;

/// Errors raised while discovering or calling UTCP tools.
///
/// A tool call that completes with a non-2xx status is *not* an error; it is
/// reported through [`ToolCallResult::success`](crate::ToolCallResult).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The manifest could not be fetched, returned a non-2xx status, or failed to parse.
    #[error("discovery failed for {url}: {reason}")]
    Discovery { url: String, reason: String },

    /// Tools were queried before any manifest was discovered.
    #[error("no manifest loaded; run discovery first")]
    NotDiscovered,

    /// The requested tool is not part of the current manifest.
    #[error("tool not found: {0}")]
    UnknownTool(String),

    /// The tool uses a call template kind this client cannot execute.
    #[error("call template type not supported: {0}")]
    UnsupportedTemplate(String),

    /// The request could not be built (bad method, URL or header).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The call did not complete (DNS, connection refused, timeout).
    #[error("transport error: {0}")]
    Transport(String),
}

impl Error {
    pub(crate) fn discovery(url: &str, reason: impl ToString) -> Self {
        Self::Discovery {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
