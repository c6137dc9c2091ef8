use thiserror::Error;

/// Errors that can occur while providing or executing tools.
///
/// A tool whose endpoint answered with an error status is not a `ToolError`;
/// that outcome is reported to the model as a result payload.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ToolError {
    #[error("tool not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Utcp(#[from] utcp::Error),
}
