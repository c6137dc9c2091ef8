use thiserror::Error;

/// Failures of a single model call.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ModelError {
    /// The HTTP client could not be configured.
    #[error("http client: {0}")]
    Client(String),

    /// The request never got a response (connection, TLS, timeout).
    #[error("network: {0}")]
    Network(String),

    /// The provider answered with a non-2xx status.
    #[error("provider returned {status}: {body}")]
    Api { status: u16, body: String },

    /// The body was not a usable chat completion, or the executed tool
    /// call carried arguments that are not JSON.
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
}
