//! CLI error types.

use crate::config::ConfigError;
use thiserror::Error;

/// Everything that can end a `toolbridge` command with exit status 1.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// `toolbridge.toml` could not be read or describes an unusable setup.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// `--args` was not a JSON object.
    #[error("invalid tool arguments: {0}")]
    InvalidArguments(String),

    /// The chat exchange failed (model call or tool execution).
    #[error(transparent)]
    Runtime(#[from] runtime::Error),

    /// Tool discovery or execution failed.
    #[error(transparent)]
    Tool(#[from] runtime::ToolError),

    #[error(transparent)]
    Utcp(#[from] utcp::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Reading stdin or writing the prompt failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
