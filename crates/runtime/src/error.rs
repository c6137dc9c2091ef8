use crate::model::ModelError;
use crate::tools::ToolError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Tool(#[from] ToolError),
}

impl From<utcp::Error> for Error {
    fn from(err: utcp::Error) -> Self {
        Self::Tool(ToolError::Utcp(err))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
