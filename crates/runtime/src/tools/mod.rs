//! Tool hosts the orchestrator can call into.

pub mod errors;
mod host;
mod utcp_host;

pub use errors::ToolError;
pub use host::ToolHost;
pub use utcp_host::{UtcpToolHost, result_payload};
