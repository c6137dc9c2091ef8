//! Toolbridge runtime: connects a chat model to UTCP tools.
//!
//! # Overview
//!
//! - **Backend**: a trait abstracting LLM providers; [`OpenAiBackend`] speaks
//!   the chat completions protocol with function calling.
//! - **ToolHost**: a trait for anything that can list and run tools;
//!   [`UtcpToolHost`] serves tools discovered from UTCP manifests.
//! - **bridge**: conversions between UTCP tool definitions and function
//!   schemas, and between model arguments and call parameters.
//! - **ChatOrchestrator**: the two-turn exchange of model call, optional
//!   tool execution and final model call.
//!
//! # Example
//!
//! ```no_run
//! use runtime::{ChatOrchestrator, OpenAiBackend, UtcpToolHost};
//! use utcp::ManifestClient;
//!
//! # async fn example() -> runtime::Result<()> {
//! let backend = OpenAiBackend::builder("gpt-4o-mini").api_key("sk-...").build()?;
//! let client = ManifestClient::builder().build()?;
//! let tools = UtcpToolHost::new(client, ["https://localhost:7247/api/v1/utcp"]);
//!
//! let chat = ChatOrchestrator::new(backend, tools);
//! let reply = chat.send_message("What's the weather in Paris?").await?;
//! println!("{reply}");
//! # Ok(())
//! # }
//! ```

pub mod bridge;
mod error;
pub mod model;
mod orchestrator;
mod providers;
pub mod tools;

pub use error::{Error, Result};
pub use model::{
    Backend, Message, ModelError, ModelRequest, ModelResponse, Part, Role, ToolCall, ToolResult,
    ToolSpec, Usage,
};
pub use orchestrator::{ChatOrchestrator, DEFAULT_SYSTEM_PROMPT, DiscoveryMode, Exchange, TurnState};
pub use providers::{DEFAULT_BASE_URL, OpenAiBackend, OpenAiBackendBuilder};
pub use tools::{ToolError, ToolHost, UtcpToolHost};
