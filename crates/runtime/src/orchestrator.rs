//! The two-turn chat flow.
//!
//! Each user message runs through at most two model calls:
//!
//! ```text
//! AwaitModel1 ──no tool call──────────────────────────────▶ Done
//!      │
//!      └─tool call─▶ ExecuteTool ─▶ AwaitModel2 ───────────▶ Done
//! ```
//!
//! Only the first tool call of the first response is executed; the others
//! are not inspected, so their arguments may even be malformed. The second
//! model call never gets tools executed on its behalf; its text is the reply.

use crate::error::Result;
use crate::model::{Backend, Message, ModelError, ModelRequest, ToolCall, Usage};
use crate::tools::ToolHost;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are an assistant that uses tools when needed.";

/// When tool definitions are reloaded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryMode {
    /// Refresh before every user message.
    #[default]
    EveryCall,
    /// Refresh before the first user message only.
    Once,
}

/// Position within one exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    AwaitModel1,
    ExecuteTool,
    AwaitModel2,
    Done,
}

/// Everything that happened while answering one user message.
#[derive(Debug, Clone)]
pub struct Exchange {
    /// The reply shown to the user.
    pub text: String,
    /// States visited, in order.
    pub states: Vec<TurnState>,
    /// The tool call that was executed, if any.
    pub tool_call: Option<ToolCall>,
    /// Further tool calls from the same response that were not executed.
    pub ignored_calls: Vec<ToolCall>,
    /// The payload returned to the model for `tool_call`.
    pub tool_output: Option<Value>,
    /// Usage summed over both model calls.
    pub usage: Usage,
}

/// Runs user messages through a model with tools from a [`ToolHost`].
///
/// Each exchange starts from a fresh conversation of system prompt and user
/// message; earlier exchanges are not replayed.
pub struct ChatOrchestrator<B, H> {
    backend: B,
    tools: H,
    system_prompt: String,
    discovery: DiscoveryMode,
    discovered: AtomicBool,
}

impl<B: Backend, H: ToolHost> ChatOrchestrator<B, H> {
    pub fn new(backend: B, tools: H) -> Self {
        Self {
            backend,
            tools,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            discovery: DiscoveryMode::default(),
            discovered: AtomicBool::new(false),
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_discovery(mut self, mode: DiscoveryMode) -> Self {
        self.discovery = mode;
        self
    }

    pub fn tools(&self) -> &H {
        &self.tools
    }

    /// Answer `user_text`, returning only the final reply.
    pub async fn send_message(&self, user_text: &str) -> Result<String> {
        Ok(self.exchange(user_text).await?.text)
    }

    /// Answer `user_text`, returning the full record of the exchange.
    pub async fn exchange(&self, user_text: &str) -> Result<Exchange> {
        self.ensure_discovered().await?;

        let specs = self.tools.specs().await?;
        let mut messages = vec![
            Message::system(self.system_prompt.as_str()),
            Message::user(user_text),
        ];
        let mut states = Vec::new();

        advance(&mut states, TurnState::AwaitModel1);
        let first = self
            .backend
            .call(ModelRequest {
                messages: &messages,
                tools: &specs,
            })
            .await?;
        let mut usage = first.usage;

        let mut calls = first.message.tool_calls().into_iter();
        let Some(call) = calls.next() else {
            advance(&mut states, TurnState::Done);
            return Ok(Exchange {
                text: first.message.text(),
                states,
                tool_call: None,
                ignored_calls: Vec::new(),
                tool_output: None,
                usage,
            });
        };
        if let Some(reason) = &call.arguments_error {
            return Err(ModelError::InvalidResponse(format!(
                "arguments for {}: {reason}",
                call.name
            ))
            .into());
        }
        let ignored_calls: Vec<ToolCall> = calls.collect();
        if !ignored_calls.is_empty() {
            debug!(
                executed = %call.name,
                ignored = ignored_calls.len(),
                "ignoring additional tool calls"
            );
        }

        advance(&mut states, TurnState::ExecuteTool);
        info!(tool = %call.name, "executing tool call");
        let output = self.tools.execute(&call).await?;

        messages.push(Message::assistant_calls(first.message.text(), [call.clone()]));
        messages.push(Message::tool_result(call.id.as_str(), output.clone()));

        advance(&mut states, TurnState::AwaitModel2);
        let second = self
            .backend
            .call(ModelRequest {
                messages: &messages,
                tools: &specs,
            })
            .await?;
        usage += second.usage;

        advance(&mut states, TurnState::Done);
        Ok(Exchange {
            text: second.message.text(),
            states,
            tool_call: Some(call),
            ignored_calls,
            tool_output: Some(output),
            usage,
        })
    }

    async fn ensure_discovered(&self) -> Result<()> {
        if self.discovery == DiscoveryMode::Once && self.discovered.load(Ordering::Acquire) {
            return Ok(());
        }
        self.tools.refresh().await?;
        self.discovered.store(true, Ordering::Release);
        Ok(())
    }
}

fn advance(states: &mut Vec<TurnState>, next: TurnState) {
    debug!(state = ?next, "chat state");
    states.push(next);
}
