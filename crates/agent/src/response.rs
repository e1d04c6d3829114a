//! Outward-facing events produced by a turn.
//!
//! `AgentResponse` is a one-way projection of what happens inside the
//! state machine. It is never fed back into the history, which keeps the
//! richer [`Message`] form.

use serde::{Deserialize, Serialize};
use toolweave_core::{Message, ToolCall};

/// Events yielded by [`crate::Agent::run`].
///
/// Serialized with a `type` tag:
/// - `output_text`:      assistant text, streamed or final
/// - `reasoning`:        assistant reasoning text
/// - `tool_call`:        the model requested a tool
/// - `tool_call_result`: a tool finished (successfully or not)
/// - `error`:            something went wrong but the turn was not aborted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentResponse {
    OutputText { content: String, end_of_turn: bool },

    Reasoning { content: String, end_of_turn: bool },

    ToolCall { call: ToolCall, end_of_turn: bool },

    #[serde(rename = "tool_call_result")]
    ToolResult { result: Message },

    Error { content: String },
}

impl AgentResponse {
    /// Project an assistant text message as output or reasoning.
    pub(crate) fn text(message: &Message, end_of_turn: bool) -> Self {
        let content = message.content().unwrap_or_default().to_string();
        if message.is_reasoning() {
            Self::Reasoning {
                content,
                end_of_turn,
            }
        } else {
            Self::OutputText {
                content,
                end_of_turn,
            }
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            Self::OutputText { .. } => "output_text",
            Self::Reasoning { .. } => "reasoning",
            Self::ToolCall { .. } => "tool_call",
            Self::ToolResult { .. } => "tool_call_result",
            Self::Error { .. } => "error",
        }
    }

    /// Text carried by output, reasoning and error events.
    pub fn content(&self) -> Option<&str> {
        match self {
            Self::OutputText { content, .. }
            | Self::Reasoning { content, .. }
            | Self::Error { content } => Some(content),
            Self::ToolCall { .. } | Self::ToolResult { .. } => None,
        }
    }
}
