//! Message and history domain types.
//!
//! These are the value objects that flow through every inference round:
//! the agent appends them to its [`History`], serializes the history into
//! the inference request, and deserializes [`MessageDelta`]s coming back.
//!
//! The wire shape is the OpenAI-style chat format: every message carries a
//! `role` discriminant, and the two assistant forms are told apart by the
//! presence of `tool_calls`.

use serde::{Deserialize, Deserializer, Serialize};

/// Tool arguments as an ordered JSON object.
pub type Arguments = serde_json::Map<String, serde_json::Value>;

/// The role of a message sender on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A single entry in the conversation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawMessage", into = "RawMessage")]
pub enum Message {
    System {
        content: String,
    },
    User {
        content: String,
    },
    AssistantText {
        content: String,
        reasoning: Option<bool>,
    },
    AssistantToolCall {
        tool_calls: Vec<ToolCall>,
    },
    ToolResult {
        name: String,
        tool_call_id: String,
        content: String,
    },
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self::System {
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::User {
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::AssistantText {
            content: content.into(),
            reasoning: None,
        }
    }

    pub fn tool_result(
        name: impl Into<String>,
        tool_call_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self::ToolResult {
            name: name.into(),
            tool_call_id: tool_call_id.into(),
            content: content.into(),
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Self::System { .. } => Role::System,
            Self::User { .. } => Role::User,
            Self::AssistantText { .. } | Self::AssistantToolCall { .. } => Role::Assistant,
            Self::ToolResult { .. } => Role::Tool,
        }
    }

    /// Text content, if this variant carries any.
    pub fn content(&self) -> Option<&str> {
        match self {
            Self::System { content }
            | Self::User { content }
            | Self::AssistantText { content, .. }
            | Self::ToolResult { content, .. } => Some(content),
            Self::AssistantToolCall { .. } => None,
        }
    }

    /// Whether this is an assistant text fragment flagged as reasoning.
    pub fn is_reasoning(&self) -> bool {
        matches!(
            self,
            Self::AssistantText {
                reasoning: Some(true),
                ..
            }
        )
    }
}

/// Flat wire representation shared by every variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawMessage {
    role: Role,
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reasoning: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl TryFrom<RawMessage> for Message {
    type Error = String;

    fn try_from(raw: RawMessage) -> Result<Self, Self::Error> {
        let content = |raw_content: Option<String>, role: &str| {
            raw_content.ok_or_else(|| format!("{role} message requires string content"))
        };
        match raw.role {
            Role::System => Ok(Self::System {
                content: content(raw.content, "system")?,
            }),
            Role::User => Ok(Self::User {
                content: content(raw.content, "user")?,
            }),
            Role::Assistant => match raw.tool_calls {
                Some(tool_calls) => Ok(Self::AssistantToolCall { tool_calls }),
                None => Ok(Self::AssistantText {
                    content: content(raw.content, "assistant")?,
                    reasoning: raw.reasoning,
                }),
            },
            Role::Tool => Ok(Self::ToolResult {
                name: raw.name.ok_or("tool message requires 'name'")?,
                tool_call_id: raw
                    .tool_call_id
                    .ok_or("tool message requires 'tool_call_id'")?,
                content: content(raw.content, "tool")?,
            }),
        }
    }
}

impl From<Message> for RawMessage {
    fn from(message: Message) -> Self {
        let role = message.role();
        let mut raw = RawMessage {
            role,
            content: None,
            reasoning: None,
            tool_calls: None,
            name: None,
            tool_call_id: None,
        };
        match message {
            Message::System { content } | Message::User { content } => {
                raw.content = Some(content);
            }
            Message::AssistantText { content, reasoning } => {
                raw.content = Some(content);
                raw.reasoning = reasoning;
            }
            Message::AssistantToolCall { tool_calls } => {
                raw.tool_calls = Some(tool_calls);
            }
            Message::ToolResult {
                name,
                tool_call_id,
                content,
            } => {
                raw.name = Some(name);
                raw.tool_call_id = Some(tool_call_id);
                raw.content = Some(content);
            }
        }
        raw
    }
}

/// A request from the model to invoke a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique call ID within the turn
    pub id: String,

    #[serde(rename = "type", default = "function_kind")]
    pub kind: String,

    pub function: ToolCallFunction,
}

fn function_kind() -> String {
    "function".into()
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Arguments) -> Self {
        Self {
            id: id.into(),
            kind: function_kind(),
            function: ToolCallFunction {
                name: name.into(),
                arguments,
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.function.name
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallFunction {
    pub name: String,

    /// Some backends send arguments as a JSON-encoded string; both forms are accepted.
    #[serde(default, deserialize_with = "arguments_from_object_or_string")]
    pub arguments: Arguments,
}

fn arguments_from_object_or_string<'de, D>(deserializer: D) -> Result<Arguments, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error as _;

    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Object(map) => Ok(map),
        serde_json::Value::Null => Ok(Arguments::new()),
        serde_json::Value::String(encoded) if encoded.trim().is_empty() => Ok(Arguments::new()),
        serde_json::Value::String(encoded) => serde_json::from_str(&encoded).map_err(D::Error::custom),
        other => Err(D::Error::custom(format!(
            "tool arguments must be an object, got {other}"
        ))),
    }
}

/// Why the model stopped emitting a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    ToolCalls,
    Length,
    Error,
}

/// One streamed unit of an inference response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageDelta {
    /// `None` while the model is still producing text
    pub finish_reason: Option<FinishReason>,
    pub message: Message,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HistoryError {
    #[error("a system message may only appear first in the history")]
    MisplacedSystemMessage,
}

/// Ordered, append-only conversation history.
///
/// At most one system message exists and it is always first. The only way
/// to shrink the history is [`History::reset`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct History {
    messages: Vec<Message>,
}

impl History {
    pub fn new(system_message: Option<String>) -> Self {
        Self {
            messages: system_message.into_iter().map(Message::system).collect(),
        }
    }

    /// Append a message. System messages are only accepted into an empty history.
    pub fn push(&mut self, message: Message) -> Result<(), HistoryError> {
        if matches!(message, Message::System { .. }) && !self.messages.is_empty() {
            return Err(HistoryError::MisplacedSystemMessage);
        }
        self.messages.push(message);
        Ok(())
    }

    /// Drop everything except the system message.
    pub fn reset(&mut self) {
        self.messages
            .truncate(usize::from(self.system_message().is_some()));
    }

    pub fn system_message(&self) -> Option<&str> {
        match self.messages.first() {
            Some(Message::System { content }) => Some(content),
            _ => None,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.messages.iter()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
