//! # toolweave core
//!
//! Domain types, traits, and error definitions for the toolweave agent
//! orchestrator. Everything the conversation state machine consumes is
//! defined here as a trait or a plain value type:
//!
//! - [`Runtime`]: the external inference/tool engine
//! - [`Tool`] and [`ToolRegistry`]: named, schema-described capabilities
//! - [`Message`], [`MessageDelta`], [`History`]: the chat wire format
//! - [`template`] and [`Authenticator`]: building blocks for REST tools
//!
//! Implementations live in the `toolweave-tools` and `toolweave-agent` crates.

pub mod auth;
pub mod component;
pub mod error;
pub mod message;
pub mod runtime;
pub mod template;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use auth::{Authenticator, BearerAuthenticator};
pub use component::ComponentHandle;
pub use error::{DefinitionError, Error, Result, RuntimeError, ToolError};
pub use message::{
    Arguments, FinishReason, History, HistoryError, Message, MessageDelta, Role, ToolCall,
    ToolCallFunction,
};
pub use runtime::{HttpRequest, HttpResponse, Runtime, ValueStream};
pub use tool::{Registration, Tool, ToolContext, ToolDescription, ToolParameters, ToolRegistry};
