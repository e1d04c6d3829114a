//! The toolweave conversation agent.
//!
//! An [`Agent`] owns one model component, a message history and a tool
//! registry. Each call to [`Agent::run`] drives one turn:
//!
//! 1. **Append** the user message to the history
//! 2. **Infer**: stream deltas from the model, projecting text as it arrives
//! 3. **If tool calls**: run them concurrently, append the results in call
//!    order, go back to step 2
//! 4. **If final**: project the answer, append it, end the stream
//!
//! Everything the caller sees is an [`AgentResponse`].

pub mod agent;
pub mod configure;
pub mod error;
pub mod model;
pub mod response;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use agent::{Agent, AgentOptions, RunOptions};
pub use configure::{mcp_server_params, preset_authenticator};
pub use error::AgentError;
pub use model::{ModelAttrs, ModelDescription};
pub use response::AgentResponse;
