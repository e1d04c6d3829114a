//! Tool invocation strategies for toolweave.
//!
//! Every strategy implements [`toolweave_core::Tool`]:
//!
//! - [`FunctionTool`]: an in-process async closure
//! - [`UniversalTool`]: a capability provided by the runtime
//! - [`RestApiTool`]: a templated HTTP call made through the runtime
//! - [`McpTool`]: a tool living in an external MCP server process
//!
//! Declarative tools come from [`ToolDefinition`]s, usually loaded in bulk
//! from a preset with a [`PresetLoader`].

pub mod definition;
pub mod function;
pub mod mcp;
pub mod output_path;
pub mod preset;
pub mod rest_api;
pub mod universal;

use std::sync::Arc;

use toolweave_core::{Authenticator, DefinitionError, Tool};

pub use definition::{AuthenticationKind, HttpMethod, RestApiBehavior, ToolDefinition, UniversalBehavior};
pub use function::FunctionTool;
pub use mcp::{McpError, McpServerParams, McpTool, RemoteTool, SessionConnector, StdioConnector};
pub use output_path::OutputPath;
pub use preset::{DirectoryPresetLoader, PresetLoader};
pub use rest_api::RestApiTool;
pub use universal::UniversalTool;

/// Build the tool a definition describes. `authenticator` only applies to REST tools.
pub fn build_tool(
    definition: ToolDefinition,
    authenticator: Option<Arc<dyn Authenticator>>,
) -> Result<Arc<dyn Tool>, DefinitionError> {
    definition.validate()?;
    Ok(match definition {
        ToolDefinition::Universal { .. } => Arc::new(UniversalTool::from_definition(definition)?),
        ToolDefinition::RestApi { .. } => {
            Arc::new(RestApiTool::from_definition(definition, authenticator)?)
        }
    })
}
