//! Universal tools: capabilities implemented by the runtime itself.
//!
//! The tool name doubles as the runtime capability name; arguments are
//! forwarded untouched once the required ones are known to be present.

use async_trait::async_trait;
use serde_json::Value;
use toolweave_core::{
    Arguments, DefinitionError, Tool, ToolContext, ToolDescription, ToolError,
};
use tracing::debug;

use crate::definition::{ToolDefinition, UniversalBehavior, compile_output_path};
use crate::output_path::OutputPath;

pub struct UniversalTool {
    description: ToolDescription,
    output_path: Option<OutputPath>,
}

impl UniversalTool {
    pub fn new(
        description: ToolDescription,
        behavior: UniversalBehavior,
    ) -> Result<Self, DefinitionError> {
        let output_path = compile_output_path(behavior.output_path.as_deref())?;
        Ok(Self {
            description,
            output_path,
        })
    }

    /// Build from a definition, which must be of type `universal`.
    pub fn from_definition(definition: ToolDefinition) -> Result<Self, DefinitionError> {
        let (description, behavior) = definition.into_universal()?;
        Self::new(description, behavior)
    }
}

#[async_trait]
impl Tool for UniversalTool {
    fn description(&self) -> &ToolDescription {
        &self.description
    }

    async fn invoke(&self, ctx: &ToolContext, arguments: Arguments) -> Result<Value, ToolError> {
        ensure_required(&self.description, &arguments)?;

        let name = &self.description.name;
        debug!(tool = %name, call_id = %ctx.call_id, "Calling runtime capability");
        let output = ctx
            .runtime
            .call(name, Value::Object(arguments))
            .await
            .map_err(|e| ToolError::InvocationFailed {
                tool: name.clone(),
                call_id: ctx.call_id.clone(),
                reason: e.to_string(),
            })?;

        Ok(apply_output_path(self.output_path.as_ref(), output))
    }
}

/// Fail with `MissingParameter` for the first required parameter absent from `arguments`.
pub(crate) fn ensure_required(
    description: &ToolDescription,
    arguments: &Arguments,
) -> Result<(), ToolError> {
    match description
        .parameters
        .required
        .iter()
        .find(|param| !arguments.contains_key(param.as_str()))
    {
        Some(missing) => Err(ToolError::MissingParameter {
            tool: description.name.clone(),
            parameter: missing.clone(),
        }),
        None => Ok(()),
    }
}

pub(crate) fn apply_output_path(path: Option<&OutputPath>, output: Value) -> Value {
    match path {
        Some(path) => path.search(&output),
        None => output,
    }
}
