//! Tool trait: the abstraction over capabilities the model may request.
//!
//! Every invocation strategy (in-process function, runtime capability,
//! templated REST call, MCP subprocess) implements [`Tool`]. Tools are
//! owned by the [`ToolRegistry`], which is the only name → tool mapping;
//! dispatch always goes through a name lookup.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ToolError;
use crate::message::Arguments;
use crate::runtime::Runtime;

/// Schema-level description of a tool, sent verbatim to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescription {
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub parameters: ToolParameters,

    /// Schema of the value the tool returns
    #[serde(
        rename = "return",
        alias = "return_type",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub return_type: Option<serde_json::Value>,
}

impl ToolDescription {
    /// The `{"type": "function", "function": ...}` entry used in inference requests.
    pub fn to_function_spec(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "function",
            "function": self,
        })
    }
}

/// JSON-Schema-like object describing tool arguments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolParameters {
    #[serde(rename = "type", default)]
    pub kind: ObjectKind,

    /// In declaration order
    #[serde(default)]
    pub properties: IndexMap<String, PropertySchema>,

    #[serde(default)]
    pub required: Vec<String>,
}

/// The only accepted parameters type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectKind {
    #[default]
    #[serde(rename = "object")]
    Object,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySchema {
    /// Usually a type name; JSON Schema also allows a list of names
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Everything else (`enum`, `items`, `default`, ...)
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Per-call context handed to a tool.
#[derive(Clone)]
pub struct ToolContext {
    pub runtime: Arc<dyn Runtime>,
    /// ID of the tool call being served (used in error reports)
    pub call_id: String,
}

impl ToolContext {
    pub fn new(runtime: Arc<dyn Runtime>, call_id: impl Into<String>) -> Self {
        Self {
            runtime,
            call_id: call_id.into(),
        }
    }
}

/// The core Tool trait.
#[async_trait]
pub trait Tool: Send + Sync {
    fn description(&self) -> &ToolDescription;

    fn name(&self) -> &str {
        &self.description().name
    }

    /// Execute the tool. The returned value is what the model sees (JSON-encoded).
    async fn invoke(
        &self,
        ctx: &ToolContext,
        arguments: Arguments,
    ) -> Result<serde_json::Value, ToolError>;
}

/// Outcome of [`ToolRegistry::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    Added,
    /// A tool with that name already existed and was kept
    AlreadyRegistered,
}

impl Registration {
    pub fn is_added(self) -> bool {
        self == Self::Added
    }
}

/// Ordered registry of uniquely named tools.
///
/// Order is registration order and is preserved in [`ToolRegistry::descriptions`].
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. An existing tool with the same name wins; the
    /// collision is logged and reported through the return value.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Registration {
        let name = tool.name().to_string();
        if self.index.contains_key(&name) {
            warn!(tool = %name, "Tool is already registered, keeping the existing one");
            return Registration::AlreadyRegistered;
        }
        self.index.insert(name, self.tools.len());
        self.tools.push(tool);
        Registration::Added
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    /// Like [`ToolRegistry::get`] but failing with `ToolError::NotFound`.
    pub fn lookup(&self, name: &str) -> Result<Arc<dyn Tool>, ToolError> {
        self.get(name)
            .cloned()
            .ok_or_else(|| ToolError::NotFound(name.to_string()))
    }

    /// All tool descriptions in registration order.
    pub fn descriptions(&self) -> Vec<ToolDescription> {
        self.tools.iter().map(|t| t.description().clone()).collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn clear(&mut self) {
        self.tools.clear();
        self.index.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RuntimeError;
    use serde_json::json;

    struct NullRuntime;

    #[async_trait]
    impl Runtime for NullRuntime {
        async fn define(&self, _: &str, _: &str, _: serde_json::Value) -> Result<(), RuntimeError> {
            Ok(())
        }
        async fn delete(&self, _: &str) -> Result<(), RuntimeError> {
            Ok(())
        }
        async fn call(&self, _: &str, _: serde_json::Value) -> Result<serde_json::Value, RuntimeError> {
            Ok(serde_json::Value::Null)
        }
        async fn call_method(
            &self,
            _: &str,
            _: &str,
            _: serde_json::Value,
        ) -> Result<serde_json::Value, RuntimeError> {
            Ok(serde_json::Value::Null)
        }
    }

    /// Echoes its `text` argument, tagged with a marker to tell instances apart.
    struct EchoTool {
        desc: ToolDescription,
        marker: &'static str,
    }

    impl EchoTool {
        fn named(name: &str, marker: &'static str) -> Arc<dyn Tool> {
            let desc: ToolDescription = serde_json::from_value(json!({
                "name": name,
                "description": "Echoes back the input",
                "parameters": {
                    "type": "object",
                    "properties": {"text": {"type": "string"}},
                    "required": ["text"]
                }
            }))
            .unwrap();
            Arc::new(Self { desc, marker })
        }
    }

    #[async_trait]
    impl Tool for EchoTool {
        fn description(&self) -> &ToolDescription {
            &self.desc
        }

        async fn invoke(
            &self,
            _ctx: &ToolContext,
            arguments: Arguments,
        ) -> Result<serde_json::Value, ToolError> {
            Ok(json!({"echo": arguments.get("text"), "marker": self.marker}))
        }
    }

    fn ctx() -> ToolContext {
        ToolContext::new(Arc::new(NullRuntime), "call_1")
    }

    #[test]
    fn duplicate_registration_keeps_first() {
        let mut registry = ToolRegistry::new();
        assert_eq!(registry.register(EchoTool::named("echo", "first")), Registration::Added);
        assert_eq!(
            registry.register(EchoTool::named("echo", "second")),
            Registration::AlreadyRegistered
        );
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn duplicate_does_not_overwrite() {
        let mut registry = ToolRegistry::new();
        let _ = registry.register(EchoTool::named("echo", "first"));
        let _ = registry.register(EchoTool::named("echo", "second"));
        let args = json!({"text": "hi"}).as_object().cloned().unwrap();
        let out = registry.lookup("echo").unwrap().invoke(&ctx(), args).await.unwrap();
        assert_eq!(out["marker"], "first");
        assert_eq!(out["echo"], "hi");
    }

    #[test]
    fn descriptions_follow_registration_order() {
        let mut registry = ToolRegistry::new();
        for name in ["zeta", "alpha", "mid"] {
            let _ = registry.register(EchoTool::named(name, "x"));
        }
        let names: Vec<_> = registry.descriptions().into_iter().map(|d| d.name).collect();
        assert_eq!(names, ["zeta", "alpha", "mid"]);
        assert_eq!(registry.names(), ["zeta", "alpha", "mid"]);
    }

    #[test]
    fn missing_tool_is_not_found() {
        let registry = ToolRegistry::new();
        let err = registry.lookup("nonexistent").err().unwrap();
        assert!(matches!(err, ToolError::NotFound(ref n) if n == "nonexistent"));
    }

    #[test]
    fn clear_empties_registry() {
        let mut registry = ToolRegistry::new();
        let _ = registry.register(EchoTool::named("echo", "x"));
        registry.clear();
        assert!(registry.is_empty());
        assert!(registry.get("echo").is_none());
        assert!(registry.register(EchoTool::named("echo", "y")).is_added());
    }

    #[test]
    fn description_wire_format() {
        let desc: ToolDescription = serde_json::from_value(json!({
            "name": "get_current_temperature",
            "description": "Get the current temperature at a location.",
            "parameters": {
                "type": "object",
                "properties": {
                    "unit": {"type": "string", "enum": ["celsius", "fahrenheit"]}
                },
                "required": ["unit"]
            },
            "return": {"type": "number"}
        }))
        .unwrap();
        assert_eq!(desc.parameters.required, ["unit"]);
        assert_eq!(desc.parameters.properties["unit"].extra["enum"][0], "celsius");

        let spec = desc.to_function_spec();
        assert_eq!(spec["type"], "function");
        assert_eq!(spec["function"]["return"]["type"], "number");
        assert_eq!(spec["function"]["parameters"]["type"], "object");
    }

    #[test]
    fn property_order_survives_the_round_trip() {
        let desc: ToolDescription = serde_json::from_value(json!({
            "name": "search",
            "parameters": {
                "type": "object",
                "properties": {
                    "query": {"type": "string"},
                    "limit": {"type": "integer"},
                    "after": {"type": "string"}
                }
            }
        }))
        .unwrap();
        let keys: Vec<_> = desc.parameters.properties.keys().map(String::as_str).collect();
        assert_eq!(keys, ["query", "limit", "after"]);

        let spec = desc.to_function_spec();
        let sent: Vec<_> = spec["function"]["parameters"]["properties"]
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(sent, ["query", "limit", "after"]);
    }

    #[test]
    fn non_object_parameters_rejected() {
        let result: Result<ToolParameters, _> =
            serde_json::from_value(json!({"type": "array", "properties": {}}));
        assert!(result.is_err());
    }
}
