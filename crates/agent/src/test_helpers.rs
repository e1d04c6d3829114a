//! Shared test helpers for agent tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use toolweave_core::{
    Arguments, Runtime, RuntimeError, ToolCall, ToolDescription, ToolParameters, ValueStream,
};
use toolweave_tools::mcp::{CallToolResult, ToolServerSession};
use toolweave_tools::{
    McpError, McpServerParams, RemoteTool, SessionConnector, ToolDefinition, UniversalBehavior,
};

/// A runtime that streams scripted inference rounds.
///
/// Each `infer` call streams the next batch of deltas, then closes the
/// stream. Capabilities answer with a fixed value after a fixed delay.
#[derive(Default)]
pub struct ScriptedRuntime {
    rounds: Mutex<VecDeque<Vec<Value>>>,
    requests: Mutex<Vec<Value>>,
    capabilities: HashMap<String, (Duration, Value)>,
    completed: Mutex<Vec<String>>,
    defined: Mutex<Vec<(String, String, Value)>>,
    deleted: Mutex<Vec<String>>,
}

impl ScriptedRuntime {
    pub fn new(rounds: Vec<Vec<Value>>) -> Self {
        Self {
            rounds: Mutex::new(rounds.into()),
            ..Default::default()
        }
    }

    pub fn with_capability(mut self, name: &str, delay: Duration, output: Value) -> Self {
        self.capabilities.insert(name.to_string(), (delay, output));
        self
    }

    pub fn infer_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Inference request bodies, in order.
    pub fn requests(&self) -> Vec<Value> {
        self.requests.lock().unwrap().clone()
    }

    /// Capability names in completion order.
    pub fn completed(&self) -> Vec<String> {
        self.completed.lock().unwrap().clone()
    }

    pub fn defined(&self) -> Vec<(String, String, Value)> {
        self.defined.lock().unwrap().clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl Runtime for ScriptedRuntime {
    async fn define(
        &self,
        component_type: &str,
        component_id: &str,
        attrs: Value,
    ) -> Result<(), RuntimeError> {
        self.defined.lock().unwrap().push((
            component_type.to_string(),
            component_id.to_string(),
            attrs,
        ));
        Ok(())
    }

    async fn delete(&self, component_id: &str) -> Result<(), RuntimeError> {
        self.deleted.lock().unwrap().push(component_id.to_string());
        Ok(())
    }

    async fn call(&self, capability: &str, _args: Value) -> Result<Value, RuntimeError> {
        let (delay, output) =
            self.capabilities
                .get(capability)
                .cloned()
                .ok_or_else(|| RuntimeError::Call {
                    capability: capability.to_string(),
                    reason: "unknown capability".into(),
                })?;
        tokio::time::sleep(delay).await;
        self.completed.lock().unwrap().push(capability.to_string());
        Ok(output)
    }

    async fn call_method(&self, _: &str, method: &str, _: Value) -> Result<Value, RuntimeError> {
        Err(RuntimeError::Call {
            capability: method.to_string(),
            reason: "only streamed calls are scripted".into(),
        })
    }

    async fn call_iter_method(
        &self,
        _component_id: &str,
        method: &str,
        args: Value,
    ) -> Result<ValueStream, RuntimeError> {
        assert_eq!(method, "infer");
        self.requests.lock().unwrap().push(args);
        let deltas = self
            .rounds
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| RuntimeError::Stream("no more scripted rounds".into()))?;

        let (tx, rx) = mpsc::channel(deltas.len().max(1));
        for delta in deltas {
            let _ = tx.send(Ok(delta)).await;
        }
        Ok(rx)
    }
}

// ── Delta builders ──────────────────────────────────────────────────────

pub fn text_delta(content: &str) -> Value {
    json!({"finish_reason": null, "message": {"role": "assistant", "content": content}})
}

pub fn stop_delta(content: &str) -> Value {
    json!({"finish_reason": "stop", "message": {"role": "assistant", "content": content}})
}

pub fn error_delta(content: &str) -> Value {
    json!({"finish_reason": "error", "message": {"role": "assistant", "content": content}})
}

pub fn tool_calls_delta(calls: Vec<ToolCall>) -> Value {
    json!({
        "finish_reason": "tool_calls",
        "message": {"role": "assistant", "content": null, "tool_calls": calls}
    })
}

pub fn call(id: &str, name: &str, arguments: Value) -> ToolCall {
    let arguments: Arguments = arguments.as_object().cloned().unwrap_or_default();
    ToolCall::new(id, name, arguments)
}

pub fn universal_definition(name: &str) -> ToolDefinition {
    ToolDefinition::Universal {
        description: ToolDescription {
            name: name.into(),
            description: format!("{name} capability"),
            parameters: ToolParameters::default(),
            return_type: None,
        },
        behavior: UniversalBehavior::default(),
    }
}

// ── MCP ─────────────────────────────────────────────────────────────────

/// Serves a fixed tool list; every call answers `"<tool>:<path>"`.
pub struct FakeMcpConnector {
    tools: Vec<String>,
    closed: Arc<AtomicUsize>,
}

impl FakeMcpConnector {
    pub fn new(tools: &[&str]) -> Self {
        Self {
            tools: tools.iter().map(|t| t.to_string()).collect(),
            closed: Arc::default(),
        }
    }

    pub fn sessions_closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

struct FakeMcpSession {
    tools: Vec<String>,
    closed: Arc<AtomicUsize>,
}

#[async_trait]
impl SessionConnector for FakeMcpConnector {
    async fn connect(
        &self,
        _params: &McpServerParams,
    ) -> Result<Box<dyn ToolServerSession>, McpError> {
        Ok(Box::new(FakeMcpSession {
            tools: self.tools.clone(),
            closed: Arc::clone(&self.closed),
        }))
    }
}

#[async_trait]
impl ToolServerSession for FakeMcpSession {
    async fn initialize(&mut self) -> Result<(), McpError> {
        Ok(())
    }

    async fn list_tools(&mut self) -> Result<Vec<RemoteTool>, McpError> {
        Ok(self
            .tools
            .iter()
            .map(|name| RemoteTool {
                name: name.clone(),
                description: Some(format!("{name} on the fake server")),
                input_schema: json!({
                    "type": "object",
                    "properties": {"path": {"type": "string"}},
                    "required": ["path"]
                }),
            })
            .collect())
    }

    async fn call_tool(
        &mut self,
        name: &str,
        arguments: Arguments,
    ) -> Result<CallToolResult, McpError> {
        let path = arguments.get("path").and_then(Value::as_str).unwrap_or("");
        Ok(serde_json::from_value(json!({
            "content": [{"type": "text", "text": format!("{name}:{path}")}]
        }))
        .unwrap())
    }

    async fn close(&mut self) -> Result<(), McpError> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
