//! Tools served by an external MCP (Model Context Protocol) server.
//!
//! Sessions are short-lived: every call and every tool listing connects,
//! initializes, does its work, and closes the session again, whatever the
//! outcome. No server process outlives the operation that started it.

pub mod error;
pub mod protocol;
pub mod stdio;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use toolweave_core::{
    Arguments, DefinitionError, Tool, ToolContext, ToolDescription, ToolError, ToolParameters,
};
use tracing::{debug, warn};

pub use error::McpError;
pub use protocol::{CallToolResult, RemoteTool, ToolContent};
pub use stdio::{StdioConnector, StdioSession};

/// How to start a tool server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct McpServerParams {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<PathBuf>,
}

impl McpServerParams {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Default::default()
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }
}

/// An open session with a tool server.
#[async_trait]
pub trait ToolServerSession: Send {
    async fn initialize(&mut self) -> Result<(), McpError>;

    async fn list_tools(&mut self) -> Result<Vec<RemoteTool>, McpError>;

    async fn call_tool(
        &mut self,
        name: &str,
        arguments: Arguments,
    ) -> Result<CallToolResult, McpError>;

    /// Shut the session down. Called exactly once, on every exit path.
    async fn close(&mut self) -> Result<(), McpError>;
}

/// Opens sessions for a set of spawn parameters.
#[async_trait]
pub trait SessionConnector: Send + Sync {
    async fn connect(&self, params: &McpServerParams)
    -> Result<Box<dyn ToolServerSession>, McpError>;
}

/// Run `f` on a fresh session, close it, then return `f`'s result.
/// A failing close is logged; the operation's own outcome wins.
async fn scoped<T, F>(
    connector: &dyn SessionConnector,
    params: &McpServerParams,
    f: F,
) -> Result<T, McpError>
where
    F: for<'s> FnOnce(
        &'s mut (dyn ToolServerSession + 'static),
    ) -> BoxFuture<'s, Result<T, McpError>>,
{
    let mut session = connector.connect(params).await?;
    let outcome = f(session.as_mut()).await;
    if let Err(e) = session.close().await {
        warn!(command = %params.command, error = %e, "Failed to close MCP session");
    }
    outcome
}

/// List the tools a server offers.
pub async fn list_server_tools(
    connector: &dyn SessionConnector,
    params: &McpServerParams,
) -> Result<Vec<RemoteTool>, McpError> {
    scoped(connector, params, |session| {
        Box::pin(async move {
            session.initialize().await?;
            session.list_tools().await
        })
    })
    .await
}

/// A remote tool, reached through a fresh session per call.
pub struct McpTool {
    description: ToolDescription,
    params: McpServerParams,
    connector: Arc<dyn SessionConnector>,
}

impl McpTool {
    pub fn new(
        params: McpServerParams,
        remote: &RemoteTool,
        connector: Arc<dyn SessionConnector>,
    ) -> Result<Self, DefinitionError> {
        let parameters: ToolParameters = serde_json::from_value(remote.input_schema.clone())
            .map_err(|e| DefinitionError::Malformed {
                name: remote.name.clone(),
                reason: format!("unusable inputSchema: {e}"),
            })?;
        Ok(Self {
            description: ToolDescription {
                name: remote.name.clone(),
                description: remote.description.clone().unwrap_or_default(),
                parameters,
                return_type: None,
            },
            params,
            connector,
        })
    }

    pub fn server(&self) -> &McpServerParams {
        &self.params
    }
}

#[async_trait]
impl Tool for McpTool {
    fn description(&self) -> &ToolDescription {
        &self.description
    }

    async fn invoke(&self, ctx: &ToolContext, arguments: Arguments) -> Result<Value, ToolError> {
        let name = self.description.name.clone();
        debug!(tool = %name, call_id = %ctx.call_id, command = %self.params.command, "Calling MCP tool");

        let remote_name = name.clone();
        let result = scoped(self.connector.as_ref(), &self.params, move |session| {
            Box::pin(async move {
                session.initialize().await?;
                session.call_tool(&remote_name, arguments).await
            })
        })
        .await
        .map_err(|e| match e {
            McpError::Server { .. } => ToolError::InvocationFailed {
                tool: name.clone(),
                call_id: ctx.call_id.clone(),
                reason: e.to_string(),
            },
            other => ToolError::Transport {
                tool: name.clone(),
                call_id: ctx.call_id.clone(),
                reason: other.to_string(),
            },
        })?;

        let is_error = result.is_error;
        let payloads: Vec<String> = result
            .content
            .into_iter()
            .filter_map(ToolContent::into_payload)
            .collect();

        if is_error {
            return Err(ToolError::InvocationFailed {
                tool: name,
                call_id: ctx.call_id.clone(),
                reason: payloads.join("\n"),
            });
        }
        Ok(Value::from(payloads))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use toolweave_core::{Runtime, RuntimeError};

    #[derive(Clone, Copy)]
    enum Behavior {
        Succeed,
        ToolError,
        Disconnect,
    }

    struct FakeConnector {
        behavior: Behavior,
        opened: AtomicUsize,
        closed: Arc<AtomicUsize>,
        calls: Arc<Mutex<Vec<(String, Arguments)>>>,
    }

    impl FakeConnector {
        fn new(behavior: Behavior) -> Arc<Self> {
            Arc::new(Self {
                behavior,
                opened: AtomicUsize::new(0),
                closed: Arc::new(AtomicUsize::new(0)),
                calls: Arc::default(),
            })
        }
    }

    struct FakeSession {
        behavior: Behavior,
        closed: Arc<AtomicUsize>,
        calls: Arc<Mutex<Vec<(String, Arguments)>>>,
    }

    #[async_trait]
    impl SessionConnector for FakeConnector {
        async fn connect(
            &self,
            _params: &McpServerParams,
        ) -> Result<Box<dyn ToolServerSession>, McpError> {
            self.opened.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(FakeSession {
                behavior: self.behavior,
                closed: Arc::clone(&self.closed),
                calls: Arc::clone(&self.calls),
            }))
        }
    }

    #[async_trait]
    impl ToolServerSession for FakeSession {
        async fn initialize(&mut self) -> Result<(), McpError> {
            Ok(())
        }

        async fn list_tools(&mut self) -> Result<Vec<RemoteTool>, McpError> {
            Ok(vec![remote("read_file"), remote("write_file")])
        }

        async fn call_tool(
            &mut self,
            name: &str,
            arguments: Arguments,
        ) -> Result<CallToolResult, McpError> {
            self.calls.lock().unwrap().push((name.to_string(), arguments));
            match self.behavior {
                Behavior::Succeed => Ok(serde_json::from_value(json!({
                    "content": [
                        {"type": "text", "text": "line one"},
                        {"type": "resource", "resource": {"uri": "mem://x", "blob": "AAEC"}}
                    ]
                }))
                .unwrap()),
                Behavior::ToolError => Ok(serde_json::from_value(json!({
                    "content": [{"type": "text", "text": "no such file"}],
                    "isError": true
                }))
                .unwrap()),
                Behavior::Disconnect => Err(McpError::Transport {
                    server: "fake".into(),
                    reason: "broken pipe".into(),
                }),
            }
        }

        async fn close(&mut self) -> Result<(), McpError> {
            self.closed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct NoRuntime;

    #[async_trait]
    impl Runtime for NoRuntime {
        async fn define(&self, _: &str, _: &str, _: Value) -> Result<(), RuntimeError> {
            Ok(())
        }
        async fn delete(&self, _: &str) -> Result<(), RuntimeError> {
            Ok(())
        }
        async fn call(&self, _: &str, _: Value) -> Result<Value, RuntimeError> {
            Ok(Value::Null)
        }
        async fn call_method(&self, _: &str, _: &str, _: Value) -> Result<Value, RuntimeError> {
            Ok(Value::Null)
        }
    }

    fn remote(name: &str) -> RemoteTool {
        serde_json::from_value(json!({
            "name": name,
            "description": "file access",
            "inputSchema": {
                "type": "object",
                "properties": {"path": {"type": "string"}},
                "required": ["path"]
            }
        }))
        .unwrap()
    }

    fn ctx() -> ToolContext {
        ToolContext::new(Arc::new(NoRuntime), "call_1")
    }

    fn path_args() -> Arguments {
        json!({"path": "/tmp/a"}).as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn call_translates_content_and_closes() {
        let connector = FakeConnector::new(Behavior::Succeed);
        let tool = McpTool::new(McpServerParams::new("fake"), &remote("read_file"), connector.clone())
            .unwrap();
        assert_eq!(tool.description().parameters.required, ["path"]);

        let out = tool.invoke(&ctx(), path_args()).await.unwrap();
        assert_eq!(out, json!(["line one", "AAEC"]));
        assert_eq!(connector.opened.load(Ordering::SeqCst), 1);
        assert_eq!(connector.closed.load(Ordering::SeqCst), 1);
        assert_eq!(connector.calls.lock().unwrap()[0].0, "read_file");
    }

    #[tokio::test]
    async fn tool_error_still_closes() {
        let connector = FakeConnector::new(Behavior::ToolError);
        let tool = McpTool::new(McpServerParams::new("fake"), &remote("read_file"), connector.clone())
            .unwrap();
        let err = tool.invoke(&ctx(), path_args()).await.unwrap_err();
        assert!(matches!(err, ToolError::InvocationFailed { ref reason, .. } if reason == "no such file"));
        assert_eq!(connector.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn transport_error_still_closes() {
        let connector = FakeConnector::new(Behavior::Disconnect);
        let tool = McpTool::new(McpServerParams::new("fake"), &remote("read_file"), connector.clone())
            .unwrap();
        let err = tool.invoke(&ctx(), path_args()).await.unwrap_err();
        assert!(matches!(err, ToolError::Transport { .. }));
        assert!(!err.is_fatal());
        assert_eq!(connector.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn every_call_opens_its_own_session() {
        let connector = FakeConnector::new(Behavior::Succeed);
        let tool = McpTool::new(McpServerParams::new("fake"), &remote("read_file"), connector.clone())
            .unwrap();
        for _ in 0..3 {
            tool.invoke(&ctx(), path_args()).await.unwrap();
        }
        assert_eq!(connector.opened.load(Ordering::SeqCst), 3);
        assert_eq!(connector.closed.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn listing_is_scoped_too() {
        let connector = FakeConnector::new(Behavior::Succeed);
        let tools = list_server_tools(connector.as_ref(), &McpServerParams::new("fake"))
            .await
            .unwrap();
        let names: Vec<_> = tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["read_file", "write_file"]);
        assert_eq!(connector.closed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn non_object_schema_rejected() {
        let remote: RemoteTool =
            serde_json::from_value(json!({"name": "odd", "inputSchema": {"type": "string"}})).unwrap();
        let err = McpTool::new(McpServerParams::new("fake"), &remote, FakeConnector::new(Behavior::Succeed))
            .err();
        assert!(matches!(err, Some(DefinitionError::Malformed { .. })));
    }
}
