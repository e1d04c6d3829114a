//! The conversation state machine.
//!
//! A turn starts by appending the user message and then alternates between
//! two phases until the model gives a final answer:
//!
//! 1. **Infer**: stream deltas from the bound model component, projecting
//!    partial text as it arrives.
//! 2. **Dispatch**: when a delta asks for tools, run every requested call
//!    concurrently, append the results in call order, and infer again.
//!
//! There is no round limit. A model that keeps asking for tools keeps the
//! turn alive; callers that need a cap can stop polling the stream.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use futures::stream::{self, BoxStream, StreamExt};
use serde_json::{Value, json};
use tokio_stream::wrappers::ReceiverStream;
use toolweave_core::{
    Arguments, Authenticator, ComponentHandle, FinishReason, History, Message, MessageDelta,
    Registration, Runtime, RuntimeError, Tool, ToolCall, ToolContext, ToolDescription, ToolError,
    ToolRegistry,
};
use toolweave_tools::mcp::list_server_tools;
use toolweave_tools::{
    FunctionTool, McpServerParams, McpTool, PresetLoader, RemoteTool, RestApiTool,
    SessionConnector, StdioConnector, ToolDefinition, UniversalTool, build_tool,
};
use tracing::{debug, info, warn};

use crate::error::AgentError;
use crate::model::{self, ModelAttrs, ModelDescription};
use crate::response::AgentResponse;

/// Method streamed from the model component for each inference round.
const INFER: &str = "infer";

/// How to build an [`Agent`].
#[derive(Debug, Clone)]
pub struct AgentOptions {
    /// A name from the model catalogue, e.g. `qwen3-8b`
    pub model: String,
    pub attrs: ModelAttrs,
    /// Overrides the model's default system message
    pub system_message: Option<String>,
}

impl AgentOptions {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            attrs: ModelAttrs::default(),
            system_message: None,
        }
    }

    pub fn with_system_message(mut self, message: impl Into<String>) -> Self {
        self.system_message = Some(message.into());
        self
    }

    pub fn with_attrs(mut self, attrs: ModelAttrs) -> Self {
        self.attrs = attrs;
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.attrs.api_key = Some(api_key.into());
        self
    }
}

/// Per-turn inference flags, forwarded verbatim to the model.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    pub enable_reasoning: bool,
    pub ignore_reasoning_messages: bool,
}

/// A conversational agent bound to one model component.
pub struct Agent {
    model: &'static ModelDescription,
    component: ComponentHandle,
    history: History,
    tools: ToolRegistry,
    connector: Arc<dyn SessionConnector>,
}

impl Agent {
    /// Define the model component in the runtime and bind a fresh agent to it.
    ///
    /// Unsupported models and missing required attributes fail before the
    /// runtime is contacted.
    pub async fn define(
        runtime: Arc<dyn Runtime>,
        options: AgentOptions,
    ) -> Result<Self, AgentError> {
        let model = model::lookup(&options.model)?;
        let attrs = model.define_attrs(&options.attrs)?;
        let system_message = options
            .system_message
            .or_else(|| model.default_system_message.map(str::to_string));

        let component = ComponentHandle::define(runtime, model.component_type, attrs).await?;
        info!(
            model = model.name,
            component_id = %component.id(),
            "Agent defined"
        );

        Ok(Self {
            model,
            component,
            history: History::new(system_message),
            tools: ToolRegistry::new(),
            connector: Arc::new(StdioConnector),
        })
    }

    /// Use a different way of reaching MCP servers (the default spawns them over stdio).
    pub fn with_session_connector(mut self, connector: Arc<dyn SessionConnector>) -> Self {
        self.connector = connector;
        self
    }

    pub fn model(&self) -> &'static ModelDescription {
        self.model
    }

    pub fn component_id(&self) -> &str {
        self.component.id()
    }

    pub fn is_valid(&self) -> bool {
        self.component.is_valid()
    }

    /// Release the model component and trim the history back to the system
    /// message. Calling it again does nothing.
    pub async fn delete(&mut self) -> Result<(), AgentError> {
        if !self.component.is_valid() {
            return Ok(());
        }
        self.history.reset();
        self.component.delete().await?;
        Ok(())
    }

    // ── History ─────────────────────────────────────────────────────────

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Forget the conversation, keeping the system message.
    pub fn clear_messages(&mut self) {
        self.history.reset();
    }

    // ── Tools ───────────────────────────────────────────────────────────

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn tool_descriptions(&self) -> Vec<ToolDescription> {
        self.tools.descriptions()
    }

    pub fn clear_tools(&mut self) {
        self.tools.clear();
    }

    /// Register a tool. A name collision keeps the existing tool and is
    /// reported as [`Registration::AlreadyRegistered`].
    pub fn add_tool(&mut self, tool: Arc<dyn Tool>) -> Registration {
        self.tools.register(tool)
    }

    pub fn add_function_tool<F, Fut>(&mut self, description: ToolDescription, f: F) -> Registration
    where
        F: Fn(Arguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ToolError>> + Send + 'static,
    {
        self.add_tool(Arc::new(FunctionTool::new(description, f)))
    }

    /// Register a `universal` definition. Any other type is rejected.
    pub fn add_universal_tool(
        &mut self,
        definition: ToolDefinition,
    ) -> Result<Registration, AgentError> {
        definition.validate()?;
        let tool = UniversalTool::from_definition(definition)?;
        Ok(self.add_tool(Arc::new(tool)))
    }

    /// Register a `restapi` definition. Any other type is rejected.
    pub fn add_restapi_tool(
        &mut self,
        definition: ToolDefinition,
        authenticator: Option<Arc<dyn Authenticator>>,
    ) -> Result<Registration, AgentError> {
        definition.validate()?;
        let tool = RestApiTool::from_definition(definition, authenticator)?;
        Ok(self.add_tool(Arc::new(tool)))
    }

    /// Register every tool of a preset. Returns how many were newly added.
    ///
    /// All definitions are built before any is registered, so a malformed
    /// preset leaves the registry untouched.
    pub fn add_tools_from_preset(
        &mut self,
        loader: &dyn PresetLoader,
        preset: &str,
        authenticator: Option<Arc<dyn Authenticator>>,
    ) -> Result<usize, AgentError> {
        let tools = loader
            .load(preset)?
            .into_iter()
            .map(|definition| build_tool(definition, authenticator.clone()))
            .collect::<Result<Vec<_>, _>>()?;

        let added = tools
            .into_iter()
            .filter(|tool| self.add_tool(Arc::clone(tool)).is_added())
            .count();
        debug!(preset, added, "Preset tools registered");
        Ok(added)
    }

    /// Register one tool served by an MCP server.
    pub fn add_mcp_tool(
        &mut self,
        params: McpServerParams,
        remote: &RemoteTool,
    ) -> Result<Registration, AgentError> {
        let tool = McpTool::new(params, remote, Arc::clone(&self.connector))?;
        Ok(self.add_tool(Arc::new(tool)))
    }

    /// Ask an MCP server for its tools and register them, optionally only
    /// those named in `filter`. Returns every tool the server listed.
    pub async fn add_tools_from_mcp_server(
        &mut self,
        params: McpServerParams,
        filter: Option<&[String]>,
    ) -> Result<Vec<RemoteTool>, AgentError> {
        let listed = list_server_tools(self.connector.as_ref(), &params).await?;
        let mut registered = 0;
        for remote in listed
            .iter()
            .filter(|t| filter.is_none_or(|names| names.contains(&t.name)))
        {
            self.add_mcp_tool(params.clone(), remote)?;
            registered += 1;
        }
        info!(
            command = %params.command,
            listed = listed.len(),
            registered,
            "MCP server tools registered"
        );
        Ok(listed)
    }

    // ── Turns ───────────────────────────────────────────────────────────

    /// Run one turn. The returned stream ends after the model's final
    /// answer, or right after an `Err` item when the turn is aborted.
    pub fn run(
        &mut self,
        message: impl Into<String>,
        options: RunOptions,
    ) -> BoxStream<'_, Result<AgentResponse, AgentError>> {
        let turn = Turn {
            agent: self,
            options,
            phase: Phase::Start(message.into()),
            pending: VecDeque::new(),
            round: 0,
        };
        stream::unfold(turn, |mut turn| async move {
            let event = turn.next_event().await?;
            Some((event, turn))
        })
        .boxed()
    }

    fn inference_request(&self, options: RunOptions) -> Result<Value, AgentError> {
        let tools: Vec<Value> = self
            .tools
            .descriptions()
            .iter()
            .map(ToolDescription::to_function_spec)
            .collect();
        Ok(json!({
            "messages": serde_json::to_value(&self.history)?,
            "tools": tools,
            "enable_reasoning": options.enable_reasoning,
            "ignore_reasoning_messages": options.ignore_reasoning_messages,
        }))
    }

    /// Run all calls concurrently; outcomes come back in call order.
    async fn dispatch(&self, calls: &[ToolCall]) -> Vec<CallOutcome> {
        let runtime = Arc::clone(self.component.runtime());
        let handles: Vec<_> = calls
            .iter()
            .map(|call| {
                let tool = self.tools.lookup(call.name());
                let ctx = ToolContext::new(Arc::clone(&runtime), call.id.clone());
                let arguments = call.function.arguments.clone();
                tokio::spawn(async move {
                    let tool = tool?;
                    let started = Instant::now();
                    let result = tool.invoke(&ctx, arguments).await;
                    debug!(
                        tool = %tool.name(),
                        call_id = %ctx.call_id,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        success = result.is_ok(),
                        "Tool call finished"
                    );
                    result
                })
            })
            .collect();

        join_all(handles)
            .await
            .into_iter()
            .zip(calls)
            .map(|(joined, call)| match joined {
                Ok(Ok(value)) => CallOutcome::Done(value),
                Ok(Err(e)) if e.is_fatal() => CallOutcome::Aborted(e),
                Ok(Err(e)) => CallOutcome::Failed(e),
                Err(join_err) => CallOutcome::Aborted(ToolError::InvocationFailed {
                    tool: call.name().to_string(),
                    call_id: call.id.clone(),
                    reason: format!("tool task did not complete: {join_err}"),
                }),
            })
            .collect()
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("model", &self.model.name)
            .field("component", &self.component)
            .field("messages", &self.history.len())
            .field("tools", &self.tools.names())
            .finish()
    }
}

// ── Turn state machine ──────────────────────────────────────────────────

enum CallOutcome {
    Done(Value),
    /// Reported back to the model; the turn goes on
    Failed(ToolError),
    /// Ends the turn once the batch is recorded
    Aborted(ToolError),
}

enum Phase {
    Start(String),
    Infer,
    Streaming(ReceiverStream<Result<Value, RuntimeError>>),
    Dispatch(Vec<ToolCall>),
    Done,
}

struct Turn<'a> {
    agent: &'a mut Agent,
    options: RunOptions,
    phase: Phase,
    /// Events decided but not yet handed to the caller
    pending: VecDeque<Result<AgentResponse, AgentError>>,
    round: usize,
}

impl Turn<'_> {
    async fn next_event(&mut self) -> Option<Result<AgentResponse, AgentError>> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(event);
            }
            if matches!(self.phase, Phase::Done) {
                return None;
            }
            if let Err(e) = self.advance().await {
                self.phase = Phase::Done;
                self.pending.push_back(Err(e));
            }
        }
    }

    async fn advance(&mut self) -> Result<(), AgentError> {
        match std::mem::replace(&mut self.phase, Phase::Done) {
            Phase::Done => {}
            Phase::Start(message) => {
                if !self.agent.component.is_valid() {
                    return Err(AgentError::ComponentInvalid(
                        self.agent.component.id().to_string(),
                    ));
                }
                self.agent.history.push(Message::user(message))?;
                self.phase = Phase::Infer;
            }
            Phase::Infer => {
                self.round += 1;
                let request = self.agent.inference_request(self.options)?;
                debug!(
                    component_id = %self.agent.component.id(),
                    round = self.round,
                    messages = self.agent.history.len(),
                    tools = self.agent.tools.len(),
                    "Starting inference round"
                );
                let rx = self.agent.component.call_iter_method(INFER, request).await?;
                self.phase = Phase::Streaming(ReceiverStream::new(rx));
            }
            Phase::Streaming(mut deltas) => {
                let raw = deltas.next().await.ok_or_else(|| {
                    AgentError::InvalidDelta("inference stream ended without a finish reason".into())
                })??;
                let delta: MessageDelta = serde_json::from_value(raw)
                    .map_err(|e| AgentError::InvalidDelta(e.to_string()))?;
                self.classify(delta, deltas)?;
            }
            Phase::Dispatch(calls) => {
                let outcomes = self.agent.dispatch(&calls).await;
                self.record_results(calls, outcomes)?;
            }
        }
        Ok(())
    }

    fn classify(
        &mut self,
        delta: MessageDelta,
        deltas: ReceiverStream<Result<Value, RuntimeError>>,
    ) -> Result<(), AgentError> {
        match delta.finish_reason {
            None => {
                self.pending
                    .push_back(Ok(AgentResponse::text(&delta.message, false)));
                self.phase = Phase::Streaming(deltas);
            }
            Some(FinishReason::ToolCalls) => {
                let Message::AssistantToolCall { tool_calls } = &delta.message else {
                    return Err(AgentError::InvalidDelta(
                        "tool_calls delta does not carry tool calls".into(),
                    ));
                };
                let calls = tool_calls.clone();
                self.agent.history.push(delta.message)?;
                self.pending.extend(calls.iter().map(|call| {
                    Ok(AgentResponse::ToolCall {
                        call: call.clone(),
                        end_of_turn: true,
                    })
                }));
                self.phase = Phase::Dispatch(calls);
            }
            Some(FinishReason::Stop | FinishReason::Length) => {
                self.pending
                    .push_back(Ok(AgentResponse::text(&delta.message, false)));
                self.agent.history.push(delta.message)?;
                debug!(rounds = self.round, "Turn finished");
            }
            Some(FinishReason::Error) => {
                let content = delta
                    .message
                    .content()
                    .filter(|c| !c.is_empty())
                    .unwrap_or("inference failed")
                    .to_string();
                warn!(round = self.round, error = %content, "Inference ended with an error");
                self.pending.push_back(Ok(AgentResponse::Error { content }));
            }
        }
        Ok(())
    }

    /// Append one result per call, in call order, then either resume
    /// inference or end the turn on the first fatal failure.
    fn record_results(
        &mut self,
        calls: Vec<ToolCall>,
        outcomes: Vec<CallOutcome>,
    ) -> Result<(), AgentError> {
        let mut fatal = None;
        for (call, outcome) in calls.into_iter().zip(outcomes) {
            let content = match outcome {
                CallOutcome::Done(value) => value.to_string(),
                CallOutcome::Failed(e) => {
                    warn!(tool = %call.name(), call_id = %call.id, error = %e, "Tool execution failed");
                    self.pending.push_back(Ok(AgentResponse::Error {
                        content: e.to_string(),
                    }));
                    json!({"error": e.to_string()}).to_string()
                }
                CallOutcome::Aborted(e) => {
                    warn!(tool = %call.name(), call_id = %call.id, error = %e, "Tool call aborted the turn");
                    let content = json!({"error": e.to_string()}).to_string();
                    if fatal.is_none() {
                        fatal = Some(e);
                    }
                    content
                }
            };
            let result = Message::tool_result(call.function.name, call.id, content);
            self.agent.history.push(result.clone())?;
            self.pending.push_back(Ok(AgentResponse::ToolResult { result }));
        }

        match fatal {
            Some(e) => Err(e.into()),
            None => {
                self.phase = Phase::Infer;
                Ok(())
            }
        }
    }
}
