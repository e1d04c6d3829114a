//! In-process tools backed by a Rust closure.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::BoxFuture;
use serde_json::Value;
use toolweave_core::{Arguments, Tool, ToolContext, ToolDescription, ToolError};

use crate::universal::ensure_required;

type Handler = Arc<dyn Fn(Arguments) -> BoxFuture<'static, Result<Value, ToolError>> + Send + Sync>;

/// A tool whose implementation is an async function of its arguments.
///
/// ```ignore
/// let tool = FunctionTool::new(description, |args| async move {
///     let city = args.get("city").and_then(|v| v.as_str()).unwrap_or("Seoul");
///     Ok(json!({"city": city, "temperature": 21}))
/// });
/// ```
pub struct FunctionTool {
    description: ToolDescription,
    handler: Handler,
}

impl FunctionTool {
    pub fn new<F, Fut>(description: ToolDescription, f: F) -> Self
    where
        F: Fn(Arguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ToolError>> + Send + 'static,
    {
        Self {
            description,
            handler: Arc::new(move |args| f(args).boxed()),
        }
    }

    /// Wrap a synchronous function.
    pub fn from_fn<F>(description: ToolDescription, f: F) -> Self
    where
        F: Fn(Arguments) -> Result<Value, ToolError> + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        Self::new(description, move |args| {
            let f = Arc::clone(&f);
            async move { f(args) }
        })
    }
}

#[async_trait]
impl Tool for FunctionTool {
    fn description(&self) -> &ToolDescription {
        &self.description
    }

    async fn invoke(&self, _ctx: &ToolContext, arguments: Arguments) -> Result<Value, ToolError> {
        ensure_required(&self.description, &arguments)?;
        (self.handler)(arguments).await
    }
}
