//! Runtime trait: the abstraction over the inference/tool engine.
//!
//! A Runtime hosts named components (language models, embedding endpoints)
//! and exposes generic capabilities such as `http_request`. The agent never
//! talks to a model directly; it defines a component and streams `infer`
//! results from it through this contract.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::RuntimeError;

/// Receiving half of a streamed multi-value call.
pub type ValueStream = mpsc::Receiver<Result<serde_json::Value, RuntimeError>>;

/// Capability name used for outbound HTTP.
pub const HTTP_REQUEST: &str = "http_request";

/// The core Runtime trait.
///
/// Implementations are expected to be cheap to share (`Arc<dyn Runtime>`);
/// retries and timeouts, if any, live behind this boundary.
#[async_trait]
pub trait Runtime: Send + Sync {
    /// Create a named component. Defining an existing id is an error of the runtime's choosing.
    async fn define(
        &self,
        component_type: &str,
        component_id: &str,
        attrs: serde_json::Value,
    ) -> Result<(), RuntimeError>;

    /// Remove a named component. Deleting an unknown id must be a no-op.
    async fn delete(&self, component_id: &str) -> Result<(), RuntimeError>;

    /// Single-shot invocation of a runtime-wide capability.
    async fn call(
        &self,
        capability: &str,
        args: serde_json::Value,
    ) -> Result<serde_json::Value, RuntimeError>;

    /// Single-shot invocation of a method on a component.
    async fn call_method(
        &self,
        component_id: &str,
        method: &str,
        args: serde_json::Value,
    ) -> Result<serde_json::Value, RuntimeError>;

    /// Streamed invocation of a method on a component.
    ///
    /// The returned stream is finite and consumed exactly once.
    /// Default implementation calls `call_method()` and wraps the result as a single item.
    async fn call_iter_method(
        &self,
        component_id: &str,
        method: &str,
        args: serde_json::Value,
    ) -> Result<ValueStream, RuntimeError> {
        let value = self.call_method(component_id, method, args).await?;
        let (tx, rx) = mpsc::channel(1);
        let _ = tx.send(Ok(value)).await;
        Ok(rx)
    }

    /// Execute an HTTP request through the `http_request` capability.
    async fn http_request(&self, request: &HttpRequest) -> Result<HttpResponse, RuntimeError> {
        let args = serde_json::to_value(request).map_err(|e| RuntimeError::Call {
            capability: HTTP_REQUEST.into(),
            reason: format!("failed to encode request: {e}"),
        })?;
        let value = self.call(HTTP_REQUEST, args).await?;
        serde_json::from_value(value).map_err(|e| RuntimeError::Call {
            capability: HTTP_REQUEST.into(),
            reason: format!("malformed response: {e}"),
        })
    }
}

/// Outbound request descriptor handed to the `http_request` capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpRequest {
    pub url: String,
    pub method: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

/// Response from the `http_request` capability. Only `body` is relied upon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpResponse {
    pub body: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}
