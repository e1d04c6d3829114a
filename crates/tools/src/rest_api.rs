//! Templated REST tools.
//!
//! Arguments referenced by `${key}` placeholders in the URL or body template
//! are substituted there; every other argument is appended as a URL-encoded
//! query parameter. The request goes out through the runtime's
//! `http_request` capability and the response body is parsed as JSON.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use toolweave_core::template::{display_value, render};
use toolweave_core::{
    Arguments, Authenticator, DefinitionError, HttpRequest, Tool, ToolContext, ToolDescription,
    ToolError,
};
use tracing::{debug, warn};
use url::form_urlencoded;

use crate::definition::{RestApiBehavior, ToolDefinition, compile_output_path};
use crate::output_path::OutputPath;
use crate::universal::apply_output_path;

pub struct RestApiTool {
    description: ToolDescription,
    behavior: RestApiBehavior,
    output_path: Option<OutputPath>,
    authenticator: Option<Arc<dyn Authenticator>>,
}

impl RestApiTool {
    pub fn new(
        description: ToolDescription,
        behavior: RestApiBehavior,
        authenticator: Option<Arc<dyn Authenticator>>,
    ) -> Result<Self, DefinitionError> {
        let output_path = compile_output_path(behavior.output_path.as_deref())?;
        if behavior.authentication.is_some() && authenticator.is_none() {
            warn!(
                tool = %description.name,
                "Tool declares authentication but no authenticator was supplied"
            );
        }
        Ok(Self {
            description,
            behavior,
            output_path,
            authenticator,
        })
    }

    /// Build from a definition, which must be of type `restapi`.
    pub fn from_definition(
        definition: ToolDefinition,
        authenticator: Option<Arc<dyn Authenticator>>,
    ) -> Result<Self, DefinitionError> {
        let (description, behavior) = definition.into_rest_api()?;
        Self::new(description, behavior, authenticator)
    }

    pub fn behavior(&self) -> &RestApiBehavior {
        &self.behavior
    }

    /// The request this tool would send for `arguments`, authenticator applied.
    pub fn build_request(&self, arguments: &Arguments) -> HttpRequest {
        let url = render(&self.behavior.base_url, arguments);
        let mut consumed: BTreeSet<String> = url.keys;

        // A body that renders empty is not sent, but its keys stay consumed.
        let body = self.behavior.body.as_deref().and_then(|template| {
            let rendered = render(template, arguments);
            consumed.extend(rendered.keys);
            Some(rendered.text).filter(|text| !text.is_empty())
        });

        let mut url = url.text;
        let leftover: Vec<(&String, &Value)> = arguments
            .iter()
            .filter(|(key, _)| !consumed.contains(key.as_str()))
            .collect();
        if !leftover.is_empty() {
            let mut query = form_urlencoded::Serializer::new(String::new());
            for (key, value) in leftover {
                query.append_pair(key, &display_value(value));
            }
            url.push(if url.contains('?') { '&' } else { '?' });
            url.push_str(&query.finish());
        }

        let request = HttpRequest {
            url,
            method: self.behavior.method.as_str().to_string(),
            headers: self.behavior.headers.clone(),
            body,
        };
        match &self.authenticator {
            Some(auth) => auth.apply(request),
            None => request,
        }
    }
}

#[async_trait]
impl Tool for RestApiTool {
    fn description(&self) -> &ToolDescription {
        &self.description
    }

    async fn invoke(&self, ctx: &ToolContext, arguments: Arguments) -> Result<Value, ToolError> {
        let name = &self.description.name;
        let request = self.build_request(&arguments);
        debug!(
            tool = %name,
            call_id = %ctx.call_id,
            method = %request.method,
            url = %request.url,
            "Sending REST request"
        );

        let response = ctx
            .runtime
            .http_request(&request)
            .await
            .map_err(|e| ToolError::Transport {
                tool: name.clone(),
                call_id: ctx.call_id.clone(),
                reason: e.to_string(),
            })?;

        let output: Value =
            serde_json::from_str(&response.body).map_err(|e| ToolError::InvalidResponse {
                tool: name.clone(),
                call_id: ctx.call_id.clone(),
                reason: format!("response body is not JSON: {e}"),
            })?;

        Ok(apply_output_path(self.output_path.as_ref(), output))
    }
}
