//! Agents built from an [`AppConfig`].

use std::sync::Arc;

use toolweave_config::{AppConfig, McpServerConfig};
use toolweave_core::{Authenticator, BearerAuthenticator, Runtime};
use toolweave_tools::{DirectoryPresetLoader, McpServerParams};
use tracing::{info, warn};

use crate::agent::{Agent, AgentOptions, RunOptions};
use crate::error::AgentError;
use crate::model::{self, ModelAttrs};

impl AgentOptions {
    /// Model, device and system message from the config. The API key is
    /// only forwarded to models that need one.
    pub fn from_config(config: &AppConfig) -> Self {
        let wants_key = match model::lookup(&config.model) {
            Ok(m) => m.required_attrs.contains(&"api_key"),
            Err(_) => true,
        };
        Self {
            model: config.model.clone(),
            attrs: ModelAttrs {
                device: config.device,
                api_key: config.api_key.clone().filter(|_| wants_key),
                ..Default::default()
            },
            system_message: config.system_message.clone(),
        }
    }
}

impl From<&AppConfig> for RunOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            enable_reasoning: config.enable_reasoning,
            ignore_reasoning_messages: config.ignore_reasoning_messages,
        }
    }
}

/// Spawn parameters for a `[[mcp_servers]]` entry.
pub fn mcp_server_params(server: &McpServerConfig) -> McpServerParams {
    McpServerParams {
        command: server.command.clone(),
        args: server.args.clone(),
        env: server.env.clone(),
        cwd: server.cwd.clone(),
    }
}

/// The bearer authenticator configured under `[auth.<preset>]`, if any.
pub fn preset_authenticator(config: &AppConfig, preset: &str) -> Option<Arc<dyn Authenticator>> {
    config.auth.get(preset).map(|auth| {
        Arc::new(BearerAuthenticator::with_format(&auth.token, &auth.format))
            as Arc<dyn Authenticator>
    })
}

impl Agent {
    /// Define an agent for the configured model and register every
    /// configured preset and MCP server. The component is deleted again if
    /// any tool fails to register.
    pub async fn from_config(
        runtime: Arc<dyn Runtime>,
        config: &AppConfig,
    ) -> Result<Self, AgentError> {
        let mut agent = Self::define(runtime, AgentOptions::from_config(config)).await?;
        if let Err(e) = agent.add_configured_tools(config).await {
            if let Err(cleanup) = agent.delete().await {
                warn!(error = %cleanup, "Failed to delete component after setup error");
            }
            return Err(e);
        }
        Ok(agent)
    }

    /// Register the tools of `config.presets`, then those of
    /// `config.mcp_servers`. Returns how many tools were added.
    pub async fn add_configured_tools(&mut self, config: &AppConfig) -> Result<usize, AgentError> {
        let before = self.tools().len();

        let loader = DirectoryPresetLoader::new(&config.preset_dir);
        for preset in &config.presets {
            self.add_tools_from_preset(&loader, preset, preset_authenticator(config, preset))?;
        }
        for server in &config.mcp_servers {
            self.add_tools_from_mcp_server(mcp_server_params(server), server.tools.as_deref())
                .await?;
        }

        let added = self.tools().len() - before;
        info!(
            presets = config.presets.len(),
            mcp_servers = config.mcp_servers.len(),
            added,
            "Configured tools registered"
        );
        Ok(added)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use futures::StreamExt;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn config_with_tools(preset_dir: &std::path::Path) -> AppConfig {
        let mut config: AppConfig = toml::from_str(
            r#"
model = "qwen3-4b"
device = 1
api_key = "sk-unused"
system_message = "Answer in French."
enable_reasoning = true
ignore_reasoning_messages = true
presets = ["fx"]

[auth.fx]
token = "fx-token"

[[mcp_servers]]
name = "files"
command = "fs-server"
tools = ["read_file"]
"#,
        )
        .unwrap();
        config.preset_dir = preset_dir.to_path_buf();
        config
    }

    fn write_fx_preset(dir: &std::path::Path) {
        std::fs::write(
            dir.join("fx.json"),
            r#"{
                "rates": {
                    "type": "restapi",
                    "description": {"name": "rates"},
                    "behavior": {"baseURL": "https://api.frankfurter.app/latest", "method": "GET"}
                }
            }"#,
        )
        .unwrap();
    }

    #[test]
    fn options_follow_the_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_with_tools(dir.path());

        let options = AgentOptions::from_config(&config);
        assert_eq!(options.model, "qwen3-4b");
        assert_eq!(options.attrs.device, Some(1));
        assert_eq!(options.attrs.api_key, None);
        assert_eq!(options.system_message.as_deref(), Some("Answer in French."));

        let run = RunOptions::from(&config);
        assert!(run.enable_reasoning);
        assert!(run.ignore_reasoning_messages);
    }

    #[test]
    fn hosted_models_get_the_api_key() {
        let config = AppConfig {
            model: "gpt-4o".into(),
            api_key: Some("sk-live".into()),
            ..Default::default()
        };
        let options = AgentOptions::from_config(&config);
        assert_eq!(options.attrs.api_key.as_deref(), Some("sk-live"));
        assert_eq!(options.system_message, None);
    }

    #[test]
    fn server_entries_become_spawn_params() {
        let server = McpServerConfig {
            name: "fs".into(),
            command: "npx".into(),
            args: vec!["-y".into(), "server-filesystem".into()],
            env: BTreeMap::from([("DEBUG".to_string(), "0".to_string())]),
            cwd: None,
            tools: None,
        };
        let params = mcp_server_params(&server);
        assert_eq!(params.command, "npx");
        assert_eq!(params.args, ["-y", "server-filesystem"]);
        assert_eq!(params.env["DEBUG"], "0");
    }

    #[tokio::test]
    async fn configured_agent_registers_presets_and_servers() {
        let dir = tempfile::tempdir().unwrap();
        write_fx_preset(dir.path());
        let config = config_with_tools(dir.path());

        let runtime = Arc::new(ScriptedRuntime::new(vec![vec![stop_delta("Bonjour")]]));
        let connector = Arc::new(FakeMcpConnector::new(&["read_file", "write_file"]));
        let mut agent = Agent::define(runtime.clone(), AgentOptions::from_config(&config))
            .await
            .unwrap()
            .with_session_connector(connector);

        assert_eq!(agent.add_configured_tools(&config).await.unwrap(), 2);
        assert_eq!(agent.tools().names(), ["rates", "read_file"]);
        assert_eq!(agent.history().system_message(), Some("Answer in French."));
        assert_eq!(
            runtime.defined()[0].2,
            json!({"model": "Qwen/Qwen3-4B", "device": 1})
        );

        let events: Vec<_> = agent.run("Hi", RunOptions::from(&config)).collect().await;
        assert_eq!(events.len(), 1);
        let request = &runtime.requests()[0];
        assert_eq!(request["enable_reasoning"], true);
        assert_eq!(request["ignore_reasoning_messages"], true);
    }

    #[tokio::test]
    async fn setup_failure_releases_the_component() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            presets: vec!["missing".into()],
            preset_dir: dir.path().to_path_buf(),
            ..Default::default()
        };

        let runtime = Arc::new(ScriptedRuntime::new(vec![]));
        let err = Agent::from_config(runtime.clone(), &config).await.unwrap_err();

        assert!(err.is_configuration());
        assert_eq!(runtime.defined().len(), 1);
        assert_eq!(runtime.deleted(), [runtime.defined()[0].1.clone()]);
    }
}
