//! `toolweave mcp`: Talk to MCP tool servers.

use anyhow::{Context, bail};
use toolweave_agent::mcp_server_params;
use toolweave_config::AppConfig;
use toolweave_tools::mcp::list_server_tools;
use toolweave_tools::{McpServerParams, StdioConnector};

pub async fn list(server: Option<String>, command: Vec<String>) -> anyhow::Result<()> {
    let params = match (server, command.split_first()) {
        (Some(name), _) => {
            let config = AppConfig::load().context("Failed to load config")?;
            let entry = config
                .mcp_servers
                .iter()
                .find(|s| s.name == name)
                .with_context(|| format!("No MCP server named \"{name}\" in the config"))?;
            mcp_server_params(entry)
        }
        (None, Some((program, args))) => {
            McpServerParams::new(program.clone()).with_args(args.iter().cloned())
        }
        (None, None) => bail!("Give the server command after `--`, or --server <name>"),
    };

    let tools = list_server_tools(&StdioConnector, &params)
        .await
        .with_context(|| format!("Failed to list tools of `{}`", params.command))?;

    println!("{} tool(s) from `{}`", tools.len(), params.command);
    for tool in &tools {
        let summary = tool
            .description
            .as_deref()
            .and_then(|d| d.lines().next())
            .unwrap_or_default();
        println!("  {:<24} {summary}", tool.name);
    }
    Ok(())
}

pub fn servers() -> anyhow::Result<()> {
    let config = AppConfig::load().context("Failed to load config")?;
    if config.mcp_servers.is_empty() {
        println!("No MCP servers configured");
    }
    for server in &config.mcp_servers {
        let filter = match &server.tools {
            Some(names) => names.join(", "),
            None => "all tools".into(),
        };
        println!(
            "  {:<16} {} {}  ({filter})",
            server.name,
            server.command,
            server.args.join(" ")
        );
    }
    Ok(())
}
