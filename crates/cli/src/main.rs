//! toolweave CLI: the main entry point.
//!
//! Commands:
//! - `preset`:  List presets and their tools, dry-run REST tools
//! - `mcp`:     List the tools an MCP server offers
//! - `models`:  Show the supported model catalogue
//! - `config`:  Show, locate or validate the configuration

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "toolweave",
    about = "toolweave: tool-calling agent orchestrator",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect tool presets
    Preset {
        #[command(subcommand)]
        action: PresetAction,
    },

    /// Talk to MCP tool servers
    Mcp {
        #[command(subcommand)]
        action: McpAction,
    },

    /// List the supported models
    Models,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum PresetAction {
    /// List available presets, or the tools of one preset
    List {
        name: Option<String>,

        /// Preset directory (defaults to `preset_dir` from the config)
        #[arg(long, env = "TOOLWEAVE_PRESET_DIR")]
        dir: Option<PathBuf>,
    },

    /// Print the HTTP request a REST tool would send, without sending it
    Plan {
        preset: String,
        tool: String,

        /// Tool arguments as a JSON object
        #[arg(short, long)]
        args: Option<String>,

        #[arg(long, env = "TOOLWEAVE_PRESET_DIR")]
        dir: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum McpAction {
    /// List a server's tools: `toolweave mcp list -- npx some-server`
    List {
        /// A server from `[[mcp_servers]]` in the config
        #[arg(long, conflicts_with = "command")]
        server: Option<String>,

        /// Command and arguments that start the server
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },

    /// List the servers configured in `[[mcp_servers]]`
    Servers,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration (secrets redacted)
    Show,
    /// Print the config file path
    Path,
    /// Load and validate the configuration
    Validate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Preset { action } => match action {
            PresetAction::List { name, dir } => commands::preset::list(name, dir)?,
            PresetAction::Plan {
                preset,
                tool,
                args,
                dir,
            } => commands::preset::plan(&preset, &tool, args.as_deref(), dir)?,
        },
        Commands::Mcp { action } => match action {
            McpAction::List { server, command } => commands::mcp::list(server, command).await?,
            McpAction::Servers => commands::mcp::servers()?,
        },
        Commands::Models => commands::models::run(),
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_cmd::show()?,
            ConfigAction::Path => commands::config_cmd::path(),
            ConfigAction::Validate => commands::config_cmd::validate()?,
        },
    }

    Ok(())
}
