//! `toolweave preset`: Inspect tool presets.

use std::path::PathBuf;

use anyhow::{Context, bail};
use serde_json::Value;
use toolweave_agent::preset_authenticator;
use toolweave_config::AppConfig;
use toolweave_core::{Arguments, HttpRequest};
use toolweave_tools::{DirectoryPresetLoader, PresetLoader, RestApiTool, ToolDefinition};
use tracing::debug;

fn loader(config: &AppConfig, dir: Option<PathBuf>) -> DirectoryPresetLoader {
    DirectoryPresetLoader::new(dir.unwrap_or_else(|| config.preset_dir.clone()))
}

pub fn list(name: Option<String>, dir: Option<PathBuf>) -> anyhow::Result<()> {
    let config = AppConfig::load().context("Failed to load config")?;
    let loader = loader(&config, dir);

    let Some(name) = name else {
        let available = loader.available();
        if available.is_empty() {
            println!("No presets in {}", loader.dir().display());
        }
        for preset in available {
            println!("{preset}");
        }
        return Ok(());
    };

    let definitions = loader.load(&name)?;
    println!("Preset \"{name}\": {} tool(s)", definitions.len());
    for definition in &definitions {
        println!("{}", describe(definition));
    }
    Ok(())
}

pub fn plan(
    preset: &str,
    tool: &str,
    args: Option<&str>,
    dir: Option<PathBuf>,
) -> anyhow::Result<()> {
    let config = AppConfig::load().context("Failed to load config")?;
    let definition = loader(&config, dir)
        .load(preset)?
        .into_iter()
        .find(|d| d.name() == tool)
        .with_context(|| format!("Preset \"{preset}\" has no tool \"{tool}\""))?;
    let arguments = parse_arguments(args)?;

    let rest = RestApiTool::from_definition(definition, preset_authenticator(&config, preset))?;
    let request = redact_authorization(rest.build_request(&arguments));
    debug!(preset, tool, url = %request.url, "Planned request");
    println!("{}", serde_json::to_string_pretty(&request)?);
    Ok(())
}

/// One summary line per tool.
pub(crate) fn describe(definition: &ToolDefinition) -> String {
    let description = definition.description();
    let summary = description.description.lines().next().unwrap_or_default();
    match definition {
        ToolDefinition::Universal { .. } => {
            format!("  {:<24} universal  {summary}", description.name)
        }
        ToolDefinition::RestApi { behavior, .. } => format!(
            "  {:<24} restapi    {} {}  {summary}",
            description.name, behavior.method, behavior.base_url
        ),
    }
}

pub(crate) fn parse_arguments(raw: Option<&str>) -> anyhow::Result<Arguments> {
    let Some(raw) = raw else {
        return Ok(Arguments::new());
    };
    match serde_json::from_str::<Value>(raw).context("--args is not valid JSON")? {
        Value::Object(map) => Ok(map),
        other => bail!("--args must be a JSON object, got {other}"),
    }
}

/// Keep the scheme, hide the credential.
fn redact_authorization(mut request: HttpRequest) -> HttpRequest {
    if let Some(value) = request.headers.get_mut("Authorization") {
        let scheme = value.split_whitespace().next().unwrap_or_default().to_string();
        *value = format!("{scheme} [REDACTED]");
    }
    request
}
