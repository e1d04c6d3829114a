//! `toolweave config`: Configuration management commands.

use anyhow::Context;
use toolweave_agent::model;
use toolweave_config::AppConfig;

pub fn validate() -> anyhow::Result<()> {
    println!("Validating configuration...");

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            println!("   Config error: {e}");
            return Err(e.into());
        }
    };
    println!("   Config parsed successfully");

    let mut warnings = Vec::new();
    match model::lookup(&config.model) {
        Ok(m) if m.required_attrs.contains(&"api_key") && !config.has_api_key() => {
            warnings.push(format!(
                "Model \"{}\" needs an API key (set TOOLWEAVE_API_KEY or OPENAI_API_KEY)",
                config.model
            ));
        }
        Ok(_) => {}
        Err(e) => warnings.push(e.to_string()),
    }
    if !config.preset_dir.is_dir() {
        warnings.push(format!(
            "Preset directory {} does not exist",
            config.preset_dir.display()
        ));
    }
    for preset in config.auth.keys() {
        if !config.presets.contains(preset) {
            warnings.push(format!("Credentials for preset \"{preset}\" are never used"));
        }
    }

    if warnings.is_empty() {
        println!("   All checks passed");
    } else {
        println!();
        for w in &warnings {
            println!("   warning: {w}");
        }
    }

    println!();
    println!("   Model:        {}", config.model);
    println!("   Presets:      {}", config.presets.join(", "));
    println!("   MCP servers:  {}", config.mcp_servers.len());
    Ok(())
}

pub fn show() -> anyhow::Result<()> {
    let config = AppConfig::load().context("Failed to load config")?;
    println!("{}", toml::to_string_pretty(&redacted(config))?);
    Ok(())
}

pub fn path() {
    println!("{}", AppConfig::config_dir().join("config.toml").display());
}

fn redacted(mut config: AppConfig) -> AppConfig {
    if config.api_key.is_some() {
        config.api_key = Some("[REDACTED]".into());
    }
    for auth in config.auth.values_mut() {
        auth.token = "[REDACTED]".into();
    }
    config
}
