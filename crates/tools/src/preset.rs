//! Tool presets: named collections of tool definitions.
//!
//! A preset file is a JSON object mapping tool name to [`ToolDefinition`].
//! Entries whose `type` is not understood are skipped with a warning so
//! newer preset files keep loading on older builds.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use toolweave_core::DefinitionError;

use crate::definition::{RESTAPI, ToolDefinition, UNIVERSAL};

/// Resolves a preset id to its tool definitions, in file order.
pub trait PresetLoader: Send + Sync {
    fn load(&self, preset: &str) -> Result<Vec<ToolDefinition>, DefinitionError>;
}

/// Loads `<dir>/<preset>.json`.
#[derive(Debug, Clone)]
pub struct DirectoryPresetLoader {
    dir: PathBuf,
}

impl DirectoryPresetLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Preset ids available in the directory, sorted.
    pub fn available(&self) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(&self.dir) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .filter_map(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .collect();
        names.sort();
        names
    }
}

impl PresetLoader for DirectoryPresetLoader {
    fn load(&self, preset: &str) -> Result<Vec<ToolDefinition>, DefinitionError> {
        if preset.is_empty() || preset.contains(['/', '\\']) || preset.starts_with('.') {
            return Err(DefinitionError::UnknownPreset(preset.to_string()));
        }
        let path = self.dir.join(format!("{preset}.json"));
        let content = std::fs::read_to_string(&path)
            .map_err(|_| DefinitionError::UnknownPreset(preset.to_string()))?;
        debug!(preset, path = %path.display(), "Loading tool preset");
        parse_preset(preset, &content)
    }
}

/// Parse the contents of a preset file.
pub fn parse_preset(preset: &str, content: &str) -> Result<Vec<ToolDefinition>, DefinitionError> {
    let entries: serde_json::Map<String, serde_json::Value> = serde_json::from_str(content)
        .map_err(|e| DefinitionError::Malformed {
            name: preset.to_string(),
            reason: format!("preset is not a JSON object of tool definitions: {e}"),
        })?;

    let mut definitions = Vec::with_capacity(entries.len());
    for (tool_name, value) in entries {
        let tool_type = value.get("type").and_then(|t| t.as_str()).unwrap_or("");
        if tool_type != UNIVERSAL && tool_type != RESTAPI {
            warn!(
                preset,
                tool = %tool_name,
                tool_type,
                "Tool type is not supported, skipping"
            );
            continue;
        }
        let definition = ToolDefinition::from_value(value)?;
        definition.validate()?;
        definitions.push(definition);
    }
    Ok(definitions)
}
