//! Catalogue of the language models an agent can be bound to.

use serde_json::{Map, Value};
use toolweave_core::DefinitionError;

pub const QWEN_SYSTEM_MESSAGE: &str =
    "You are Qwen, created by Alibaba Cloud. You are a helpful assistant.";

/// How a supported model name maps onto a runtime component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelDescription {
    pub name: &'static str,
    pub component_type: &'static str,
    pub model_id: &'static str,
    pub default_system_message: Option<&'static str>,
    /// Attributes that must be supplied in [`ModelAttrs`]
    pub required_attrs: &'static [&'static str],
}

const fn qwen(name: &'static str, model_id: &'static str) -> ModelDescription {
    ModelDescription {
        name,
        component_type: "tvm_language_model",
        model_id,
        default_system_message: Some(QWEN_SYSTEM_MESSAGE),
        required_attrs: &[],
    }
}

pub static MODELS: &[ModelDescription] = &[
    qwen("qwen3-0.6b", "Qwen/Qwen3-0.6B"),
    qwen("qwen3-1.7b", "Qwen/Qwen3-1.7B"),
    qwen("qwen3-4b", "Qwen/Qwen3-4B"),
    qwen("qwen3-8b", "Qwen/Qwen3-8B"),
    ModelDescription {
        name: "gpt-4o",
        component_type: "openai",
        model_id: "gpt-4o",
        default_system_message: None,
        required_attrs: &["api_key"],
    },
];

/// Find a model by name.
pub fn lookup(name: &str) -> Result<&'static ModelDescription, DefinitionError> {
    MODELS
        .iter()
        .find(|m| m.name == name)
        .ok_or_else(|| DefinitionError::UnsupportedModel(name.to_string()))
}

/// Names of every supported model, in catalogue order.
pub fn supported_models() -> impl Iterator<Item = &'static str> {
    MODELS.iter().map(|m| m.name)
}

/// Optional attributes forwarded to the runtime when the model is defined.
#[derive(Clone, Default)]
pub struct ModelAttrs {
    pub device: Option<u32>,
    /// e.g. `q4f16_1`
    pub quantization: Option<String>,
    /// e.g. `interactive`
    pub mode: Option<String>,
    pub api_key: Option<String>,
}

impl std::fmt::Debug for ModelAttrs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelAttrs")
            .field("device", &self.device)
            .field("quantization", &self.quantization)
            .field("mode", &self.mode)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl ModelAttrs {
    fn get(&self, attribute: &str) -> Option<Value> {
        match attribute {
            "device" => self.device.map(Value::from),
            "quantization" => self.quantization.clone().map(Value::from),
            "mode" => self.mode.clone().map(Value::from),
            "api_key" => self.api_key.clone().map(Value::from),
            _ => None,
        }
    }
}

impl ModelDescription {
    /// The attrs passed to `Runtime::define`: `{"model": <model id>, ...set attrs}`.
    pub fn define_attrs(&self, attrs: &ModelAttrs) -> Result<Value, DefinitionError> {
        if let Some(missing) = self
            .required_attrs
            .iter()
            .find(|a| attrs.get(a).is_none())
        {
            return Err(DefinitionError::MissingModelAttribute {
                model: self.name.to_string(),
                attribute: missing.to_string(),
            });
        }

        let mut out = Map::new();
        out.insert("model".into(), Value::from(self.model_id));
        for key in ["device", "quantization", "mode", "api_key"] {
            if let Some(value) = attrs.get(key) {
                out.insert(key.into(), value);
            }
        }
        Ok(Value::Object(out))
    }
}
