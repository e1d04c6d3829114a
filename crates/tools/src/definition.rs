//! Declarative tool definitions, as found in preset files.
//!
//! ```json
//! {
//!   "type": "restapi",
//!   "description": { "name": "frankfurter", "parameters": { ... } },
//!   "behavior": {
//!     "baseURL": "https://api.frankfurter.app/latest",
//!     "method": "GET",
//!     "outputPath": "rates"
//!   }
//! }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use toolweave_core::{DefinitionError, ToolDescription};

use crate::output_path::OutputPath;

pub const UNIVERSAL: &str = "universal";
pub const RESTAPI: &str = "restapi";

/// A tool definition, discriminated by its `type` tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ToolDefinition {
    #[serde(rename = "universal")]
    Universal {
        description: ToolDescription,
        #[serde(default)]
        behavior: UniversalBehavior,
    },
    #[serde(rename = "restapi")]
    RestApi {
        description: ToolDescription,
        behavior: RestApiBehavior,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UniversalBehavior {
    #[serde(
        rename = "outputPath",
        alias = "output_path",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub output_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestApiBehavior {
    /// URL template; `${key}` placeholders consume arguments
    #[serde(rename = "baseURL", alias = "base_url")]
    pub base_url: String,

    pub method: HttpMethod,

    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Body template, rendered like `base_url`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authentication: Option<AuthenticationKind>,

    #[serde(
        rename = "outputPath",
        alias = "output_path",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub output_path: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authentication scheme a REST tool expects its caller to supply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthenticationKind {
    Bearer,
}

impl ToolDefinition {
    /// Parse a single definition from JSON.
    pub fn from_value(value: serde_json::Value) -> Result<Self, DefinitionError> {
        let name = value
            .pointer("/description/name")
            .and_then(|v| v.as_str())
            .unwrap_or("<unnamed>")
            .to_string();
        serde_json::from_value(value).map_err(|e| DefinitionError::Malformed {
            name,
            reason: e.to_string(),
        })
    }

    /// The `type` tag of this definition.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Universal { .. } => UNIVERSAL,
            Self::RestApi { .. } => RESTAPI,
        }
    }

    pub fn description(&self) -> &ToolDescription {
        match self {
            Self::Universal { description, .. } | Self::RestApi { description, .. } => description,
        }
    }

    pub fn name(&self) -> &str {
        &self.description().name
    }

    pub fn output_path(&self) -> Option<&str> {
        match self {
            Self::Universal { behavior, .. } => behavior.output_path.as_deref(),
            Self::RestApi { behavior, .. } => behavior.output_path.as_deref(),
        }
    }

    /// Split into the universal parts, failing if this is another kind.
    pub fn into_universal(self) -> Result<(ToolDescription, UniversalBehavior), DefinitionError> {
        match self {
            Self::Universal {
                description,
                behavior,
            } => Ok((description, behavior)),
            other => Err(DefinitionError::WrongType {
                expected: UNIVERSAL.into(),
                found: other.type_name().into(),
            }),
        }
    }

    /// Split into the REST parts, failing if this is another kind.
    pub fn into_rest_api(self) -> Result<(ToolDescription, RestApiBehavior), DefinitionError> {
        match self {
            Self::RestApi {
                description,
                behavior,
            } => Ok((description, behavior)),
            other => Err(DefinitionError::WrongType {
                expected: RESTAPI.into(),
                found: other.type_name().into(),
            }),
        }
    }

    /// Check everything that can be checked before the first call.
    pub fn validate(&self) -> Result<(), DefinitionError> {
        if self.name().trim().is_empty() {
            return Err(DefinitionError::Malformed {
                name: String::new(),
                reason: "tool name is empty".into(),
            });
        }
        if let Self::RestApi { behavior, .. } = self
            && behavior.base_url.trim().is_empty()
        {
            return Err(DefinitionError::Malformed {
                name: self.name().to_string(),
                reason: "baseURL is empty".into(),
            });
        }
        compile_output_path(self.output_path())?;
        Ok(())
    }
}

pub(crate) fn compile_output_path(
    expression: Option<&str>,
) -> Result<Option<OutputPath>, DefinitionError> {
    expression.map(OutputPath::compile).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn frankfurter() -> serde_json::Value {
        json!({
            "type": "restapi",
            "description": {
                "name": "frankfurter",
                "description": "Get the latest currency exchange rates",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "base": {"type": "string"},
                        "symbols": {"type": "string"}
                    },
                    "required": ["base"]
                }
            },
            "behavior": {
                "baseURL": "https://api.frankfurter.app/latest",
                "method": "GET",
                "headers": {"accept": "application/json"},
                "outputPath": "rates"
            }
        })
    }

    #[test]
    fn parses_restapi_definition() {
        let def = ToolDefinition::from_value(frankfurter()).unwrap();
        assert_eq!(def.type_name(), "restapi");
        assert_eq!(def.name(), "frankfurter");
        assert_eq!(def.output_path(), Some("rates"));
        let (_, behavior) = def.into_rest_api().unwrap();
        assert_eq!(behavior.method, HttpMethod::Get);
        assert_eq!(behavior.headers["accept"], "application/json");
        assert!(behavior.authentication.is_none());
    }

    #[test]
    fn snake_case_aliases_accepted() {
        let def = ToolDefinition::from_value(json!({
            "type": "restapi",
            "description": {"name": "x"},
            "behavior": {
                "base_url": "https://h/${id}",
                "method": "POST",
                "output_path": "a.b",
                "authentication": "bearer"
            }
        }))
        .unwrap();
        let (_, behavior) = def.into_rest_api().unwrap();
        assert_eq!(behavior.base_url, "https://h/${id}");
        assert_eq!(behavior.authentication, Some(AuthenticationKind::Bearer));
    }

    #[test]
    fn universal_behavior_optional() {
        let def = ToolDefinition::from_value(json!({
            "type": "universal",
            "description": {"name": "calculator"}
        }))
        .unwrap();
        let (desc, behavior) = def.into_universal().unwrap();
        assert_eq!(desc.name, "calculator");
        assert!(behavior.output_path.is_none());
    }

    #[test]
    fn wrong_variant_is_rejected() {
        let def = ToolDefinition::from_value(frankfurter()).unwrap();
        let err = def.into_universal().unwrap_err();
        assert!(matches!(
            err,
            DefinitionError::WrongType { ref expected, ref found }
                if expected == "universal" && found == "restapi"
        ));
    }

    #[test]
    fn unknown_type_is_malformed() {
        let err = ToolDefinition::from_value(json!({
            "type": "graphql",
            "description": {"name": "gq"},
            "behavior": {}
        }))
        .unwrap_err();
        assert!(matches!(err, DefinitionError::Malformed { ref name, .. } if name == "gq"));
    }

    #[test]
    fn only_universal_and_restapi_tags_parse() {
        for tag in ["builtin", "graphql", ""] {
            let value = json!({"type": tag, "description": {"name": "x"}, "behavior": {}});
            assert!(ToolDefinition::from_value(value).is_err(), "{tag} should be rejected");
        }
        let value = json!({"type": "universal", "description": {"name": "x"}});
        assert!(ToolDefinition::from_value(value).is_ok());
    }

    #[test]
    fn unsupported_method_is_malformed() {
        let mut value = frankfurter();
        value["behavior"]["method"] = json!("PATCH");
        assert!(ToolDefinition::from_value(value).is_err());
    }

    #[test]
    fn validate_checks_output_path() {
        let mut value = frankfurter();
        value["behavior"]["outputPath"] = json!("rates[");
        let def = ToolDefinition::from_value(value).unwrap();
        assert!(matches!(
            def.validate(),
            Err(DefinitionError::InvalidOutputPath { .. })
        ));
    }

    #[test]
    fn serializes_with_preset_field_names() {
        let def = ToolDefinition::from_value(frankfurter()).unwrap();
        let value = serde_json::to_value(&def).unwrap();
        assert_eq!(value["type"], "restapi");
        assert_eq!(value["behavior"]["baseURL"], "https://api.frankfurter.app/latest");
        assert_eq!(value["behavior"]["outputPath"], "rates");
    }
}
