//! `${var}` placeholder rendering.
//!
//! Placeholders look like `${ key }`: optional whitespace around a key made
//! of anything but whitespace and `}`. Keys present in the context are
//! substituted; absent keys render as `{key}` so the result stays visible
//! without failing the call. The returned key set drives argument
//! partitioning in REST tools (path/body variables vs. query parameters).

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex_lite::{Captures, Regex};

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{\s*([^}\s]+)\s*\}").unwrap_or_else(|e| panic!("invalid placeholder regex: {e}"))
});

/// Output of [`render`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub text: String,
    /// Context keys consumed by placeholders
    pub keys: BTreeSet<String>,
}

/// Render `template` against `context`.
pub fn render(template: &str, context: &serde_json::Map<String, serde_json::Value>) -> Rendered {
    let mut keys = BTreeSet::new();
    let text = PLACEHOLDER.replace_all(template, |caps: &Captures<'_>| {
        let key = &caps[1];
        match context.get(key) {
            Some(value) => {
                keys.insert(key.to_string());
                display_value(value)
            }
            None => format!("{{{key}}}"),
        }
    });
    Rendered {
        text: text.into_owned(),
        keys,
    }
}

/// String form of a JSON value as it should appear inside a URL or body.
pub fn display_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
