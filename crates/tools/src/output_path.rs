//! Output-path queries over JSON tool results.
//!
//! Output paths are JMESPath expressions, compiled once when the tool is
//! built and evaluated against every raw result:
//!
//! ```text
//! rates                          field
//! items[*].name                  projection
//! items[?price > `10`].id        filter
//! sort_by(items, &price)[0].id   functions and expression references
//! ```
//!
//! Evaluation never fails: paths that don't match produce `null`.

use std::sync::Arc;

use serde_json::Value;
use toolweave_core::DefinitionError;
use tracing::debug;

/// Integer literals in an expression are capped so slice arithmetic inside
/// the evaluator stays within `i32`.
const MAX_INTEGER_LITERAL: u64 = 1 << 30;

/// A compiled output path.
#[derive(Clone)]
pub struct OutputPath {
    expression: String,
    compiled: Arc<jmespath::Expression<'static>>,
}

impl OutputPath {
    pub fn compile(expression: &str) -> Result<Self, DefinitionError> {
        let invalid = |reason: String| DefinitionError::InvalidOutputPath {
            expression: expression.to_string(),
            reason,
        };
        check_integer_literals(expression).map_err(invalid)?;
        let compiled = jmespath::compile(expression).map_err(|e| invalid(e.to_string()))?;
        Ok(Self {
            expression: expression.to_string(),
            compiled: Arc::new(compiled),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.expression
    }

    /// Evaluate against `data`. Non-matching paths yield `Value::Null`, and so
    /// do evaluation errors such as a function applied to the wrong type.
    pub fn search(&self, data: &Value) -> Value {
        let found = match self.compiled.search(data) {
            Ok(found) => found,
            Err(e) => {
                debug!(expression = %self.expression, error = %e, "Output path evaluation failed");
                return Value::Null;
            }
        };
        serde_json::to_value(&*found).unwrap_or(Value::Null)
    }
}

impl PartialEq for OutputPath {
    fn eq(&self, other: &Self) -> bool {
        self.expression == other.expression
    }
}

impl std::fmt::Debug for OutputPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("OutputPath").field(&self.expression).finish()
    }
}

impl std::fmt::Display for OutputPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.expression)
    }
}

/// Reject bare integers (indexes, slice bounds and steps) above
/// [`MAX_INTEGER_LITERAL`]. Quoted identifiers, raw strings and JSON
/// literals are skipped; digits inside unquoted identifiers are not numbers.
fn check_integer_literals(expression: &str) -> Result<(), String> {
    let chars: Vec<char> = expression.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            '\'' | '"' | '`' => {
                i += 1;
                while i < chars.len() && chars[i] != c {
                    if chars[i] == '\\' {
                        i += 1;
                    }
                    i += 1;
                }
                i += 1;
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
            }
            c if c.is_ascii_digit() => {
                let start = i;
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
                let digits: String = chars[start..i].iter().collect();
                let within = digits
                    .parse::<u64>()
                    .is_ok_and(|n| n <= MAX_INTEGER_LITERAL);
                if !within {
                    return Err(format!(
                        "integer {digits} is out of range (max {MAX_INTEGER_LITERAL})"
                    ));
                }
            }
            _ => i += 1,
        }
    }
    Ok(())
}
