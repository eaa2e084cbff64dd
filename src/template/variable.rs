//! Variable types a template placeholder may declare

use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of placeholder variable types
///
/// Shared with renderers outside this crate, so adding a member is a
/// versioned change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VariableType {
    String,
    Number,
    Boolean,
    /// A string that renderers must not log or echo
    Secret,
}

impl VariableType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VariableType::String => "STRING",
            VariableType::Number => "NUMBER",
            VariableType::Boolean => "BOOLEAN",
            VariableType::Secret => "SECRET",
        }
    }

    pub fn all() -> &'static [VariableType] {
        &[
            VariableType::String,
            VariableType::Number,
            VariableType::Boolean,
            VariableType::Secret,
        ]
    }

    /// Match a placeholder's type token, ignoring ASCII case
    pub fn from_token(token: &str) -> Option<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|t| t.as_str().eq_ignore_ascii_case(token))
    }

    /// Supported names formatted for error messages, e.g. `[STRING, NUMBER]`
    pub fn supported_list() -> String {
        let names: Vec<&str> = Self::all().iter().map(|t| t.as_str()).collect();
        format!("[{}]", names.join(", "))
    }
}

impl fmt::Display for VariableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
