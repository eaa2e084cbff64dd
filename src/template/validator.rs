//! Structural validation of blueprint templates
//!
//! A template is a JSON object whose string values may carry a typed
//! placeholder of the form `{{<TYPE> name}}`. Validation parses the document
//! and checks every placeholder's type against [`VariableType`]. Nothing is
//! rendered.

use miette::Diagnostic;
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;
use thiserror::Error;

use crate::template::diagnostics::TemplateSyntaxError;
use crate::template::variable::VariableType;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s*\{\{\s*<(?P<variable_type>[A-Za-z0-9_]+)>\s*(?P<variable_id>[A-Za-z0-9_]+)\s*\}\}")
        .expect("placeholder pattern compiles")
});

/// Why a template was rejected
#[derive(Debug, Error, Diagnostic)]
pub enum TemplateError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Malformed(#[from] TemplateSyntaxError),

    #[error("Template is not a JSON object but a JSON {found}")]
    #[diagnostic(
        code(blueprints::template::not_an_object),
        help("The top level of a template must be a JSON object")
    )]
    NotAnObject { found: &'static str },

    #[error("Unsupported variable type '{variable_type}' in template; supported types are: {supported}")]
    #[diagnostic(code(blueprints::template::unsupported_variable_type))]
    UnsupportedVariableType {
        variable_type: String,
        variable: String,
        supported: String,
    },
}

/// A placeholder found in a template string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder<'a> {
    /// The type token exactly as written
    pub variable_type: &'a str,
    pub variable: &'a str,
}

/// Find the first placeholder in a string value
///
/// Only the first occurrence is reported. Strings carrying several
/// placeholders have the later ones ignored.
pub fn first_placeholder(value: &str) -> Option<Placeholder<'_>> {
    let caps = PLACEHOLDER.captures(value)?;
    Some(Placeholder {
        variable_type: caps.name("variable_type")?.as_str(),
        variable: caps.name("variable_id")?.as_str(),
    })
}

/// Template validator
///
/// Stateless; one instance can be shared freely between threads.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateValidator;

impl TemplateValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validate template text
    pub fn validate(&self, template: &str) -> Result<(), TemplateError> {
        self.validate_named(template, "template")
    }

    /// Validate template text, naming the source in syntax diagnostics
    pub fn validate_named(&self, template: &str, source_name: &str) -> Result<(), TemplateError> {
        let document = parse_template(template, source_name)?;
        validate_object(&document)
    }
}

fn parse_template(template: &str, source_name: &str) -> Result<Map<String, Value>, TemplateError> {
    let value: Value = serde_json::from_str(template)
        .map_err(|e| TemplateSyntaxError::from_serde_error(&e, template, source_name))?;

    match value {
        Value::Object(map) => Ok(map),
        other => Err(TemplateError::NotAnObject {
            found: json_kind(&other),
        }),
    }
}

fn validate_object(object: &Map<String, Value>) -> Result<(), TemplateError> {
    for value in object.values() {
        match value {
            Value::String(s) => validate_string(s)?,
            Value::Object(inner) => validate_object(inner)?,
            Value::Array(items) => {
                for item in items {
                    match item {
                        Value::Object(inner) => validate_object(inner)?,
                        Value::String(s) => validate_string(s)?,
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }
    Ok(())
}

fn validate_string(value: &str) -> Result<(), TemplateError> {
    let Some(placeholder) = first_placeholder(value) else {
        return Ok(());
    };

    if VariableType::from_token(placeholder.variable_type).is_none() {
        return Err(TemplateError::UnsupportedVariableType {
            variable_type: placeholder.variable_type.to_string(),
            variable: placeholder.variable.to_string(),
            supported: VariableType::supported_list(),
        });
    }
    Ok(())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
