//! JSON syntax diagnostics for template documents

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Template text that is not valid JSON, with the failing location
#[derive(Debug, Error, Diagnostic)]
#[error("Template is not a valid JSON object: {message}")]
#[diagnostic(code(blueprints::template::malformed))]
pub struct TemplateSyntaxError {
    #[source_code]
    src: NamedSource<String>,

    #[label("error here")]
    span: SourceSpan,

    #[help]
    help: Option<String>,

    /// The underlying parser message
    message: String,

    line: usize,
    column: usize,
}

impl TemplateSyntaxError {
    /// Create a syntax error from a serde_json error
    pub fn from_serde_error(err: &serde_json::Error, source: &str, name: &str) -> Self {
        let line = err.line().max(1);
        let column = err.column().max(1);
        let offset = line_col_to_offset(source, line, column);
        let message = err.to_string();
        let help = generate_help(&message);

        Self {
            src: NamedSource::new(name, source.to_string()),
            span: SourceSpan::from(offset..offset.saturating_add(1)),
            help,
            message,
            line,
            column,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// 1-based line of the failure
    pub fn line(&self) -> usize {
        self.line
    }

    /// 1-based column of the failure
    pub fn column(&self) -> usize {
        self.column
    }
}

/// Convert line/column to byte offset
fn line_col_to_offset(source: &str, line: usize, column: usize) -> usize {
    let mut current_line = 1;
    let mut line_start = 0;

    for (i, ch) in source.char_indices() {
        if current_line == line {
            break;
        }
        if ch == '\n' {
            current_line += 1;
            line_start = i + 1;
        }
    }

    if current_line < line {
        return source.len().saturating_sub(1);
    }

    // serde_json columns count bytes from the line start
    let mut offset = (line_start + column.saturating_sub(1)).min(source.len().saturating_sub(1));
    while !source.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}

/// Generate helpful suggestions based on the parser message
fn generate_help(message: &str) -> Option<String> {
    let msg_lower = message.to_lowercase();

    if msg_lower.contains("expected `,` or `}`") {
        return Some("Separate object members with commas: {\"a\": 1, \"b\": 2}".to_string());
    }

    if msg_lower.contains("expected `,` or `]`") {
        return Some("Separate array items with commas: [1, 2, 3]".to_string());
    }

    if msg_lower.contains("trailing comma") {
        return Some("JSON does not allow a comma after the last member".to_string());
    }

    if msg_lower.contains("key must be a string") {
        return Some("Object keys must be double-quoted strings".to_string());
    }

    if msg_lower.contains("eof while parsing") {
        return Some("The document ends early - check for unclosed braces or brackets".to_string());
    }

    if msg_lower.contains("control character") {
        return Some("Escape newlines and tabs inside strings as \\n and \\t".to_string());
    }

    None
}
