//! Template system - placeholder types and structural validation

pub mod diagnostics;
pub mod validator;
pub mod variable;

pub use diagnostics::TemplateSyntaxError;
pub use validator::{first_placeholder, Placeholder, TemplateError, TemplateValidator};
pub use variable::VariableType;
