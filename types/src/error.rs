use ecow::EcoString;
use miette::Diagnostic;
use thiserror::Error;

/// Errors raised while defining types.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum TypeError {
    #[error("struct `{struct_name}` declares field `{field}` more than once")]
    #[diagnostic(code(fusor::duplicate_field))]
    DuplicateField {
        struct_name: EcoString,
        field: EcoString,
    },
}
