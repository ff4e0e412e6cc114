use thiserror::Error;

/// Domain rule violations. Every variant is recoverable at the component
/// boundary; request handlers convert these into structured responses and
/// never let them escape as panics.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    /// A field-keyed validation failure, rejected before any persistence.
    #[error("{field}: {message}")]
    Validation { field: String, message: String },
    /// The acting user lacks the role or ownership the operation requires.
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    /// Lookup by id came up empty, or the caller may not see the row exists.
    #[error("{0} not found")]
    NotFound(&'static str),
    /// A business-rule conflict checked proactively before insert.
    #[error("{0}")]
    Conflict(String),
}

impl DomainError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation { field: field.into(), message: message.into() }
    }

    /// The field a validation error is keyed on, if any.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Validation { field, .. } => Some(field),
            _ => None,
        }
    }
}
