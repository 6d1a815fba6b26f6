//! Error types for portal services
//!
//! Errors are classified by the caller contract:
//! - Validation: malformed input, caught before any side effect
//! - Authorization: caller lacks the required role
//! - Backend: persistence or collaborator failure that could not be absorbed
//!
//! Remote-store failures are normally absorbed by the failover layer and
//! never reach a service boundary; what does surface here is either a caller
//! mistake or a failure the orchestration deliberately treats as fatal
//! (backup checksum mismatch).

use thiserror::Error;

/// A single field-level validation message.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[derive(Debug, Error)]
pub enum PortalError {
    #[error("Validation failed: {}", format_fields(.0))]
    Validation(Vec<FieldError>),

    #[error("Not authorized: {0}")]
    Authorization(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PortalError {
    /// Shorthand for a single-field validation failure.
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        PortalError::Validation(vec![FieldError::new(field, message)])
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, PortalError::Validation(_))
    }

    pub fn is_authorization(&self) -> bool {
        matches!(self, PortalError::Authorization(_))
    }

    /// True for failures that should also fire an external notification
    /// (backup failures, checksum mismatches). Validation and authorization
    /// are caller mistakes, not incidents.
    pub fn is_notifiable(&self) -> bool {
        matches!(
            self,
            PortalError::Backend(_) | PortalError::Serialization(_) | PortalError::Io(_)
        )
    }
}

fn format_fields(fields: &[FieldError]) -> String {
    fields
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Serializable error representation for view-layer responses.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureReport {
    pub message: String,
    pub error_type: ErrorType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldError>,
}

#[derive(Debug, Clone, Copy, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorType {
    Validation,
    Authorization,
    Backend,
    NotFound,
}

impl From<&PortalError> for FailureReport {
    fn from(err: &PortalError) -> Self {
        let (error_type, fields) = match err {
            PortalError::Validation(fields) => (ErrorType::Validation, fields.clone()),
            PortalError::Authorization(_) => (ErrorType::Authorization, Vec::new()),
            PortalError::NotFound(_) => (ErrorType::NotFound, Vec::new()),
            _ => (ErrorType::Backend, Vec::new()),
        };

        FailureReport {
            message: err.to_string(),
            error_type,
            fields,
        }
    }
}
