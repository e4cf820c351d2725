//! Error types for trellis

use crate::router::Method;
use thiserror::Error;

/// Result type alias for trellis operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for query compilation and route matching
#[derive(Debug, Error)]
pub enum Error {
    /// Validation error (bad identifier, malformed template, duplicate route)
    #[error("Validation error: {0}")]
    Validation(String),

    /// A matched route variable failed its declared pattern constraint.
    ///
    /// Maps to an HTTP 400-class response at the boundary.
    #[error("Invalid argument '{value}': expected pattern '{pattern}'")]
    InvalidArgument { value: String, pattern: String },

    /// A route template matched the path but no registration permits the method.
    ///
    /// Maps to HTTP 405 at the boundary.
    #[error("Method {method} not allowed on route '{route}'")]
    MethodNotAllowed { method: Method, route: String },

    /// Row not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Driver-level execution failure, surfaced as-is from the executor
    #[error("Execution error [{code}]: {message}")]
    Execution { code: String, message: String },
}

impl Error {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create an execution error carrying the driver's code and message
    pub fn execution(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Execution {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Check if this is an invalid-argument error
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument { .. })
    }

    /// Check if this is a method-not-allowed error
    pub fn is_method_not_allowed(&self) -> bool {
        matches!(self, Self::MethodNotAllowed { .. })
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
