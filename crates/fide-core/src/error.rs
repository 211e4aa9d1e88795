//! Domain-specific error types following panic-free policy.

use thiserror::Error;

/// Errors that can occur in domain operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A session identity could not be built from the given input
    #[error("Invalid session id: {value:?} ({reason})")]
    InvalidSessionId { value: String, reason: String },

    /// An environment variable name is not a valid POSIX name
    #[error("Invalid environment variable name: {name:?}")]
    InvalidVariableName { name: String },

    /// A package id is empty or blank
    #[error("Invalid package id: {value:?}")]
    InvalidPackageId { value: String },
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
