//! Error types and result aliases for hubsweep.
//!
//! This module defines the shared error type returned by the external
//! collaborator traits ([`crate::store::ResourceStore`],
//! [`crate::email::EmailTransport`]) and by configuration loading.

use std::fmt;

/// The result type used throughout hubsweep.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when talking to collaborators or loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input was provided (configuration, identifiers).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A resource store operation failed.
    #[error("resource store error: {message}")]
    Store {
        /// Description of the store failure.
        message: String,
        /// The underlying cause, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Sending an email failed.
    #[error("email transport error: {message}")]
    Transport {
        /// Description of the transport failure.
        message: String,
        /// The underlying cause, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The requested resource was not found.
    #[error("not found: {resource_type} with id {id}")]
    NotFound {
        /// The type of resource that was not found.
        resource_type: &'static str,
        /// The identifier that was looked up.
        id: String,
    },
}

impl Error {
    /// Creates a new store error with the given message.
    #[must_use]
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new store error with a source cause.
    #[must_use]
    pub fn store_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Store {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a new transport error with the given message.
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new resource not found error.
    #[must_use]
    pub fn not_found(resource_type: &'static str, id: impl fmt::Display) -> Self {
        Self::NotFound {
            resource_type,
            id: id.to_string(),
        }
    }
}
