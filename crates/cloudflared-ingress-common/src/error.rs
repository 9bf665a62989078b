//! Error types for the cloudflared ingress operator
//!
//! Errors carry the ConfigMap identity or the failing context so that a
//! single log line is enough to locate the problem.

use thiserror::Error;

/// Default context value when no specific context is available
pub const UNKNOWN_CONTEXT: &str = "unknown";

/// Main error type for operator operations
#[derive(Debug, Error)]
pub enum Error {
    /// Kubernetes API error
    #[error("kubernetes error: {source}")]
    Kube {
        /// The underlying kube-rs error
        #[from]
        source: kube::Error,
    },

    /// The cloudflared configuration document could not be used
    #[error("document error for {namespace}/{name}: {message}")]
    Document {
        /// Namespace of the ConfigMap holding the document
        namespace: String,
        /// Name of the ConfigMap holding the document
        name: String,
        /// Description of what's wrong with the document
        message: String,
    },

    /// Serialization/deserialization error
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of what failed
        message: String,
        /// What was being (de)serialized, if known
        kind: Option<String>,
    },

    /// Invalid operator configuration
    #[error("configuration error: {message}")]
    Configuration {
        /// Description of what's invalid
        message: String,
    },

    /// Internal/operational error
    #[error("internal error [{context}]: {message}")]
    Internal {
        /// Description of what failed
        message: String,
        /// Context where the error occurred (e.g., "scheduler", "source")
        context: String,
    },
}

impl Error {
    /// Create a document error for the given ConfigMap
    pub fn document(
        namespace: impl Into<String>,
        name: impl Into<String>,
        msg: impl Into<String>,
    ) -> Self {
        Self::Document {
            namespace: namespace.into(),
            name: name.into(),
            message: msg.into(),
        }
    }

    /// Create a serialization error with the given message
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
            kind: None,
        }
    }

    /// Create a serialization error naming what was being serialized
    pub fn serialization_for_kind(kind: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
            kind: Some(kind.into()),
        }
    }

    /// Create a configuration error
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration {
            message: msg.into(),
        }
    }

    /// Create an internal error with the given message
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal {
            message: msg.into(),
            context: UNKNOWN_CONTEXT.to_string(),
        }
    }

    /// Create an internal error with context
    pub fn internal_with_context(context: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Internal {
            message: msg.into(),
            context: context.into(),
        }
    }

    /// Whether the next reconciliation pass can be expected to succeed
    /// without an operator change
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Kube { .. } => true,
            Error::Document { .. } => true,
            Error::Internal { .. } => true,
            Error::Serialization { .. } => false,
            Error::Configuration { .. } => false,
        }
    }

    /// Get the context of the error, if any
    pub fn context(&self) -> Option<&str> {
        match self {
            Error::Internal { context, .. } => Some(context),
            Error::Serialization { kind, .. } => kind.as_deref(),
            _ => None,
        }
    }
}
