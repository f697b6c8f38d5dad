//! Error types for versioned response bodies

use crate::config::ConfigError;
use http::{Method, StatusCode};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Result type alias for versioning operations
pub type Result<T, E = VersioningError> = std::result::Result<T, E>;

/// Rejection reported by a version sink that refused the value written to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkWriteError {
    message: String,
}

impl SinkWriteError {
    /// Create a new rejection with a human-readable reason
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The reason given by the sink
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for SinkWriteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for SinkWriteError {}

/// A model type marks more than one member as its version sink.
///
/// This is a programming mistake in the model definition. It is cached by
/// the [`SinkLocator`](crate::SinkLocator) and raised again on every lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmbiguousSink {
    /// Fully qualified name of the offending type
    pub type_name: &'static str,
    /// Every member that carries the version sink marker
    pub members: Vec<String>,
}

impl fmt::Display for AmbiguousSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "type `{}` declares {} version sinks ({}), at most one is allowed",
            self.type_name,
            self.members.len(),
            self.members.join(", ")
        )
    }
}

impl std::error::Error for AmbiguousSink {}

/// Errors surfaced while versioning a response body.
///
/// Every variant is a server-side problem; none of them is caused by what the
/// client sent. Missing or malformed version inputs never produce an error,
/// they fall back to the endpoint's default version instead.
#[derive(Debug, Error)]
pub enum VersioningError {
    /// More than one version sink on a model type
    #[error(transparent)]
    AmbiguousSink(#[from] AmbiguousSink),

    /// The version sink rejected the resolved version
    #[error("unable to set the version of `{type_name}` through `{member}`: {source}")]
    SinkWrite {
        type_name: &'static str,
        member: String,
        #[source]
        source: SinkWriteError,
    },

    /// An endpoint policy was built from unusable settings
    #[error("invalid endpoint version policy: {0}")]
    InvalidPolicy(String),

    /// The same endpoint was registered twice
    #[error("endpoint {method} {path} already has a version policy")]
    DuplicateEndpoint { method: Method, path: String },

    /// Loading a policy from the environment failed
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The model serializer failed after tagging
    #[error("failed to serialize response body: {0}")]
    Serialize(String),
}

impl VersioningError {
    /// HTTP status used when this error reaches the HTTP boundary
    pub fn status(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    /// Stable machine-readable identifier for the error body
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::AmbiguousSink(_) => "ambiguous_version_sink",
            Self::SinkWrite { .. } => "version_sink_write_failed",
            Self::InvalidPolicy(_) => "invalid_version_policy",
            Self::DuplicateEndpoint { .. } => "duplicate_versioned_endpoint",
            Self::Config(_) => "versioning_config_error",
            Self::Serialize(_) => "serialization_error",
        }
    }
}

impl From<serde_json::Error> for VersioningError {
    fn from(err: serde_json::Error) -> Self {
        VersioningError::Serialize(err.to_string())
    }
}

/// JSON representation of a versioning failure
#[derive(Debug, Serialize)]
pub(crate) struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub(crate) struct ErrorBody {
    #[serde(rename = "type")]
    pub error_type: &'static str,
    pub message: String,
}

impl ErrorResponse {
    /// Build the body, masking internal details when `show_details` is false
    pub(crate) fn new(err: &VersioningError, show_details: bool) -> Self {
        let message = if show_details {
            err.to_string()
        } else {
            "An internal error occurred".to_string()
        };

        Self {
            error: ErrorBody {
                error_type: err.error_type(),
                message,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ambiguous_sink_names_type_and_members() {
        let err = VersioningError::from(AmbiguousSink {
            type_name: "app::Order",
            members: vec!["model_version".to_string(), "set_version".to_string()],
        });

        let message = err.to_string();
        assert!(message.contains("app::Order"));
        assert!(message.contains("model_version, set_version"));
        assert_eq!(err.error_type(), "ambiguous_version_sink");
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_sink_write_keeps_source() {
        let err = VersioningError::SinkWrite {
            type_name: "app::Order",
            member: "model_version".to_string(),
            source: SinkWriteError::new("not a number"),
        };

        let source = std::error::Error::source(&err).map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("not a number"));
        assert!(err.to_string().contains("unable to set the version"));
    }

    #[test]
    fn test_error_response_masks_details() {
        let err = VersioningError::InvalidPolicy("default version is empty".to_string());

        let masked = ErrorResponse::new(&err, false);
        assert_eq!(masked.error.message, "An internal error occurred");
        assert_eq!(masked.error.error_type, "invalid_version_policy");

        let verbose = ErrorResponse::new(&err, true);
        assert!(verbose.error.message.contains("default version is empty"));
    }
}
