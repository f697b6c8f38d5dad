//! Turning tagged bodies and versioning errors into HTTP responses
//!
//! The structural downgrade of a payload to an older model version is the
//! serializer's job. This module only defines the seam, [`ModelSerializer`],
//! and a plain `serde_json` implementation of it.

use crate::config::Environment;
use crate::error::{ErrorResponse, Result, VersioningError};
use bytes::Bytes;
use http::{header, HeaderValue, StatusCode};
use http_body_util::Full;
use serde::Serialize;

/// HTTP Response type
pub type Response = http::Response<Full<Bytes>>;

/// Serializes a tagged model into a response body.
pub trait ModelSerializer: Send + Sync + 'static {
    /// Encode `value`; the model's version sink already holds the target version
    fn serialize<T: Serialize>(&self, value: &T) -> Result<Vec<u8>>;

    /// `Content-Type` of the produced body
    fn content_type(&self) -> &'static str {
        "application/json"
    }
}

/// `serde_json` serializer
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer {
    pretty: bool,
}

impl JsonSerializer {
    /// Compact output
    pub fn new() -> Self {
        Self::default()
    }

    /// Pretty-printed output
    pub fn pretty() -> Self {
        Self { pretty: true }
    }
}

impl ModelSerializer for JsonSerializer {
    fn serialize<T: Serialize>(&self, value: &T) -> Result<Vec<u8>> {
        let bytes = if self.pretty {
            serde_json::to_vec_pretty(value)?
        } else {
            serde_json::to_vec(value)?
        };
        Ok(bytes)
    }
}

/// Build a response with the given status, content type and body
pub(crate) fn body_response(status: StatusCode, content_type: &'static str, body: Vec<u8>) -> Response {
    let mut response = http::Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}

impl VersioningError {
    /// Convert into a JSON error response.
    ///
    /// Details are included only when `environment` allows it.
    pub fn into_response(self, environment: &Environment) -> Response {
        let status = self.status();
        let error_response = ErrorResponse::new(&self, environment.show_error_details());
        let body = serde_json::to_vec(&error_response).unwrap_or_else(|_| {
            br#"{"error":{"type":"internal_error","message":"Failed to serialize error"}}"#.to_vec()
        });

        body_response(status, "application/json", body)
    }
}
