//! Response body advice for version-aware endpoints
//!
//! The request-handling layer calls [`VersionedBodyAdvice`] right before it
//! writes a response body. Endpoints registered with a policy get their body
//! tagged with the resolved target version; every other endpoint passes
//! through untouched.
//!
//! # Example
//!
//! ```rust,ignore
//! use versioned_response_core::{EndpointKey, EndpointVersionPolicy, VersionedBodyAdvice, VersionedEndpoints};
//! use http::Method;
//!
//! let mut endpoints = VersionedEndpoints::new();
//! endpoints.register(
//!     Method::GET,
//!     "/orders/{id}",
//!     EndpointVersionPolicy::new("3")?.query_param("v"),
//! )?;
//!
//! let advice = VersionedBodyAdvice::new(endpoints);
//!
//! // inside a handler, after the router matched `/orders/{id}`
//! let key = EndpointKey::new(Method::GET, "/orders/{id}");
//! let response = advice.write_body(order, &key, &parts);
//! ```

use crate::config::Environment;
use crate::error::{Result, VersioningError};
use crate::locator::SinkLocator;
use crate::policy::EndpointVersionPolicy;
use crate::response::{body_response, JsonSerializer, ModelSerializer, Response};
use crate::sink::VersionedModel;
use crate::tagger::ResponseTagger;
use http::request::Parts;
use http::{Method, StatusCode};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Identity of an endpoint: HTTP method plus route path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EndpointKey {
    method: Method,
    path: String,
}

impl EndpointKey {
    /// Key for `method` on `path`.
    ///
    /// `path` is whatever the router uses to identify the route, usually the
    /// route template (`/orders/{id}`).
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
        }
    }

    /// Key built from the literal method and path of a request
    pub fn from_parts(parts: &Parts) -> Self {
        Self::new(parts.method.clone(), parts.uri.path())
    }

    /// HTTP method
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Route path
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl fmt::Display for EndpointKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

/// Registry of version-aware endpoints and their policies.
///
/// Filled at startup, read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct VersionedEndpoints {
    policies: HashMap<EndpointKey, Arc<EndpointVersionPolicy>>,
}

impl VersionedEndpoints {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `policy` to `method` + `path`.
    ///
    /// Fails when the endpoint already has a policy.
    pub fn register(
        &mut self,
        method: Method,
        path: impl Into<String>,
        policy: EndpointVersionPolicy,
    ) -> Result<()> {
        let key = EndpointKey::new(method, path);
        if self.policies.contains_key(&key) {
            return Err(VersioningError::DuplicateEndpoint {
                method: key.method,
                path: key.path,
            });
        }

        debug!(
            endpoint = %key,
            default_version = policy.default_version(),
            query_param = policy.query_param_name().unwrap_or(""),
            header = policy.header_name().map(|h| h.as_str()).unwrap_or(""),
            "registered versioned endpoint"
        );
        self.policies.insert(key, Arc::new(policy));
        Ok(())
    }

    /// Builder form of [`register`](Self::register)
    pub fn with(
        mut self,
        method: Method,
        path: impl Into<String>,
        policy: EndpointVersionPolicy,
    ) -> Result<Self> {
        self.register(method, path, policy)?;
        Ok(self)
    }

    /// Policy of an endpoint, if it is version-aware
    pub fn policy(&self, key: &EndpointKey) -> Option<&Arc<EndpointVersionPolicy>> {
        self.policies.get(key)
    }

    /// Number of version-aware endpoints
    pub fn len(&self) -> usize {
        self.policies.len()
    }

    /// Whether no endpoint is version-aware
    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}

/// Hook invoked before a response body is written.
#[derive(Debug, Clone)]
pub struct VersionedBodyAdvice<S = JsonSerializer> {
    endpoints: Arc<VersionedEndpoints>,
    tagger: ResponseTagger,
    serializer: S,
    environment: Environment,
}

impl VersionedBodyAdvice<JsonSerializer> {
    /// Advice over `endpoints` with a fresh sink cache and the JSON serializer
    pub fn new(endpoints: VersionedEndpoints) -> Self {
        Self {
            endpoints: Arc::new(endpoints),
            tagger: ResponseTagger::default(),
            serializer: JsonSerializer::default(),
            environment: Environment::current(),
        }
    }
}

impl<S: ModelSerializer> VersionedBodyAdvice<S> {
    /// Share an existing sink cache
    pub fn with_locator(mut self, locator: Arc<SinkLocator>) -> Self {
        self.tagger = ResponseTagger::new(locator);
        self
    }

    /// Replace the body serializer
    pub fn with_serializer<S2: ModelSerializer>(self, serializer: S2) -> VersionedBodyAdvice<S2> {
        VersionedBodyAdvice {
            endpoints: self.endpoints,
            tagger: self.tagger,
            serializer,
            environment: self.environment,
        }
    }

    /// Override the environment used for error masking
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// Registered endpoints
    pub fn endpoints(&self) -> &VersionedEndpoints {
        &self.endpoints
    }

    /// The tagger, and through it the sink cache
    pub fn tagger(&self) -> &ResponseTagger {
        &self.tagger
    }

    /// Whether bodies of `endpoint` are version-tagged
    pub fn supports(&self, endpoint: &EndpointKey) -> bool {
        self.endpoints.policy(endpoint).is_some()
    }

    /// Tag `body` if `endpoint` is version-aware; return it either way.
    pub fn before_body_write<T: VersionedModel>(
        &self,
        body: T,
        endpoint: &EndpointKey,
        parts: &Parts,
    ) -> Result<T> {
        match self.endpoints.policy(endpoint) {
            Some(policy) => self.tagger.tag_request(body, policy, parts),
            None => Ok(body),
        }
    }

    /// Tag and serialize `body` into a `200` response.
    ///
    /// Any versioning or serialization failure becomes a `500` error
    /// response.
    pub fn write_body<T>(&self, body: T, endpoint: &EndpointKey, parts: &Parts) -> Response
    where
        T: VersionedModel + Serialize,
    {
        self.try_write_body(body, endpoint, parts)
            .unwrap_or_else(|err| err.into_response(&self.environment))
    }

    /// Like [`write_body`](Self::write_body) but hands the error back
    pub fn try_write_body<T>(&self, body: T, endpoint: &EndpointKey, parts: &Parts) -> Result<Response>
    where
        T: VersionedModel + Serialize,
    {
        let body = self.before_body_write(body, endpoint, parts)?;
        let bytes = self.serializer.serialize(&body)?;
        Ok(body_response(StatusCode::OK, self.serializer.content_type(), bytes))
    }
}
