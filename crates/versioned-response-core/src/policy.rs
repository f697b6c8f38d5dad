//! Per-endpoint version policies
//!
//! A policy tells the resolver where a client may ask for a model version
//! and what to fall back to when it does not.
//!
//! # Example
//!
//! ```rust,ignore
//! use versioned_response_core::EndpointVersionPolicy;
//!
//! // ?v=1 wins over `Model-Version: 2`, and both fall back to "3"
//! let policy = EndpointVersionPolicy::new("3")?
//!     .query_param("v")
//!     .header("Model-Version")?;
//! ```

use crate::error::{Result, VersioningError};
use http::HeaderName;
use serde::Deserialize;

/// How one endpoint resolves the target version of its response body.
///
/// Immutable once built. The default version is always present and
/// non-empty; the query parameter and header sources are optional.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "PolicySettings")]
pub struct EndpointVersionPolicy {
    default_version: String,
    query_param_name: Option<String>,
    header_name: Option<HeaderName>,
}

impl EndpointVersionPolicy {
    /// Create a policy that always resolves to `default_version`
    pub fn new(default_version: impl Into<String>) -> Result<Self> {
        let default_version = default_version.into();
        if default_version.is_empty() {
            return Err(VersioningError::InvalidPolicy(
                "default version must not be empty".to_string(),
            ));
        }

        Ok(Self {
            default_version,
            query_param_name: None,
            header_name: None,
        })
    }

    /// Build a policy from compile-time settings.
    ///
    /// Empty `query_param_name` or `header_name` disable that source. This is
    /// what `#[versioned_body]` expands to; the macro validates its input, so
    /// the panics below are unreachable from generated code.
    ///
    /// # Panics
    ///
    /// When `default_version` is empty or `header_name` is not a valid header
    /// name.
    pub fn from_static(
        default_version: &'static str,
        query_param_name: &'static str,
        header_name: &'static str,
    ) -> Self {
        assert!(
            !default_version.is_empty(),
            "default version must not be empty"
        );

        let header_name = (!header_name.is_empty()).then(|| {
            HeaderName::from_bytes(header_name.as_bytes())
                .unwrap_or_else(|_| panic!("`{}` is not a valid header name", header_name))
        });

        Self {
            default_version: default_version.to_owned(),
            query_param_name: (!query_param_name.is_empty()).then(|| query_param_name.to_owned()),
            header_name,
        }
    }

    /// Read the version from this query parameter first.
    ///
    /// An empty name disables the query source.
    pub fn query_param(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.query_param_name = (!name.is_empty()).then_some(name);
        self
    }

    /// Read the version from this header when the query parameter is absent.
    ///
    /// An empty name disables the header source. Fails when the name is not
    /// a valid HTTP header name.
    pub fn header(mut self, name: impl AsRef<str>) -> Result<Self> {
        let name = name.as_ref();
        if name.is_empty() {
            self.header_name = None;
            return Ok(self);
        }

        let header = HeaderName::from_bytes(name.as_bytes()).map_err(|_| {
            VersioningError::InvalidPolicy(format!("`{}` is not a valid header name", name))
        })?;
        self.header_name = Some(header);
        Ok(self)
    }

    /// Fallback of last resort
    pub fn default_version(&self) -> &str {
        &self.default_version
    }

    /// Query parameter consulted first, if enabled
    pub fn query_param_name(&self) -> Option<&str> {
        self.query_param_name.as_deref()
    }

    /// Header consulted second, if enabled
    pub fn header_name(&self) -> Option<&HeaderName> {
        self.header_name.as_ref()
    }
}

/// Raw endpoint settings as they appear in configuration.
///
/// Field names follow the endpoint registration surface; the short aliases
/// match the `#[versioned_body]` attribute keys.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PolicySettings {
    #[serde(alias = "default")]
    pub default_version: String,
    #[serde(default, alias = "query_param")]
    pub query_param_name: String,
    #[serde(default, alias = "header")]
    pub header_name: String,
}

impl TryFrom<PolicySettings> for EndpointVersionPolicy {
    type Error = VersioningError;

    fn try_from(settings: PolicySettings) -> Result<Self> {
        EndpointVersionPolicy::new(settings.default_version)?
            .query_param(settings.query_param_name)
            .header(settings.header_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_only_policy() {
        let policy = EndpointVersionPolicy::new("3").unwrap();

        assert_eq!(policy.default_version(), "3");
        assert_eq!(policy.query_param_name(), None);
        assert!(policy.header_name().is_none());
    }

    #[test]
    fn test_empty_default_is_rejected() {
        let err = EndpointVersionPolicy::new("").unwrap_err();
        assert!(matches!(err, VersioningError::InvalidPolicy(_)));
    }

    #[test]
    fn test_empty_names_disable_sources() {
        let policy = EndpointVersionPolicy::new("2")
            .unwrap()
            .query_param("")
            .header("")
            .unwrap();

        assert_eq!(policy.query_param_name(), None);
        assert!(policy.header_name().is_none());
    }

    #[test]
    fn test_invalid_header_name_is_rejected() {
        let err = EndpointVersionPolicy::new("2")
            .unwrap()
            .header("Model Version")
            .unwrap_err();

        assert!(err.to_string().contains("Model Version"));
    }

    #[test]
    fn test_header_name_is_case_insensitive() {
        let policy = EndpointVersionPolicy::new("2")
            .unwrap()
            .header("Model-Version")
            .unwrap();

        assert_eq!(policy.header_name().unwrap().as_str(), "model-version");
    }

    #[test]
    fn test_from_static_matches_builder() {
        let built = EndpointVersionPolicy::new("2")
            .unwrap()
            .header("Model-Version")
            .unwrap();

        assert_eq!(
            EndpointVersionPolicy::from_static("2", "", "Model-Version"),
            built
        );
    }

    #[test]
    #[should_panic(expected = "default version must not be empty")]
    fn test_from_static_rejects_empty_default() {
        let _ = EndpointVersionPolicy::from_static("", "v", "");
    }

    #[test]
    fn test_deserialize_full_names() {
        let policy: EndpointVersionPolicy = serde_json::from_str(
            r#"{"default_version":"3","query_param_name":"v","header_name":"Model-Version"}"#,
        )
        .unwrap();

        assert_eq!(policy.default_version(), "3");
        assert_eq!(policy.query_param_name(), Some("v"));
        assert_eq!(policy.header_name().unwrap().as_str(), "model-version");
    }

    #[test]
    fn test_deserialize_short_aliases() {
        let policy: EndpointVersionPolicy =
            serde_json::from_str(r#"{"default":"1","query_param":"version"}"#).unwrap();

        assert_eq!(policy.default_version(), "1");
        assert_eq!(policy.query_param_name(), Some("version"));
        assert!(policy.header_name().is_none());
    }

    #[test]
    fn test_deserialize_rejects_empty_default() {
        let result = serde_json::from_str::<EndpointVersionPolicy>(r#"{"default_version":""}"#);
        assert!(result.is_err());
    }
}
