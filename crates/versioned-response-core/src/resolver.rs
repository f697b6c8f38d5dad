//! Target version resolution
//!
//! Precedence, first match wins:
//!
//! 1. the policy's query parameter, if configured and present in the request
//! 2. the policy's header, if configured and present in the request
//! 3. the policy's default version
//!
//! Only the first value of a repeated parameter or header is considered, even
//! when it is empty. A header value that is not visible ASCII counts as
//! absent. Resolution never fails and never validates the version string.

use crate::policy::EndpointVersionPolicy;
use crate::request::VersionInputs;
use std::fmt;
use tracing::trace;

/// Where a resolved version came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VersionSource {
    /// The policy's query parameter
    Query,
    /// The policy's header
    Header,
    /// The policy's default version
    Default,
}

impl fmt::Display for VersionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionSource::Query => f.write_str("query"),
            VersionSource::Header => f.write_str("header"),
            VersionSource::Default => f.write_str("default"),
        }
    }
}

/// Outcome of one resolution; the version itself is an opaque string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedVersion {
    value: String,
    source: VersionSource,
}

impl ResolvedVersion {
    /// The target version
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Which input supplied it
    pub fn source(&self) -> VersionSource {
        self.source
    }

    /// Take the version string
    pub fn into_string(self) -> String {
        self.value
    }
}

impl AsRef<str> for ResolvedVersion {
    fn as_ref(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for ResolvedVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl PartialEq<str> for ResolvedVersion {
    fn eq(&self, other: &str) -> bool {
        self.value == other
    }
}

impl PartialEq<&str> for ResolvedVersion {
    fn eq(&self, other: &&str) -> bool {
        self.value == *other
    }
}

/// Resolve the target version for one response.
pub fn resolve(policy: &EndpointVersionPolicy, inputs: VersionInputs<'_>) -> ResolvedVersion {
    let resolved = from_query(policy, &inputs)
        .or_else(|| from_header(policy, &inputs))
        .unwrap_or_else(|| ResolvedVersion {
            value: policy.default_version().to_owned(),
            source: VersionSource::Default,
        });

    trace!(
        version = resolved.as_str(),
        source = %resolved.source(),
        "resolved target model version"
    );
    resolved
}

fn from_query(policy: &EndpointVersionPolicy, inputs: &VersionInputs<'_>) -> Option<ResolvedVersion> {
    let name = policy.query_param_name()?;
    let value = inputs.query.first(name)?;

    Some(ResolvedVersion {
        value: value.to_owned(),
        source: VersionSource::Query,
    })
}

fn from_header(
    policy: &EndpointVersionPolicy,
    inputs: &VersionInputs<'_>,
) -> Option<ResolvedVersion> {
    let name = policy.header_name()?;
    let value = inputs
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())?;

    Some(ResolvedVersion {
        value: value.to_owned(),
        source: VersionSource::Header,
    })
}

impl EndpointVersionPolicy {
    /// Resolve the target version of a response under this policy
    pub fn resolve(&self, inputs: VersionInputs<'_>) -> ResolvedVersion {
        resolve(self, inputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::QueryParams;
    use http::{HeaderMap, HeaderValue};
    use proptest::prelude::*;

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(*name, HeaderValue::from_str(value).unwrap());
        }
        map
    }

    fn query_policy() -> EndpointVersionPolicy {
        EndpointVersionPolicy::new("3").unwrap().query_param("v")
    }

    fn header_policy() -> EndpointVersionPolicy {
        EndpointVersionPolicy::new("2")
            .unwrap()
            .header("Model-Version")
            .unwrap()
    }

    fn both_policy() -> EndpointVersionPolicy {
        EndpointVersionPolicy::new("3")
            .unwrap()
            .query_param("v")
            .header("Model-Version")
            .unwrap()
    }

    #[test]
    fn test_query_param_absent_uses_default() {
        let query = QueryParams::parse("other=1");
        let headers = HeaderMap::new();

        let resolved = resolve(&query_policy(), VersionInputs::new(&query, &headers));
        assert_eq!(resolved, "3");
        assert_eq!(resolved.source(), VersionSource::Default);
    }

    #[test]
    fn test_query_param_present() {
        let query = QueryParams::parse("v=1");
        let headers = HeaderMap::new();

        let resolved = resolve(&query_policy(), VersionInputs::new(&query, &headers));
        assert_eq!(resolved, "1");
        assert_eq!(resolved.source(), VersionSource::Query);
    }

    #[test]
    fn test_header_present_and_absent() {
        let query = QueryParams::default();
        let with_header = headers(&[("model-version", "1")]);
        let without_header = HeaderMap::new();

        let policy = header_policy();
        assert_eq!(resolve(&policy, VersionInputs::new(&query, &with_header)), "1");
        assert_eq!(resolve(&policy, VersionInputs::new(&query, &without_header)), "2");
    }

    #[test]
    fn test_query_wins_over_header() {
        let query = QueryParams::parse("v=1");
        let headers = headers(&[("model-version", "2")]);

        let resolved = resolve(&both_policy(), VersionInputs::new(&query, &headers));
        assert_eq!(resolved, "1");
        assert_eq!(resolved.source(), VersionSource::Query);
    }

    #[test]
    fn test_first_value_wins() {
        let query = QueryParams::parse("v=4&v=5");
        let headers = headers(&[("model-version", "6"), ("model-version", "7")]);

        assert_eq!(resolve(&both_policy(), VersionInputs::new(&query, &headers)), "4");

        let empty = QueryParams::default();
        assert_eq!(resolve(&both_policy(), VersionInputs::new(&empty, &headers)), "6");
    }

    #[test]
    fn test_empty_query_value_wins_over_header() {
        let query = QueryParams::parse("v=");
        let headers = headers(&[("model-version", "2")]);

        let resolved = resolve(&both_policy(), VersionInputs::new(&query, &headers));
        assert_eq!(resolved, "");
        assert_eq!(resolved.source(), VersionSource::Query);
    }

    #[test]
    fn test_bare_query_key_falls_through_to_header() {
        let query = QueryParams::parse("v");
        let headers = headers(&[("model-version", "2")]);

        let resolved = resolve(&both_policy(), VersionInputs::new(&query, &headers));
        assert_eq!(resolved, "2");
        assert_eq!(resolved.source(), VersionSource::Header);
    }

    #[test]
    fn test_empty_header_value_wins_over_default() {
        let query = QueryParams::default();
        let headers = headers(&[("model-version", "")]);

        let resolved = resolve(&header_policy(), VersionInputs::new(&query, &headers));
        assert_eq!(resolved, "");
        assert_eq!(resolved.source(), VersionSource::Header);
    }

    #[test]
    fn test_opaque_header_value_falls_through_to_default() {
        let query = QueryParams::default();
        let mut map = HeaderMap::new();
        map.insert("model-version", HeaderValue::from_bytes(b"\xfa\xfb").unwrap());

        let resolved = resolve(&header_policy(), VersionInputs::new(&query, &map));
        assert_eq!(resolved, "2");
        assert_eq!(resolved.source(), VersionSource::Default);
    }

    #[test]
    fn test_versions_are_not_validated() {
        let query = QueryParams::parse("v=not-a-version");
        let headers = HeaderMap::new();

        let resolved = query_policy().resolve(VersionInputs::new(&query, &headers));
        assert_eq!(resolved.into_string(), "not-a-version");
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_disabled_sources_always_yield_default(
            default in "[0-9a-z.]{1,8}",
            value in "[0-9a-z.]{1,8}",
            name in "[a-z]{1,8}",
        ) {
            let policy = EndpointVersionPolicy::new(default.clone()).unwrap();
            let query: QueryParams = vec![(name.clone(), value.clone())].into_iter().collect();
            let mut headers = HeaderMap::new();
            headers.insert(
                http::HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_str(&value).unwrap(),
            );

            let resolved = resolve(&policy, VersionInputs::new(&query, &headers));
            prop_assert_eq!(resolved.as_str(), default.as_str());
            prop_assert_eq!(resolved.source(), VersionSource::Default);
        }

        #[test]
        fn prop_query_takes_precedence_over_header(
            query_value in "[0-9a-z.]{1,8}",
            header_value in "[0-9a-z.]{1,8}",
        ) {
            let query: QueryParams = vec![("v", query_value.clone())].into_iter().collect();
            let headers = headers(&[("model-version", header_value.as_str())]);

            let resolved = resolve(&both_policy(), VersionInputs::new(&query, &headers));
            prop_assert_eq!(resolved.as_str(), query_value.as_str());
        }

        #[test]
        fn prop_header_used_when_query_absent(
            header_value in "[0-9a-z.]{1,8}",
            configure_query in any::<bool>(),
        ) {
            let policy = if configure_query { both_policy() } else { header_policy() };
            let query = QueryParams::default();
            let headers = headers(&[("model-version", header_value.as_str())]);

            let resolved = resolve(&policy, VersionInputs::new(&query, &headers));
            prop_assert_eq!(resolved.as_str(), header_value.as_str());
            prop_assert_eq!(resolved.source(), VersionSource::Header);
        }

        #[test]
        fn prop_neither_present_yields_default(
            noise in "[a-u]{1,8}",
        ) {
            let query: QueryParams = vec![(noise.clone(), "9")].into_iter().collect();
            let headers = headers(&[("x-noise", "9")]);

            let resolved = resolve(&both_policy(), VersionInputs::new(&query, &headers));
            prop_assert_eq!(resolved.as_str(), "3");
        }
    }
}
