//! Request-side inputs to version resolution

use http::request::Parts;
use http::{HeaderMap, Uri};

/// Decoded query parameters, in the order they appeared.
///
/// Repeated names keep every value; lookups return the first one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    /// Parse an `application/x-www-form-urlencoded` query string.
    ///
    /// A query that cannot be decoded yields no parameters rather than an
    /// error; the resolver then falls back to its other sources. A bare key
    /// without `=` carries no value and is skipped, while `key=` carries the
    /// empty string.
    pub fn parse(query: &str) -> Self {
        let valued = query
            .split('&')
            .filter(|segment| segment.contains('='))
            .collect::<Vec<_>>()
            .join("&");
        let pairs = serde_urlencoded::from_str::<Vec<(String, String)>>(&valued).unwrap_or_default();
        Self { pairs }
    }

    /// Parameters of a request URI
    pub fn from_uri(uri: &Uri) -> Self {
        uri.query().map(Self::parse).unwrap_or_default()
    }

    /// First value for `name`
    pub fn first(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Every value for `name`, in request order
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.pairs
            .iter()
            .filter(move |(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Number of decoded pairs
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Whether the query carried no parameters
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for QueryParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            pairs: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// Everything the resolver reads from one request
#[derive(Debug, Clone, Copy)]
pub struct VersionInputs<'a> {
    pub query: &'a QueryParams,
    pub headers: &'a HeaderMap,
}

impl<'a> VersionInputs<'a> {
    /// Bundle already-decoded parameters and headers
    pub fn new(query: &'a QueryParams, headers: &'a HeaderMap) -> Self {
        Self { query, headers }
    }
}

/// Owned version inputs extracted from request parts
#[derive(Debug, Clone, Default)]
pub struct RequestVersionInputs {
    query: QueryParams,
    headers: HeaderMap,
}

impl RequestVersionInputs {
    /// Capture the query and headers of a request head
    pub fn from_parts(parts: &Parts) -> Self {
        Self {
            query: QueryParams::from_uri(&parts.uri),
            headers: parts.headers.clone(),
        }
    }

    /// Capture the query and headers of a full request
    pub fn from_request<B>(request: &http::Request<B>) -> Self {
        Self {
            query: QueryParams::from_uri(request.uri()),
            headers: request.headers().clone(),
        }
    }

    /// Borrow as resolver inputs
    pub fn as_inputs(&self) -> VersionInputs<'_> {
        VersionInputs::new(&self.query, &self.headers)
    }

    /// Decoded query parameters
    pub fn query(&self) -> &QueryParams {
        &self.query
    }

    /// Request headers
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_keeps_order_and_duplicates() {
        let params = QueryParams::parse("v=1&other=x&v=2");

        assert_eq!(params.len(), 3);
        assert_eq!(params.first("v"), Some("1"));
        assert_eq!(params.get_all("v").collect::<Vec<_>>(), vec!["1", "2"]);
        assert_eq!(params.first("missing"), None);
    }

    #[test]
    fn test_empty_value_is_kept_and_bare_key_skipped() {
        let params = QueryParams::parse("v=&flag&w=2");

        assert_eq!(params.first("v"), Some(""));
        assert_eq!(params.first("flag"), None);
        assert_eq!(params.first("w"), Some("2"));
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_first_outlives_the_name() {
        let params = QueryParams::parse("version=7");
        let value = {
            let name = String::from("version");
            params.first(&name)
        };

        assert_eq!(value, Some("7"));
    }

    #[test]
    fn test_parse_decodes_percent_encoding() {
        let params = QueryParams::parse("version=1%2E2&name=a+b");

        assert_eq!(params.first("version"), Some("1.2"));
        assert_eq!(params.first("name"), Some("a b"));
    }

    #[test]
    fn test_from_uri_without_query() {
        let uri: Uri = "/orders/7".parse().unwrap();
        assert!(QueryParams::from_uri(&uri).is_empty());
    }

    #[test]
    fn test_from_request_captures_query_and_headers() {
        let request = http::Request::builder()
            .uri("/orders?v=1")
            .header("Model-Version", "2")
            .body(())
            .unwrap();

        let inputs = RequestVersionInputs::from_request(&request);
        assert_eq!(inputs.query().first("v"), Some("1"));
        assert_eq!(inputs.headers().get("model-version").unwrap(), "2");
    }

    #[test]
    fn test_from_parts_matches_from_request() {
        let request = http::Request::builder()
            .uri("/orders?v=4")
            .body(())
            .unwrap();
        let (parts, _) = request.into_parts();

        let inputs = RequestVersionInputs::from_parts(&parts);
        assert_eq!(inputs.as_inputs().query.first("v"), Some("4"));
    }

    #[test]
    fn test_collect_from_pairs() {
        let params: QueryParams = vec![("v", "9")].into_iter().collect();
        assert_eq!(params.first("v"), Some("9"));
    }
}
