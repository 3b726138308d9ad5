//! Owned representation of an incoming HTTP request.
//!
//! The wire request is parsed once into [`ParsedRequest`]; everything
//! downstream (matcher, binder, handlers) works on the owned form, which is
//! also what the test helpers construct directly.

use std::collections::HashMap;
use std::io::Read;

use may_minihttp::Request;

/// Parsed request data carried by the request context.
#[derive(Debug, Default)]
pub struct ParsedRequest {
    /// Uppercase HTTP method name.
    pub method: String,
    /// Path component, query stripped.
    pub path: String,
    /// Decoded query pairs in order of appearance.
    pub query: Vec<(String, String)>,
    /// Headers with lowercased names; last value wins on duplicates.
    pub headers: HashMap<String, String>,
    /// Raw body bytes.
    pub body: Vec<u8>,
}

impl ParsedRequest {
    /// Build a request by hand, mostly for tests and benchmarks.
    /// `target` may carry a query string.
    pub fn new(method: &str, target: &str) -> Self {
        let (path, query) = split_target(target);
        ParsedRequest {
            method: method.to_ascii_uppercase(),
            path,
            query,
            headers: HashMap::new(),
            body: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers
            .insert(name.to_ascii_lowercase(), value.to_string());
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Attach a JSON body with the matching content type.
    pub fn with_json<T: serde::Serialize>(self, data: &T) -> Self {
        let body = serde_json::to_vec(data).expect("serializable test body");
        self.with_header("content-type", "application/json")
            .with_body(body)
    }

    /// Attach an urlencoded form body.
    pub fn with_form(self, pairs: &[(&str, &str)]) -> Self {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs)
            .finish();
        self.with_header("content-type", "application/x-www-form-urlencoded")
            .with_body(body.into_bytes())
    }

    /// Header lookup, case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        if name.chars().all(|c| !c.is_ascii_uppercase()) {
            return self.headers.get(name).map(String::as_str);
        }
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// First query value under `key`.
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

fn split_target(target: &str) -> (String, Vec<(String, String)>) {
    match target.split_once('?') {
        Some((path, query)) => (
            path.to_string(),
            url::form_urlencoded::parse(query.as_bytes())
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect(),
        ),
        None => (target.to_string(), Vec::new()),
    }
}

/// Extract everything the framework needs from a wire request.
pub fn parse_request(req: Request) -> ParsedRequest {
    let method = req.method().to_ascii_uppercase();
    let raw_path = req.path().to_string();
    let (path, query) = split_target(&raw_path);

    let headers: HashMap<String, String> = req
        .headers()
        .iter()
        .map(|h| {
            (
                h.name.to_ascii_lowercase(),
                String::from_utf8_lossy(h.value).to_string(),
            )
        })
        .collect();

    let mut body = Vec::new();
    let _ = req.body().read_to_end(&mut body);

    ParsedRequest {
        method,
        path,
        query,
        headers,
        body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_target() {
        let req = ParsedRequest::new("get", "/p?x=1&y=two&x=3");
        assert_eq!(req.method, "GET");
        assert_eq!(req.path, "/p");
        assert_eq!(req.query_value("x"), Some("1"));
        assert_eq!(req.query_value("y"), Some("two"));
    }

    #[test]
    fn test_header_case_insensitive() {
        let req = ParsedRequest::new("GET", "/").with_header("X-Auth-Token", "secret");
        assert_eq!(req.header("x-auth-token"), Some("secret"));
        assert_eq!(req.header("X-Auth-Token"), Some("secret"));
    }

    #[test]
    fn test_form_builder_sets_content_type() {
        let req = ParsedRequest::new("POST", "/").with_form(&[("a", "1")]);
        assert_eq!(
            req.header("content-type"),
            Some("application/x-www-form-urlencoded")
        );
        assert_eq!(req.body, b"a=1");
    }
}
