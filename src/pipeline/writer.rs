//! Response accumulation.
//!
//! Handlers write into [`ResponseParts`]; the server layer copies the parts
//! onto the wire once the chain finishes. Keeping the response owned by the
//! context lets pooled contexts reset it without reallocating.

use serde::Serialize;
use serde_json::Value;

use crate::error::{Error, Result};

/// Status, headers and body accumulated while a chain runs.
#[derive(Debug)]
pub struct ResponseParts {
    status: u16,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl Default for ResponseParts {
    fn default() -> Self {
        ResponseParts {
            status: 200,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }
}

impl ResponseParts {
    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn set_status(&mut self, status: u16) {
        self.status = status;
    }

    /// Set a header, replacing any previous value of the same name.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(&name));
        self.headers.push((name, value.into()));
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn write_str(&mut self, s: &str) {
        self.body.extend_from_slice(s.as_bytes());
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.body.extend_from_slice(bytes);
    }

    /// Set the status and write a plain-text body in one step.
    pub fn text(&mut self, status: u16, body: &str) {
        self.status = status;
        if self.header("Content-Type").is_none() {
            self.set_header("Content-Type", "text/plain");
        }
        self.write_str(body);
    }

    /// Serialize `data` as a JSON body with the matching content type.
    pub fn json<T: Serialize + ?Sized>(&mut self, data: &T) -> Result<()> {
        let bytes = serde_json::to_vec(data).map_err(|e| Error::internal().wrap(e))?;
        self.set_header("Content-Type", "application/json");
        self.body.extend_from_slice(&bytes);
        Ok(())
    }

    /// Render an already-decoded JSON value the way handlers expect raw
    /// results to appear: strings verbatim, scalars in display form, `null`
    /// as nothing, and everything else as a JSON document.
    pub fn write_json_value(&mut self, value: Value) -> Result<()> {
        match value {
            Value::Null => Ok(()),
            Value::String(s) => {
                self.write_str(&s);
                Ok(())
            }
            Value::Number(n) => {
                self.write_str(&n.to_string());
                Ok(())
            }
            Value::Bool(b) => {
                self.write_str(if b { "true" } else { "false" });
                Ok(())
            }
            other => self.json(&other),
        }
    }

    /// Set the status and write an HTML body.
    pub fn html(&mut self, status: u16, body: &str) {
        self.status = status;
        self.set_header("Content-Type", "text/html; charset=utf-8");
        self.write_str(body);
    }

    /// Consume the parts, yielding the body buffer.
    pub fn into_body(self) -> Vec<u8> {
        self.body
    }

    pub(crate) fn reset(&mut self) {
        self.status = 200;
        self.headers.clear();
        self.body.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_sets_status_and_content_type() {
        let mut parts = ResponseParts::default();
        parts.text(201, "created");
        assert_eq!(parts.status(), 201);
        assert_eq!(parts.header("Content-Type"), Some("text/plain"));
        assert_eq!(parts.body(), b"created");
    }

    #[test]
    fn test_json_value_rendering() {
        let mut parts = ResponseParts::default();
        parts.write_json_value(Value::String("raw".into())).unwrap();
        assert_eq!(parts.body(), b"raw");
        assert_eq!(parts.header("Content-Type"), None);

        let mut parts = ResponseParts::default();
        parts
            .write_json_value(serde_json::json!({"k": 1}))
            .unwrap();
        assert_eq!(parts.header("Content-Type"), Some("application/json"));
        assert_eq!(parts.body(), br#"{"k":1}"#);
    }

    #[test]
    fn test_set_header_replaces() {
        let mut parts = ResponseParts::default();
        parts.set_header("X-Tag", "a");
        parts.set_header("x-tag", "b");
        assert_eq!(parts.headers().len(), 1);
        assert_eq!(parts.header("X-Tag"), Some("b"));
    }
}
