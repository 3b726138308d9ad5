//! Typed error values carried through handler chains.
//!
//! Every error holds a numeric code and a message. The code's first three
//! digits are the HTTP status class, so an "after" middleware can render a
//! uniform wire response without inspecting error internals. The framework
//! core never serializes errors itself; see [`crate::middleware::render_error`]
//! for the stock renderer.

use std::error::Error as StdError;
use std::fmt;

/// Result alias used across the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// An error with a numeric code, a human message, and an optional cause.
#[derive(Debug)]
pub struct Error {
    code: u32,
    message: String,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl Error {
    /// Create an error with an explicit code and message.
    pub fn new(code: u32, message: impl Into<String>) -> Self {
        Error {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Numeric error code, e.g. `40002`.
    pub fn code(&self) -> u32 {
        self.code
    }

    /// Error message, including any appended detail.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// HTTP status derived from the code's leading three digits.
    /// Codes outside the 100..=599 range map to 500.
    pub fn http_status(&self) -> u16 {
        let status = self.code / 100;
        if (100..=599).contains(&status) {
            status as u16
        } else {
            500
        }
    }

    /// Replace the code, keeping message and cause.
    pub fn with_code(mut self, code: u32) -> Self {
        self.code = code;
        self
    }

    /// Replace the message, keeping the code.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Append detail to the message: `"missing arg" -> "missing arg: page"`.
    pub fn with_detail(mut self, detail: impl fmt::Display) -> Self {
        self.message = format!("{}: {}", self.message, detail);
        self
    }

    /// Attach a cause. The cause's message is appended and the value is
    /// retained for [`StdError::source`].
    pub fn wrap(mut self, cause: impl StdError + Send + Sync + 'static) -> Self {
        self.message = format!("{}: {}", self.message, cause);
        self.source = Some(Box::new(cause));
        self
    }

    // 400xx argument errors
    pub fn bad_request() -> Self {
        Error::new(40000, "bad request")
    }
    pub fn invalid_arg() -> Self {
        Error::new(40001, "invalid arg")
    }
    pub fn missing_arg() -> Self {
        Error::new(40002, "missing arg")
    }
    pub fn arg_format() -> Self {
        Error::new(40003, "arg format error")
    }

    // 401xx / 403xx authentication and authorization
    pub fn unauthorized() -> Self {
        Error::new(40100, "unauthorized")
    }
    pub fn token_invalid() -> Self {
        Error::new(40101, "token invalid")
    }
    pub fn token_expired() -> Self {
        Error::new(40102, "token expired")
    }
    pub fn no_permission() -> Self {
        Error::new(40103, "no permission")
    }
    pub fn forbidden() -> Self {
        Error::new(40300, "forbidden")
    }

    // 404xx missing resources
    pub fn not_found() -> Self {
        Error::new(40400, "not found")
    }
    pub fn resource_not_found() -> Self {
        Error::new(40401, "resource not found")
    }
    pub fn endpoint_not_found() -> Self {
        Error::new(40402, "endpoint not found")
    }

    // 409xx conflicts
    pub fn conflict() -> Self {
        Error::new(40900, "resource conflict")
    }
    pub fn already_exists() -> Self {
        Error::new(40901, "resource already exists")
    }

    // 429xx rate limiting
    pub fn too_many_requests() -> Self {
        Error::new(42900, "too many requests")
    }

    // 500xx server-side failures
    pub fn internal() -> Self {
        Error::new(50000, "internal server error")
    }
    pub fn database() -> Self {
        Error::new(50001, "database error")
    }
    pub fn cache() -> Self {
        Error::new(50002, "cache error")
    }
    pub fn third_party() -> Self {
        Error::new(50003, "third party service error")
    }

    // 501xx capability
    pub fn not_implemented() -> Self {
        Error::new(50100, "not implemented")
    }
    pub fn not_supported() -> Self {
        Error::new(50101, "not supported")
    }

    // 503xx availability
    pub fn service_unavailable() -> Self {
        Error::new(50300, "service unavailable")
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "code: {}, message: {}", self.code, self.message)
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|s| s.as_ref() as &(dyn StdError + 'static))
    }
}

impl PartialEq for Error {
    /// Errors compare by code; the message carries per-occurrence detail.
    fn eq(&self, other: &Self) -> bool {
        self.code == other.code
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_from_code() {
        assert_eq!(Error::missing_arg().http_status(), 400);
        assert_eq!(Error::unauthorized().http_status(), 401);
        assert_eq!(Error::not_found().http_status(), 404);
        assert_eq!(Error::internal().http_status(), 500);
        assert_eq!(Error::new(7, "odd").http_status(), 500);
    }

    #[test]
    fn test_detail_appends() {
        let err = Error::missing_arg().with_detail("page");
        assert_eq!(err.code(), 40002);
        assert_eq!(err.message(), "missing arg: page");
    }

    #[test]
    fn test_wrap_keeps_cause() {
        let cause = std::io::Error::new(std::io::ErrorKind::Other, "disk gone");
        let err = Error::database().wrap(cause);
        assert!(err.message().contains("disk gone"));
        assert!(err.source().is_some());
    }
}
