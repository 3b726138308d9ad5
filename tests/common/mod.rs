#![allow(dead_code)]

use trellis::{ParsedRequest, ResponseParts, Router};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .with_test_writer()
        .try_init();
}

pub fn body_str(parts: &ResponseParts) -> String {
    String::from_utf8_lossy(parts.body()).to_string()
}

pub fn get(router: &Router, target: &str) -> ResponseParts {
    router.handle(ParsedRequest::new("GET", target))
}
