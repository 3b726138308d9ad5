//! Copying accumulated [`ResponseParts`] onto the wire.

use std::collections::HashSet;
use std::sync::Mutex;

use may_minihttp::Response;
use once_cell::sync::Lazy;
use tracing::warn;

use crate::pipeline::ResponseParts;

fn status_reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        301 => "Moved Permanently",
        302 => "Found",
        304 => "Not Modified",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        409 => "Conflict",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        503 => "Service Unavailable",
        _ => "OK",
    }
}

/// Upper bound on distinct non-literal header lines kept for the process
/// lifetime; lines beyond it are dropped rather than allocated.
const MAX_INTERNED_HEADER_LINES: usize = 256;

static HEADER_LINES: Lazy<Mutex<HashSet<&'static str>>> =
    Lazy::new(|| Mutex::new(HashSet::new()));

// may_minihttp takes whole header lines with a 'static lifetime. Lines the
// framework emits itself are literals; anything else is interned at most
// once per distinct line, bounded by MAX_INTERNED_HEADER_LINES.
fn header_line(name: &str, value: &str) -> Option<&'static str> {
    match (name, value) {
        ("Content-Type", "application/json") => return Some("Content-Type: application/json"),
        ("Content-Type", "text/plain") => return Some("Content-Type: text/plain"),
        ("Content-Type", "text/html; charset=utf-8") => {
            return Some("Content-Type: text/html; charset=utf-8")
        }
        ("Content-Type", "text/event-stream") => return Some("Content-Type: text/event-stream"),
        _ => {}
    }

    let line = format!("{name}: {value}");
    let mut interned = HEADER_LINES.lock().expect("header line table poisoned");
    if let Some(&existing) = interned.get(line.as_str()) {
        return Some(existing);
    }
    if interned.len() >= MAX_INTERNED_HEADER_LINES {
        warn!(header = name, "header line table full, dropping response header");
        return None;
    }
    let line: &'static str = Box::leak(line.into_boxed_str());
    interned.insert(line);
    Some(line)
}

/// Write status, headers and body to the outgoing response.
pub fn write_response(parts: ResponseParts, res: &mut Response) {
    res.status_code(parts.status() as usize, status_reason(parts.status()));
    for (name, value) in parts.headers() {
        if let Some(line) = header_line(name, value) {
            res.header(line);
        }
    }
    res.body_vec(parts.into_body());
}
