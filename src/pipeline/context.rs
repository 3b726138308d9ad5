//! The per-request context and its pool.
//!
//! One context lives for exactly one request: acquired from the free list at
//! dispatch entry, threaded through every handler in the matched chain, and
//! released with all reference-holding fields cleared at dispatch exit.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use once_cell::sync::Lazy;
use smallvec::SmallVec;
use tracing::warn;

use crate::bind::{parse_form, FormData, Source, UploadedFile};
use crate::error::{Error, Result};
use crate::handler::{Entry, HandlerMeta, Pipe, PipeValue};
use crate::server::ParsedRequest;

use super::writer::ResponseParts;

/// Path/parameter pairs kept inline for typical routes.
pub const MAX_INLINE_PARAMS: usize = 8;

type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// Ordered path-parameter bindings.
///
/// A vector, not a map: the matcher rolls back a failed branch by truncating
/// to the length recorded before the attempt, which a keyed map cannot do in
/// O(1). Lookups scan in insertion order, first match wins.
#[derive(Debug, Default)]
pub struct PathParams {
    entries: ParamVec,
}

impl PathParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k.as_ref() == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn push(&mut self, key: Arc<str>, value: String) {
        self.entries.push((key, value));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn truncate(&mut self, len: usize) {
        self.entries.truncate(len);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_ref(), v.as_str()))
    }

    /// Drop every captured key and value, keeping the backing capacity for
    /// the next pooled use.
    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}

static EMPTY_CHAIN: Lazy<Arc<[Entry]>> = Lazy::new(|| Arc::from(Vec::new()));
static EMPTY_METAS: Lazy<Arc<[HandlerMeta]>> = Lazy::new(|| Arc::from(Vec::new()));

/// The request context handed to every handler.
pub struct Context {
    req: ParsedRequest,
    res: ResponseParts,
    /// Parameters captured by the matcher, in capture order.
    pub path_params: PathParams,
    vars: HashMap<String, Box<dyn Any + Send + Sync>>,
    chain: Arc<[Entry]>,
    metas: Arc<[HandlerMeta]>,
    cursor: usize,
    pipe: Option<PipeValue>,
    form: Option<FormData>,
    json_body: Option<serde_json::Map<String, serde_json::Value>>,
}

impl Context {
    fn empty() -> Self {
        Context {
            req: ParsedRequest::default(),
            res: ResponseParts::default(),
            path_params: PathParams::new(),
            vars: HashMap::new(),
            chain: EMPTY_CHAIN.clone(),
            metas: EMPTY_METAS.clone(),
            cursor: 0,
            pipe: None,
            form: None,
            json_body: None,
        }
    }

    /// The parsed request this context serves.
    pub fn request(&self) -> &ParsedRequest {
        &self.req
    }

    /// The response under construction.
    pub fn response(&mut self) -> &mut ResponseParts {
        &mut self.res
    }

    /// Split borrow for bare HTTP handlers.
    pub fn req_res_mut(&mut self) -> (&ParsedRequest, &mut ResponseParts) {
        (&self.req, &mut self.res)
    }

    /// Store a request-scoped value under `key`.
    pub fn set(&mut self, key: impl Into<String>, value: impl Any + Send + Sync) {
        self.vars.insert(key.into(), Box::new(value));
    }

    /// Fetch a request-scoped value stored with [`Context::set`].
    pub fn get<T: Any>(&self, key: &str) -> Option<&T> {
        self.vars.get(key).and_then(|v| v.downcast_ref())
    }

    // ── chain control flow ───────────────────────────────────────────

    pub(crate) fn begin(&mut self, chain: Arc<[Entry]>, metas: Arc<[HandlerMeta]>, start: usize) {
        self.chain = chain;
        self.metas = metas;
        self.cursor = start;
    }

    /// Drive the chain forward from the cursor.
    ///
    /// A handler that calls `next()` inside its own body re-enters this loop;
    /// the entries after it run to completion before control returns, which
    /// is what produces the onion wrap. Errors divert to the nearest
    /// downstream error handler.
    pub fn next(&mut self) {
        while self.cursor < self.chain.len() {
            let idx = self.cursor;
            self.cursor += 1;
            let handler = match &self.chain[idx] {
                Entry::Handler(f) => f.clone(),
                // Error handlers and sentinels are inert on the normal path.
                Entry::ErrorHandler(_) | Entry::SkipBefore => continue,
            };
            match handler(self) {
                Ok(Some(value)) => self.pipe = Some(value),
                Ok(None) => {}
                Err(err) => {
                    if let Some(unhandled) = self.route_error(err) {
                        let origin = self
                            .metas
                            .get(idx)
                            .map(|m| m.name)
                            .unwrap_or("<unknown handler>");
                        warn!(handler = origin, error = %unhandled, "unhandled error in chain");
                    }
                    return;
                }
            }
        }
    }

    /// Forward-search for the next error handler. Returns the error back if
    /// nothing consumed it.
    fn route_error(&mut self, mut err: Error) -> Option<Error> {
        while self.cursor < self.chain.len() {
            let idx = self.cursor;
            self.cursor += 1;
            let catcher = match &self.chain[idx] {
                Entry::ErrorHandler(f) => f.clone(),
                _ => continue,
            };
            match catcher(self, err) {
                Ok(()) => return None,
                Err(next) => err = next,
            }
        }
        Some(err)
    }

    /// Prevent any further entry from running once the current handler
    /// returns. In-flight work is not interrupted.
    pub fn stop(&mut self) {
        self.cursor = self.chain.len();
    }

    /// Advance the cursor by `n` entries without executing them.
    pub fn skip(&mut self, n: usize) {
        self.cursor = self.cursor.saturating_add(n);
    }

    // ── pipe slot ────────────────────────────────────────────────────

    /// Move the current pipe value out of the slot.
    pub fn take_pipe(&mut self) -> Pipe {
        Pipe(self.pipe.take())
    }

    /// Borrow the current pipe value.
    pub fn pipe_ref(&self) -> Option<&dyn crate::handler::PipePayload> {
        self.pipe.as_deref()
    }

    /// Replace the pipe value directly.
    pub fn set_pipe(&mut self, value: PipeValue) {
        self.pipe = Some(value);
    }

    // ── binder support ───────────────────────────────────────────────

    /// Raw text value of `key` in `source`, if present.
    pub fn arg_value(&mut self, source: Source, key: &str) -> Result<Option<String>> {
        match source {
            Source::Path => Ok(self.path_params.get(key).map(str::to_string)),
            Source::Query => Ok(self
                .req
                .query
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())),
            Source::Header => Ok(self.req.header(key).map(str::to_string)),
            Source::Form => Ok(self.form()?.value(key).map(str::to_string)),
            Source::Json => Err(Error::internal()
                .with_detail("json fields are decoded from the body map, not arg_value")),
        }
    }

    /// Uploaded parts bound to `key`. Cloning shares the part bytes.
    pub fn form_files(&mut self, key: &str) -> Result<Vec<UploadedFile>> {
        Ok(self.form()?.files(key).to_vec())
    }

    /// The parsed form body, parsed on first use.
    pub fn form(&mut self) -> Result<&FormData> {
        if self.form.is_none() {
            let content_type = self.req.header("content-type").map(str::to_string);
            self.form = Some(parse_form(content_type.as_deref(), &self.req.body)?);
        }
        Ok(self.form.as_ref().expect("form cache populated above"))
    }

    /// One json body field. The body is decoded once and cached; an empty
    /// body behaves as an empty object so non-json fields keep working.
    pub fn json_field(&mut self, key: &str) -> Result<Option<serde_json::Value>> {
        if self.json_body.is_none() {
            let trimmed: &[u8] = {
                let b: &[u8] = &self.req.body;
                let start = b.iter().position(|c| !c.is_ascii_whitespace());
                match start {
                    Some(s) => &b[s..],
                    None => &[],
                }
            };
            let map = if trimmed.is_empty() {
                serde_json::Map::new()
            } else {
                match serde_json::from_slice::<serde_json::Value>(trimmed) {
                    Ok(serde_json::Value::Object(map)) => map,
                    Ok(_) => {
                        return Err(Error::invalid_arg().with_detail("json body must be an object"))
                    }
                    Err(e) => return Err(Error::arg_format().with_detail("json body").wrap(e)),
                }
            };
            self.json_body = Some(map);
        }
        Ok(self
            .json_body
            .as_ref()
            .expect("json cache populated above")
            .get(key)
            .cloned())
    }

    // ── convenience writers ──────────────────────────────────────────

    /// Write a plain-text response with the given status.
    pub fn text(&mut self, status: u16, body: &str) {
        self.res.text(status, body);
    }

    /// Serialize a JSON response body.
    pub fn json<T: serde::Serialize + ?Sized>(&mut self, data: &T) -> Result<()> {
        self.res.json(data)
    }

    /// Client address, honoring `X-Forwarded-For` then `X-Real-IP`.
    pub fn remote_ip(&self) -> Option<String> {
        if let Some(fwd) = self.req.header("x-forwarded-for") {
            return fwd.split(',').next().map(|ip| ip.trim().to_string());
        }
        self.req.header("x-real-ip").map(str::to_string)
    }

    pub(crate) fn take_response(&mut self) -> ResponseParts {
        std::mem::take(&mut self.res)
    }

    /// Clear every reference-holding field before the context returns to the
    /// pool. Each captured path-parameter string is dropped here, not merely
    /// length-truncated.
    fn reset(&mut self) {
        self.req = ParsedRequest::default();
        self.res.reset();
        self.path_params.clear();
        self.vars.clear();
        self.chain = EMPTY_CHAIN.clone();
        self.metas = EMPTY_METAS.clone();
        self.cursor = 0;
        self.pipe = None;
        self.form = None;
        self.json_body = None;
    }
}

const POOL_CAP: usize = 128;

static POOL: Lazy<Mutex<Vec<Box<Context>>>> = Lazy::new(|| Mutex::new(Vec::new()));

/// Take a context from the free list, or allocate one.
pub(crate) fn acquire(req: ParsedRequest) -> Box<Context> {
    let mut ctx = POOL
        .lock()
        .expect("context pool poisoned")
        .pop()
        .unwrap_or_else(|| Box::new(Context::empty()));
    ctx.req = req;
    ctx
}

/// Reset and return a context to the free list.
pub(crate) fn release(mut ctx: Box<Context>) {
    ctx.reset();
    let mut pool = POOL.lock().expect("context pool poisoned");
    if pool.len() < POOL_CAP {
        pool.push(ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_params_first_match_wins() {
        let mut params = PathParams::new();
        params.push(Arc::from("id"), "1".to_string());
        params.push(Arc::from("id"), "2".to_string());
        assert_eq!(params.get("id"), Some("1"));
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_path_params_truncate_rolls_back() {
        let mut params = PathParams::new();
        params.push(Arc::from("a"), "1".to_string());
        let mark = params.len();
        params.push(Arc::from("b"), "2".to_string());
        params.truncate(mark);
        assert_eq!(params.get("b"), None);
        assert_eq!(params.get("a"), Some("1"));
    }

    #[test]
    fn test_vars_roundtrip() {
        let mut ctx = Context::empty();
        ctx.set("user_id", 42i64);
        assert_eq!(ctx.get::<i64>("user_id"), Some(&42));
        assert_eq!(ctx.get::<String>("user_id"), None);
        assert_eq!(ctx.get::<i64>("missing"), None);
    }

    #[test]
    fn test_pool_reuse_is_clean() {
        let mut req = ParsedRequest::default();
        req.path = "keep".to_string();
        let mut ctx = acquire(req);
        ctx.path_params.push(Arc::from("id"), "9".to_string());
        ctx.set("k", 1u8);
        release(ctx);

        let ctx = acquire(ParsedRequest::default());
        assert!(ctx.path_params.is_empty());
        assert!(ctx.request().path.is_empty());
        assert_eq!(ctx.get::<u8>("k"), None);
        release(ctx);
    }
}
