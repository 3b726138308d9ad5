//! Route tree, registration DSL and the backtracking matcher.

use std::collections::HashMap;
use std::panic::Location;
use std::sync::Arc;

use http::Method;
use once_cell::sync::Lazy;
use tracing::{debug, warn};

use crate::handler::{ArgsDoc, Chain, Entry, HandlerMeta, IntoChain};
use crate::pipeline::{acquire, release, PathParams, ResponseParts};
use crate::server::ParsedRequest;

use super::parse::{parse_segment, ParsedSegment, SegmentKind};

/// Methods a route may be registered under. `ANY` is the matcher's
/// fallback pseudo-method, not an HTTP verb.
pub static ALLOWED_METHODS: Lazy<Vec<Method>> = Lazy::new(|| {
    vec![
        Method::GET,
        Method::HEAD,
        Method::POST,
        Method::PUT,
        Method::PATCH,
        Method::DELETE,
        Method::CONNECT,
        Method::OPTIONS,
        Method::TRACE,
        Method::from_bytes(b"PROPFIND").expect("static method name"),
        Method::from_bytes(b"ANY").expect("static method name"),
    ]
});

pub(crate) fn any_method() -> &'static Method {
    static ANY: Lazy<Method> =
        Lazy::new(|| Method::from_bytes(b"ANY").expect("static method name"));
    &ANY
}

fn parse_method(name: &str) -> Option<Method> {
    let upper = name.to_ascii_uppercase();
    let method = Method::from_bytes(upper.as_bytes()).ok()?;
    ALLOWED_METHODS.contains(&method).then_some(method)
}

type NodeId = usize;
const ROOT: NodeId = 0;

/// Per-method handler record on a terminal node.
struct RouteHandler {
    entries: Vec<Entry>,
    metas: Vec<HandlerMeta>,
    summary: String,
    args: Option<ArgsDoc>,
    response: Option<&'static str>,
}

/// Flattened chain for one method, rebuilt on every registration that
/// touches the node or an ancestor.
#[derive(Clone)]
pub(crate) struct CachedChain {
    pub entries: Arc<[Entry]>,
    pub metas: Arc<[HandlerMeta]>,
}

struct Node {
    kind: SegmentKind,
    fragment: String,
    param_name: Option<Arc<str>>,
    pattern: Option<regex::Regex>,
    capture_keys: Vec<Arc<str>>,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
    before: Vec<Entry>,
    before_meta: Vec<HandlerMeta>,
    after: Vec<Entry>,
    after_meta: Vec<HandlerMeta>,
    methods: HashMap<Method, RouteHandler>,
    cache: HashMap<Method, CachedChain>,
}

impl Node {
    fn new(fragment: &str, parsed: ParsedSegment, parent: Option<NodeId>) -> Self {
        Node {
            kind: parsed.kind,
            fragment: fragment.to_string(),
            param_name: parsed.param_name,
            pattern: parsed.pattern,
            capture_keys: parsed.capture_keys,
            children: Vec::new(),
            parent,
            before: Vec::new(),
            before_meta: Vec::new(),
            after: Vec::new(),
            after_meta: Vec::new(),
            methods: HashMap::new(),
            cache: HashMap::new(),
        }
    }
}

/// Introspection record for one registered route, consumed by external
/// documentation tooling.
#[derive(Clone)]
pub struct RouteDoc {
    pub path: String,
    pub method: Method,
    pub summary: String,
    pub handlers: Vec<HandlerMeta>,
    pub args: Option<ArgsDoc>,
    pub response: Option<&'static str>,
}

/// The route tree.
///
/// Built at startup and treated as immutable while serving; a server that
/// permits runtime registration must serialize registrations against
/// matches (the bundled service wraps the router in `Arc<RwLock<_>>`).
pub struct Router {
    nodes: Vec<Node>,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    pub fn new() -> Self {
        Router {
            nodes: vec![Node::new("", ParsedSegment::plain(SegmentKind::Static), None)],
        }
    }

    // ── registration ─────────────────────────────────────────────────

    /// Register a handler chain for `(path, method)`.
    ///
    /// Panics on an unrecognized method name or an empty chain: malformed
    /// registrations stop startup instead of surfacing per request.
    #[track_caller]
    pub fn set<M>(&mut self, path: &str, method: &str, handlers: impl IntoChain<M>) -> &mut Self {
        let location = Location::caller();
        self.set_at(ROOT, path, method, handlers.into_chain(), location);
        self
    }

    #[track_caller]
    pub fn get<M>(&mut self, path: &str, handlers: impl IntoChain<M>) -> &mut Self {
        let location = Location::caller();
        self.set_at(ROOT, path, "GET", handlers.into_chain(), location);
        self
    }

    #[track_caller]
    pub fn post<M>(&mut self, path: &str, handlers: impl IntoChain<M>) -> &mut Self {
        let location = Location::caller();
        self.set_at(ROOT, path, "POST", handlers.into_chain(), location);
        self
    }

    #[track_caller]
    pub fn put<M>(&mut self, path: &str, handlers: impl IntoChain<M>) -> &mut Self {
        let location = Location::caller();
        self.set_at(ROOT, path, "PUT", handlers.into_chain(), location);
        self
    }

    #[track_caller]
    pub fn patch<M>(&mut self, path: &str, handlers: impl IntoChain<M>) -> &mut Self {
        let location = Location::caller();
        self.set_at(ROOT, path, "PATCH", handlers.into_chain(), location);
        self
    }

    #[track_caller]
    pub fn delete<M>(&mut self, path: &str, handlers: impl IntoChain<M>) -> &mut Self {
        let location = Location::caller();
        self.set_at(ROOT, path, "DELETE", handlers.into_chain(), location);
        self
    }

    #[track_caller]
    pub fn head<M>(&mut self, path: &str, handlers: impl IntoChain<M>) -> &mut Self {
        let location = Location::caller();
        self.set_at(ROOT, path, "HEAD", handlers.into_chain(), location);
        self
    }

    /// Register under the `ANY` pseudo-method: matched when no
    /// method-specific chain exists.
    #[track_caller]
    pub fn any<M>(&mut self, path: &str, handlers: impl IntoChain<M>) -> &mut Self {
        let location = Location::caller();
        self.set_at(ROOT, path, "ANY", handlers.into_chain(), location);
        self
    }

    /// Attach "before" middleware to the root; it contributes to every
    /// descendant chain.
    #[track_caller]
    pub fn before<M>(&mut self, middleware: impl IntoChain<M>) -> &mut Self {
        let location = Location::caller();
        self.middleware_at(ROOT, middleware.into_chain(), location, true);
        self
    }

    /// Attach "after" middleware to the root.
    #[track_caller]
    pub fn after<M>(&mut self, middleware: impl IntoChain<M>) -> &mut Self {
        let location = Location::caller();
        self.middleware_at(ROOT, middleware.into_chain(), location, false);
        self
    }

    /// Remove the handler record for `(path, method)`; method `"*"` also
    /// drops the node's middleware.
    pub fn clear(&mut self, path: &str, method: &str) {
        self.clear_at(ROOT, path, method);
    }

    /// A registration handle rooted at `prefix`.
    pub fn scope(&mut self, prefix: &str) -> Scope<'_> {
        assert!(
            !prefix.is_empty() && prefix != "/",
            "scope prefix can not be empty or '/'"
        );
        let node = self.ensure_path(ROOT, prefix);
        Scope { router: self, node }
    }

    fn set_at(
        &mut self,
        base: NodeId,
        path: &str,
        method: &str,
        chain: Chain,
        location: &'static Location<'static>,
    ) {
        let method =
            parse_method(method).unwrap_or_else(|| panic!("unsupported HTTP method: {method}"));
        assert!(
            !chain.entries.is_empty(),
            "there must be at least one handler"
        );

        let node_id = self.ensure_path(base, path);
        let node_path = self.node_path(node_id);
        let metas: Vec<HandlerMeta> = chain
            .names
            .iter()
            .map(|name| HandlerMeta {
                name,
                file: location.file(),
                line: location.line(),
                scope: String::new(),
            })
            .collect();

        let node = &mut self.nodes[node_id];
        if node.methods.contains_key(&method) {
            warn!(path = %node_path, method = %method, "handler already exists, replacing");
        }
        node.methods.insert(
            method,
            RouteHandler {
                entries: chain.entries,
                metas,
                summary: chain.summary.unwrap_or_default(),
                args: chain.args,
                response: chain.response,
            },
        );
        self.sync_cache(node_id);
    }

    fn middleware_at(
        &mut self,
        node_id: NodeId,
        chain: Chain,
        location: &'static Location<'static>,
        before: bool,
    ) {
        let scope = {
            let path = self.node_path(node_id);
            if path.is_empty() {
                "/".to_string()
            } else {
                path
            }
        };
        let metas: Vec<HandlerMeta> = chain
            .names
            .iter()
            .map(|name| HandlerMeta {
                name,
                file: location.file(),
                line: location.line(),
                scope: scope.clone(),
            })
            .collect();

        let node = &mut self.nodes[node_id];
        if before {
            node.before.extend(chain.entries);
            node.before_meta.extend(metas);
        } else {
            node.after.extend(chain.entries);
            node.after_meta.extend(metas);
        }
        self.sync_cache(node_id);
    }

    fn clear_at(&mut self, base: NodeId, path: &str, method: &str) {
        let node_id = self.ensure_path(base, path);
        let node = &mut self.nodes[node_id];
        if method == "*" {
            node.methods.clear();
            node.before.clear();
            node.before_meta.clear();
            node.after.clear();
            node.after_meta.clear();
        } else if let Some(method) = parse_method(method) {
            node.methods.remove(&method);
        }
        self.sync_cache(node_id);
    }

    // ── tree maintenance ─────────────────────────────────────────────

    fn ensure_path(&mut self, base: NodeId, path: &str) -> NodeId {
        let trimmed = path.trim_matches('/');
        if trimmed.is_empty() {
            return base;
        }
        let mut current = base;
        for seg in trimmed.split('/') {
            assert!(
                self.nodes[current].kind != SegmentKind::CatchAll,
                "catch-all segment must be the last segment of a route"
            );
            let parsed = parse_segment(seg);
            let existing = self.nodes[current]
                .children
                .iter()
                .copied()
                .find(|&c| self.nodes[c].kind == parsed.kind && self.nodes[c].fragment == seg);
            current = match existing {
                Some(id) => id,
                None => {
                    let id = self.nodes.len();
                    self.nodes.push(Node::new(seg, parsed, Some(current)));
                    self.nodes[current].children.push(id);
                    self.sort_children(current);
                    id
                }
            };
        }
        current
    }

    /// Rank children most-specific first: static segments, then parametric
    /// ones, then wildcard and catch-all. Registration order is preserved
    /// within a rank, so a static sibling wins over `{param}` no matter
    /// which was registered first.
    fn sort_children(&mut self, parent: NodeId) {
        let mut children = std::mem::take(&mut self.nodes[parent].children);
        children.sort_by_key(|&id| match self.nodes[id].kind {
            SegmentKind::Static => 0,
            SegmentKind::Param | SegmentKind::Pattern => 1,
            SegmentKind::Wildcard | SegmentKind::CatchAll => 2,
        });
        self.nodes[parent].children = children;
    }

    /// Rebuild the flattened per-method chains for `node_id` and every
    /// descendant. Ancestor "before" entries run outermost-first; "after"
    /// entries run innermost-first.
    fn sync_cache(&mut self, node_id: NodeId) {
        let mut before: Vec<Entry> = Vec::new();
        let mut before_meta: Vec<HandlerMeta> = Vec::new();
        let mut after: Vec<Entry> = Vec::new();
        let mut after_meta: Vec<HandlerMeta> = Vec::new();

        let mut cursor = Some(node_id);
        while let Some(id) = cursor {
            let node = &self.nodes[id];
            before.splice(0..0, node.before.iter().cloned());
            before_meta.splice(0..0, node.before_meta.iter().cloned());
            after.extend(node.after.iter().cloned());
            after_meta.extend(node.after_meta.iter().cloned());
            cursor = node.parent;
        }

        let node = &mut self.nodes[node_id];
        node.cache.clear();
        for (method, record) in &node.methods {
            let mut entries = Vec::with_capacity(before.len() + record.entries.len() + after.len());
            entries.extend(before.iter().cloned());
            entries.extend(record.entries.iter().cloned());
            entries.extend(after.iter().cloned());

            let mut metas = Vec::with_capacity(entries.len());
            metas.extend(before_meta.iter().cloned());
            metas.extend(record.metas.iter().cloned());
            metas.extend(after_meta.iter().cloned());

            node.cache.insert(
                method.clone(),
                CachedChain {
                    entries: entries.into(),
                    metas: metas.into(),
                },
            );
        }

        let children = self.nodes[node_id].children.clone();
        for child in children {
            self.sync_cache(child);
        }
    }

    fn node_path(&self, node_id: NodeId) -> String {
        let mut fragments = Vec::new();
        let mut cursor = Some(node_id);
        while let Some(id) = cursor {
            let node = &self.nodes[id];
            if node.parent.is_some() {
                fragments.push(node.fragment.as_str());
            }
            cursor = node.parent;
        }
        if fragments.is_empty() {
            return String::new();
        }
        fragments.reverse();
        format!("/{}", fragments.join("/"))
    }

    // ── matching & dispatch ──────────────────────────────────────────

    /// Walk the tree from `node_id` over `path[start..]`, collecting path
    /// parameters into `params`. A branch that matches but reaches no
    /// terminal is rolled back by truncating `params` to its length before
    /// the attempt; the next sibling is then tried in order.
    fn match_node(
        &self,
        node_id: NodeId,
        path: &str,
        start: usize,
        method: &Method,
        params: &mut PathParams,
    ) -> Option<CachedChain> {
        let node = &self.nodes[node_id];

        if start >= path.len() {
            if let Some(chain) = node.cache.get(method) {
                return Some(chain.clone());
            }
            if let Some(chain) = node.cache.get(any_method()) {
                return Some(chain.clone());
            }
            // A catch-all child may accept the empty remainder, so
            // `/foo/**` also matches `/foo`.
            for &child_id in &node.children {
                let child = &self.nodes[child_id];
                if child.kind != SegmentKind::CatchAll {
                    continue;
                }
                let mark = params.len();
                if let Some(name) = &child.param_name {
                    params.push(name.clone(), String::new());
                }
                if let Some(hit) = self.match_node(child_id, path, start, method, params) {
                    return Some(hit);
                }
                params.truncate(mark);
            }
            return None;
        }

        let end = path[start..]
            .find('/')
            .map(|i| i + start)
            .unwrap_or(path.len());
        let segment = &path[start..end];

        for &child_id in &node.children {
            let child = &self.nodes[child_id];
            let mark = params.len();
            let mut next_start = end + 1;

            let matched = match child.kind {
                SegmentKind::Static => child.fragment == segment,
                SegmentKind::Param | SegmentKind::Wildcard => {
                    if let Some(name) = &child.param_name {
                        params.push(name.clone(), segment.to_string());
                    }
                    true
                }
                SegmentKind::CatchAll => {
                    next_start = path.len();
                    if let Some(name) = &child.param_name {
                        params.push(name.clone(), path[start..].to_string());
                    }
                    true
                }
                SegmentKind::Pattern => match &child.pattern {
                    Some(re) => match re.captures(segment) {
                        Some(caps)
                            if caps.get(0).map(|m| m.as_str().len()) == Some(segment.len()) =>
                        {
                            for key in &child.capture_keys {
                                if let Some(value) = caps.name(key) {
                                    params.push(key.clone(), value.as_str().to_string());
                                }
                            }
                            true
                        }
                        _ => false,
                    },
                    None => false,
                },
            };

            if matched {
                let next_start = next_start.min(path.len());
                if let Some(hit) = self.match_node(child_id, path, next_start, method, params) {
                    return Some(hit);
                }
                params.truncate(mark);
            }
        }
        None
    }

    /// Dispatch one parsed request through the tree and its matched chain.
    ///
    /// Unmatched paths and matched paths without a chain for the method
    /// both produce a bare 404; no 405 is synthesized — `ANY` routes are
    /// the substitute.
    pub fn handle(&self, req: ParsedRequest) -> ResponseParts {
        let method = Method::from_bytes(req.method.as_bytes()).ok();
        let path = req.path.trim_matches('/').to_string();

        let mut ctx = acquire(req);
        let matched = method
            .as_ref()
            .and_then(|m| self.match_node(ROOT, &path, 0, m, &mut ctx.path_params));

        match matched {
            Some(chain) if !chain.entries.is_empty() => {
                // A SkipBefore sentinel discards everything before it; the
                // last one in the chain wins.
                let start = chain
                    .entries
                    .iter()
                    .rposition(|e| matches!(e, Entry::SkipBefore))
                    .map(|i| i + 1)
                    .unwrap_or(0);
                ctx.begin(chain.entries, chain.metas, start);
                ctx.next();
            }
            _ => {
                debug!(
                    method = %ctx.request().method,
                    path = %ctx.request().path,
                    "no route matched"
                );
                ctx.response().set_status(404);
            }
        }

        let parts = ctx.take_response();
        release(ctx);
        parts
    }

    // ── introspection ────────────────────────────────────────────────

    /// All registered routes, for the documentation collaborator.
    pub fn describe(&self) -> Vec<RouteDoc> {
        let mut docs = Vec::new();
        for (id, node) in self.nodes.iter().enumerate() {
            for (method, record) in &node.methods {
                docs.push(RouteDoc {
                    path: self.node_path(id),
                    method: method.clone(),
                    summary: record.summary.clone(),
                    handlers: record.metas.clone(),
                    args: record.args,
                    response: record.response,
                });
            }
        }
        docs.sort_by(|a, b| {
            (a.path.as_str(), a.method.as_str()).cmp(&(b.path.as_str(), b.method.as_str()))
        });
        docs
    }

    /// Parameter-carrying fragments on the way to `path`, outermost first.
    pub fn params_of(&mut self, path: &str) -> Vec<String> {
        let node_id = self.ensure_path(ROOT, path);
        let mut fragments = Vec::new();
        let mut cursor = Some(node_id);
        while let Some(id) = cursor {
            let node = &self.nodes[id];
            if node.kind != SegmentKind::Static {
                fragments.push(node.fragment.clone());
            }
            cursor = node.parent;
        }
        fragments.reverse();
        fragments
    }
}

/// Registration handle for a subtree, created by [`Router::scope`].
///
/// Paths are relative to the scope's prefix; middleware attached here
/// contributes only to chains at or below the prefix.
pub struct Scope<'r> {
    router: &'r mut Router,
    node: NodeId,
}

impl<'r> Scope<'r> {
    /// Absolute path of this scope's node.
    pub fn path(&self) -> String {
        self.router.node_path(self.node)
    }

    #[track_caller]
    pub fn set<M>(&mut self, path: &str, method: &str, handlers: impl IntoChain<M>) -> &mut Self {
        let location = Location::caller();
        self.router
            .set_at(self.node, path, method, handlers.into_chain(), location);
        self
    }

    #[track_caller]
    pub fn get<M>(&mut self, path: &str, handlers: impl IntoChain<M>) -> &mut Self {
        let location = Location::caller();
        self.router
            .set_at(self.node, path, "GET", handlers.into_chain(), location);
        self
    }

    #[track_caller]
    pub fn post<M>(&mut self, path: &str, handlers: impl IntoChain<M>) -> &mut Self {
        let location = Location::caller();
        self.router
            .set_at(self.node, path, "POST", handlers.into_chain(), location);
        self
    }

    #[track_caller]
    pub fn put<M>(&mut self, path: &str, handlers: impl IntoChain<M>) -> &mut Self {
        let location = Location::caller();
        self.router
            .set_at(self.node, path, "PUT", handlers.into_chain(), location);
        self
    }

    #[track_caller]
    pub fn patch<M>(&mut self, path: &str, handlers: impl IntoChain<M>) -> &mut Self {
        let location = Location::caller();
        self.router
            .set_at(self.node, path, "PATCH", handlers.into_chain(), location);
        self
    }

    #[track_caller]
    pub fn delete<M>(&mut self, path: &str, handlers: impl IntoChain<M>) -> &mut Self {
        let location = Location::caller();
        self.router
            .set_at(self.node, path, "DELETE", handlers.into_chain(), location);
        self
    }

    #[track_caller]
    pub fn head<M>(&mut self, path: &str, handlers: impl IntoChain<M>) -> &mut Self {
        let location = Location::caller();
        self.router
            .set_at(self.node, path, "HEAD", handlers.into_chain(), location);
        self
    }

    #[track_caller]
    pub fn any<M>(&mut self, path: &str, handlers: impl IntoChain<M>) -> &mut Self {
        let location = Location::caller();
        self.router
            .set_at(self.node, path, "ANY", handlers.into_chain(), location);
        self
    }

    /// Attach "before" middleware to this scope's node.
    #[track_caller]
    pub fn before<M>(&mut self, middleware: impl IntoChain<M>) -> &mut Self {
        let location = Location::caller();
        self.router
            .middleware_at(self.node, middleware.into_chain(), location, true);
        self
    }

    /// Attach "after" middleware to this scope's node.
    #[track_caller]
    pub fn after<M>(&mut self, middleware: impl IntoChain<M>) -> &mut Self {
        let location = Location::caller();
        self.router
            .middleware_at(self.node, middleware.into_chain(), location, false);
        self
    }

    pub fn clear(&mut self, path: &str, method: &str) {
        self.router.clear_at(self.node, path, method);
    }

    /// A nested scope below this one.
    pub fn scope(&mut self, prefix: &str) -> Scope<'_> {
        assert!(
            !prefix.is_empty() && prefix != "/",
            "scope prefix can not be empty or '/'"
        );
        let node = self.router.ensure_path(self.node, prefix);
        Scope {
            router: &mut *self.router,
            node,
        }
    }
}
