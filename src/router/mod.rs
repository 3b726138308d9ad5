//! # Router Module
//!
//! Path matching and route resolution over a segment trie.
//!
//! ## Overview
//!
//! The router indexes URL paths segment-by-segment into a tree. Each
//! segment is classified once at registration time:
//!
//! - **Static** segments (`users`) match by equality.
//! - **Parameters** (`{id}`) match one segment and bind it.
//! - **Wildcards** (`*`) match one segment without binding.
//! - **Catch-alls** (`**`, `{path:*}`) swallow the remaining path.
//! - **Patterns** (`{file}.{ext}`, `v{ver:[0-9]+}`) compile to one anchored
//!   regex with named captures.
//!
//! ## Matching
//!
//! Matching is an ordered recursive descent. Children are ranked static
//! first, then parametric, then wildcard and catch-all (registration order
//! is preserved within a rank), so the most specific branch to reach a
//! terminal with a chain for the method wins — no scoring pass. A branch
//! that fails after binding parameters is rolled back by truncating the
//! parameter vector to its pre-attempt length before the next sibling is
//! tried.
//!
//! ## Chain cache
//!
//! Every terminal node caches, per method, the fully flattened chain:
//! ancestor "before" entries, the node's own entries, then the "after"
//! entries back out to the root. Registration recomputes the cache for the
//! touched node and all descendants, which is cheap because registration is
//! a startup-time operation.
//!
//! ## Example
//!
//! ```rust,ignore
//! use trellis::Router;
//!
//! let mut router = Router::new();
//! router.get("/users/{id}", |ctx: &mut trellis::Context| {
//!     let id = ctx.path_params.get("id").unwrap_or("").to_string();
//!     ctx.text(200, &id);
//! });
//!
//! let mut api = router.scope("/api");
//! api.before(|ctx: &mut trellis::Context| { /* auth */ });
//! api.get("/health", |ctx: &mut trellis::Context| ctx.text(200, "ok"));
//! ```

mod core;
mod parse;

pub use core::{RouteDoc, Router, Scope, ALLOWED_METHODS};
pub use parse::SegmentKind;
