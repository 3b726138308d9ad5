//! Trellis is an HTTP request-dispatch framework built around three pieces:
//!
//! - a **trie-based matcher** supporting static, parametric, regex,
//!   composite, wildcard and catch-all segments with ordered backtracking;
//! - an **onion-model pipeline** where middleware wraps both the approach
//!   to and the return from the innermost handler, driven by an explicit
//!   cursor (`next` / `stop` / `skip`) with forward error routing;
//! - a **typed binding layer** that adapts a family of handler signatures
//!   and decodes request structs from path, query, header, form and JSON
//!   sources via `#[derive(Bind)]`.
//!
//! ```rust,ignore
//! use trellis::{App, Bind, Context, Error, Result};
//!
//! #[derive(Bind)]
//! struct PostArgs {
//!     #[bind(path)]
//!     id: u64,
//!     #[bind(query, default = "1")]
//!     page: u32,
//! }
//!
//! fn get_post(_ctx: &mut Context, args: PostArgs) -> Result<String, Error> {
//!     Ok(format!("post {} page {}", args.id, args.page))
//! }
//!
//! fn main() -> std::io::Result<()> {
//!     let mut app = App::new();
//!     app.router()
//!         .after((trellis::middleware::render_json, trellis::Catch(trellis::middleware::render_error)))
//!         .get("/posts/{id}", get_post);
//!     app.start()?.join().ok();
//!     Ok(())
//! }
//! ```

pub mod bind;
pub mod config;
pub mod error;
pub mod handler;
pub mod middleware;
pub mod pipeline;
pub mod router;
pub mod server;

pub use bind::{Bind, FieldSpec, Source, UploadedFile};
pub use config::Config;
pub use error::{Error, Result};
pub use handler::{ignore_err, supply, Catch, Pipe, PipePayload, PipeValue, SkipBefore, Summary};
pub use pipeline::{Context, PathParams, ResponseParts};
pub use router::{RouteDoc, Router, Scope};
pub use server::{App, AppService, ParsedRequest, ServerHandle};

/// Derives [`bind::Bind`] for a request struct; see the `bind` module docs
/// for the field attribute surface.
pub use trellis_macros::Bind;
