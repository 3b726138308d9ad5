//! # Bind Module
//!
//! Struct-driven request binding. A handler that takes a second argument
//! implementing [`Bind`] receives a freshly decoded instance per request;
//! decoding failures short-circuit the handler and flow to the chain's
//! error routing.
//!
//! ## Sources
//!
//! Each field declares where its value comes from:
//!
//! - `path` — parameters captured by the route matcher
//! - `query` — the URL query component
//! - `header` — request headers (case-insensitive names)
//! - `form` — urlencoded or multipart bodies, including uploaded files
//! - `json` — the request body, decoded once into a JSON object (default)
//!
//! ## Requiredness
//!
//! Plain fields are required: the key must be present, though an empty
//! string binds the type's zero value. `Option` fields are optional and
//! stay `None` when absent. A `default = "..."` attribute makes a scalar
//! field optional, decoding the default text when the key is missing.
//!
//! ## Example
//!
//! ```rust,ignore
//! use trellis::Bind;
//!
//! #[derive(Bind)]
//! struct SearchArgs {
//!     #[bind(query)]
//!     q: String,
//!     #[bind(query, default = "1")]
//!     page: u32,
//!     #[bind(header, alias = "X-Request-Id")]
//!     request_id: Option<String>,
//! }
//!
//! fn search(ctx: &mut trellis::Context, args: SearchArgs) -> trellis::Result<(), trellis::Error> {
//!     ctx.text(200, &format!("q={} page={}", args.q, args.page))
//! }
//! ```

mod core;
mod form;

pub use core::{
    optional, optional_file, optional_json, required, required_file, required_files, required_json,
};
pub use core::{Bind, FieldSpec, FromArg, Source};
pub use form::{extract_boundary, parse_form, parse_multipart, FormData, UploadedFile, MAX_PART_SIZE};
