//! # Pipeline Module
//!
//! Onion-model execution of a matched handler chain.
//!
//! ## Control flow
//!
//! The matched chain lives in the request [`Context`] together with a cursor.
//! [`Context::next`] increments the cursor and executes one entry at a time
//! until the chain is exhausted; a handler that calls `next()` itself
//! re-enters that loop, so its remaining body runs after everything
//! downstream has finished:
//!
//! ```text
//! before₁ ─▶ before₂ ─▶ handler ─▶ after₁ ─▶ after₂
//!    ▲          ▲                              │
//!    └──────────┴──── unwinding returns ◀──────┘
//! ```
//!
//! [`Context::stop`] parks the cursor past the end; [`Context::skip`]
//! advances it without executing. There is no scheduler and no coroutine
//! machinery — suspension is simply a nested call that has not returned yet.
//!
//! ## Error routing
//!
//! A handler returning `Err` aborts normal progression. From the cursor
//! forward, the next `Catch` entry receives the error; `Ok(())` consumes it,
//! `Err(next)` keeps searching with the replacement. An error no catcher
//! consumes is logged with the originating handler's name.
//!
//! ## Pooling
//!
//! Contexts come from a process-wide free list. Release clears the request,
//! response, chain, pipe slot, key/value bag and every captured
//! path-parameter string, so pooled contexts never retain request data.

mod context;
mod writer;

pub use context::{Context, PathParams, MAX_INLINE_PARAMS};
pub use writer::ResponseParts;

pub(crate) use context::{acquire, release};
