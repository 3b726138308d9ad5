//! # Handler Module
//!
//! Turns user functions of many shapes into uniform chain entries.
//!
//! ## Accepted signatures
//!
//! | Shape | How to register |
//! |---|---|
//! | `Fn(&mut Context)` | directly |
//! | `Fn(&mut Context) -> Result<R, Error>` | directly; `R` feeds the pipe slot, `R = ()` does not |
//! | `Fn(&mut Context, T) -> …` where `T: Bind` | directly; `T` is bound from the request first |
//! | `Fn(&mut Context, Pipe) -> …` | directly; receives the current pipe value |
//! | `Fn(&ParsedRequest, &mut ResponseParts) -> …` | directly; bare HTTP handler |
//! | `Fn(&mut Context) -> R` (infallible producer) | wrapped in [`supply`] |
//! | `Fn(&mut Context, Error) -> Result<()>` | wrapped in [`Catch`] |
//! | [`SkipBefore`] | sentinel, not a handler |
//! | `&str` / `String` / [`Summary`] | route summary, not a handler |
//!
//! Handlers register alone or as tuples:
//!
//! ```rust,ignore
//! router.get("/users/{id}", (auth, load_user, trellis::middleware::render_json));
//! router.get("/admin", (trellis::SkipBefore, admin_panel));
//! ```
//!
//! A signature outside these families fails to compile at the registration
//! call, which is the registration-time hard failure this crate wants: no
//! handler shape is discovered to be unsupported at request time.

mod adapter;

pub use adapter::{
    ignore_err, markers, supply, ArgsDoc, Catch, Chain, Entry, EntryDoc, ErrorHandlerFn,
    HandlerFn, HandlerMeta, IntoChain, IntoPart, Outcome, Part, Pipe, PipePayload, PipeValue,
    SkipBefore, Summary, Supply,
};
