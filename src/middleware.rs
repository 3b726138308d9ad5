//! Stock "after" middlewares.
//!
//! The core never serializes results or errors on its own; a deployment
//! installs this pair at the root so every route gets a uniform wire shape:
//!
//! ```rust,ignore
//! router.after((trellis::middleware::render_json,
//!               trellis::Catch(trellis::middleware::render_error)));
//! ```

use crate::error::{Error, Result};
use crate::handler::Pipe;
use crate::pipeline::Context;

/// Render the current pipe value as the response body.
///
/// Strings are written verbatim, scalars in display form, an empty pipe
/// writes nothing, and anything else is serialized as a JSON document.
pub fn render_json(ctx: &mut Context, value: Pipe) -> Result<()> {
    if value.is_empty() {
        return Ok(());
    }
    let json = value.to_json()?;
    ctx.response().write_json_value(json)
}

/// Render an unconsumed chain error as `{"code":…,"message":…}` with the
/// HTTP status derived from the error code.
pub fn render_error(ctx: &mut Context, err: Error) -> Result<()> {
    let status = err.http_status();
    let body = serde_json::json!({
        "code": err.code(),
        "message": err.message(),
    });
    ctx.response().set_status(status);
    ctx.response().json(&body)?;
    Ok(())
}
