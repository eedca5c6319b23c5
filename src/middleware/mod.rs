//! Middleware layer.
//!
//! A middleware is any function `Fn(&mut Context) -> Result<(), Error>`.
//! It may work before calling [`Context::next`], after it, or both, and it
//! may stop the chain with [`Context::abort`]. Returning `Err` records the
//! error without stopping anything; see [`crate::context`] for the full
//! contract.
//!
//! Built-in middleware:
//! - [`trace`]: per-request span with method, path, status, latency

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, info_span};

use crate::context::Context;
use crate::error::Error;

/// A shareable chain link.
///
/// `Arc` because the same middleware is stacked onto many routes and every
/// request gets its own copy of the chain.
pub type Middleware = Arc<dyn Fn(&mut Context<'_>) -> Result<(), Error> + Send + Sync + 'static>;

/// Wraps a function or closure as a [`Middleware`].
pub fn from_fn<F>(f: F) -> Middleware
where
    F: Fn(&mut Context<'_>) -> Result<(), Error> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Opens a `request` span around the rest of the chain and logs one line
/// when it returns.
///
/// Register it first so it sees everything:
///
/// ```rust
/// use tether::{Router, middleware};
///
/// let mut api = Router::new("/api");
/// api.middleware(middleware::trace());
/// ```
pub fn trace() -> Middleware {
    from_fn(|ctx| {
        let span = info_span!(
            "request",
            method = %ctx.request().method(),
            path = %ctx.request().path(),
        );
        let _entered = span.enter();
        let started = Instant::now();

        ctx.next();

        // The route writes the last error after the chain unwinds.
        let status = match ctx.last_error() {
            Some(err) if !ctx.response().is_written() => err.code(),
            _ => ctx.response().status(),
        };
        info!(
            status,
            errors = ctx.errors().len(),
            latency_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX),
            "request finished",
        );
        Ok(())
    })
}
