//! Handler trait and type erasure.
//!
//! # How handlers are stored
//!
//! A router holds routes whose handlers are all different closure types, so
//! each one is hidden behind a trait object (`dyn ErasedHandler`) and shared
//! with an `Arc`:
//!
//! ```text
//! fn get_user(ctx: &mut Context) -> Result<Option<Data>, Error> { … }   ← user writes this
//!        ↓ router.get("/users", get_user)
//! get_user.into_boxed_handler()                    ← Handler blanket impl
//!        ↓
//! Arc::new(FnHandler(get_user))                    ← stored as BoxedHandler
//!        ↓
//! handler.call(&mut ctx)  inside the terminal link ← one vtable dispatch
//! ```
//!
//! The result contract: `Ok(Some(data))` sends `data`, `Err(error)` sends
//! `error`, and `Ok(None)` sends nothing (the handler wrote the response
//! itself, or wants the recorded errors to speak).

use std::sync::Arc;

use crate::context::Context;
use crate::error::Error;
use crate::response::Data;

/// What a business handler returns.
pub type HandlerResult = Result<Option<Data>, Error>;

/// Object-safe face of a handler, called by the terminal chain link.
///
/// Public only because [`Handler::into_boxed_handler`] names it.
#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, ctx: &mut Context<'_>) -> HandlerResult;
}

/// A type-erased handler shared by every request on its route.
#[doc(hidden)]
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

// ── Public Handler trait ──────────────────────────────────────────────────────

/// A business handler: the last link of every route's chain.
///
/// You never implement this yourself. It is satisfied by any function or
/// closure with the signature:
///
/// ```text
/// fn name(ctx: &mut Context) -> Result<Option<Data>, Error>
/// ```
///
/// The trait is **sealed**: only the blanket impl below can satisfy it.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

mod private {
    pub trait Sealed {}
}

// ── Blanket implementations ───────────────────────────────────────────────────

impl<F> private::Sealed for F
where
    F: Fn(&mut Context<'_>) -> HandlerResult + Send + Sync + 'static,
{
}

impl<F> Handler for F
where
    F: Fn(&mut Context<'_>) -> HandlerResult + Send + Sync + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(FnHandler(self))
    }
}

// ── Concrete wrapper ──────────────────────────────────────────────────────────

/// Holds a concrete handler behind `dyn ErasedHandler`.
struct FnHandler<F>(F);

impl<F> ErasedHandler for FnHandler<F>
where
    F: Fn(&mut Context<'_>) -> HandlerResult + Send + Sync,
{
    fn call(&self, ctx: &mut Context<'_>) -> HandlerResult {
        (self.0)(ctx)
    }
}
