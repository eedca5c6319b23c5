//! A single `(method, path)` binding and the callback it hands the transport.

use std::sync::Arc;

use crate::context::Context;
use crate::error::SetupError;
use crate::handler::{BoxedHandler, Handler};
use crate::method::Method;
use crate::middleware::{Middleware, from_fn};
use crate::request::Request;
use crate::response::ResponseWriter;
use crate::transport::Callback;

/// Something a router can own, re-prefix when mounted, wrap in middleware,
/// and finally hand to a transport.
///
/// Implemented by [`Route`] and [`FileHandler`](crate::FileHandler). The two
/// share mounting and middleware stacking and nothing else.
pub trait HttpRoute {
    /// The transport key. `"<METHOD> <path>"` for API routes.
    fn route(&self) -> String;

    fn path(&self) -> &str;

    /// Rewrites the path as `prefix + path`, trailing `/` of the current
    /// path removed first.
    fn prepend(&mut self, prefix: &str);

    /// Puts `middleware` ahead of everything already stacked, keeping both
    /// groups in their own order.
    fn stack_middleware(&mut self, middleware: &[Middleware]);

    /// Appends route-local middleware. It runs after anything a router stacks.
    fn middleware(&mut self, middleware: Middleware) -> &mut Self
    where
        Self: Sized;

    /// Builds the transport-facing callback. Each call of the callback runs
    /// one request through a fresh [`Context`].
    fn callback(&self) -> Callback;
}

/// One API endpoint.
#[derive(Clone)]
pub struct Route {
    method: Method,
    path: String,
    handler: BoxedHandler,
    middleware: Vec<Middleware>,
}

impl Route {
    /// An empty path means `/`. Any other path must begin with `/`.
    pub fn new(method: Method, path: &str, handler: impl Handler) -> Result<Self, SetupError> {
        let path = if path.is_empty() { "/" } else { path };
        if !path.starts_with('/') {
            return Err(SetupError::InvalidPath(path.to_owned()));
        }
        Ok(Self {
            method,
            path: path.to_owned(),
            handler: handler.into_boxed_handler(),
            middleware: Vec::new(),
        })
    }

    pub fn method(&self) -> Method { self.method }

    /// How many middleware currently wrap the handler.
    pub fn middleware_len(&self) -> usize { self.middleware.len() }
}

impl HttpRoute for Route {
    fn route(&self) -> String {
        format!("{} {}", self.method, self.path)
    }

    fn path(&self) -> &str { &self.path }

    fn prepend(&mut self, prefix: &str) {
        self.path = join_path(prefix, &self.path);
    }

    fn stack_middleware(&mut self, middleware: &[Middleware]) {
        let mut stacked = middleware.to_vec();
        stacked.append(&mut self.middleware);
        self.middleware = stacked;
    }

    fn middleware(&mut self, middleware: Middleware) -> &mut Self {
        self.middleware.push(middleware);
        self
    }

    fn callback(&self) -> Callback {
        let mut chain = self.middleware.clone();
        chain.push(terminal(Arc::clone(&self.handler)));
        chain_callback(chain)
    }
}

/// The last chain link: runs the business handler and writes its result.
fn terminal(handler: BoxedHandler) -> Middleware {
    from_fn(move |ctx| match handler.call(ctx) {
        Ok(Some(data)) => {
            ctx.write_json(data.code(), data.payload());
            Ok(())
        }
        Ok(None) => Ok(()),
        Err(err) => {
            ctx.write_json(err.code(), &err);
            Err(err)
        }
    })
}

/// Wraps a complete chain (terminal link included) as a transport callback.
///
/// After the chain returns, if no body was written and errors were recorded,
/// the most recent error becomes the body. A status committed by the chain
/// is kept.
pub(crate) fn chain_callback(chain: Vec<Middleware>) -> Callback {
    let chain: Arc<[Middleware]> = chain.into();
    Arc::new(move |response: &mut ResponseWriter, request: Request| {
        let mut ctx = Context::new(request, response);
        if let Err(err) = ctx.set_chain(chain.to_vec()) {
            ctx.write_json(err.code(), &err);
            return;
        }
        ctx.next();
        respond_with_last_error(&mut ctx);
    })
}

fn respond_with_last_error(ctx: &mut Context<'_>) {
    if ctx.response().has_body() {
        return;
    }
    if let Some(err) = ctx.last_error().cloned() {
        ctx.write_json(err.code(), &err);
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

/// Drops trailing slashes: `"/api/"` → `"/api"`, `"/"` → `""`.
pub(crate) fn trim_path(path: &str) -> &str {
    path.trim_end_matches('/')
}

/// `prefix + path` with no doubled and no trailing slash. Empty joins to `/`.
pub(crate) fn join_path(prefix: &str, path: &str) -> String {
    let joined = format!("{}{}", trim_path(prefix), trim_path(path));
    if joined.is_empty() { "/".to_owned() } else { joined }
}

/// A route-local or mount path is acceptable when empty or rooted.
pub(crate) fn check_local_path(path: &str) -> Result<&str, SetupError> {
    let path = trim_path(path);
    if path.is_empty() || path.starts_with('/') {
        Ok(path)
    } else {
        Err(SetupError::InvalidPath(path.to_owned()))
    }
}
