//! The transport contract and an in-process reference multiplexer.
//!
//! tether never matches paths itself. Routers hand each route's callback to a
//! [`Transport`] under its method and path, and the transport decides which
//! callback a request reaches. [`Mux`] is the transport [`Server`](crate::Server)
//! uses: one radix tree per method for API routes plus one for static
//! prefixes, O(path-length) lookup via [`matchit`]. Registered paths are
//! literal; `{id}` in a route matches only the text `{id}`.

use std::collections::HashMap;
use std::sync::Arc;

use matchit::{InsertError, Router as MatchitRouter};

use crate::error::{Error, SetupError};
use crate::method::Method;
use crate::request::Request;
use crate::response::ResponseWriter;
use crate::router::HttpRouter;
use crate::route::trim_path;

/// What a transport calls for a matched request.
///
/// Shared across concurrent requests, so it must be `Send + Sync`. Everything
/// mutable lives in the per-call [`ResponseWriter`] and [`Request`].
pub type Callback = Arc<dyn Fn(&mut ResponseWriter, Request) + Send + Sync + 'static>;

/// Something that dispatches requests to registered callbacks.
pub trait Transport {
    /// Registers `callback` under the key `"<METHOD> <path>"`.
    fn handle(&mut self, method: Method, path: &str, callback: Callback) -> Result<(), SetupError>;

    /// Registers `callback` for every request at or below `prefix`.
    fn handle_prefix(&mut self, prefix: &str, callback: Callback) -> Result<(), SetupError>;
}

/// The reference [`Transport`].
///
/// Exact method + path routes win over static prefixes. Anything unmatched
/// gets a `404` JSON [`Error`].
#[derive(Default)]
pub struct Mux {
    routes: HashMap<Method, MatchitRouter<Callback>>,
    prefixes: MatchitRouter<Callback>,
}

impl Mux {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs the router's `register` hook and registers all its routes.
    pub fn register(&mut self, router: impl HttpRouter) -> Result<(), SetupError> {
        let mut router = router;
        router.register();
        router.into_router().register_server(self)
    }

    /// Routes one request and returns what the chain wrote.
    pub fn dispatch(&self, request: Request) -> ResponseWriter {
        let mut response = ResponseWriter::new();
        match self.lookup(&request) {
            Some(callback) => callback(&mut response, request),
            None => not_found(&mut response, &request),
        }
        response
    }

    fn lookup(&self, request: &Request) -> Option<Callback> {
        let path = request.path();
        let exact = request.method().parse::<Method>().ok()
            .and_then(|method| self.routes.get(&method))
            .and_then(|tree| tree.at(path).ok());
        match exact {
            Some(matched) => Some(Arc::clone(matched.value)),
            // `/static/` is the directory itself, same as `/static`.
            None => self.prefixes.at(path)
                .or_else(|_| self.prefixes.at(trim_path(path)))
                .ok()
                .map(|matched| Arc::clone(matched.value)),
        }
    }
}

impl Transport for Mux {
    fn handle(&mut self, method: Method, path: &str, callback: Callback) -> Result<(), SetupError> {
        self.routes
            .entry(method)
            .or_default()
            .insert(escape(path), callback)
            .map_err(|e| insert_error(format!("{method} {path}"), e))
    }

    fn handle_prefix(&mut self, prefix: &str, callback: Callback) -> Result<(), SetupError> {
        let prefix = trim_path(prefix);
        let exact = if prefix.is_empty() { "/".to_owned() } else { escape(prefix) };
        let below = format!("{}/{{*rest}}", escape(prefix));
        for pattern in [exact, below] {
            self.prefixes
                .insert(pattern.as_str(), Arc::clone(&callback))
                .map_err(|e| insert_error(pattern.clone(), e))?;
        }
        Ok(())
    }
}

/// Escapes matchit's parameter syntax so the path matches only itself.
fn escape(path: &str) -> String {
    path.replace('{', "{{").replace('}', "}}")
}

fn insert_error(key: String, e: InsertError) -> SetupError {
    match e {
        InsertError::Conflict { .. } => SetupError::DuplicateRoute(key),
        other => SetupError::InvalidPath(format!("{key}: {other}")),
    }
}

fn not_found(response: &mut ResponseWriter, request: &Request) {
    let err = Error::not_found(format!("no route for {} {}", request.method(), request.path()));
    response.write_error(&err);
}
