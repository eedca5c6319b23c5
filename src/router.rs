//! Routers: named groups of routes with a shared prefix and middleware.
//!
//! # Mounting
//!
//! [`Router::handle`] takes the child router **by value**. Its routes are
//! flattened into the parent on the spot: there is no tree and no link back,
//! so nothing done to the child afterwards (it no longer exists) can leak in.
//!
//! Middleware precedence, for any depth of nesting:
//!
//! ```text
//! outermost router → … → innermost router → route-local → handler
//! ```
//!
//! A router's middleware reaches its *own* routes when the router is
//! finalized (mounted or registered), so `Use` order relative to route
//! creation does not matter there. Routes adopted from a child receive the
//! parent's middleware as it stands at mount time.
//!
//! ```rust
//! use tether::{Context, Data, Mux, Request, Router, middleware};
//! use serde_json::json;
//!
//! let mut v1 = Router::new("/v1");
//! v1.get("/users", |_ctx: &mut Context<'_>| Ok(Some(Data::ok(json!(["alice"])))));
//!
//! let mut api = Router::new("/api");
//! api.middleware(middleware::trace());
//! api.handle("/", v1).unwrap();
//!
//! let mut mux = Mux::new();
//! mux.register(api).unwrap();
//!
//! let res = mux.dispatch(Request::new("GET", "/api/v1/users"));
//! assert_eq!(res.status(), 200);
//! assert_eq!(res.body(), br#"["alice"]"#);
//! ```

use std::path::PathBuf;

use tracing::{error, info};

use crate::context::Context;
use crate::error::SetupError;
use crate::files::FileHandler;
use crate::handler::HandlerResult;
use crate::method::Method;
use crate::middleware::Middleware;
use crate::route::{HttpRoute, Route, check_local_path, join_path, trim_path};
use crate::transport::Transport;

/// Anything that can be mounted into a [`Router`] or registered on a
/// [`Mux`](crate::Mux).
///
/// Implement it to give an application its own router type whose routes
/// are set up in [`register`](Self::register):
///
/// ```rust
/// use tether::{Context, Data, HttpRouter, Router};
/// use serde_json::json;
///
/// struct Health(Router);
///
/// impl HttpRouter for Health {
///     fn register(&mut self) {
///         self.0.get("/healthz", |_ctx: &mut Context<'_>| Ok(Some(Data::ok(json!("ok")))));
///     }
///
///     fn into_router(self) -> Router { self.0 }
/// }
///
/// let mut app = Router::new("");
/// app.handle("/", Health(Router::new("/"))).unwrap();
/// assert_eq!(app.routes().count(), 1);
/// ```
pub trait HttpRouter {
    /// Called exactly once, right before the router is mounted or registered.
    fn register(&mut self) {}

    fn into_router(self) -> Router;
}

impl HttpRouter for Router {
    fn into_router(self) -> Router { self }
}

/// A group of routes under one path prefix.
///
/// Built once at startup, then either mounted into another router with
/// [`handle`](Router::handle) or given to a transport with
/// [`register_server`](Router::register_server). Both consume it.
#[derive(Clone, Default)]
pub struct Router {
    prefix: String,
    routes: Vec<Route>,
    files: Vec<FileHandler>,
    middleware: Vec<Middleware>,
    // Adopted from mounted children. Already carry every middleware they get.
    mounted_routes: Vec<Route>,
    mounted_files: Vec<FileHandler>,
}

/// A finalized router's contents.
struct Flattened {
    routes: Vec<Route>,
    files: Vec<FileHandler>,
}

impl Router {
    /// A router whose routes all live under `prefix`. Trailing `/` is dropped.
    pub fn new(prefix: &str) -> Self {
        Self { prefix: trim_path(prefix).to_owned(), ..Self::default() }
    }

    pub fn prefix(&self) -> &str { &self.prefix }

    // ── Routes ────────────────────────────────────────────────────────────────

    /// Registers a `GET` route. See [`Router::add`].
    pub fn get<H>(&mut self, path: &str, handler: H) -> Option<&mut Route>
    where
        H: Fn(&mut Context<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        self.add(Method::Get, path, handler)
    }

    pub fn post<H>(&mut self, path: &str, handler: H) -> Option<&mut Route>
    where
        H: Fn(&mut Context<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        self.add(Method::Post, path, handler)
    }

    pub fn put<H>(&mut self, path: &str, handler: H) -> Option<&mut Route>
    where
        H: Fn(&mut Context<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        self.add(Method::Put, path, handler)
    }

    pub fn patch<H>(&mut self, path: &str, handler: H) -> Option<&mut Route>
    where
        H: Fn(&mut Context<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        self.add(Method::Patch, path, handler)
    }

    pub fn delete<H>(&mut self, path: &str, handler: H) -> Option<&mut Route>
    where
        H: Fn(&mut Context<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        self.add(Method::Delete, path, handler)
    }

    /// Binds `handler` to `method` at `prefix + path` and returns the route so
    /// route-local middleware can be chained on.
    ///
    /// A malformed path is logged and yields `None`; the router stays usable.
    pub fn add<H>(&mut self, method: Method, path: &str, handler: H) -> Option<&mut Route>
    where
        H: Fn(&mut Context<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        let route = check_local_path(path)
            .and_then(|local| Route::new(method, &join_path(&self.prefix, local), handler));
        match route {
            Ok(route) => {
                self.routes.push(route);
                self.routes.last_mut()
            }
            Err(e) => {
                error!(%method, path, "invalid route: {e}");
                None
            }
        }
    }

    /// Serves the files under `dir` at `prefix + path`.
    pub fn serve_dir(&mut self, path: &str, dir: impl Into<PathBuf>) -> Option<&mut FileHandler> {
        match check_local_path(path) {
            Ok(local) => {
                self.files.push(FileHandler::new(&join_path(&self.prefix, local), dir));
                self.files.last_mut()
            }
            Err(e) => {
                error!(path, "invalid static path: {e}");
                None
            }
        }
    }

    /// Every route this router will register, own routes first.
    pub fn routes(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter().chain(&self.mounted_routes)
    }

    pub fn file_handlers(&self) -> impl Iterator<Item = &FileHandler> {
        self.files.iter().chain(&self.mounted_files)
    }

    // ── Middleware ────────────────────────────────────────────────────────────

    /// Adds router-level middleware. It runs before any route-local middleware.
    pub fn middleware(&mut self, middleware: Middleware) -> &mut Self {
        self.middleware.push(middleware);
        self
    }

    // ── Mounting and registration ─────────────────────────────────────────────

    /// Mounts `child` at `self.prefix + path`.
    ///
    /// Runs the child's `register` hook, finalizes it, then adopts every
    /// route and file handler it holds: each is prefixed and gets this
    /// router's current middleware stacked in front. `self.prefix` is left
    /// unchanged.
    pub fn handle(&mut self, path: &str, child: impl HttpRouter) -> Result<(), SetupError> {
        let local = check_local_path(path)?;
        let mut child = child;
        child.register();
        let Flattened { routes, files } = child.into_router().flatten();

        let prefix = format!("{}{}", self.prefix, local);
        for mut route in routes {
            route.prepend(&prefix);
            route.stack_middleware(&self.middleware);
            self.mounted_routes.push(route);
        }
        for mut file in files {
            file.prepend(&prefix);
            file.stack_middleware(&self.middleware);
            self.mounted_files.push(file);
        }
        Ok(())
    }

    /// Hands every route and file handler to `transport`.
    ///
    /// Consumes the router, so its middleware is stacked exactly once.
    pub fn register_server(self, transport: &mut impl Transport) -> Result<(), SetupError> {
        let Flattened { routes, files } = self.flatten();
        for route in &routes {
            info!(route = %route.route(), middleware = route.middleware_len(), "api route");
            transport.handle(route.method(), route.path(), route.callback())?;
        }
        for file in &files {
            info!(path = file.path(), dir = %file.root().display(), "static dir");
            transport.handle_prefix(file.path(), file.callback())?;
        }
        Ok(())
    }

    /// Stacks this router's middleware onto its own routes and merges in the
    /// adopted ones.
    fn flatten(self) -> Flattened {
        let Self { routes, files, middleware, mounted_routes, mounted_files, .. } = self;
        let routes = routes.into_iter()
            .map(|mut route| {
                route.stack_middleware(&middleware);
                route
            })
            .chain(mounted_routes)
            .collect();
        let files = files.into_iter()
            .map(|mut file| {
                file.stack_middleware(&middleware);
                file
            })
            .chain(mounted_files)
            .collect();
        Flattened { routes, files }
    }
}
