//! # tether
//!
//! Middleware chains and mountable routers for JSON APIs, on top of any HTTP
//! transport.
//!
//! ## The contract
//!
//! tether does three things:
//!
//! - **Runs a middleware chain** around each handler. A middleware can work
//!   before the handler, after it, or stop the request outright. See
//!   [`Context`].
//! - **Composes routers.** Mounting a router flattens its routes into the
//!   parent, joining path prefixes and stacking middleware outer-to-inner.
//!   See [`Router`].
//! - **Speaks JSON.** Handler results and errors go out as
//!   `application/json`; request bodies come in through
//!   [`Context::bind_json`].
//!
//! Path matching belongs to the transport. tether hands it `"<METHOD> <path>"`
//! keys and callbacks through the [`Transport`] trait. [`Mux`] is a ready-made
//! one and [`Server`] puts it on the network with hyper.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use serde::Deserialize;
//! use serde_json::json;
//! use tether::{Context, Data, Error, HttpRoute, Mux, Router, Server, Status, middleware};
//!
//! #[derive(Deserialize)]
//! struct NewUser { name: String }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), tether::SetupError> {
//!     let mut users = Router::new("/users");
//!     users.get("/", list_users);
//!     if let Some(route) = users.post("/", create_user) {
//!         route.middleware(middleware::from_fn(require_token));
//!     }
//!
//!     let mut api = Router::new("/api");
//!     api.middleware(middleware::trace());
//!     api.handle("/v1", users)?;
//!
//!     let mut mux = Mux::new();
//!     mux.register(api)?;
//!     Server::bind("0.0.0.0:3000").serve(mux).await
//! }
//!
//! fn require_token(ctx: &mut Context<'_>) -> Result<(), Error> {
//!     if ctx.request().header("authorization").is_none() {
//!         return Err(ctx.abort_with_error("missing token", Status::Unauthorized));
//!     }
//!     ctx.next();
//!     Ok(())
//! }
//!
//! fn list_users(_ctx: &mut Context<'_>) -> Result<Option<Data>, Error> {
//!     Ok(Some(Data::ok(json!([{ "name": "alice" }]))))
//! }
//!
//! fn create_user(ctx: &mut Context<'_>) -> Result<Option<Data>, Error> {
//!     let user: NewUser = ctx.bind_json()?;
//!     Ok(Some(Data::new(Status::Created, json!({ "name": user.name }))))
//! }
//! ```

mod context;
mod error;
mod files;
mod handler;
mod method;
mod request;
mod response;
mod route;
mod router;
mod server;
mod status;
mod transport;

pub mod middleware;

pub use context::{ChainState, Context, ENCODE_FAILED, INVALID_JSON};
pub use error::{Error, SetupError};
pub use files::FileHandler;
pub use handler::{Handler, HandlerResult};
pub use method::Method;
pub use middleware::Middleware;
pub use request::Request;
pub use response::{ContentType, Data, ResponseWriter};
pub use route::{HttpRoute, Route};
pub use router::{HttpRouter, Router};
pub use server::Server;
pub use status::Status;
pub use transport::{Callback, Mux, Transport};
