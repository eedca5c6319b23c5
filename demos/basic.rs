//! A small JSON API with nested routers, middleware and a static directory.
//!
//! Run with:
//!   cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/api/v1/users
//!   curl -X POST http://localhost:3000/api/v1/users \
//!        -H 'authorization: Bearer demo' \
//!        -d '{"name":"alice"}'
//!   curl -X POST http://localhost:3000/api/v1/users -d '{"name":"bob"}'   # 401
//!   curl -X POST http://localhost:3000/api/v1/users \
//!        -H 'authorization: Bearer demo' -d '{"name":'                  # 400
//!   curl http://localhost:3000/static/Cargo.toml

use serde::{Deserialize, Serialize};
use serde_json::json;
use tether::{Context, Data, Error, HttpRoute, Mux, Router, Server, Status, middleware};

#[derive(Deserialize, Serialize)]
struct User {
    name: String,
}

#[tokio::main]
async fn main() -> Result<(), tether::SetupError> {
    tracing_subscriber::fmt::init();

    let mut users = Router::new("/users");
    users.get("/", list_users);
    if let Some(route) = users.post("/", create_user) {
        route.middleware(middleware::from_fn(require_token));
    }
    users.delete("/", |_ctx| Err(Error::new("not implemented", Status::NotImplemented)));

    let mut api = Router::new("/api");
    api.middleware(middleware::trace());
    api.handle("/v1", users)?;

    let mut app = Router::new("");
    app.handle("/", api)?;
    app.serve_dir("/static", env!("CARGO_MANIFEST_DIR"));

    let mut mux = Mux::new();
    mux.register(app)?;

    Server::bind("0.0.0.0:3000").serve(mux).await
}

fn require_token(ctx: &mut Context<'_>) -> Result<(), Error> {
    match ctx.request().header("authorization") {
        Some(token) if token.starts_with("Bearer ") => {
            ctx.next();
            Ok(())
        }
        _ => Err(ctx.abort_with_error("missing bearer token", Status::Unauthorized)),
    }
}

fn list_users(_ctx: &mut Context<'_>) -> Result<Option<Data>, Error> {
    Ok(Some(Data::ok(json!([{ "name": "alice" }, { "name": "bob" }]))))
}

fn create_user(ctx: &mut Context<'_>) -> Result<Option<Data>, Error> {
    let user: User = ctx.bind_json()?;
    Ok(Some(Data::from_serialize(Status::Created, &user)?))
}
