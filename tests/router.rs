//! Router composition: prefixes, mounting, middleware precedence, JSON I/O.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::json;
use tether::{
    Context, Data, Error, HttpRoute, HttpRouter, INVALID_JSON, Mux, Request, Router, SetupError,
    Server, Status, middleware,
};

mod common;

use common::{entries, error_body, get, log, mark, mux, send};

fn ok(_ctx: &mut Context<'_>) -> Result<Option<Data>, Error> {
    Ok(Some(Data::ok(json!("ok"))))
}

// ── Paths ─────────────────────────────────────────────────────────────────────

#[test]
fn nested_prefixes_compose() {
    let mut v1 = Router::new("/v1");
    v1.get("/users", ok);

    let mut api = Router::new("/api");
    api.handle("/", v1).unwrap();

    let mux = mux(api);
    assert_eq!(get(&mux, "/api/v1/users").status(), 200);
    assert_eq!(get(&mux, "/api/users").status(), 404);
}

#[test]
fn trailing_slashes_never_double_up() {
    let mut v1 = Router::new("/v1/");
    v1.get("/users/", ok);

    let mut api = Router::new("/api/");
    api.handle("/", v1).unwrap();

    let paths: Vec<_> = api.routes().map(HttpRoute::path).map(str::to_owned).collect();
    assert_eq!(paths, ["/api/v1/users"]);
}

#[test]
fn mounting_twice_goes_three_levels_deep() {
    let mut users = Router::new("/users");
    users.delete("/", ok);

    let mut v2 = Router::new("/v2");
    v2.handle("/admin", users).unwrap();

    let mut root = Router::new("/api");
    root.handle("/", v2).unwrap();

    let mux = mux(root);
    let res = mux.dispatch(Request::new("DELETE", "/api/v2/admin/users"));
    assert_eq!(res.status(), 200);
}

#[test]
fn mounting_leaves_the_parent_prefix_alone() {
    let mut a = Router::new("/a");
    a.get("/x", ok);
    let mut b = Router::new("/b");
    b.get("/y", ok);

    let mut api = Router::new("/api");
    api.handle("/one", a).unwrap();
    api.handle("/two", b).unwrap();
    api.get("/z", ok);

    let mux = mux(api);
    for path in ["/api/one/a/x", "/api/two/b/y", "/api/z"] {
        assert_eq!(get(&mux, path).status(), 200, "{path}");
    }
}

#[test]
fn malformed_route_does_not_stop_registration() {
    let mut router = Router::new("/api");
    assert!(router.get("no-slash", ok).is_none());
    router.get("/fine", ok);

    assert_eq!(get(&mux(router), "/api/fine").status(), 200);
}

#[test]
fn unknown_route_is_a_json_404() {
    let res = get(&mux(Router::new("")), "/nowhere");
    assert_eq!(res.status(), 404);
    assert_eq!(res.header("content-type"), Some("application/json"));
    assert_eq!(error_body(&res).code(), 404);
}

#[test]
fn method_is_part_of_the_key() {
    let mut router = Router::new("");
    router.post("/items", |_ctx| Ok(Some(Data::new(Status::Created, json!({})))));

    let mux = mux(router);
    assert_eq!(send(&mux, "POST", "/items", "{}").status(), 201);
    assert_eq!(get(&mux, "/items").status(), 404);
}

#[test]
fn braces_in_a_path_are_literal() {
    let mut router = Router::new("/users");
    router.get("/{id}", ok);

    let mux = mux(router);
    assert_eq!(get(&mux, "/users/42").status(), 404);
    assert_eq!(get(&mux, "/users/{id}").status(), 200);
}

#[test]
fn duplicate_route_is_rejected_at_registration() {
    let mut router = Router::new("");
    router.get("/dup", ok);
    router.get("/dup/", ok);

    let mut mux = Mux::new();
    assert!(matches!(mux.register(router), Err(SetupError::DuplicateRoute(key)) if key == "GET /dup"));
}

// ── Middleware precedence ─────────────────────────────────────────────────────

#[test]
fn router_middleware_runs_before_route_middleware() {
    let log = log();

    let mut router = Router::new("");
    router.get("/", ok).unwrap().middleware(mark(&log, "B"));
    // Added after the route exists: still first.
    router.middleware(mark(&log, "A"));

    get(&mux(router), "/");
    assert_eq!(entries(&log), ["A", "B"]);
}

#[test]
fn outer_mounts_run_before_inner_mounts() {
    let log = log();

    let mut leaf = Router::new("/leaf");
    leaf.middleware(mark(&log, "leaf-router"));
    leaf.get("/", ok).unwrap().middleware(mark(&log, "route"));

    let mut mid = Router::new("/mid");
    mid.middleware(mark(&log, "mid-router"));
    mid.handle("/", leaf).unwrap();

    let mut top = Router::new("/top");
    top.middleware(mark(&log, "top-router"));
    top.handle("/", mid).unwrap();

    let res = get(&mux(top), "/top/mid/leaf");
    assert_eq!(res.status(), 200);
    assert_eq!(entries(&log), ["top-router", "mid-router", "leaf-router", "route"]);
}

#[test]
fn router_middleware_is_stacked_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);

    let mut child = Router::new("/child");
    child.get("/", ok);

    let mut parent = Router::new("");
    parent.middleware(middleware::from_fn(move |ctx| {
        counter.fetch_add(1, Ordering::SeqCst);
        ctx.next();
        Ok(())
    }));
    parent.get("/own", ok);
    parent.handle("/", child).unwrap();

    let mux = mux(parent);
    get(&mux, "/own");
    get(&mux, "/child");
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

// ── Custom routers ────────────────────────────────────────────────────────────

struct Health {
    router: Router,
    registered: Arc<AtomicUsize>,
}

impl HttpRouter for Health {
    fn register(&mut self) {
        self.registered.fetch_add(1, Ordering::SeqCst);
        self.router.get("/healthz", ok);
    }

    fn into_router(self) -> Router {
        self.router
    }
}

#[test]
fn register_hook_runs_once_before_mounting() {
    let registered = Arc::new(AtomicUsize::new(0));
    let health = Health { router: Router::new("/ops"), registered: Arc::clone(&registered) };

    let mut app = Router::new("");
    app.handle("/", health).unwrap();

    assert_eq!(registered.load(Ordering::SeqCst), 1);
    assert_eq!(get(&mux(app), "/ops/healthz").status(), 200);
}

#[test]
fn register_hook_runs_for_top_level_routers() {
    let registered = Arc::new(AtomicUsize::new(0));
    let health = Health { router: Router::new(""), registered: Arc::clone(&registered) };

    let mut mux = Mux::new();
    mux.register(health).unwrap();

    assert_eq!(registered.load(Ordering::SeqCst), 1);
    assert_eq!(get(&mux, "/healthz").status(), 200);
}

// ── JSON ──────────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
struct Record {
    username: String,
    password: String,
}

#[test]
fn json_round_trips_through_bind_and_write() {
    let records = vec![
        Record { username: "Joseph Joestar".into(), password: "OhMyGod!!".into() },
        Record { username: "Gyro Zeppeli".into(), password: "Pizza_Mozzarella".into() },
    ];

    let mut router = Router::new("/");
    router.post("/test", |ctx| {
        let data: Vec<Record> = ctx.bind_json()?;
        assert!(ctx.errors().is_empty(), "{}", ctx.error_stack());
        ctx.write_json(Status::Ok, &data);
        Ok(None)
    });

    let body = serde_json::to_string(&records).unwrap();
    let res = send(&mux(router), "POST", "/test", &body);

    assert_eq!(res.status(), 200);
    let echoed: Vec<Record> = serde_json::from_slice(res.body()).unwrap();
    assert_eq!(echoed, records);
}

#[test]
fn data_payload_is_the_whole_body() {
    let value = json!({ "nested": { "list": [1, 2.5, "three", null, true] }, "empty": {} });
    let expected = value.clone();

    let mut router = Router::new("");
    router.get("/", move |_ctx| Ok(Some(Data::ok(value.clone()))));

    let res = get(&mux(router), "/");
    let decoded: serde_json::Value = serde_json::from_slice(res.body()).unwrap();
    assert_eq!(decoded, expected);
}

#[test]
fn malformed_body_is_a_400() {
    let mut router = Router::new("");
    router.post("/", |ctx| {
        let record: Record = ctx.bind_json()?;
        Ok(Some(Data::from_serialize(Status::Created, &record)?))
    });

    let res = send(&mux(router), "POST", "/", r#"{"username": "#);

    assert_eq!(res.status(), 400);
    assert_eq!(error_body(&res), Error::new(INVALID_JSON, Status::BadRequest));
}

// Body validation: a non-zero `type` passes, anything else is refused.

#[derive(Deserialize)]
struct Kind {
    #[serde(rename = "type")]
    kind: i32,
}

fn check_kind(ctx: &mut Context<'_>) -> Result<(), Error> {
    let Ok(body) = ctx.bind_json::<Kind>() else {
        return Err(ctx.abort_with_error("Could Not Decode Body", Status::InternalServerError));
    };
    if body.kind == 0 {
        return Err(ctx.abort_with_error("test", Status::InternalServerError));
    }
    ctx.next();
    Ok(())
}

fn write_ok(ctx: &mut Context<'_>) -> Result<Option<Data>, Error> {
    ctx.status(Status::Ok);
    ctx.write(b"ok");
    Ok(None)
}

#[test]
fn route_middleware_validates_body() {
    let mut router = Router::new("/");
    router.post("/", write_ok).unwrap().middleware(middleware::from_fn(check_kind));
    let mux = mux(router);

    let res = send(&mux, "POST", "/", r#"{"type":1}"#);
    assert_eq!(res.status(), 200);
    assert_eq!(res.body(), b"ok");

    let res = send(&mux, "POST", "/", r#"{"type":0}"#);
    assert_eq!(res.status(), 500);
    assert_eq!(error_body(&res).message(), "test");
}

#[test]
fn router_middleware_validates_every_route() {
    let mut router = Router::new("/");
    router.middleware(middleware::from_fn(check_kind));
    router.post("/ok", write_ok);
    router.post("/not-ok", write_ok);
    let mux = mux(router);

    let res = send(&mux, "POST", "/ok", r#"{"type":1}"#);
    assert_eq!(res.status(), 200);
    assert_eq!(res.body(), b"ok");

    let res = send(&mux, "POST", "/not-ok", r#"{"type":0}"#);
    assert_eq!(res.status(), 500);
    assert_eq!(error_body(&res).message(), "test");

    // A decode failure records two errors; the later one is sent.
    let res = send(&mux, "POST", "/ok", "garbage");
    assert_eq!(res.status(), 500);
    assert_eq!(error_body(&res).message(), "Could Not Decode Body");
}

// ── Server ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn server_rejects_a_bad_address() {
    let err = Server::bind("not an address").serve(Mux::new()).await.unwrap_err();
    assert!(matches!(err, SetupError::InvalidAddr(addr) if addr == "not an address"));
}
