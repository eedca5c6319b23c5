//! Static directories mounted through routers.

use std::fs;

use serde_json::json;
use tether::{Data, HttpRoute, Request, Router, Status, middleware};

mod common;

use common::{entries, error_body, get, log, mark, mux};

fn site() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("index.html"), "<h1>home</h1>").unwrap();
    fs::create_dir(dir.path().join("css")).unwrap();
    fs::write(dir.path().join("css").join("site.css"), "body{}").unwrap();
    dir
}

#[test]
fn serves_files_below_the_prefix() {
    let dir = site();
    let mut router = Router::new("/app");
    router.serve_dir("/static", dir.path());

    let res = get(&mux(router), "/app/static/css/site.css");
    assert_eq!(res.status(), 200);
    assert_eq!(res.header("content-type"), Some("text/css"));
    assert_eq!(res.body(), b"body{}");
}

#[test]
fn directory_requests_get_index_html() {
    let dir = site();
    let mut router = Router::new("");
    router.serve_dir("/static/", dir.path());
    let mux = mux(router);

    for path in ["/static", "/static/"] {
        let res = get(&mux, path);
        assert_eq!(res.status(), 200, "{path}");
        assert_eq!(res.body(), b"<h1>home</h1>");
    }
}

#[test]
fn missing_and_escaping_paths_are_404() {
    let dir = site();
    let mut router = Router::new("");
    router.serve_dir("/static", dir.path());
    let mux = mux(router);

    let res = get(&mux, "/static/nope.txt");
    assert_eq!(res.status(), 404);
    assert_eq!(error_body(&res).message(), "file not found");

    assert_eq!(get(&mux, "/static/../Cargo.toml").status(), 404);
}

#[test]
fn only_get_is_served() {
    let dir = site();
    let mut router = Router::new("");
    router.serve_dir("/static", dir.path());

    let res = mux(router).dispatch(Request::new("POST", "/static/index.html"));
    assert_eq!(res.status(), 405);
}

#[test]
fn api_routes_win_over_a_root_directory() {
    let dir = site();
    let mut router = Router::new("");
    router.serve_dir("/", dir.path());
    router.get("/api/ping", |_ctx| Ok(Some(Data::ok(json!("pong")))));
    let mux = mux(router);

    assert_eq!(get(&mux, "/api/ping").body(), br#""pong""#);
    assert_eq!(get(&mux, "/css/site.css").body(), b"body{}");
}

#[test]
fn mounted_directories_run_router_middleware() {
    let dir = site();
    let log = log();

    let mut assets = Router::new("/assets");
    assets.middleware(mark(&log, "assets"));
    assets.serve_dir("/", dir.path());

    let mut app = Router::new("/app");
    app.middleware(mark(&log, "app"));
    app.handle("/", assets).unwrap();

    let res = get(&mux(app), "/app/assets/index.html");
    assert_eq!(res.status(), 200);
    assert_eq!(entries(&log), ["app", "assets"]);
}

#[test]
fn middleware_can_guard_a_directory() {
    let dir = site();
    let mut router = Router::new("");
    if let Some(files) = router.serve_dir("/private", dir.path()) {
        files.middleware(middleware::from_fn(|ctx| {
            Err(ctx.abort_with_error("private", Status::Forbidden))
        }));
    }

    let res = get(&mux(router), "/private/index.html");
    assert_eq!(res.status(), 403);
}
