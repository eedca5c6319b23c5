//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use tether::{Error, Middleware, Mux, Request, ResponseWriter, Router, middleware};

/// An execution log shared between middleware and handlers.
pub type Log = Arc<Mutex<Vec<String>>>;

pub fn log() -> Log {
    Log::default()
}

pub fn entries(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

/// A middleware that logs `<label>-pre`, continues the chain, then logs `<label>-post`.
pub fn wrap(log: &Log, label: &'static str) -> Middleware {
    let log = Arc::clone(log);
    middleware::from_fn(move |ctx| {
        log.lock().unwrap().push(format!("{label}-pre"));
        ctx.next();
        log.lock().unwrap().push(format!("{label}-post"));
        Ok(())
    })
}

/// A middleware that logs `label` and continues the chain.
pub fn mark(log: &Log, label: &'static str) -> Middleware {
    let log = Arc::clone(log);
    middleware::from_fn(move |ctx| {
        log.lock().unwrap().push(label.to_owned());
        ctx.next();
        Ok(())
    })
}

/// Registers `router` on a fresh mux.
pub fn mux(router: Router) -> Mux {
    let mut mux = Mux::new();
    mux.register(router).unwrap();
    mux
}

pub fn get(mux: &Mux, path: &str) -> ResponseWriter {
    mux.dispatch(Request::new("GET", path))
}

pub fn send(mux: &Mux, method: &str, path: &str, body: &str) -> ResponseWriter {
    mux.dispatch(
        Request::new(method, path)
            .with_header("content-type", "application/json")
            .with_body(body.as_bytes()),
    )
}

/// Decodes the response body as an [`Error`].
pub fn error_body(res: &ResponseWriter) -> Error {
    serde_json::from_slice(res.body()).unwrap()
}
