//! Static directory serving.
//!
//! A [`FileHandler`] owns a path prefix and a directory. The transport sends
//! it every request under that prefix; the prefix is stripped and the rest
//! is looked up beneath the directory. It mounts and stacks middleware like
//! any route, and that is all it shares with one.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::context::Context;
use crate::error::Error;
use crate::middleware::{Middleware, from_fn};
use crate::response::ContentType;
use crate::route::{HttpRoute, chain_callback, join_path, trim_path};
use crate::status::Status;
use crate::transport::Callback;

/// Serves the files beneath `root` for `GET` requests under `path`.
#[derive(Clone)]
pub struct FileHandler {
    path: String,
    root: PathBuf,
    middleware: Vec<Middleware>,
}

impl FileHandler {
    pub fn new(path: &str, root: impl Into<PathBuf>) -> Self {
        Self {
            path: join_path("", path),
            root: root.into(),
            middleware: Vec::new(),
        }
    }

    pub fn root(&self) -> &Path { &self.root }
}

impl HttpRoute for FileHandler {
    /// The bare prefix: file handlers answer every method and decide for
    /// themselves.
    fn route(&self) -> String {
        self.path.clone()
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
        let prefix = trim_path(&self.path).to_owned();
        let root = self.root.clone();
        chain.push(from_fn(move |ctx| serve_file(ctx, &prefix, &root)));
        chain_callback(chain)
    }
}

fn serve_file(ctx: &mut Context<'_>, prefix: &str, root: &Path) -> Result<(), Error> {
    if ctx.request().method() != "GET" {
        return Err(ctx.abort_with_error("method not allowed", Status::MethodNotAllowed));
    }

    let request_path = ctx.request().path();
    let rest = request_path.strip_prefix(prefix).unwrap_or(request_path);
    let Some(mut file) = resolve(root, rest) else {
        return Err(ctx.abort_with_error("file not found", Status::NotFound));
    };
    if file.is_dir() {
        file.push("index.html");
    }

    match std::fs::read(&file) {
        Ok(bytes) => {
            let content_type = file.extension()
                .and_then(|ext| ext.to_str())
                .map_or(ContentType::OctetStream, ContentType::from_extension);
            let response = ctx.response_mut();
            response.set_header("content-type", content_type.as_str());
            response.write_status(Status::Ok);
            response.write(&bytes);
            ctx.abort();
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            Err(ctx.abort_with_error("file not found", Status::NotFound))
        }
        Err(e) => {
            debug!(file = %file.display(), "static file unreadable: {e}");
            Err(ctx.abort_with_error("file could not be read", Status::InternalServerError))
        }
    }
}

/// Maps a URL remainder onto `root`. `None` for anything that tries to
/// leave it.
fn resolve(root: &Path, rest: &str) -> Option<PathBuf> {
    let mut file = root.to_path_buf();
    for segment in rest.split('/').filter(|s| !s.is_empty() && *s != ".") {
        if segment == ".." || segment.contains('\\') || segment.contains('\0') {
            return None;
        }
        file.push(segment);
    }
    Some(file)
}
