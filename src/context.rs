//! Per-request execution context and the middleware chain engine.
//!
//! # How the chain runs
//!
//! A route hands the context its chain: every stacked middleware followed by
//! a terminal link that calls the business handler. [`Context::next`] then
//! walks the chain with a cursor:
//!
//! ```text
//! next()                       state
//! ├─ m1 pre-work               Running(0)
//! │  └─ next()
//! │     ├─ m2 pre-work         Running(1)
//! │     │  └─ next()
//! │     │     └─ handler       Running(2)
//! │     │        → end of chain: Completed
//! │     └─ m2 post-work        (loop sees Completed, stops)
//! └─ m1 post-work
//! ```
//!
//! `next` is a loop, not a pure recursion. A link that returns without
//! calling `next` only pauses itself: the loop moves on to the following
//! link. The only way to stop the walk is [`Context::abort`] (directly or via
//! one of the `abort_with_*` helpers, or by writing a JSON response).
//!
//! Errors a link returns are appended to the context's error list and do
//! **not** stop the chain. A middleware that wants to short-circuit must
//! abort:
//!
//! ```rust
//! use tether::{Context, Error, Status};
//!
//! fn require_token(ctx: &mut Context<'_>) -> Result<(), Error> {
//!     if ctx.request().header("authorization").is_none() {
//!         return Err(ctx.abort_with_error("missing token", Status::Unauthorized));
//!     }
//!     ctx.next();
//!     Ok(())
//! }
//! ```

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, error, warn};

use crate::error::Error;
use crate::middleware::Middleware;
use crate::request::Request;
use crate::response::{ContentType, ResponseWriter};
use crate::status::Status;

/// Body of the error reported when `bind_json` cannot decode the request.
pub const INVALID_JSON: &str = "invalid JSON format";

/// Body of the error recorded when `write_json` cannot encode its value.
pub const ENCODE_FAILED: &str = "failed to encode JSON response";

/// Where the chain walk currently stands.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ChainState {
    /// Chain installed (or not yet), nothing has run.
    Idle,
    /// The link at this index is executing.
    Running(usize),
    /// Stopped early. No further link runs, in this or any enclosing `next`.
    Aborted,
    /// Every link has been visited.
    Completed,
}

/// Mutable state for one request's trip through a middleware chain.
///
/// Created per request by the route callback and dropped when the response
/// is handed back to the transport. Never shared between requests.
pub struct Context<'w> {
    request: Request,
    response: &'w mut ResponseWriter,
    chain: Vec<Middleware>,
    installed: bool,
    state: ChainState,
    errors: Vec<Error>,
    // (link index, error index) of the latest error recorded through
    // `abort_with_error` while a link was running.
    recorded_by: Option<(usize, usize)>,
}

impl<'w> Context<'w> {
    pub fn new(request: Request, response: &'w mut ResponseWriter) -> Self {
        Self {
            request,
            response,
            chain: Vec::new(),
            installed: false,
            state: ChainState::Idle,
            errors: Vec::new(),
            recorded_by: None,
        }
    }

    pub fn request(&self) -> &Request { &self.request }
    pub fn request_mut(&mut self) -> &mut Request { &mut self.request }
    pub fn response(&self) -> &ResponseWriter { self.response }
    pub fn response_mut(&mut self) -> &mut ResponseWriter { self.response }
    pub fn state(&self) -> ChainState { self.state }

    // ── Chain control ─────────────────────────────────────────────────────────

    /// Installs the chain. Allowed once, before the first [`next`](Self::next).
    pub fn set_chain(&mut self, chain: Vec<Middleware>) -> Result<(), Error> {
        if self.installed || self.state != ChainState::Idle {
            return Err(Error::internal("middleware chain already installed"));
        }
        self.chain = chain;
        self.installed = true;
        Ok(())
    }

    /// Runs the remaining links of the chain, starting after the current one.
    ///
    /// An `Err` a link returns is appended to [`errors`](Self::errors),
    /// unless it is the very error that link recorded itself through
    /// [`abort_with_error`](Self::abort_with_error) or
    /// [`bind_json`](Self::bind_json). An equal error recorded by a nested
    /// link is appended again.
    pub fn next(&mut self) {
        let mut index = match self.state {
            ChainState::Idle => 0,
            ChainState::Running(i) => i + 1,
            ChainState::Aborted | ChainState::Completed => return,
        };

        loop {
            let Some(link) = self.chain.get(index).cloned() else {
                self.state = ChainState::Completed;
                return;
            };
            self.state = ChainState::Running(index);

            if let Err(err) = link(self) {
                // `return Err(ctx.abort_with_error(..))` already recorded it.
                let own = self.recorded_by
                    .filter(|&(by, _)| by == index)
                    .and_then(|(_, at)| self.errors.get(at));
                if own != Some(&err) {
                    self.errors.push(err);
                }
            }

            index = match self.state {
                ChainState::Running(i) => i + 1,
                ChainState::Idle | ChainState::Aborted | ChainState::Completed => return,
            };
        }
    }

    /// Stops the chain. No further link runs.
    pub fn abort(&mut self) {
        self.state = ChainState::Aborted;
    }

    pub fn is_aborted(&self) -> bool {
        self.state == ChainState::Aborted
    }

    /// Commits `code` as the response status, then aborts.
    pub fn abort_with_status(&mut self, code: impl Into<u16>) {
        self.response.write_status(code);
        self.abort();
    }

    /// Records an [`Error`], aborts, and hands the error back so a middleware
    /// can `return Err(ctx.abort_with_error(..))` in one expression.
    pub fn abort_with_error(&mut self, message: impl Into<String>, code: impl Into<u16>) -> Error {
        let err = Error::new(message, code);
        if let ChainState::Running(link) = self.state {
            self.recorded_by = Some((link, self.errors.len()));
        }
        self.errors.push(err.clone());
        self.abort();
        err
    }

    // ── JSON ──────────────────────────────────────────────────────────────────

    /// Decodes the request body. The body is consumed either way.
    ///
    /// On failure records a `400` error with body [`INVALID_JSON`], aborts,
    /// and returns that error.
    pub fn bind_json<T: DeserializeOwned>(&mut self) -> Result<T, Error> {
        let body = self.request.take_body();
        serde_json::from_slice(&body).map_err(|e| {
            debug!(path = self.request.path(), "request body rejected: {e}");
            self.abort_with_error(INVALID_JSON, Status::BadRequest)
        })
    }

    /// Writes `value` as an `application/json` response with status `code`,
    /// then aborts. A written body is final.
    ///
    /// If a body was already written this only aborts. A status committed
    /// earlier (say by [`abort_with_status`](Self::abort_with_status)) is
    /// kept and `code` is ignored. If `value` cannot be encoded, records a
    /// `500` error and aborts with status `500`.
    pub fn write_json<T: Serialize + ?Sized>(&mut self, code: impl Into<u16>, value: &T) {
        if self.response.has_body() {
            warn!(path = self.request.path(), "response body already written, dropping JSON body");
            self.abort();
            return;
        }
        match serde_json::to_vec(value) {
            Ok(bytes) => {
                self.response.set_header("content-type", ContentType::Json.as_str());
                if !self.response.is_written() {
                    self.response.write_status(code);
                }
                self.response.write(&bytes);
                self.abort();
            }
            Err(e) => {
                error!(path = self.request.path(), "failed to encode response: {e}");
                self.errors.push(Error::internal(ENCODE_FAILED));
                self.abort_with_status(Status::InternalServerError);
            }
        }
    }

    // ── Raw writes ────────────────────────────────────────────────────────────

    /// Commits the response status without aborting.
    pub fn status(&mut self, code: impl Into<u16>) {
        self.response.write_status(code);
    }

    /// Appends raw bytes to the response body without aborting.
    pub fn write(&mut self, bytes: &[u8]) {
        self.response.write(bytes);
    }

    // ── Errors ────────────────────────────────────────────────────────────────

    /// Every error recorded so far, oldest first.
    pub fn errors(&self) -> &[Error] { &self.errors }

    /// The most recently recorded error.
    pub fn last_error(&self) -> Option<&Error> { self.errors.last() }

    /// All recorded errors rendered on one line, oldest first.
    pub fn error_stack(&self) -> String {
        self.errors.iter()
            .map(Error::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    }
}
