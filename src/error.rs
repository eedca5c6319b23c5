//! Error types.
//!
//! Two kinds of failure exist and they never mix:
//!
//! - [`Error`] is a request-time failure. Middleware and handlers produce it,
//!   the [`Context`](crate::Context) accumulates it, and the route serializes
//!   the most recent one as the JSON response body.
//! - [`SetupError`] is a startup-time failure: a malformed route path, a
//!   duplicate registration, a bad listen address, an I/O error.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::status::Status;

/// A request-time failure carrying a message and an HTTP status code.
///
/// Serializes as `{"message": "...", "code": 400}`.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Error {
    message: String,
    code: u16,
}

impl Error {
    /// Builds an error. The status code is mandatory; there is no default.
    pub fn new(message: impl Into<String>, code: impl Into<u16>) -> Self {
        Self { message: message.into(), code: code.into() }
    }

    /// `400 Bad Request`.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(message, Status::BadRequest)
    }

    /// `404 Not Found`.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(message, Status::NotFound)
    }

    /// `500 Internal Server Error`.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(message, Status::InternalServerError)
    }

    pub fn message(&self) -> &str { &self.message }
    pub fn code(&self) -> u16 { self.code }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code, self.message)
    }
}

impl std::error::Error for Error {}

/// A failure while building routers or starting the server.
#[derive(Debug)]
pub enum SetupError {
    /// A route or mount path that does not begin with `/`.
    InvalidPath(String),
    /// The transport already holds a callback for this key.
    DuplicateRoute(String),
    /// The listen address could not be parsed as `host:port`.
    InvalidAddr(String),
    Io(std::io::Error),
}

impl fmt::Display for SetupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPath(path)    => write!(f, "invalid route path `{path}`: must begin with `/`"),
            Self::DuplicateRoute(key)  => write!(f, "route `{key}` is already registered"),
            Self::InvalidAddr(addr)    => write!(f, "invalid socket address `{addr}`"),
            Self::Io(e)                => write!(f, "io: {e}"),
        }
    }
}

impl std::error::Error for SetupError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for SetupError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
