//! HTTP status codes as a typed enum.
//!
//! Every API that takes a status accepts `impl Into<u16>`, so a [`Status`]
//! and a bare integer are interchangeable:
//!
//! ```rust
//! use tether::{Error, Status};
//!
//! let a = Error::new("missing field", Status::BadRequest);
//! let b = Error::new("missing field", 400u16);
//! assert_eq!(a.code(), b.code());
//! ```
//!
//! Only the codes a JSON API actually hands back are named here. Anything
//! else goes through as a raw `u16`.

/// The status codes tether handlers commonly return.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Status {
    // ── 2xx Success ───────────────────────────────────────────────────────────
    Ok,                   // 200
    Created,              // 201
    Accepted,             // 202
    NoContent,            // 204

    // ── 3xx Redirection ───────────────────────────────────────────────────────
    MovedPermanently,     // 301
    Found,                // 302
    NotModified,          // 304

    // ── 4xx Client errors ─────────────────────────────────────────────────────
    BadRequest,           // 400
    Unauthorized,         // 401
    Forbidden,            // 403
    NotFound,             // 404
    MethodNotAllowed,     // 405
    Conflict,             // 409
    UnprocessableContent, // 422
    TooManyRequests,      // 429

    // ── 5xx Server errors ─────────────────────────────────────────────────────
    InternalServerError,  // 500
    NotImplemented,       // 501
    BadGateway,           // 502
    ServiceUnavailable,   // 503
}

impl Status {
    /// The numeric code, e.g. `404`.
    pub fn code(self) -> u16 {
        match self {
            Self::Ok                   => 200,
            Self::Created              => 201,
            Self::Accepted             => 202,
            Self::NoContent            => 204,
            Self::MovedPermanently     => 301,
            Self::Found                => 302,
            Self::NotModified          => 304,
            Self::BadRequest           => 400,
            Self::Unauthorized         => 401,
            Self::Forbidden            => 403,
            Self::NotFound             => 404,
            Self::MethodNotAllowed     => 405,
            Self::Conflict             => 409,
            Self::UnprocessableContent => 422,
            Self::TooManyRequests      => 429,
            Self::InternalServerError  => 500,
            Self::NotImplemented       => 501,
            Self::BadGateway           => 502,
            Self::ServiceUnavailable   => 503,
        }
    }

    /// True for 4xx and 5xx codes.
    pub fn is_error(code: u16) -> bool {
        code >= 400
    }
}

impl From<Status> for u16 {
    fn from(status: Status) -> u16 {
        status.code()
    }
}
