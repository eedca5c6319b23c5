//! The response handle and the success payload.
//!
//! [`ResponseWriter`] buffers what the chain writes; the transport turns it
//! into a real HTTP response once the chain returns. [`Data`] is what a
//! handler returns on success.

use bytes::Bytes;
use http_body_util::Full;
use serde::Serialize;
use tracing::warn;

use crate::error::Error;
use crate::status::Status;

// ── ContentType ───────────────────────────────────────────────────────────────

/// Content-type values tether emits.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ContentType {
    Css,          // text/css
    Html,         // text/html; charset=utf-8
    Javascript,   // text/javascript
    Jpeg,         // image/jpeg
    Json,         // application/json
    OctetStream,  // application/octet-stream
    Png,          // image/png
    Svg,          // image/svg+xml
    Text,         // text/plain; charset=utf-8
}

impl ContentType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Css         => "text/css",
            Self::Html        => "text/html; charset=utf-8",
            Self::Javascript  => "text/javascript",
            Self::Jpeg        => "image/jpeg",
            Self::Json        => "application/json",
            Self::OctetStream => "application/octet-stream",
            Self::Png         => "image/png",
            Self::Svg         => "image/svg+xml",
            Self::Text        => "text/plain; charset=utf-8",
        }
    }

    /// Guesses from a file extension, falling back to `application/octet-stream`.
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "css"          => Self::Css,
            "htm" | "html" => Self::Html,
            "js" | "mjs"   => Self::Javascript,
            "jpg" | "jpeg" => Self::Jpeg,
            "json"         => Self::Json,
            "png"          => Self::Png,
            "svg"          => Self::Svg,
            "txt"          => Self::Text,
            _              => Self::OctetStream,
        }
    }
}

// ── ResponseWriter ────────────────────────────────────────────────────────────

/// A buffered response handle.
///
/// The status is committed at most once: the first `write_status` (or the
/// first `write`, which commits `200`) wins. Headers stay open until the
/// first body write.
#[derive(Debug, Default)]
pub struct ResponseWriter {
    status: Option<u16>,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
    body_written: bool,
}

impl ResponseWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a header, replacing any previous value under the same name.
    /// Ignored once the body has been written.
    pub fn set_header(&mut self, name: &str, value: &str) {
        if self.body_written {
            warn!(header = name, "header set after body was written, ignoring");
            return;
        }
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((name.to_owned(), value.to_owned()));
    }

    /// Commits the status code. Later calls are ignored.
    pub fn write_status(&mut self, code: impl Into<u16>) {
        let code = code.into();
        match self.status {
            Some(committed) => warn!(committed, ignored = code, "superfluous write_status call"),
            None => self.status = Some(code),
        }
    }

    /// Appends to the body, committing `200` first if nothing was committed.
    pub fn write(&mut self, bytes: &[u8]) {
        if self.status.is_none() {
            self.status = Some(Status::Ok.code());
        }
        self.body.extend_from_slice(bytes);
        self.body_written = true;
    }

    /// True once a status has been committed.
    pub fn is_written(&self) -> bool {
        self.status.is_some()
    }

    /// True once `write` has been called. A committed status alone does not
    /// count.
    pub fn has_body(&self) -> bool {
        self.body_written
    }

    /// The committed status, or `200` if nothing was committed.
    pub fn status(&self) -> u16 {
        self.status.unwrap_or(Status::Ok.code())
    }

    pub fn headers(&self) -> &[(String, String)] { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Writes `err` as a JSON body. Its code becomes the status unless one
    /// was already committed.
    pub(crate) fn write_error(&mut self, err: &Error) {
        self.set_header("content-type", ContentType::Json.as_str());
        if !self.is_written() {
            self.write_status(err.code());
        }
        if let Ok(body) = serde_json::to_vec(err) {
            self.write(&body);
        }
    }

    /// Converts into the `http` response hyper sends.
    pub fn into_http(self) -> http::Response<Full<Bytes>> {
        let mut builder = http::Response::builder().status(self.status());
        for (name, value) in &self.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        match builder.body(Full::new(Bytes::from(self.body))) {
            Ok(res) => res,
            Err(e) => {
                warn!("response could not be built: {e}");
                let mut res = http::Response::new(Full::new(Bytes::new()));
                *res.status_mut() = http::StatusCode::INTERNAL_SERVER_ERROR;
                res
            }
        }
    }
}

// ── Data ──────────────────────────────────────────────────────────────────────

/// A successful handler result: a JSON payload plus the status to send it with.
///
/// Only the payload reaches the wire.
///
/// ```rust
/// use tether::{Data, Status};
/// use serde_json::json;
///
/// let created = Data::new(Status::Created, json!({ "id": 42 }));
/// assert_eq!(created.code(), 201);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Data {
    code: u16,
    payload: serde_json::Value,
}

impl Data {
    pub fn new(code: impl Into<u16>, payload: serde_json::Value) -> Self {
        Self { code: code.into(), payload }
    }

    /// `200 OK` with `payload`.
    pub fn ok(payload: serde_json::Value) -> Self {
        Self::new(Status::Ok, payload)
    }

    /// Serializes any `Serialize` value up front. Fails with a 500 [`Error`].
    pub fn from_serialize<T: Serialize + ?Sized>(
        code: impl Into<u16>,
        value: &T,
    ) -> Result<Self, Error> {
        let payload = serde_json::to_value(value)
            .map_err(|e| Error::internal(format!("failed to encode response data: {e}")))?;
        Ok(Self::new(code, payload))
    }

    pub fn code(&self) -> u16 { self.code }
    pub fn payload(&self) -> &serde_json::Value { &self.payload }
}
