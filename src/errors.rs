//! Crate-wide error classification.
//!
//! A single `ErrorKind` enum carries both low-level parse failures and the
//! higher-level dispositions from the connection loop (handler abort,
//! accept-predicate rejection, internal failure). Every variant knows its
//! status code, its message, and whether the connection must close — the
//! connection loop consults these instead of re-deriving them at each call
//! site. Implemented by hand rather than via a derive-macro error crate,
//! the same way `query::Error` in this codebase's lineage does it.

use std::error;
use std::fmt;
use std::io;

use crate::http::StatusCode;

/// A wrapped [`io::Error`] that compares by [`io::Error::kind`] so
/// `ErrorKind` can derive `PartialEq`/`Eq` for tests.
#[derive(Debug)]
pub struct IoError(io::Error);

impl PartialEq for IoError {
    fn eq(&self, other: &Self) -> bool {
        self.0.kind() == other.0.kind()
    }
}

impl Eq for IoError {}

impl From<io::Error> for IoError {
    fn from(e: io::Error) -> Self {
        IoError(e)
    }
}

impl fmt::Display for IoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Everything that can go wrong while parsing a request, running the
/// middleware/handler pipeline, or writing a response.
#[derive(Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Request line's method word didn't match GET/PUT/POST/HEAD/DELETE.
    InvalidMethod,
    /// Request line's target was missing or malformed.
    InvalidUrl,
    /// Request line's version token was present but unparseable.
    InvalidVersion,
    /// Request line's version was parseable but not 1.0 or 1.1.
    UnsupportedVersion,
    /// A header line failed the `name: value` grammar.
    InvalidHeader,
    /// The request carried more header lines than the configured limit.
    TooManyHeaders,
    /// `Content-Length` value was not a valid non-negative integer.
    InvalidContentLength,
    /// `Connection` header carried a value neither `keep-alive` nor `close`.
    InvalidConnection,
    /// `Transfer-Encoding` named something other than `chunked`/`identity`.
    UnsupportedTransferEncoding,
    /// A length-limited or chunked body exceeded the configured cap.
    BodyTooLarge,
    /// The chunked-decoder state machine hit malformed framing.
    ChunkedDecode,
    /// An accept-predicate rejected the request before its body was read.
    AcceptRejected { status: StatusCode, message: String },
    /// A handler signaled an explicit abort with a status and message.
    HandlerAbort { status: StatusCode, message: String },
    /// An unexpected failure inside a handler or middleware callback.
    InternalError(String),
    /// A read or write failed mid-connection.
    Io(IoError),
}

impl ErrorKind {
    /// Builds a [`HandlerAbort`](ErrorKind::HandlerAbort) from a status and
    /// a formatted message, mirroring the "handler signals a failure value"
    /// re-cast of the exception-based abort this crate's interface replaces.
    pub fn handler_abort(status: StatusCode, message: impl Into<String>) -> Self {
        ErrorKind::HandlerAbort { status, message: message.into() }
    }

    /// The status code this error should be reported with.
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorKind::InvalidMethod => StatusCode::BAD_REQUEST,
            ErrorKind::InvalidUrl => StatusCode::BAD_REQUEST,
            ErrorKind::InvalidVersion => StatusCode::BAD_REQUEST,
            ErrorKind::UnsupportedVersion => StatusCode::HTTP_VERSION_NOT_SUPPORTED,
            ErrorKind::InvalidHeader => StatusCode::BAD_REQUEST,
            ErrorKind::TooManyHeaders => StatusCode::REQUEST_HEADER_FIELDS_TOO_LARGE,
            ErrorKind::InvalidContentLength => StatusCode::BAD_REQUEST,
            ErrorKind::InvalidConnection => StatusCode::BAD_REQUEST,
            ErrorKind::UnsupportedTransferEncoding => StatusCode::NOT_IMPLEMENTED,
            ErrorKind::BodyTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ErrorKind::ChunkedDecode => StatusCode::BAD_REQUEST,
            ErrorKind::AcceptRejected { status, .. } => *status,
            ErrorKind::HandlerAbort { status, .. } => *status,
            ErrorKind::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Human-readable message, used as the error response body.
    pub fn message(&self) -> String {
        match self {
            ErrorKind::InvalidMethod => "unsupported or malformed method".into(),
            ErrorKind::InvalidUrl => "malformed request target".into(),
            ErrorKind::InvalidVersion => "malformed HTTP version".into(),
            ErrorKind::UnsupportedVersion => "unsupported HTTP version".into(),
            ErrorKind::InvalidHeader => "malformed header line".into(),
            ErrorKind::TooManyHeaders => "too many header lines".into(),
            ErrorKind::InvalidContentLength => "invalid Content-Length".into(),
            ErrorKind::InvalidConnection => "invalid Connection header".into(),
            ErrorKind::UnsupportedTransferEncoding => "unsupported transfer encoding".into(),
            ErrorKind::BodyTooLarge => "request body too large".into(),
            ErrorKind::ChunkedDecode => "malformed chunked transfer encoding".into(),
            ErrorKind::AcceptRejected { message, .. } => message.clone(),
            ErrorKind::HandlerAbort { message, .. } => message.clone(),
            ErrorKind::InternalError(message) => message.clone(),
            ErrorKind::Io(e) => e.to_string(),
        }
    }

    /// Whether the connection must close after this error is reported.
    /// [`HandlerAbort`](ErrorKind::HandlerAbort) is the sole exception:
    /// keep-alive is honored for a deliberate handler failure.
    pub fn closes_connection(&self) -> bool {
        !matches!(self, ErrorKind::HandlerAbort { .. })
    }
}

impl From<io::Error> for ErrorKind {
    fn from(e: io::Error) -> Self {
        ErrorKind::Io(e.into())
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl error::Error for ErrorKind {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_request_maps_to_400() {
        assert_eq!(ErrorKind::InvalidMethod.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorKind::InvalidHeader.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn unsupported_version_maps_to_505() {
        assert_eq!(ErrorKind::UnsupportedVersion.status(), StatusCode::HTTP_VERSION_NOT_SUPPORTED);
    }

    #[test]
    fn handler_abort_keeps_connection_alive() {
        let err = ErrorKind::handler_abort(StatusCode::FORBIDDEN, "nope");
        assert!(!err.closes_connection());
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
        assert_eq!(err.message(), "nope");
    }

    #[test]
    fn every_other_kind_closes_the_connection() {
        assert!(ErrorKind::InvalidMethod.closes_connection());
        assert!(ErrorKind::BodyTooLarge.closes_connection());
        assert!(ErrorKind::InternalError("boom".into()).closes_connection());
    }

    #[test]
    fn io_errors_compare_by_kind() {
        let a: ErrorKind = io::Error::new(io::ErrorKind::BrokenPipe, "x").into();
        let b: ErrorKind = io::Error::new(io::ErrorKind::BrokenPipe, "y").into();
        assert_eq!(a, b);
    }
}
