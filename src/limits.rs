//! Request and connection limits.
//!
//! Defaults are conservative on purpose: they bound the memory a single
//! connection can make the server allocate before a handler ever sees a
//! byte of it, and they bound how long a connection may sit idle. Override
//! either struct through [`crate::ServerBuilder::request_limits`] /
//! [`crate::ServerBuilder::connection_limits`].

use std::time::Duration;

/// Bounds on a single request's head and body.
#[derive(Debug, Clone)]
pub struct ReqLimits {
    /// Maximum length of the request target in bytes (default: `2048`).
    pub target_size: usize,

    /// Maximum number of header lines per request (default: `64`).
    pub header_count: usize,
    /// Maximum header name length in bytes (default: `64`).
    pub header_name_size: usize,
    /// Maximum header value length in bytes (default: `8192`).
    pub header_value_size: usize,

    /// Maximum request body size in bytes, whether length-delimited or
    /// chunked (default: `2 MiB`).
    pub body_size: usize,

    #[doc(hidden)]
    #[allow(dead_code)]
    pub _priv: (),
}

impl Default for ReqLimits {
    fn default() -> Self {
        ReqLimits {
            target_size: 2048,
            header_count: 64,
            header_name_size: 64,
            header_value_size: 8 * 1024,
            body_size: 2 * 1024 * 1024,
            _priv: (),
        }
    }
}

/// Bounds on a connection's lifetime and idle behavior.
#[derive(Debug, Clone)]
pub struct ConnLimits {
    /// Maximum time to wait for the next byte of a request before closing
    /// the connection (default: `30 seconds`). Applies to every read,
    /// including the first read of a fresh keep-alive request.
    pub read_timeout: Duration,
    /// Maximum time to wait for a write to complete (default: `30 seconds`).
    pub write_timeout: Duration,

    #[doc(hidden)]
    #[allow(dead_code)]
    pub _priv: (),
}

impl Default for ConnLimits {
    fn default() -> Self {
        ConnLimits {
            read_timeout: Duration::from_secs(30),
            write_timeout: Duration::from_secs(30),
            _priv: (),
        }
    }
}
