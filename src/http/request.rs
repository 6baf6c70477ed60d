//! Request parsing and the three body-polymorphism stages.
//!
//! A request is read in stages because how much of it a caller needs
//! depends entirely on what they're doing with it:
//!
//! - [`HeadRequest`] — the request line and headers, nothing else. This is
//!   all a router needs to pick a handler, and all an accept-predicate or
//!   decode-callback needs to inspect.
//! - [`StreamRequest`] — a `HeadRequest` plus its body as a live
//!   [`InputStream`], produced by [`attach_body`] once the framing
//!   (chunked, length-delimited, absent) has been decided from the
//!   headers. Borrows the connection's socket stream for the body's
//!   lifetime rather than owning it, so the connection gets it back for
//!   the next keep-alive request once the body is drained.
//! - [`Request`] — a `StreamRequest` with the body fully read into memory,
//!   produced by [`StreamRequest::read_body_full`]. This is what ordinary
//!   route handlers receive.

use std::io;

use crate::errors::ErrorKind;
use crate::http::headers::{is_valid_header_name, is_valid_header_value, HeaderMap};
use crate::http::method::{Method, Version};
use crate::http::transfer::{ChunkedDecoder, LengthLimited};
use crate::limits::ReqLimits;
use crate::stream::{self, InputStream};

/// A request body stream, type-erased so middleware can freely wrap it in
/// additional layers (decompression, logging, ...). Borrows rather than
/// owns the underlying socket for `'a`.
pub type BodyStream<'a> = Box<dyn InputStream + Send + 'a>;

struct EmptyStream;

impl InputStream for EmptyStream {
    fn peek(&mut self) -> io::Result<&[u8]> {
        Ok(&[])
    }
    fn consume(&mut self, _n: usize) {}
    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Request line and headers, with no body attached yet.
#[derive(Debug, Clone)]
pub struct HeadRequest {
    pub method: Method,
    pub version: Version,
    pub path: Vec<u8>,
    pub headers: HeaderMap,
    /// Seconds-since-epoch timestamp captured from the server's injected
    /// clock when parsing of this request began.
    pub started_at: u64,
    /// Whether the connection should stay open after this request,
    /// resolved from the `Connection` header and the protocol version's
    /// default.
    pub keep_alive: bool,
}

/// A [`HeadRequest`] with its body attached as a live stream.
pub struct StreamRequest<'a> {
    pub method: Method,
    pub version: Version,
    pub path: Vec<u8>,
    pub headers: HeaderMap,
    pub started_at: u64,
    pub keep_alive: bool,
    pub body: BodyStream<'a>,
}

/// A request with its body fully read into memory. What ordinary route
/// handlers receive.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub version: Version,
    pub path: Vec<u8>,
    pub headers: HeaderMap,
    pub started_at: u64,
    pub keep_alive: bool,
    pub body: Vec<u8>,
}

impl HeadRequest {
    /// Attaches `body` to produce the stream-bodied stage. The body is
    /// normally the result of [`attach_body`], optionally wrapped further
    /// by decode-callback transformers.
    pub fn into_stream(self, body: BodyStream<'_>) -> StreamRequest<'_> {
        StreamRequest {
            method: self.method,
            version: self.version,
            path: self.path,
            headers: self.headers,
            started_at: self.started_at,
            keep_alive: self.keep_alive,
            body,
        }
    }
}

impl<'a> StreamRequest<'a> {
    /// Reads the entire body into memory, failing if it would exceed
    /// `limit` bytes. This is the only enforcement point for chunked
    /// bodies, whose total size isn't known until they've been fully read.
    pub fn read_body_full(mut self, limit: usize) -> Result<Request, ErrorKind> {
        let mut buf = Vec::new();
        loop {
            let chunk = self.body.peek().map_err(body_io_err)?;
            if chunk.is_empty() {
                break;
            }
            if buf.len() + chunk.len() > limit {
                return Err(ErrorKind::BodyTooLarge);
            }
            buf.extend_from_slice(chunk);
            let n = chunk.len();
            self.body.consume(n);
        }
        Ok(Request {
            method: self.method,
            version: self.version,
            path: self.path,
            headers: self.headers,
            started_at: self.started_at,
            keep_alive: self.keep_alive,
            body: buf,
        })
    }

    /// Reads and discards whatever remains of the body. Used by the
    /// connection loop before reusing a keep-alive socket when a handler
    /// didn't consume the body itself.
    pub fn drain(&mut self) -> Result<(), ErrorKind> {
        loop {
            let chunk = self.body.peek().map_err(body_io_err)?;
            if chunk.is_empty() {
                return Ok(());
            }
            let n = chunk.len();
            self.body.consume(n);
        }
    }
}

fn io_err(e: io::Error) -> ErrorKind {
    if e.kind() == io::ErrorKind::UnexpectedEof || e.kind() == io::ErrorKind::InvalidData {
        // Premature EOF or an over-length line while reading the head is a
        // malformed request, not a transport failure.
        ErrorKind::InvalidUrl
    } else {
        ErrorKind::from(e)
    }
}

fn body_io_err(e: io::Error) -> ErrorKind {
    if e.kind() == io::ErrorKind::InvalidData {
        // The chunked decoder reports bad chunk-size lines and bad chunk
        // terminators this way; it's malformed framing, not a transport
        // failure, so it must not fall through to the generic Io variant.
        ErrorKind::ChunkedDecode
    } else {
        ErrorKind::from(e)
    }
}

fn parse_request_line(line: &[u8]) -> Result<(Method, Vec<u8>, Version), ErrorKind> {
    let (method, offset) = Method::from_bytes(line)?;
    let rest = &line[offset..];
    let space = memchr::memchr(b' ', rest).ok_or(ErrorKind::InvalidUrl)?;
    let path = &rest[..space];
    if path.is_empty() {
        return Err(ErrorKind::InvalidUrl);
    }
    let version = Version::from_bytes(&rest[space + 1..])?;
    Ok((method, path.to_vec(), version))
}

fn trim_ows(mut value: &[u8]) -> &[u8] {
    while let [b' ' | b'\t', rest @ ..] = value {
        value = rest;
    }
    while let [rest @ .., b' ' | b'\t'] = value {
        value = rest;
    }
    value
}

/// Parses a request line and headers off `stream`, up to and including the
/// blank line that terminates the head. Does not touch the body.
pub fn parse_head(
    stream: &mut dyn InputStream,
    limits: &ReqLimits,
    started_at: u64,
) -> Result<HeadRequest, ErrorKind> {
    let mut scratch = crate::buffer::ByteBuffer::with_capacity(256);

    let (method, path, version) = {
        let line = stream::read_line(stream, &mut scratch).map_err(io_err)?;
        parse_request_line(line)?
    };
    if path.len() > limits.target_size {
        return Err(ErrorKind::InvalidUrl);
    }

    let mut headers = HeaderMap::with_capacity(16);
    let mut connection_value: Option<Vec<u8>> = None;

    loop {
        let line = stream::read_line(stream, &mut scratch).map_err(io_err)?;
        if line.is_empty() {
            break;
        }

        let colon = memchr::memchr(b':', line).ok_or(ErrorKind::InvalidHeader)?;
        let name = &line[..colon];
        if !is_valid_header_name(name) {
            return Err(ErrorKind::InvalidHeader);
        }
        let value = trim_ows(&line[colon + 1..]);
        if !is_valid_header_value(value) {
            return Err(ErrorKind::InvalidHeader);
        }
        if name.len() > limits.header_name_size || value.len() > limits.header_value_size {
            return Err(ErrorKind::InvalidHeader);
        }

        if name.eq_ignore_ascii_case(b"content-length") {
            std::str::from_utf8(value)
                .ok()
                .and_then(|s| s.trim().parse::<usize>().ok())
                .ok_or(ErrorKind::InvalidContentLength)?;
        } else if name.eq_ignore_ascii_case(b"transfer-encoding") {
            let lower = value.to_ascii_lowercase();
            if lower != b"chunked" && lower != b"identity" {
                return Err(ErrorKind::UnsupportedTransferEncoding);
            }
        } else if name.eq_ignore_ascii_case(b"connection") {
            let lower = value.to_ascii_lowercase();
            if lower != b"keep-alive" && lower != b"close" {
                return Err(ErrorKind::InvalidConnection);
            }
            connection_value = Some(lower);
        }

        headers.push(name.to_vec(), value.to_vec());
        if headers.len() > limits.header_count {
            return Err(ErrorKind::TooManyHeaders);
        }
    }

    let keep_alive = match connection_value.as_deref() {
        Some(b"close") => false,
        Some(b"keep-alive") => true,
        _ => version.keep_alive_by_default(),
    };

    Ok(HeadRequest { method, version, path, headers, started_at, keep_alive })
}

/// Decides the body's framing from `head`'s headers and wraps `socket` —
/// the same stream `parse_head` read the head from — accordingly.
/// `Transfer-Encoding: chunked` takes precedence over `Content-Length`;
/// absent both, the body is empty.
pub fn attach_body<'a, S>(head: &HeadRequest, socket: S, limits: &ReqLimits) -> Result<BodyStream<'a>, ErrorKind>
where
    S: InputStream + Send + 'a,
{
    let chunked = head
        .headers
        .get(b"transfer-encoding")
        .map(|v| v.eq_ignore_ascii_case(b"chunked"))
        .unwrap_or(false);

    if chunked {
        Ok(Box::new(ChunkedDecoder::new(socket)))
    } else if let Some(len) = head.headers.get_usize(b"content-length") {
        if len > limits.body_size {
            return Err(ErrorKind::BodyTooLarge);
        }
        Ok(Box::new(LengthLimited::new(socket, len)))
    } else {
        Ok(Box::new(EmptyStream))
    }
}
