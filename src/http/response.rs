//! Response building and wire serialization.
//!
//! [`Response`] is a fluent builder enforcing call order with debug
//! assertions rather than the type system: `status()` first, then any
//! number of `header()` calls, then exactly one of `body()` /
//! `body_stream()`, which returns [`Handled`] — a token a route handler or
//! top handler returns to prove it actually finished the response instead
//! of forgetting to.

use std::borrow::Cow;
use std::io::{self, Write};
use std::sync::Arc;

use crate::errors::ErrorKind;
use crate::http::headers::{Header, HeaderMap};
use crate::http::method::Version;
use crate::http::request::BodyStream;
use crate::http::status::StatusCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResponseState {
    Clean,
    Headers,
    Complete,
}

/// Proof that a handler finished building its response. Returned by
/// [`Response::body`] / [`Response::body_stream`], the only ways to
/// finalize one.
#[must_use]
pub struct Handled(());

/// Either a fully materialized body or a stream to be emitted chunked.
pub enum ResponseBody {
    Str(Vec<u8>),
    Stream(BodyStream<'static>),
}

impl std::fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResponseBody::Str(s) => f.debug_tuple("Str").field(s).finish(),
            ResponseBody::Stream(_) => f.debug_tuple("Stream").field(&"..").finish(),
        }
    }
}

/// An HTTP response under construction.
#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: ResponseBody,
    close: bool,
    state: ResponseState,
}

impl Response {
    pub(crate) fn new() -> Self {
        Response {
            status: StatusCode::OK,
            headers: HeaderMap::with_capacity(8),
            body: ResponseBody::Str(Vec::new()),
            close: false,
            state: ResponseState::Clean,
        }
    }

    /// Builds a plain-text response for `err`, closing the connection
    /// unless `err` is a [`HandlerAbort`](ErrorKind::HandlerAbort).
    pub fn from_error(err: &ErrorKind) -> Response {
        let mut resp = Response::new();
        resp.status(err.status());
        if err.closes_connection() {
            resp.close();
        }
        resp.header("content-type", "text/plain; charset=utf-8");
        resp.body(err.message());
        resp
    }

    /// Forces the connection to close after this response regardless of
    /// the request's keep-alive disposition.
    #[track_caller]
    pub fn close(&mut self) -> &mut Self {
        debug_assert!(self.state != ResponseState::Complete, "close() must be called before any finalizing method");
        self.close = true;
        self
    }

    /// Sets the status code. Must be the first call.
    #[track_caller]
    pub fn status(&mut self, status: StatusCode) -> &mut Self {
        debug_assert!(self.state == ResponseState::Clean, "status() must be first and called only once");
        self.status = status;
        self.state = ResponseState::Headers;
        self
    }

    /// Appends a header. `content-length`, `transfer-encoding`, and
    /// `connection` are computed by the writer and are overwritten if set
    /// here.
    #[track_caller]
    pub fn header<N: WriteBuffer, V: WriteBuffer>(&mut self, name: N, value: V) -> &mut Self {
        debug_assert!(self.state == ResponseState::Headers, "header() must be called after status() and before any body method");
        let mut n = Vec::new();
        name.write_to(&mut n);
        let mut v = Vec::new();
        value.write_to(&mut v);
        self.headers.push(n, v);
        self
    }

    /// Sets the body from an in-memory value and finalizes the response.
    #[track_caller]
    pub fn body<T: WriteBuffer>(&mut self, data: T) -> Handled {
        debug_assert!(self.state == ResponseState::Headers, "body() must be called after status() and any header methods");
        let mut buf = Vec::new();
        data.write_to(&mut buf);
        self.body = ResponseBody::Str(buf);
        self.state = ResponseState::Complete;
        Handled(())
    }

    /// Sets the body to a stream, emitted with `Transfer-Encoding: chunked`,
    /// and finalizes the response.
    #[track_caller]
    pub fn body_stream(&mut self, stream: BodyStream<'static>) -> Handled {
        debug_assert!(self.state == ResponseState::Headers, "body_stream() must be called after status() and any header methods");
        self.body = ResponseBody::Stream(stream);
        self.state = ResponseState::Complete;
        Handled(())
    }
}

fn write_decimal(mut n: usize, out: &mut Vec<u8>) {
    if n == 0 {
        out.push(b'0');
        return;
    }
    let mut buf = [0u8; 20];
    let mut i = buf.len();
    while n > 0 {
        i -= 1;
        buf[i] = b'0' + (n % 10) as u8;
        n /= 10;
    }
    out.extend_from_slice(&buf[i..]);
}

fn write_hex(mut n: usize, out: &mut Vec<u8>) {
    const DIGITS: &[u8; 16] = b"0123456789abcdef";
    if n == 0 {
        out.push(b'0');
        return;
    }
    let mut buf = [0u8; 16];
    let mut i = buf.len();
    while n > 0 {
        i -= 1;
        buf[i] = DIGITS[n & 0xf];
        n >>= 4;
    }
    out.extend_from_slice(&buf[i..]);
}

fn write_header_line(out: &mut Vec<u8>, header: &Header) {
    out.extend_from_slice(&header.name);
    out.extend_from_slice(b": ");
    out.extend_from_slice(&header.value);
    out.extend_from_slice(b"\r\n");
}

/// Serializes `resp` onto `out` for a connection running `version`,
/// returning whether the connection should stay open afterward.
///
/// `Content-Length` and `Transfer-Encoding` are mutually exclusive and
/// computed here, never left to the handler: a string body gets
/// `Content-Length`, a stream body gets chunked `Transfer-Encoding`. A
/// `Connection` header is only emitted when it would differ from the
/// version's default (`close` on 1.1, `keep-alive` on 1.0).
pub fn write_response(mut resp: Response, version: Version, keep_alive: bool, out: &mut impl Write) -> io::Result<bool> {
    resp.headers.remove(b"content-length");
    resp.headers.remove(b"transfer-encoding");
    resp.headers.remove(b"connection");

    let keep_alive = keep_alive && !resp.close;

    let mut head = Vec::with_capacity(256);
    resp.status.write_status_line(version, &mut head);

    match version {
        Version::Http11 if !keep_alive => head.extend_from_slice(b"connection: close\r\n"),
        Version::Http10 if keep_alive => head.extend_from_slice(b"connection: keep-alive\r\n"),
        _ => {}
    }

    for header in resp.headers.iter() {
        write_header_line(&mut head, header);
    }

    match &resp.body {
        ResponseBody::Str(bytes) => {
            head.extend_from_slice(b"content-length: ");
            write_decimal(bytes.len(), &mut head);
            head.extend_from_slice(b"\r\n\r\n");
        }
        ResponseBody::Stream(_) => {
            head.extend_from_slice(b"transfer-encoding: chunked\r\n\r\n");
        }
    }
    out.write_all(&head)?;

    match resp.body {
        ResponseBody::Str(bytes) => out.write_all(&bytes)?,
        ResponseBody::Stream(mut stream) => {
            loop {
                let chunk = stream.peek()?;
                if chunk.is_empty() {
                    break;
                }
                let mut frame = Vec::with_capacity(chunk.len() + 16);
                write_hex(chunk.len(), &mut frame);
                frame.extend_from_slice(b"\r\n");
                frame.extend_from_slice(chunk);
                frame.extend_from_slice(b"\r\n");
                out.write_all(&frame)?;
                let n = chunk.len();
                stream.consume(n);
            }
            out.write_all(b"0\r\n\r\n")?;
        }
    }

    Ok(keep_alive)
}

/// Writes a value's wire representation directly into a buffer, avoiding
/// an intermediate `String`/`format!` allocation.
pub trait WriteBuffer {
    fn write_to(&self, buffer: &mut Vec<u8>);
}

impl<T: WriteBuffer + ?Sized> WriteBuffer for &T {
    fn write_to(&self, buffer: &mut Vec<u8>) {
        T::write_to(self, buffer);
    }
}

macro_rules! impl_write_buffer_bytes {
    ($conn:expr => $($t:ty),* $(,)?) => {
        $(impl WriteBuffer for $t {
            #[inline]
            fn write_to(&self, buffer: &mut Vec<u8>) {
                let f = $conn;
                f(self, buffer);
            }
        })*
    };
}

macro_rules! impl_write_buffer_uint {
    ($($t:ty),* $(,)?) => {
        $(impl WriteBuffer for $t {
            #[inline]
            fn write_to(&self, buffer: &mut Vec<u8>) {
                write_decimal(*self as usize, buffer);
            }
        })*
    };
}

impl_write_buffer_bytes! {
    |v: &str, buf: &mut Vec<u8>| buf.extend_from_slice(v.as_bytes())
    => str, String, Box<str>, Cow<'_, str>, Arc<str>
}
impl_write_buffer_bytes! {
    |v: &[u8], buf: &mut Vec<u8>| buf.extend_from_slice(v)
    => [u8], Vec<u8>, Box<[u8]>, Cow<'_, [u8]>, Arc<[u8]>
}
impl_write_buffer_uint!(u8, u16, u32, u64, usize);

impl WriteBuffer for bool {
    fn write_to(&self, buffer: &mut Vec<u8>) {
        buffer.extend_from_slice(if *self { b"true" } else { b"false" });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::InputStream;

    fn render(resp: Response, version: Version, keep_alive: bool) -> (Vec<u8>, bool) {
        let mut out = Vec::new();
        let alive = write_response(resp, version, keep_alive, &mut out).unwrap();
        (out, alive)
    }

    #[test]
    fn string_body_gets_content_length() {
        let mut resp = Response::new();
        resp.status(StatusCode::OK).header("content-type", "text/plain").body("hi");
        let (out, alive) = render(resp, Version::Http11, true);
        let text = std::str::from_utf8(&out).unwrap();
        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(text.contains("content-length: 2\r\n"));
        assert!(text.ends_with("\r\n\r\nhi"));
        assert!(alive);
    }

    #[test]
    fn close_overrides_default_keep_alive() {
        let mut resp = Response::new();
        resp.status(StatusCode::OK).close().body("bye");
        let (out, alive) = render(resp, Version::Http11, true);
        assert!(!alive);
        assert!(std::str::from_utf8(&out).unwrap().contains("connection: close\r\n"));
    }

    #[test]
    fn http10_keep_alive_gets_explicit_header() {
        let mut resp = Response::new();
        resp.status(StatusCode::OK).body("x");
        let (out, alive) = render(resp, Version::Http10, true);
        assert!(alive);
        assert!(std::str::from_utf8(&out).unwrap().contains("connection: keep-alive\r\n"));
    }

    #[test]
    fn stream_body_uses_chunked_framing() {
        struct TwoChunks(u8);
        impl InputStream for TwoChunks {
            fn peek(&mut self) -> io::Result<&[u8]> {
                match self.0 {
                    0 => Ok(b"abc"),
                    1 => Ok(b"de"),
                    _ => Ok(&[]),
                }
            }
            fn consume(&mut self, _n: usize) {
                self.0 += 1;
            }
            fn close(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let mut resp = Response::new();
        resp.status(StatusCode::OK).body_stream(Box::new(TwoChunks(0)));
        let (out, _) = render(resp, Version::Http11, true);
        assert_eq!(out, b"HTTP/1.1 200 OK\r\ntransfer-encoding: chunked\r\n\r\n3\r\nabc\r\n2\r\nde\r\n0\r\n\r\n");
    }

    #[test]
    fn error_response_carries_status_and_message() {
        let err = ErrorKind::InvalidMethod;
        let (out, alive) = render(Response::from_error(&err), Version::Http11, true);
        let text = std::str::from_utf8(&out).unwrap();
        assert!(text.starts_with("HTTP/1.1 400 Bad Request\r\n"));
        assert!(text.ends_with("unsupported or malformed method"));
        assert!(!alive);
    }
}
