//! The "peek slice / consume n / close" buffered input abstraction that
//! every byte source in this crate — socket, file, in-memory body, chunked
//! decoder, length-limited body — is built on top of.
//!
//! A stream never copies data it doesn't have to: [`InputStream::peek`]
//! hands back a borrow of its own internal buffer, and callers advance past
//! what they used with [`InputStream::consume`]. A zero-length peek means
//! end-of-stream; peeking again after that keeps returning zero-length
//! slices rather than erroring.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use crate::buffer::ByteBuffer;

/// Lines longer than this are rejected by [`read_line`] to bound memory use
/// from a peer that never sends a CRLF.
pub const MAX_LINE_LEN: usize = 8 * 1024;

/// Uniform peek/consume/close interface over any byte source.
///
/// Implementors must uphold: bytes are delivered in order and exactly once;
/// after end-of-stream (`peek` returns `&[]`) is observed, later `peek`
/// calls keep returning `&[]`; `consume(0)` is always valid; `close` is
/// idempotent.
pub trait InputStream {
    /// Returns the currently buffered, unconsumed slice, refilling from the
    /// underlying source if the buffer is exhausted. A zero-length slice
    /// means end-of-stream.
    fn peek(&mut self) -> io::Result<&[u8]>;

    /// Advances past `n` bytes of the slice last returned by `peek`. `n`
    /// must not exceed that slice's length.
    fn consume(&mut self, n: usize);

    /// Releases any underlying resource. Calling this more than once is a
    /// no-op.
    fn close(&mut self) -> io::Result<()>;
}

impl<'a> InputStream for Box<dyn InputStream + Send + 'a> {
    fn peek(&mut self) -> io::Result<&[u8]> {
        (**self).peek()
    }
    fn consume(&mut self, n: usize) {
        (**self).consume(n);
    }
    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }
}

/// Any mutable borrow of a stream is itself a stream — this is what lets
/// the chunked decoder and length-limited wrapper borrow the connection's
/// single long-lived socket stream for the span of one request's body
/// instead of taking ownership of it (ownership has to return to the
/// connection loop so it can read the next keep-alive request).
impl<'a, S: InputStream + ?Sized> InputStream for &'a mut S {
    fn peek(&mut self) -> io::Result<&[u8]> {
        (**self).peek()
    }
    fn consume(&mut self, n: usize) {
        (**self).consume(n);
    }
    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }
}

/// A stream backed by anything implementing [`std::io::Read`] — a TCP
/// socket, a file, a pipe — refilled into a fixed-size buffer on demand.
pub struct ReadStream<R: Read> {
    inner: Option<R>,
    buf: Vec<u8>,
    pos: usize,
    filled: usize,
    eof: bool,
}

impl<R: Read> ReadStream<R> {
    /// Wraps `inner`, refilling in chunks of `buf_size` bytes (minimum 1).
    pub fn new(inner: R, buf_size: usize) -> Self {
        ReadStream {
            inner: Some(inner),
            buf: vec![0u8; buf_size.max(1)],
            pos: 0,
            filled: 0,
            eof: false,
        }
    }

    /// Borrows the underlying reader, if the stream hasn't been closed.
    pub fn get_mut(&mut self) -> Option<&mut R> {
        self.inner.as_mut()
    }
}

impl<R: Read> InputStream for ReadStream<R> {
    fn peek(&mut self) -> io::Result<&[u8]> {
        if self.pos == self.filled && !self.eof {
            let Some(inner) = self.inner.as_mut() else {
                return Ok(&[]);
            };
            self.pos = 0;
            self.filled = 0;
            loop {
                match inner.read(&mut self.buf) {
                    Ok(0) => {
                        self.eof = true;
                        break;
                    }
                    Ok(n) => {
                        self.filled = n;
                        break;
                    }
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => return Err(e),
                }
            }
        }
        Ok(&self.buf[self.pos..self.filled])
    }

    fn consume(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.filled);
    }

    fn close(&mut self) -> io::Result<()> {
        self.inner = None;
        Ok(())
    }
}

/// A single-shot stream over an in-memory byte slice. `close` is a no-op.
pub struct SliceStream<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> SliceStream<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        SliceStream { data, pos: 0 }
    }
}

impl<'a> InputStream for SliceStream<'a> {
    fn peek(&mut self) -> io::Result<&[u8]> {
        Ok(&self.data[self.pos..])
    }

    fn consume(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.data.len());
    }

    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Opens `path`, hands a stream over its contents to `action`, and closes it
/// on every exit path — including when `action` returns an error.
pub fn with_file_stream<T>(
    path: impl AsRef<Path>,
    buf_size: usize,
    action: impl FnOnce(&mut ReadStream<File>) -> io::Result<T>,
) -> io::Result<T> {
    let file = File::open(path)?;
    let mut stream = ReadStream::new(file, buf_size);
    let result = action(&mut stream);
    stream.close()?;
    result
}

/// Reads up to and including the next CRLF (or bare LF), returning the line
/// with the line terminator stripped. `scratch` is cleared and reused as
/// accumulation storage so repeated calls don't reallocate.
///
/// Fails with [`io::ErrorKind::UnexpectedEof`] if the stream ends before a
/// line terminator is seen, or [`io::ErrorKind::InvalidData`] if the line
/// exceeds [`MAX_LINE_LEN`].
pub fn read_line<'b>(
    stream: &mut dyn InputStream,
    scratch: &'b mut ByteBuffer,
) -> io::Result<&'b [u8]> {
    scratch.clear();
    loop {
        let slice = stream.peek()?;
        if slice.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "stream ended before line terminator",
            ));
        }

        match memchr::memchr(b'\n', slice) {
            Some(pos) => {
                let has_cr = pos > 0 && slice[pos - 1] == b'\r';
                let line_end = if has_cr { pos - 1 } else { pos };
                scratch.push_slice(&slice[..line_end]);
                stream.consume(pos + 1);
                break;
            }
            None => {
                scratch.push_slice(slice);
                let n = slice.len();
                stream.consume(n);
            }
        }

        if scratch.size() > MAX_LINE_LEN {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "line too long"));
        }
    }

    if scratch.size() > MAX_LINE_LEN {
        return Err(io::Error::new(io::ErrorKind::InvalidData, "line too long"));
    }
    Ok(scratch.as_slice())
}

/// Concatenates everything remaining in `stream` until end-of-stream.
pub fn read_all(stream: &mut dyn InputStream) -> io::Result<String> {
    let mut buf = ByteBuffer::with_capacity(256);
    loop {
        let slice = stream.peek()?;
        if slice.is_empty() {
            break;
        }
        buf.push_slice(slice);
        let n = slice.len();
        stream.consume(n);
    }
    buf.contents()
        .map(str::to_owned)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "body is not valid utf-8"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slice_stream_peek_then_consume_yields_all_bytes_once() {
        let mut s = SliceStream::new(b"hello world");
        let mut collected = Vec::new();
        loop {
            let chunk = s.peek().unwrap();
            if chunk.is_empty() {
                break;
            }
            collected.extend_from_slice(chunk);
            let n = chunk.len();
            s.consume(n);
        }
        assert_eq!(collected, b"hello world");
        assert!(s.peek().unwrap().is_empty());
    }

    #[test]
    fn read_stream_refills_in_buf_size_chunks() {
        let data = b"abcdefghij".to_vec();
        let mut s = ReadStream::new(&data[..], 4);
        assert_eq!(s.peek().unwrap(), b"abcd");
        s.consume(4);
        assert_eq!(s.peek().unwrap(), b"efgh");
        s.consume(4);
        assert_eq!(s.peek().unwrap(), b"ij");
        s.consume(2);
        assert!(s.peek().unwrap().is_empty());
    }

    #[test]
    fn read_line_strips_crlf() {
        let mut s = SliceStream::new(b"GET / HTTP/1.1\r\nHost: x\r\n\r\n");
        let mut scratch = ByteBuffer::with_capacity(64);
        assert_eq!(read_line(&mut s, &mut scratch).unwrap(), b"GET / HTTP/1.1");
        assert_eq!(read_line(&mut s, &mut scratch).unwrap(), b"Host: x");
        assert_eq!(read_line(&mut s, &mut scratch).unwrap(), b"");
    }

    #[test]
    fn read_line_accepts_bare_lf() {
        let mut s = SliceStream::new(b"line one\nline two\n");
        let mut scratch = ByteBuffer::with_capacity(64);
        assert_eq!(read_line(&mut s, &mut scratch).unwrap(), b"line one");
        assert_eq!(read_line(&mut s, &mut scratch).unwrap(), b"line two");
    }

    #[test]
    fn read_line_fails_on_premature_eof() {
        let mut s = SliceStream::new(b"no terminator here");
        let mut scratch = ByteBuffer::with_capacity(64);
        let err = read_line(&mut s, &mut scratch).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn read_line_rejects_oversized_line() {
        let long = vec![b'a'; MAX_LINE_LEN + 10];
        let mut data = long.clone();
        data.push(b'\n');
        let mut s = SliceStream::new(&data);
        let mut scratch = ByteBuffer::with_capacity(64);
        let err = read_line(&mut s, &mut scratch).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn read_all_concatenates_to_eof() {
        let mut s = SliceStream::new(b"all of this body");
        assert_eq!(read_all(&mut s).unwrap(), "all of this body");
    }
}
