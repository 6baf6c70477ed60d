//! Request-body framing: wraps a raw socket stream as either a chunked- or
//! content-length-delimited [`InputStream`], so the rest of the pipeline
//! never has to know which framing a given request used.

use std::io;

use crate::buffer::ByteBuffer;
use crate::stream::{self, InputStream};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChunkState {
    ReadSize,
    ReadData(usize),
    ReadTrailer,
    Done,
}

fn malformed_chunk_size() -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, "malformed chunk size")
}

/// Decodes `Transfer-Encoding: chunked` bodies.
///
/// State machine: `ReadSize` -> `ReadData(n)` -> (consume chunk's trailing
/// CRLF) -> `ReadSize`, or, once a zero-size chunk is seen, `ReadTrailer` ->
/// `Done`. Trailer header lines after the zero chunk are read and discarded.
pub struct ChunkedDecoder<S: InputStream> {
    inner: S,
    state: ChunkState,
    scratch: ByteBuffer,
}

impl<S: InputStream> ChunkedDecoder<S> {
    pub fn new(inner: S) -> Self {
        ChunkedDecoder { inner, state: ChunkState::ReadSize, scratch: ByteBuffer::with_capacity(32) }
    }

    fn read_chunk_size(&mut self) -> io::Result<()> {
        let line = stream::read_line(&mut self.inner, &mut self.scratch)?;
        let size_part = match memchr::memchr(b';', line) {
            Some(i) => &line[..i],
            None => line,
        };
        let size_str = std::str::from_utf8(size_part).map_err(|_| malformed_chunk_size())?;
        let size = usize::from_str_radix(size_str.trim(), 16).map_err(|_| malformed_chunk_size())?;
        self.state = if size == 0 { ChunkState::ReadTrailer } else { ChunkState::ReadData(size) };
        Ok(())
    }

    fn read_trailer(&mut self) -> io::Result<()> {
        loop {
            let line = stream::read_line(&mut self.inner, &mut self.scratch)?;
            if line.is_empty() {
                break;
            }
        }
        self.state = ChunkState::Done;
        Ok(())
    }

    fn consume_chunk_terminator(&mut self) -> io::Result<()> {
        let line = stream::read_line(&mut self.inner, &mut self.scratch)?;
        if !line.is_empty() {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "malformed chunk terminator"));
        }
        self.state = ChunkState::ReadSize;
        Ok(())
    }
}

impl<S: InputStream> InputStream for ChunkedDecoder<S> {
    fn peek(&mut self) -> io::Result<&[u8]> {
        loop {
            match self.state {
                ChunkState::Done => return Ok(&[]),
                ChunkState::ReadSize => self.read_chunk_size()?,
                ChunkState::ReadTrailer => self.read_trailer()?,
                ChunkState::ReadData(0) => self.consume_chunk_terminator()?,
                ChunkState::ReadData(remaining) => {
                    let slice = self.inner.peek()?;
                    if slice.is_empty() {
                        return Err(io::Error::new(
                            io::ErrorKind::UnexpectedEof,
                            "stream ended mid chunk",
                        ));
                    }
                    let n = slice.len().min(remaining);
                    return Ok(&slice[..n]);
                }
            }
        }
    }

    fn consume(&mut self, n: usize) {
        if let ChunkState::ReadData(remaining) = self.state {
            self.inner.consume(n);
            self.state = ChunkState::ReadData(remaining - n);
        }
    }

    fn close(&mut self) -> io::Result<()> {
        self.inner.close()
    }
}

/// Delimits a body by `Content-Length`, refusing to read past `remaining`
/// bytes from the inner stream and failing if the inner stream ends early.
pub struct LengthLimited<S: InputStream> {
    inner: S,
    remaining: usize,
}

impl<S: InputStream> LengthLimited<S> {
    pub fn new(inner: S, length: usize) -> Self {
        LengthLimited { inner, remaining: length }
    }
}

impl<S: InputStream> InputStream for LengthLimited<S> {
    fn peek(&mut self) -> io::Result<&[u8]> {
        if self.remaining == 0 {
            return Ok(&[]);
        }
        let slice = self.inner.peek()?;
        if slice.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "stream ended before content-length bytes were read",
            ));
        }
        let n = slice.len().min(self.remaining);
        Ok(&slice[..n])
    }

    fn consume(&mut self, n: usize) {
        self.inner.consume(n);
        self.remaining -= n;
    }

    fn close(&mut self) -> io::Result<()> {
        self.inner.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::SliceStream;

    fn drain<S: InputStream>(mut s: S) -> Vec<u8> {
        let mut out = Vec::new();
        loop {
            let chunk = s.peek().unwrap();
            if chunk.is_empty() {
                break;
            }
            out.extend_from_slice(chunk);
            let n = chunk.len();
            s.consume(n);
        }
        out
    }

    #[test]
    fn chunked_decode_single_chunk() {
        let raw = SliceStream::new(b"5\r\nhello\r\n0\r\n\r\n");
        let decoded = drain(ChunkedDecoder::new(raw));
        assert_eq!(decoded, b"hello");
    }

    #[test]
    fn chunked_decode_multiple_chunks() {
        let raw = SliceStream::new(b"2\r\nab\r\n1\r\nc\r\n3\r\ndef\r\n0\r\n\r\n");
        let decoded = drain(ChunkedDecoder::new(raw));
        assert_eq!(decoded, b"abcdef");
    }

    #[test]
    fn chunked_decode_ignores_extension_and_trailer() {
        let raw = SliceStream::new(b"3;foo=bar\r\nxyz\r\n0\r\nX-Trailer: v\r\n\r\n");
        let decoded = drain(ChunkedDecoder::new(raw));
        assert_eq!(decoded, b"xyz");
    }

    #[test]
    fn chunked_decode_rejects_bad_size() {
        let raw = SliceStream::new(b"zz\r\nhello\r\n");
        let mut decoder = ChunkedDecoder::new(raw);
        let err = decoder.peek().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn length_limited_truncates_and_stops() {
        let raw = SliceStream::new(b"hello world, more than five");
        let mut limited = LengthLimited::new(raw, 5);
        let mut out = Vec::new();
        loop {
            let chunk = limited.peek().unwrap();
            if chunk.is_empty() {
                break;
            }
            out.extend_from_slice(chunk);
            let n = chunk.len();
            limited.consume(n);
        }
        assert_eq!(out, b"hello");
    }

    #[test]
    fn length_limited_fails_on_early_eof() {
        let raw = SliceStream::new(b"short");
        let mut limited = LengthLimited::new(raw, 100);
        let err = loop {
            match limited.peek() {
                Ok(chunk) if chunk.is_empty() => panic!("expected failure before eof"),
                Ok(chunk) => {
                    let n = chunk.len();
                    limited.consume(n);
                }
                Err(e) => break e,
            }
        };
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
