//! Request method and protocol version.

use crate::errors::ErrorKind;

/// HTTP request method.
///
/// Only the five methods this crate understands are representable; an
/// unrecognised method word fails to parse rather than being accepted as an
/// opaque string.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET - transfer a current representation of the target resource.
    Get,
    /// PUT - replace all current representations of the target resource.
    Put,
    /// POST - perform resource-specific processing on the request payload.
    Post,
    /// HEAD - same as GET but without a response body.
    Head,
    /// DELETE - remove all current representations of the target resource.
    Delete,
}

impl Method {
    /// Parses the method word at the start of `src`, returning it along
    /// with the byte offset of the following space.
    #[inline(always)]
    pub(crate) fn from_bytes(src: &[u8]) -> Result<(Self, usize), ErrorKind> {
        match src {
            [b'G', b'E', b'T', b' ', ..] => Ok((Method::Get, 4)),
            [b'P', b'U', b'T', b' ', ..] => Ok((Method::Put, 4)),
            [b'P', b'O', b'S', b'T', b' ', ..] => Ok((Method::Post, 5)),
            [b'H', b'E', b'A', b'D', b' ', ..] => Ok((Method::Head, 5)),
            [b'D', b'E', b'L', b'E', b'T', b'E', b' ', ..] => Ok((Method::Delete, 7)),
            _ => Err(ErrorKind::InvalidMethod),
        }
    }
}

/// HTTP protocol version. Only 1.0 and 1.1 are accepted; everything else is
/// rejected with 505 before a response body type is even decided.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Version {
    /// HTTP/1.0 - [RFC 1945](https://tools.ietf.org/html/rfc1945). Defaults
    /// to closing the connection after one response.
    Http10,
    /// HTTP/1.1 - [RFC 7230](https://tools.ietf.org/html/rfc7230) and
    /// related. Defaults to keep-alive.
    Http11,
}

impl Version {
    /// Parses an exact `HTTP/1.x` token.
    #[inline(always)]
    pub(crate) fn from_bytes(src: &[u8]) -> Result<Self, ErrorKind> {
        match src {
            b"HTTP/1.1" => Ok(Version::Http11),
            b"HTTP/1.0" => Ok(Version::Http10),
            _ => Err(ErrorKind::UnsupportedVersion),
        }
    }

    /// Whether this version defaults to a persistent connection absent an
    /// explicit `Connection` header.
    #[inline]
    pub(crate) fn keep_alive_by_default(&self) -> bool {
        matches!(self, Version::Http11)
    }
}
