#![allow(rustdoc::bare_urls)]

//! HTTP status codes.
//!
//! Represented as a thin `u16` newtype rather than a closed enum: the data
//! model treats the status code as "an integer" that a handler or
//! `set_top_handler` fallback can set to any value, while still getting a
//! documented reason-phrase table for the well-known codes and a generic
//! fallback phrase for anything else.

use crate::http::Version;

/// An HTTP status code together with its reason phrase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusCode(u16);

impl StatusCode {
    /// Wraps an arbitrary numeric status code.
    pub const fn new(code: u16) -> Self {
        StatusCode(code)
    }

    /// The numeric status code.
    #[inline]
    pub const fn code(&self) -> u16 {
        self.0
    }

    /// Renders the status line for `version`, e.g. `HTTP/1.1 200 OK\r\n`.
    pub fn write_status_line(&self, version: Version, out: &mut Vec<u8>) {
        out.extend_from_slice(match version {
            Version::Http11 => b"HTTP/1.1 ",
            Version::Http10 => b"HTTP/1.0 ",
        });
        let mut code_buf = [0u8; 3];
        write_u16_ascii(self.0, &mut code_buf);
        out.extend_from_slice(&code_buf);
        out.push(b' ');
        out.extend_from_slice(self.reason_phrase().as_bytes());
        out.extend_from_slice(b"\r\n");
    }
}

fn write_u16_ascii(mut n: u16, out: &mut [u8; 3]) {
    out[2] = b'0' + (n % 10) as u8;
    n /= 10;
    out[1] = b'0' + (n % 10) as u8;
    n /= 10;
    out[0] = b'0' + (n % 10) as u8;
}

macro_rules! status_codes {
    ($(
        $(#[$docs:meta])+
        $name:ident = ($num:expr, $str:expr);
    )+) => {
        impl StatusCode {$(
            $(#[$docs])+
            pub const $name: StatusCode = StatusCode($num);
        )+

            /// Reason phrase for this code. Codes outside the documented
            /// table get a generic phrase rather than failing.
            pub const fn reason_phrase(&self) -> &'static str {
                match self.0 {
                    $($num => $str,)+
                    _ => "Unknown Status",
                }
            }
        }
    }
}

status_codes! {
    /// [[RFC9110, Section 15.3.1](https://datatracker.ietf.org/doc/html/rfc9110#section-15.3.1)]
    OK = (200, "OK");
    /// [[RFC9110, Section 15.3.2](https://datatracker.ietf.org/doc/html/rfc9110#section-15.3.2)]
    CREATED = (201, "Created");
    /// [[RFC9110, Section 15.3.3](https://datatracker.ietf.org/doc/html/rfc9110#section-15.3.3)]
    ACCEPTED = (202, "Accepted");
    /// [[RFC9110, Section 15.3.5](https://datatracker.ietf.org/doc/html/rfc9110#section-15.3.5)]
    NO_CONTENT = (204, "No Content");

    /// [[RFC9110, Section 15.4.2](https://datatracker.ietf.org/doc/html/rfc9110#section-15.4.2)]
    MOVED_PERMANENTLY = (301, "Moved Permanently");
    /// [[RFC9110, Section 15.4.3](https://datatracker.ietf.org/doc/html/rfc9110#section-15.4.3)]
    FOUND = (302, "Found");
    /// [[RFC9110, Section 15.4.5](https://datatracker.ietf.org/doc/html/rfc9110#section-15.4.5)]
    NOT_MODIFIED = (304, "Not Modified");

    /// [[RFC9110, Section 15.5.1](https://datatracker.ietf.org/doc/html/rfc9110#section-15.5.1)]
    BAD_REQUEST = (400, "Bad Request");
    /// [[RFC9110, Section 15.5.2](https://datatracker.ietf.org/doc/html/rfc9110#section-15.5.2)]
    UNAUTHORIZED = (401, "Unauthorized");
    /// [[RFC9110, Section 15.5.4](https://datatracker.ietf.org/doc/html/rfc9110#section-15.5.4)]
    FORBIDDEN = (403, "Forbidden");
    /// [[RFC9110, Section 15.5.5](https://datatracker.ietf.org/doc/html/rfc9110#section-15.5.5)]
    NOT_FOUND = (404, "Not Found");
    /// [[RFC9110, Section 15.5.6](https://datatracker.ietf.org/doc/html/rfc9110#section-15.5.6)]
    METHOD_NOT_ALLOWED = (405, "Method Not Allowed");
    /// [[RFC9110, Section 15.5.9](https://datatracker.ietf.org/doc/html/rfc9110#section-15.5.9)]
    REQUEST_TIMEOUT = (408, "Request Timeout");
    /// [[RFC9110, Section 15.5.10](https://datatracker.ietf.org/doc/html/rfc9110#section-15.5.10)]
    CONFLICT = (409, "Conflict");
    /// [[RFC9110, Section 15.5.12](https://datatracker.ietf.org/doc/html/rfc9110#section-15.5.12)]
    LENGTH_REQUIRED = (411, "Length Required");
    /// [[RFC9110, Section 15.5.14](https://datatracker.ietf.org/doc/html/rfc9110#section-15.5.14)]
    PAYLOAD_TOO_LARGE = (413, "Payload Too Large");
    /// [[RFC9110, Section 15.5.15](https://datatracker.ietf.org/doc/html/rfc9110#section-15.5.15)]
    URI_TOO_LONG = (414, "URI Too Long");
    /// [[RFC9110, Section 15.5.20](https://datatracker.ietf.org/doc/html/rfc9110#section-15.5.20)]
    MISDIRECTED_REQUEST = (421, "Misdirected Request");
    /// [[RFC6585, Section 4](https://datatracker.ietf.org/doc/html/rfc6585#section-4)]
    TOO_MANY_REQUESTS = (429, "Too Many Requests");
    /// [[RFC6585, Section 5](https://datatracker.ietf.org/doc/html/rfc6585#section-5)]
    REQUEST_HEADER_FIELDS_TOO_LARGE = (431, "Request Header Fields Too Large");

    /// [[RFC9110, Section 15.6.1](https://datatracker.ietf.org/doc/html/rfc9110#section-15.6.1)]
    INTERNAL_SERVER_ERROR = (500, "Internal Server Error");
    /// [[RFC9110, Section 15.6.2](https://datatracker.ietf.org/doc/html/rfc9110#section-15.6.2)]
    NOT_IMPLEMENTED = (501, "Not Implemented");
    /// [[RFC9110, Section 15.6.3](https://datatracker.ietf.org/doc/html/rfc9110#section-15.6.3)]
    BAD_GATEWAY = (502, "Bad Gateway");
    /// [[RFC9110, Section 15.6.4](https://datatracker.ietf.org/doc/html/rfc9110#section-15.6.4)]
    SERVICE_UNAVAILABLE = (503, "Service Unavailable");
    /// [[RFC9110, Section 15.6.5](https://datatracker.ietf.org/doc/html/rfc9110#section-15.6.5)]
    GATEWAY_TIMEOUT = (504, "Gateway Timeout");
    /// [[RFC9110, Section 15.6.6](https://datatracker.ietf.org/doc/html/rfc9110#section-15.6.6)]
    HTTP_VERSION_NOT_SUPPORTED = (505, "HTTP Version Not Supported");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes_have_documented_phrases() {
        assert_eq!(StatusCode::OK.reason_phrase(), "OK");
        assert_eq!(StatusCode::NOT_FOUND.reason_phrase(), "Not Found");
        assert_eq!(StatusCode::HTTP_VERSION_NOT_SUPPORTED.code(), 505);
    }

    #[test]
    fn unknown_code_gets_generic_phrase() {
        let weird = StatusCode::new(799);
        assert_eq!(weird.reason_phrase(), "Unknown Status");
    }

    #[test]
    fn status_line_rendering() {
        let mut out = Vec::new();
        StatusCode::OK.write_status_line(Version::Http11, &mut out);
        assert_eq!(out, b"HTTP/1.1 200 OK\r\n");
    }
}
