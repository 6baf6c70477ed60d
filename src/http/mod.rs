//! HTTP/1.x wire types: methods, versions, status codes, headers, request
//! parsing, body framing, and response writing.

pub mod headers;
pub mod method;
pub mod request;
pub mod response;
pub mod status;
pub mod transfer;

pub use headers::{Header, HeaderMap};
pub use method::{Method, Version};
pub use request::{attach_body, parse_head, BodyStream, HeadRequest, Request, StreamRequest};
pub use response::{write_response, Handled, Response, ResponseBody, WriteBuffer};
pub use status::StatusCode;
