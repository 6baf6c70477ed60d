//! Request-decode and response-encode middleware chains.
//!
//! Decode callbacks run against the headers-only request, before the body
//! is attached, and may replace the head and/or contribute a stream
//! transformer (a decompressor, a byte counter, ...). Encode callbacks run
//! against the fully materialized request and the handler's response, and
//! may replace the response outright (add headers, compress the body).
//! Both chains run in registration order.

use crate::http::request::{BodyStream, HeadRequest, Request};
use crate::http::response::Response;

/// A transformer applied to the raw body stream produced from a request's
/// framing headers. Universally quantified over the stream's borrow so one
/// transformer value can be reused across however long that borrow turns
/// out to live for a given connection.
pub type BodyTransform = Box<dyn for<'a> FnOnce(BodyStream<'a>) -> BodyStream<'a> + Send>;

/// What a decode callback returned for one request.
#[derive(Default)]
pub struct DecodeOutcome {
    /// A replacement headers-only request, if the callback wants to
    /// rewrite headers or path before routing sees them.
    pub replacement: Option<HeadRequest>,
    /// A transform to compose onto the body stream.
    pub transform: Option<BodyTransform>,
}

pub type DecodeCallback = dyn Fn(&HeadRequest) -> DecodeOutcome + Send + Sync;
pub type EncodeCallback = dyn Fn(&Request, Response) -> Response + Send + Sync;

/// The two ordered middleware lists for a server.
#[derive(Default)]
pub struct Middleware {
    decode: Vec<Box<DecodeCallback>>,
    encode: Vec<Box<EncodeCallback>>,
}

impl Middleware {
    pub fn new() -> Self {
        Middleware::default()
    }

    pub fn add_decode_request_cb(&mut self, cb: Box<DecodeCallback>) {
        self.decode.push(cb);
    }

    pub fn add_encode_response_cb(&mut self, cb: Box<EncodeCallback>) {
        self.encode.push(cb);
    }

    /// Runs the decode chain in registration order. The last callback to
    /// return a replacement head wins; every returned transform is kept,
    /// in order, for [`Middleware::apply_transforms`].
    pub fn run_decode(&self, head: HeadRequest) -> (HeadRequest, Vec<BodyTransform>) {
        let mut current = head;
        let mut transforms = Vec::new();
        for cb in &self.decode {
            let outcome = cb(&current);
            if let Some(replacement) = outcome.replacement {
                current = replacement;
            }
            if let Some(transform) = outcome.transform {
                transforms.push(transform);
            }
        }
        (current, transforms)
    }

    /// Applies accumulated transforms to the raw body stream, left to
    /// right, in the order their callbacks were registered.
    pub fn apply_transforms<'a>(transforms: Vec<BodyTransform>, body: BodyStream<'a>) -> BodyStream<'a> {
        transforms.into_iter().fold(body, |body, transform| transform(body))
    }

    /// Runs the encode chain in registration order against the handler's
    /// response.
    pub fn run_encode(&self, req: &Request, resp: Response) -> Response {
        self.encode.iter().fold(resp, |resp, cb| cb(req, resp))
    }
}
