//! hearth_http - a minimal, security-conscious blocking HTTP/1.1 server core
//!
//! A small synchronous HTTP stack built around a peek/consume byte-stream
//! abstraction: one read buffer per connection, chunked and
//! content-length body framing, a structured typed-hole router, and two
//! ordered middleware chains (request-decode, response-encode). No async
//! runtime — a connection's worker blocks exactly where the underlying
//! socket read or write blocks, and the server is free to run each
//! worker on an OS thread, a pool, or anything else the embedder injects.
//!
//! # Quick start
//!
//! ```no_run
//! use hearth_http::{Server, StatusCode};
//!
//! let server = Server::builder()
//!     .port(8080)
//!     .set_top_handler(Box::new(|_req, resp| {
//!         Ok(resp.status(StatusCode::OK).body("Hello, world!"))
//!     }))
//!     .build();
//!
//! server.run().unwrap();
//! ```
//!
//! # Routing
//!
//! Routes are a sequence of [`router::Segment`]s built up programmatically
//! rather than parsed out of a pattern string, so there's nothing to get
//! wrong at runtime: the compiler checks the pattern's shape. Handlers
//! return `Result<Handled, (StatusCode, String)>` — the error path lets a
//! handler abort with an arbitrary status and message without having to
//! thread that decision through every call it makes.
//!
//! ```no_run
//! use hearth_http::{Hole, Segment, Server, StatusCode};
//!
//! let server = Server::builder()
//!     .add_path_handler(
//!         vec![Segment::Literal("users"), Segment::Int],
//!         None,
//!         None,
//!         Box::new(|holes, _req, resp| {
//!             let id = holes[0].as_int().unwrap();
//!             Ok(resp.status(StatusCode::OK).body(format!("user {id}")))
//!         }),
//!     )
//!     .build();
//! # let _ = server;
//! ```
//!
//! # Logging
//!
//! The crate depends on the [`log`] facade only; it never picks a backend
//! itself. Wire up `env_logger`, `tracing-log`, or any other `log`
//! implementation in the embedding binary to see the lines this crate
//! emits from the connection loop and accept loop.

pub(crate) mod buffer;
pub mod errors;
pub mod http;
pub mod limits;
pub mod middleware;
pub mod router;
mod server;
pub(crate) mod stream;

pub use errors::ErrorKind;
pub use http::{Handled, HeadRequest, Header, HeaderMap, Method, Request, Response, StatusCode, StreamRequest, Version};
pub use limits::{ConnLimits, ReqLimits};
pub use middleware::{BodyTransform, DecodeCallback, DecodeOutcome, EncodeCallback, Middleware};
pub use router::{AcceptPredicate, DispatchOutcome, Hole, Route, RouteHandler, Segment, TopHandler};
pub use server::{Server, ServerBuilder};
pub use stream::InputStream;
