//! The per-connection keep-alive loop (4.I).
//!
//! Owns a single buffered stream over the accepted socket for the
//! connection's whole lifetime. Each iteration parses one request's head,
//! runs the full decode/dispatch/handle/encode pipeline, writes the
//! response, and decides whether to read another request or stop. Nothing
//! here is async: a worker blocks in the stream's `peek` or the socket's
//! `write_all` exactly where the underlying I/O blocks.

use std::io::Write;
use std::net::TcpStream;
use std::sync::{Arc, RwLock};

use log::{debug, error, warn};

use crate::errors::ErrorKind;
use crate::http::method::Version;
use crate::http::request::{attach_body, parse_head};
use crate::http::response::{write_response, Response};
use crate::limits::{ConnLimits, ReqLimits};
use crate::middleware::Middleware;
use crate::router::{DispatchOutcome, Router};
use crate::stream::{InputStream, ReadStream};

/// Routes and middleware shared read-only by every connection worker,
/// locked for the span of a single dispatch. Registration happens only
/// through [`crate::server::server_impl::ServerBuilder`], before any
/// worker starts running, so contention on the read lock is never more
/// than incidental.
pub(crate) struct Shared {
    pub(crate) router: Router,
    pub(crate) middleware: Middleware,
}

/// Runs the per-request pipeline of 4.H: decode callbacks, routing,
/// body materialization, handler invocation, encode callbacks. Generic over
/// any [`InputStream`] rather than pinned to a socket so it can be driven
/// directly by tests with an in-memory stream.
fn process_request(
    shared: &Shared,
    stream: &mut (dyn InputStream + Send),
    limits: &ReqLimits,
    started_at: u64,
) -> Result<(Response, Version, bool), ErrorKind> {
    let head = parse_head(stream, limits, started_at)?;
    let (head, transforms) = shared.middleware.run_decode(head);

    let outcome = shared.router.dispatch_head(&head);
    let route = match outcome {
        DispatchOutcome::Rejected(status, message) => {
            return Err(ErrorKind::AcceptRejected { status, message });
        }
        DispatchOutcome::Matched { route, holes } => Some((route, holes)),
        DispatchOutcome::NoMatch => None,
    };

    let raw_body = attach_body(&head, stream, limits)?;
    let body = Middleware::apply_transforms(transforms, raw_body);
    let request = head.into_stream(body).read_body_full(limits.body_size)?;

    let mut resp = Response::new();
    let handled = match route {
        Some((route, holes)) => (route.handler)(&holes, &request, &mut resp),
        None => shared.router.invoke_top(&request, &mut resp),
    };
    if let Err((status, message)) = handled {
        return Err(ErrorKind::handler_abort(status, message));
    }

    let version = request.version;
    let keep_alive = request.keep_alive;
    let resp = shared.middleware.run_encode(&request, resp);
    Ok((resp, version, keep_alive))
}

/// Drives one accepted TCP connection until it closes, per 4.I. `buf_size`
/// sizes the read buffer; `get_time_s` supplies the clock used for
/// `max_keep_alive` and request timestamps; a negative `max_keep_alive`
/// means unbounded.
pub(crate) fn handle_connection(
    socket: TcpStream,
    shared: Arc<RwLock<Shared>>,
    req_limits: ReqLimits,
    conn_limits: ConnLimits,
    buf_size: usize,
    max_keep_alive: i64,
    get_time_s: Arc<dyn Fn() -> u64 + Send + Sync>,
) {
    let _ = socket.set_read_timeout(Some(conn_limits.read_timeout));
    let _ = socket.set_write_timeout(Some(conn_limits.write_timeout));

    let started = get_time_s();
    let mut stream = ReadStream::new(socket, buf_size);

    loop {
        let now = get_time_s();
        if max_keep_alive >= 0 && now.saturating_sub(started) > max_keep_alive as u64 {
            debug!("closing connection: keep-alive lifetime exceeded");
            break;
        }

        let outcome = {
            let guard = match shared.read() {
                Ok(guard) => guard,
                Err(_) => {
                    error!("shared router/middleware lock poisoned");
                    break;
                }
            };
            process_request(&guard, &mut stream, &req_limits, now)
        };

        let (resp, version, keep_alive) = match outcome {
            Ok(triple) => triple,
            Err(ErrorKind::Io(_)) => {
                debug!("connection closed: peer disconnected or I/O error");
                break;
            }
            Err(err) => {
                if err.closes_connection() {
                    warn!("request failed ({}), closing connection", err);
                } else {
                    debug!("handler aborted ({}), keeping connection alive", err);
                }
                (Response::from_error(&err), Version::Http11, !err.closes_connection())
            }
        };

        let Some(sink) = stream.get_mut() else {
            break;
        };
        let write_result =
            write_response(resp, version, keep_alive, sink).and_then(|alive| sink.flush().map(|()| alive));

        match write_result {
            Ok(true) => continue,
            Ok(false) => break,
            Err(e) => {
                warn!("failed writing response: {e}");
                break;
            }
        }
    }

    let _ = stream.close();
}

#[cfg(test)]
mod tests {
    use std::io::{self, Read as _, Write as _};
    use std::net::TcpListener;

    use super::*;
    use crate::http::status::StatusCode;
    use crate::router::Segment;
    use crate::stream::SliceStream;

    fn limits() -> ReqLimits {
        ReqLimits::default()
    }

    fn shared_with_routes() -> Shared {
        let mut router = Router::new();
        router.add_path_handler(
            vec![Segment::Literal("hello")],
            None,
            None,
            Box::new(|_holes, _req, resp| Ok(resp.status(StatusCode::OK).body("hi"))),
        );
        router.add_path_handler(
            vec![Segment::Literal("echo")],
            None,
            None,
            Box::new(|_holes, req, resp| Ok(resp.status(StatusCode::OK).body(req.body.clone()))),
        );
        router.add_path_handler(
            vec![Segment::Literal("stream")],
            None,
            None,
            Box::new(|_holes, _req, resp| {
                struct ThreeChunks(u8);
                impl InputStream for ThreeChunks {
                    fn peek(&mut self) -> io::Result<&[u8]> {
                        match self.0 {
                            0 => Ok(b"ab"),
                            1 => Ok(b"c"),
                            2 => Ok(b"def"),
                            _ => Ok(&[]),
                        }
                    }
                    fn consume(&mut self, n: usize) {
                        if n > 0 {
                            self.0 += 1;
                        }
                    }
                    fn close(&mut self) -> io::Result<()> {
                        Ok(())
                    }
                }
                Ok(resp.status(StatusCode::OK).body_stream(Box::new(ThreeChunks(0))))
            }),
        );
        Shared { router, middleware: Middleware::new() }
    }

    #[test]
    fn simple_get_round_trips() {
        let shared = shared_with_routes();
        let mut s = SliceStream::new(b"GET /hello HTTP/1.1\r\nHost: x\r\n\r\n");
        let (resp, version, keep_alive) = process_request(&shared, &mut s, &limits(), 0).unwrap();
        assert!(keep_alive);

        let mut out = Vec::new();
        write_response(resp, version, keep_alive, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(text.contains("content-length: 2\r\n"));
        assert!(text.ends_with("hi"));
    }

    #[test]
    fn chunked_post_is_echoed_back() {
        let shared = shared_with_routes();
        let mut s = SliceStream::new(b"POST /echo HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n5\r\nhello\r\n0\r\n\r\n");
        let (resp, version, keep_alive) = process_request(&shared, &mut s, &limits(), 0).unwrap();

        let mut out = Vec::new();
        write_response(resp, version, keep_alive, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("content-length: 5\r\n"));
        assert!(text.ends_with("hello"));
    }

    #[test]
    fn stream_route_emits_chunked_framing() {
        let shared = shared_with_routes();
        let mut s = SliceStream::new(b"GET /stream HTTP/1.1\r\n\r\n");
        let (resp, version, keep_alive) = process_request(&shared, &mut s, &limits(), 0).unwrap();

        let mut out = Vec::new();
        write_response(resp, version, keep_alive, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("transfer-encoding: chunked\r\n"));
        assert!(text.ends_with("2\r\nab\r\n1\r\nc\r\n3\r\ndef\r\n0\r\n\r\n"));
    }

    #[test]
    fn missing_route_falls_back_to_404() {
        let shared = shared_with_routes();
        let mut s = SliceStream::new(b"GET /missing HTTP/1.1\r\n\r\n");
        let (resp, version, keep_alive) = process_request(&shared, &mut s, &limits(), 0).unwrap();

        let mut out = Vec::new();
        write_response(resp, version, keep_alive, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("HTTP/1.1 404 Not Found\r\n"));
    }

    #[test]
    fn two_requests_share_one_connection() {
        let shared = shared_with_routes();
        let mut s = SliceStream::new(
            b"GET /hello HTTP/1.1\r\n\r\nGET /hello HTTP/1.1\r\nConnection: close\r\n\r\n",
        );

        let (resp1, version1, keep_alive1) = process_request(&shared, &mut s, &limits(), 0).unwrap();
        assert!(keep_alive1);
        let mut out1 = Vec::new();
        write_response(resp1, version1, keep_alive1, &mut out1).unwrap();
        assert!(String::from_utf8(out1).unwrap().ends_with("hi"));

        let (resp2, version2, keep_alive2) = process_request(&shared, &mut s, &limits(), 0).unwrap();
        assert!(!keep_alive2);
        let mut out2 = Vec::new();
        write_response(resp2, version2, keep_alive2, &mut out2).unwrap();
        assert!(String::from_utf8(out2).unwrap().ends_with("hi"));
    }

    #[test]
    fn malformed_request_line_closes_connection() {
        let shared = shared_with_routes();
        let mut s = SliceStream::new(b"GARBAGE\r\n\r\n");
        let err = process_request(&shared, &mut s, &limits(), 0).unwrap_err();
        assert!(err.closes_connection());

        let resp = Response::from_error(&err);
        let mut out = Vec::new();
        write_response(resp, Version::Http11, true, &mut out).unwrap();
        assert!(String::from_utf8(out).unwrap().starts_with("HTTP/1.1 400 Bad Request\r\n"));
    }

    #[test]
    fn handle_connection_serves_two_keep_alive_requests_over_a_real_socket() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let client = std::thread::spawn(move || {
            let mut conn = TcpStream::connect(addr).unwrap();
            conn.write_all(b"GET /hello HTTP/1.1\r\n\r\n").unwrap();
            conn.write_all(b"GET /hello HTTP/1.1\r\nConnection: close\r\n\r\n").unwrap();
            let mut received = Vec::new();
            conn.read_to_end(&mut received).unwrap();
            received
        });

        let (socket, _) = listener.accept().unwrap();
        let shared = Arc::new(RwLock::new(shared_with_routes()));
        let get_time_s: Arc<dyn Fn() -> u64 + Send + Sync> = Arc::new(|| 0);
        handle_connection(socket, shared, ReqLimits::default(), ConnLimits::default(), 4096, -1, get_time_s);

        let received = client.join().unwrap();
        let text = String::from_utf8(received).unwrap();
        assert_eq!(text.matches("HTTP/1.1 200 OK").count(), 2);
        assert!(text.contains("connection: close\r\n"));
    }
}
