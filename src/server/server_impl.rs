//! Server configuration and lifecycle (4.J).
//!
//! [`ServerBuilder`] collects routes, middleware, and tuning knobs; [`Server`]
//! is the built, runnable result. `run` binds a listener (or adopts one the
//! caller already bound) and accepts connections in a loop, handing each
//! socket to the injected spawn function — by default a fresh OS thread per
//! connection, the simplest worker-spawn strategy a blocking design can use.

use std::io;
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{SystemTime, UNIX_EPOCH};

use log::error;

use crate::limits::{ConnLimits, ReqLimits};
use crate::middleware::{DecodeCallback, EncodeCallback, Middleware};
use crate::router::{AcceptPredicate, Router, RouteHandler, Segment, TopHandler};

use super::connection::{handle_connection, Shared};

type SpawnFn = dyn Fn(Box<dyn FnOnce() + Send>) + Send + Sync;

fn default_spawn(job: Box<dyn FnOnce() + Send>) {
    std::thread::spawn(job);
}

fn wall_clock_seconds() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}

/// Collects configuration, routes, and middleware before the server runs.
/// None of this is mutable once [`ServerBuilder::build`] produces a
/// [`Server`] — the only way routes or middleware reach a running server is
/// through this builder, which closes the "can routes change while serving"
/// open question by construction rather than by locking a mutable list.
pub struct ServerBuilder {
    masksigpipe: bool,
    new_thread: Box<SpawnFn>,
    addr: String,
    port: u16,
    buf_size: usize,
    max_keep_alive: i64,
    get_time_s: Arc<dyn Fn() -> u64 + Send + Sync>,
    request_limits: ReqLimits,
    connection_limits: ConnLimits,
    router: Router,
    middleware: Middleware,
}

impl ServerBuilder {
    pub fn new() -> Self {
        ServerBuilder {
            masksigpipe: true,
            new_thread: Box::new(default_spawn),
            addr: "127.0.0.1".to_string(),
            port: 8080,
            buf_size: 16 * 1024,
            max_keep_alive: -1,
            get_time_s: Arc::new(wall_clock_seconds),
            request_limits: ReqLimits::default(),
            connection_limits: ConnLimits::default(),
            router: Router::new(),
            middleware: Middleware::new(),
        }
    }

    /// Whether to mask `SIGPIPE` at startup (Unix only; default `true`).
    /// Leave this off if the embedding application manages `SIGPIPE` itself.
    pub fn masksigpipe(mut self, enabled: bool) -> Self {
        self.masksigpipe = enabled;
        self
    }

    /// The function used to run each connection's worker. Defaults to
    /// `std::thread::spawn`; override to use a bounded thread pool or, in
    /// tests, a same-thread executor.
    pub fn new_thread(mut self, f: impl Fn(Box<dyn FnOnce() + Send>) + Send + Sync + 'static) -> Self {
        self.new_thread = Box::new(f);
        self
    }

    /// Bind address (default `127.0.0.1`).
    pub fn addr(mut self, addr: impl Into<String>) -> Self {
        self.addr = addr.into();
        self
    }

    /// Bind port (default `8080`).
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Per-connection read buffer size (default 16 KiB).
    pub fn buf_size(mut self, buf_size: usize) -> Self {
        self.buf_size = buf_size;
        self
    }

    /// Keep-alive lifetime in seconds; negative means unbounded (default).
    pub fn max_keep_alive(mut self, seconds: i64) -> Self {
        self.max_keep_alive = seconds;
        self
    }

    /// Overrides the clock used for request timestamps and the keep-alive
    /// lifetime check. Defaults to wall-clock seconds; tests inject a
    /// deterministic clock.
    pub fn get_time_s(mut self, f: impl Fn() -> u64 + Send + Sync + 'static) -> Self {
        self.get_time_s = Arc::new(f);
        self
    }

    pub fn request_limits(mut self, limits: ReqLimits) -> Self {
        self.request_limits = limits;
        self
    }

    pub fn connection_limits(mut self, limits: ConnLimits) -> Self {
        self.connection_limits = limits;
        self
    }

    /// Registers a route, matched in reverse registration order against
    /// later-added routes.
    pub fn add_path_handler(
        mut self,
        pattern: Vec<Segment>,
        method: Option<crate::http::method::Method>,
        accept: Option<Box<AcceptPredicate>>,
        handler: Box<RouteHandler>,
    ) -> Self {
        self.router.add_path_handler(pattern, method, accept, handler);
        self
    }

    /// Replaces the fallback invoked when no route matches (defaults to a
    /// plain 404).
    pub fn set_top_handler(mut self, handler: Box<TopHandler>) -> Self {
        self.router.set_top_handler(handler);
        self
    }

    /// Appends a request-decode middleware callback.
    pub fn add_decode_request_cb(mut self, cb: Box<DecodeCallback>) -> Self {
        self.middleware.add_decode_request_cb(cb);
        self
    }

    /// Appends a response-encode middleware callback.
    pub fn add_encode_response_cb(mut self, cb: Box<EncodeCallback>) -> Self {
        self.middleware.add_encode_response_cb(cb);
        self
    }

    /// Finalizes configuration into a runnable [`Server`].
    pub fn build(self) -> Server {
        Server {
            addr: self.addr,
            port: self.port,
            buf_size: self.buf_size,
            max_keep_alive: self.max_keep_alive,
            masksigpipe: self.masksigpipe,
            new_thread: Arc::from(self.new_thread),
            get_time_s: self.get_time_s,
            request_limits: self.request_limits,
            connection_limits: self.connection_limits,
            shared: Arc::new(RwLock::new(Shared { router: self.router, middleware: self.middleware })),
            stop: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        ServerBuilder::new()
    }
}

#[cfg(unix)]
fn mask_sigpipe() {
    // SAFETY: installing SIG_IGN for SIGPIPE is always safe; it only
    // changes how the process is notified of a broken-pipe write, never
    // touches memory.
    unsafe {
        libc::signal(libc::SIGPIPE, libc::SIG_IGN);
    }
}

#[cfg(not(unix))]
fn mask_sigpipe() {}

/// A configured, runnable HTTP server. Built via [`ServerBuilder`]; has no
/// method to add routes or middleware once built.
pub struct Server {
    addr: String,
    port: u16,
    buf_size: usize,
    max_keep_alive: i64,
    masksigpipe: bool,
    new_thread: Arc<SpawnFn>,
    get_time_s: Arc<dyn Fn() -> u64 + Send + Sync>,
    request_limits: ReqLimits,
    connection_limits: ConnLimits,
    shared: Arc<RwLock<Shared>>,
    stop: Arc<AtomicBool>,
}

impl Server {
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    /// The configured bind address.
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// The configured bind port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Signals the accept loop to stop after its next iteration. Best
    /// effort: a worker already blocked in `accept` only notices once
    /// another connection arrives or the listener is dropped.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    /// Binds `self.addr:self.port` and runs the accept loop until
    /// [`Server::stop`] is called.
    pub fn run(&self) -> io::Result<()> {
        let listener = TcpListener::bind((self.addr.as_str(), self.port))?;
        self.run_on(listener)
    }

    /// Runs the accept loop over an already-bound listener, e.g. one
    /// constructed for a test with an ephemeral port.
    pub fn run_on(&self, listener: TcpListener) -> io::Result<()> {
        if self.masksigpipe {
            mask_sigpipe();
        }

        while !self.stop.load(Ordering::SeqCst) {
            match listener.accept() {
                Ok((socket, _addr)) => self.spawn_connection(socket),
                Err(e) => {
                    error!("accept failed: {e}");
                }
            }
        }
        Ok(())
    }

    fn spawn_connection(&self, socket: TcpStream) {
        let shared = self.shared.clone();
        let req_limits = self.request_limits.clone();
        let conn_limits = self.connection_limits.clone();
        let buf_size = self.buf_size;
        let max_keep_alive = self.max_keep_alive;
        let get_time_s = self.get_time_s.clone();

        (self.new_thread)(Box::new(move || {
            handle_connection(socket, shared, req_limits, conn_limits, buf_size, max_keep_alive, get_time_s);
        }));
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Read as _, Write as _};
    use std::net::TcpListener;

    use super::*;
    use crate::http::status::StatusCode;

    #[test]
    fn builder_defaults_match_the_documented_values() {
        let builder = ServerBuilder::new();
        assert!(builder.masksigpipe);
        assert_eq!(builder.addr, "127.0.0.1");
        assert_eq!(builder.port, 8080);
        assert_eq!(builder.buf_size, 16 * 1024);
        assert_eq!(builder.max_keep_alive, -1);
    }

    #[test]
    fn addr_and_port_are_configurable_and_exposed() {
        let server = Server::builder().addr("0.0.0.0").port(9090).build();
        assert_eq!(server.addr(), "0.0.0.0");
        assert_eq!(server.port(), 9090);
    }

    #[test]
    fn run_on_serves_requests_and_honors_stop() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        // Runs each connection inline on the accept thread so the test can
        // reason about ordering without a real worker pool.
        let server = Arc::new(
            Server::builder()
                .new_thread(|job| job())
                .set_top_handler(Box::new(|_req, resp| Ok(resp.status(StatusCode::OK).body("hi"))))
                .build(),
        );

        let runner = std::thread::spawn({
            let server = server.clone();
            move || server.run_on(listener)
        });

        let mut conn = TcpStream::connect(addr).unwrap();
        conn.write_all(b"GET / HTTP/1.1\r\nConnection: close\r\n\r\n").unwrap();
        let mut received = Vec::new();
        conn.read_to_end(&mut received).unwrap();
        assert!(String::from_utf8(received).unwrap().starts_with("HTTP/1.1 200 OK"));

        server.stop();
        // `run_on` only reconsiders the stop flag between `accept()` calls;
        // wake up a worker that may already be blocked in `accept()` so the
        // loop observes the flag and returns.
        let mut wake = TcpStream::connect(addr).unwrap();
        let _ = wake.write_all(b"GET / HTTP/1.1\r\nConnection: close\r\n\r\n");
        let mut drain = Vec::new();
        let _ = wake.read_to_end(&mut drain);

        runner.join().unwrap().unwrap();
    }
}
