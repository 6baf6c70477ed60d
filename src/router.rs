//! Typed-hole path routing.
//!
//! A route's pattern is a sequence of [`Segment`]s built up programmatically
//! rather than parsed out of a format string — there is no little
//! mini-language to get wrong at runtime, just a `Vec<Segment>` the
//! compiler can check the shape of. Matching walks the pattern against the
//! request path's `/`-separated parts; a [`Segment::Rest`] must be last and
//! swallows everything remaining.

use crate::http::headers::HeaderMap;
use crate::http::method::Method;
use crate::http::request::{HeadRequest, Request};
use crate::http::response::{Handled, Response};
use crate::http::status::StatusCode;

/// One element of a route's path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Matches exactly this path segment.
    Literal(&'static str),
    /// Matches any non-empty segment, captured as a string.
    Str,
    /// Matches any segment parseable as `i64`, captured as an integer.
    Int,
    /// Matches every remaining segment, captured as a single `/`-joined
    /// string. Only valid as the pattern's last element.
    Rest,
}

/// A value extracted from the path by a [`Segment::Str`], [`Segment::Int`],
/// or [`Segment::Rest`] hole, in pattern order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Hole {
    Str(String),
    Int(i64),
}

impl Hole {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Hole::Str(s) => Some(s),
            Hole::Int(_) => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Hole::Int(n) => Some(*n),
            Hole::Str(_) => None,
        }
    }
}

/// An accept-predicate examines the headers-only request before the body
/// is read and may reject it outright with a status and message.
pub type AcceptPredicate = dyn Fn(&HeadRequest) -> Result<(), (StatusCode, String)> + Send + Sync;

/// A route's handler: the holes extracted from the path, the fully
/// materialized request, and the response to fill in. Returning `Err`
/// aborts with that status and message instead of whatever the handler
/// had written to `resp` so far; the connection is kept alive regardless.
pub type RouteHandler = dyn Fn(&[Hole], &Request, &mut Response) -> Result<Handled, (StatusCode, String)> + Send + Sync;

/// A fallback handler invoked when no route matches.
pub type TopHandler = dyn Fn(&Request, &mut Response) -> Result<Handled, (StatusCode, String)> + Send + Sync;

pub struct Route {
    pattern: Vec<Segment>,
    method: Option<Method>,
    accept: Option<Box<AcceptPredicate>>,
    pub(crate) handler: Box<RouteHandler>,
}

/// What [`Router::dispatch_head`] decided for a given headers-only request.
pub enum DispatchOutcome<'a> {
    /// A route matched and its accept-predicate (if any) passed.
    Matched { route: &'a Route, holes: Vec<Hole> },
    /// A route matched but its accept-predicate rejected the request.
    Rejected(StatusCode, String),
    /// No route matched; fall through to the top handler.
    NoMatch,
}

fn strip_query(path: &[u8]) -> &[u8] {
    match memchr::memchr(b'?', path) {
        Some(i) => &path[..i],
        None => path,
    }
}

fn split_path(path: &[u8]) -> Vec<&[u8]> {
    let path = strip_query(path);
    let trimmed = path.strip_prefix(b"/").unwrap_or(path);
    if trimmed.is_empty() {
        Vec::new()
    } else {
        trimmed.split(|&b| b == b'/').collect()
    }
}

fn match_pattern(pattern: &[Segment], parts: &[&[u8]]) -> Option<Vec<Hole>> {
    let mut holes = Vec::new();
    let mut i = 0;
    for (pos, seg) in pattern.iter().enumerate() {
        match seg {
            Segment::Rest => {
                debug_assert_eq!(pos, pattern.len() - 1, "Segment::Rest must be the last pattern element");
                let joined = parts[i..].join(&b"/"[..]);
                holes.push(Hole::Str(String::from_utf8(joined).ok()?));
                i = parts.len();
            }
            Segment::Literal(lit) => {
                if *parts.get(i)? != lit.as_bytes() {
                    return None;
                }
                i += 1;
            }
            Segment::Str => {
                let s = std::str::from_utf8(parts.get(i)?).ok()?.to_owned();
                holes.push(Hole::Str(s));
                i += 1;
            }
            Segment::Int => {
                let s = std::str::from_utf8(parts.get(i)?).ok()?;
                holes.push(Hole::Int(s.parse().ok()?));
                i += 1;
            }
        }
    }
    (i == parts.len()).then_some(holes)
}

/// Registered routes plus the 404 fallback. Built up via [`Router::add_path_handler`]
/// and [`Router::set_top_handler`] before the server starts running.
pub struct Router {
    routes: Vec<Route>,
    top_handler: Box<TopHandler>,
}

impl Router {
    pub fn new() -> Self {
        Router {
            routes: Vec::new(),
            top_handler: Box::new(|_req, resp| Ok(resp.status(StatusCode::NOT_FOUND).body("not found"))),
        }
    }

    /// Registers a route. Later registrations take priority: matching
    /// tries routes in reverse registration order.
    pub fn add_path_handler(
        &mut self,
        pattern: Vec<Segment>,
        method: Option<Method>,
        accept: Option<Box<AcceptPredicate>>,
        handler: Box<RouteHandler>,
    ) {
        self.routes.push(Route { pattern, method, accept, handler });
    }

    /// Replaces the fallback invoked when no route matches. Defaults to a
    /// plain 404.
    pub fn set_top_handler(&mut self, handler: Box<TopHandler>) {
        self.top_handler = handler;
    }

    /// Finds the highest-priority matching route for `head`, running its
    /// accept-predicate if present. Does not touch the body.
    pub fn dispatch_head(&self, head: &HeadRequest) -> DispatchOutcome<'_> {
        let parts = split_path(&head.path);
        for route in self.routes.iter().rev() {
            if let Some(method) = route.method {
                if method != head.method {
                    continue;
                }
            }
            let Some(holes) = match_pattern(&route.pattern, &parts) else {
                continue;
            };
            if let Some(accept) = &route.accept {
                if let Err((status, message)) = accept(head) {
                    return DispatchOutcome::Rejected(status, message);
                }
            }
            return DispatchOutcome::Matched { route, holes };
        }
        DispatchOutcome::NoMatch
    }

    pub fn invoke_top(&self, req: &Request, resp: &mut Response) -> Result<Handled, (StatusCode, String)> {
        (self.top_handler)(req, resp)
    }
}

impl Default for Router {
    fn default() -> Self {
        Router::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::response::write_response;

    fn head(path: &str, method: Method) -> HeadRequest {
        HeadRequest {
            method,
            version: crate::http::method::Version::Http11,
            path: path.as_bytes().to_vec(),
            headers: HeaderMap::with_capacity(0),
            started_at: 0,
            keep_alive: true,
        }
    }

    fn request(path: &str, method: Method) -> Request {
        Request {
            method,
            version: crate::http::method::Version::Http11,
            path: path.as_bytes().to_vec(),
            headers: HeaderMap::with_capacity(0),
            started_at: 0,
            keep_alive: true,
            body: Vec::new(),
        }
    }

    #[test]
    fn matches_literal_and_typed_holes() {
        let mut router = Router::new();
        router.add_path_handler(
            vec![Segment::Literal("users"), Segment::Int, Segment::Literal("posts"), Segment::Str],
            Some(Method::Get),
            None,
            Box::new(|holes, _req, resp| {
                Ok(resp.status(StatusCode::OK).body(format!("{:?}", holes)))
            }),
        );

        let h = head("/users/42/posts/hello", Method::Get);
        match router.dispatch_head(&h) {
            DispatchOutcome::Matched { holes, .. } => {
                assert_eq!(holes, vec![Hole::Int(42), Hole::Str("hello".into())]);
            }
            _ => panic!("expected a match"),
        }
    }

    #[test]
    fn rest_segment_consumes_remainder() {
        let mut router = Router::new();
        router.add_path_handler(
            vec![Segment::Literal("files"), Segment::Rest],
            None,
            None,
            Box::new(|_holes, _req, resp| Ok(resp.status(StatusCode::OK).body("ok"))),
        );

        let h = head("/files/a/b/c.txt", Method::Get);
        match router.dispatch_head(&h) {
            DispatchOutcome::Matched { holes, .. } => {
                assert_eq!(holes, vec![Hole::Str("a/b/c.txt".into())]);
            }
            _ => panic!("expected a match"),
        }
    }

    #[test]
    fn later_registration_takes_priority() {
        let mut router = Router::new();
        router.add_path_handler(vec![Segment::Str], None, None, Box::new(|_, _, r| Ok(r.status(StatusCode::OK).body("first"))));
        router.add_path_handler(vec![Segment::Str], None, None, Box::new(|_, _, r| Ok(r.status(StatusCode::OK).body("second"))));

        let h = head("/anything", Method::Get);
        match router.dispatch_head(&h) {
            DispatchOutcome::Matched { route, holes } => {
                let mut resp = Response::new();
                let req = request("/anything", Method::Get);
                let _ = (route.handler)(&holes, &req, &mut resp);
            }
            _ => panic!("expected a match"),
        }
    }

    #[test]
    fn method_filter_excludes_non_matching_requests() {
        let mut router = Router::new();
        router.add_path_handler(vec![Segment::Literal("x")], Some(Method::Post), None, Box::new(|_, _, r| Ok(r.status(StatusCode::OK).body("x"))));

        let h = head("/x", Method::Get);
        assert!(matches!(router.dispatch_head(&h), DispatchOutcome::NoMatch));
    }

    #[test]
    fn accept_predicate_can_reject_before_handler_runs() {
        let mut router = Router::new();
        router.add_path_handler(
            vec![Segment::Literal("admin")],
            None,
            Some(Box::new(|_head| Err((StatusCode::FORBIDDEN, "nope".to_string())))),
            Box::new(|_, _, r| Ok(r.status(StatusCode::OK).body("unreachable"))),
        );

        let h = head("/admin", Method::Get);
        match router.dispatch_head(&h) {
            DispatchOutcome::Rejected(status, message) => {
                assert_eq!(status, StatusCode::FORBIDDEN);
                assert_eq!(message, "nope");
            }
            _ => panic!("expected a rejection"),
        }
    }

    #[test]
    fn no_match_falls_through_to_top_handler() {
        let router = Router::new();
        let h = head("/missing", Method::Get);
        assert!(matches!(router.dispatch_head(&h), DispatchOutcome::NoMatch));

        let mut resp = Response::new();
        let req = request("/missing", Method::Get);
        let _ = router.invoke_top(&req, &mut resp);

        let mut out = Vec::new();
        write_response(resp, crate::http::method::Version::Http11, true, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("HTTP/1.1 404 Not Found\r\n"));
        assert!(text.ends_with("not found"));
    }
}
