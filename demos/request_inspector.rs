use std::str::from_utf8;

use hearth_http::{Server, StatusCode};

fn main() {
    let server = Server::builder()
        .port(8080)
        .set_top_handler(Box::new(|req, resp| {
            let user_agent = match req.headers.get(b"user-agent") {
                Some(value) => format!(r#", "user_agent": {:?}"#, from_utf8(value).unwrap_or("")),
                None => String::new(),
            };
            let content_type = match req.headers.get(b"content-type") {
                Some(value) => format!(r#", "content_type": {:?}"#, from_utf8(value).unwrap_or("")),
                None => String::new(),
            };

            let result = format!(
                r#"{{"method": "{:?}", "path": {:?}{user_agent}{content_type}, "body": {:?}}}"#,
                req.method,
                from_utf8(&req.path).unwrap_or(""),
                from_utf8(&req.body).unwrap_or(""),
            );

            Ok(resp.status(StatusCode::OK).header("content-type", "application/json").body(result))
        }))
        .build();

    server.run().unwrap();
}
