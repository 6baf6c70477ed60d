use std::str::from_utf8;

use hearth_http::{Server, StatusCode};

fn main() {
    let server = Server::builder()
        .port(8080)
        .set_top_handler(Box::new(|req, resp| {
            let result = format!(
                r#"{{"path": {:?}, "body": {:?}}}"#,
                from_utf8(&req.path).unwrap_or(""),
                from_utf8(&req.body).unwrap_or(""),
            );

            Ok(resp.status(StatusCode::OK).header("content-type", "application/json").body(result))
        }))
        .build();

    server.run().unwrap();
}
