use hearth_http::{Server, StatusCode};

fn main() {
    let server = Server::builder()
        .port(8080)
        .set_top_handler(Box::new(|_req, resp| {
            Ok(resp.status(StatusCode::OK).header("content-type", "text/plain").body("Hello, world!"))
        }))
        .build();

    server.run().unwrap();
}
