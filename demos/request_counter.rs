use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use hearth_http::{Server, StatusCode};

fn main() {
    let count = Arc::new(AtomicUsize::new(0));

    let server = Server::builder()
        .port(8080)
        .set_top_handler(Box::new(move |_req, resp| {
            let n = count.fetch_add(1, Ordering::Relaxed) + 1;
            Ok(resp.status(StatusCode::OK).header("content-type", "application/json").body(format!(r#"{{"count_request": {n}}}"#)))
        }))
        .build();

    server.run().unwrap();
}
