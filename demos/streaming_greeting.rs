use std::io;

use hearth_http::{InputStream, Server, StatusCode};

/// Emits a greeting split across a handful of chunks rather than as a
/// single string, so the response is framed with `Transfer-Encoding:
/// chunked` instead of `Content-Length`.
struct Greeting {
    parts: &'static [&'static [u8]],
    pos: usize,
}

impl InputStream for Greeting {
    fn peek(&mut self) -> io::Result<&[u8]> {
        Ok(self.parts.get(self.pos).copied().unwrap_or(&[]))
    }

    fn consume(&mut self, n: usize) {
        if n > 0 {
            self.pos += 1;
        }
    }

    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

const ZH_GREETING: &[&[u8]] = &[
    "你好".as_bytes(),
    "，".as_bytes(),
    "世界".as_bytes(),
    "！".as_bytes(),
];
const ES_GREETING: &[&[u8]] = &[
    "¡Hola".as_bytes(),
    " ".as_bytes(),
    "Mundo".as_bytes(),
    "!".as_bytes(),
];

fn greeting_for(lang: &str) -> Option<&'static [&'static [u8]]> {
    match lang {
        "en" => Some(&[b"Hello", b", ", b"world", b"!"]),
        "zh" => Some(ZH_GREETING),
        "es" => Some(ES_GREETING),
        _ => None,
    }
}

fn main() {
    let server = Server::builder()
        .port(8080)
        .add_path_handler(
            vec![hearth_http::Segment::Literal("api"), hearth_http::Segment::Str],
            None,
            None,
            Box::new(|holes, _req, resp| {
                let lang = holes[0].as_str().unwrap();
                match greeting_for(lang) {
                    Some(parts) => {
                        resp.status(StatusCode::OK).header("content-type", "text/plain; charset=utf-8");
                        Ok(resp.body_stream(Box::new(Greeting { parts, pos: 0 })))
                    }
                    None => Err((StatusCode::NOT_FOUND, format!("unsupported language: {lang}"))),
                }
            }),
        )
        .build();

    server.run().unwrap();
}
