//! Test helpers shared by the HTTP adapters.
//!
//! Only used as a dev-dependency.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// A canned HTTP/1.1 response.
#[derive(Debug, Clone, Copy)]
pub struct CannedResponse {
    /// Status line, e.g. `HTTP/1.1 200 OK`.
    pub status_line: &'static str,
    /// Extra header lines, each terminated by `\r\n`.
    pub extra_headers: &'static str,
    /// JSON body.
    pub body: &'static str,
}

impl CannedResponse {
    /// A JSON response without extra headers.
    #[must_use]
    pub const fn json(status_line: &'static str, body: &'static str) -> Self {
        Self {
            status_line,
            extra_headers: "",
            body,
        }
    }

    /// Adds header lines.
    #[must_use]
    pub const fn with_headers(mut self, extra_headers: &'static str) -> Self {
        self.extra_headers = extra_headers;
        self
    }
}

/// Accepts one connection, answers it with `response`, and yields the raw
/// request text.
///
/// Returns the server's base URL (`http://127.0.0.1:<port>`).
///
/// # Panics
///
/// Panics if the listener cannot be bound or the connection fails.
pub async fn serve_once(response: CannedResponse) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("listener address");

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.expect("accept connection");
        let raw = read_request(&mut socket).await;

        let reply = format!(
            "{}\r\ncontent-type: application/json\r\n{}content-length: {}\r\nconnection: close\r\n\r\n{}",
            response.status_line,
            response.extra_headers,
            response.body.len(),
            response.body
        );
        socket
            .write_all(reply.as_bytes())
            .await
            .expect("write response");
        socket.shutdown().await.expect("shutdown socket");
        raw
    });

    (format!("http://{addr}"), handle)
}

/// Returns a URL on which nothing listens.
///
/// # Panics
///
/// Panics if no local port can be bound.
pub async fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("listener address");
    drop(listener);
    format!("http://{addr}")
}

/// Reads headers and a `content-length` body.
async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
    let mut raw = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = socket.read(&mut chunk).await.expect("read request");
        if n == 0 {
            break;
        }
        raw.extend_from_slice(&chunk[..n]);
        let text = String::from_utf8_lossy(&raw);
        if let Some(header_end) = text.find("\r\n\r\n") {
            if raw.len() >= header_end + 4 + content_length(&text[..header_end]) {
                break;
            }
        }
    }
    String::from_utf8_lossy(&raw).into_owned()
}

fn content_length(headers: &str) -> usize {
    headers
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse::<usize>().ok())
                .flatten()
        })
        .unwrap_or(0)
}
