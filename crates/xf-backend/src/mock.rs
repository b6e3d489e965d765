//! Mock Xtream panel for testing.
//!
//! A tiny HTTP/1.1 server on `127.0.0.1` that answers GET requests by path
//! with canned responses, so tests at every layer can exercise the real
//! client without network access.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// A canned response.
#[derive(Debug, Clone)]
pub struct MockRoute {
    pub status: u16,
    pub content_type: String,
    pub body: Vec<u8>,
    /// Send `Content-Length`. Without it the body is close-delimited.
    pub content_length: bool,
}

impl MockRoute {
    pub fn json(body: &str) -> Self {
        Self {
            status: 200,
            content_type: "application/json".to_string(),
            body: body.as_bytes().to_vec(),
            content_length: true,
        }
    }

    pub fn text(status: u16, body: &str) -> Self {
        Self {
            status,
            content_type: "text/plain; charset=utf-8".to_string(),
            body: body.as_bytes().to_vec(),
            content_length: true,
        }
    }

    pub fn m3u(body: &str) -> Self {
        Self {
            status: 200,
            content_type: "audio/x-mpegurl; charset=utf-8".to_string(),
            body: body.as_bytes().to_vec(),
            content_length: true,
        }
    }

    pub fn without_length(mut self) -> Self {
        self.content_length = false;
        self
    }
}

/// Running mock server. Stops when dropped.
pub struct MockServer {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<String>>>,
    handle: JoinHandle<()>,
}

impl MockServer {
    /// Bind an ephemeral port and serve `routes` (matched on path, query ignored).
    /// Unknown paths get a 404.
    pub async fn start(routes: Vec<(&str, MockRoute)>) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let routes: Arc<Vec<(String, MockRoute)>> = Arc::new(
            routes
                .into_iter()
                .map(|(path, route)| (path.to_string(), route))
                .collect(),
        );
        let requests = Arc::new(Mutex::new(Vec::new()));
        let log = requests.clone();

        let handle = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let routes = routes.clone();
                let log = log.clone();
                tokio::spawn(async move {
                    let _ = handle_connection(stream, &routes, &log).await;
                });
            }
        });

        Ok(Self {
            addr,
            requests,
            handle,
        })
    }

    /// `127.0.0.1:PORT`, the form a user would type as server address.
    pub fn host(&self) -> String {
        self.addr.to_string()
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Request targets (path and query) received so far.
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn handle_connection(
    mut stream: TcpStream,
    routes: &[(String, MockRoute)],
    log: &Mutex<Vec<String>>,
) -> std::io::Result<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        // TLS ClientHello: plain HTTP only, hang up so https candidates fail fast.
        if buf.first() == Some(&0x16) {
            return stream.shutdown().await;
        }
    }

    let head = String::from_utf8_lossy(&buf);
    let target = head
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("/")
        .to_string();
    let path = target.split('?').next().unwrap_or("/").to_string();
    if let Ok(mut requests) = log.lock() {
        requests.push(target);
    }

    let not_found = MockRoute::text(404, "not found");
    let route = routes
        .iter()
        .find(|(p, _)| *p == path)
        .map(|(_, r)| r)
        .unwrap_or(&not_found);

    let mut response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nConnection: close\r\n",
        route.status,
        reason(route.status),
        route.content_type
    );
    if route.content_length {
        response.push_str(&format!("Content-Length: {}\r\n", route.body.len()));
    }
    response.push_str("\r\n");

    stream.write_all(response.as_bytes()).await?;
    stream.write_all(&route.body).await?;
    stream.shutdown().await
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        403 => "Forbidden",
        404 => "Not Found",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        _ => "Unknown",
    }
}
