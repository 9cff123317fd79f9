//! Shared utilities for integration tests.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use yalb::config::{Algorithm, ConfigSnapshot};
use yalb::{HttpServer, Router, Shutdown};

/// What a mock backend does with one request.
#[allow(dead_code)]
pub enum Reply {
    /// Answer with a status and body.
    Respond(u16, String),
    /// Close the connection without answering.
    Reset,
}

/// Start a mock backend on an ephemeral port.
///
/// `f` receives the raw request: request line, headers and body as sent.
pub async fn start_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Reply> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let f = f.clone();
            tokio::spawn(async move {
                let mut raw = Vec::new();
                let mut buf = [0u8; 1024];
                while !request_complete(&raw) {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => raw.extend_from_slice(&buf[..n]),
                    }
                }
                let request = String::from_utf8_lossy(&raw).into_owned();

                if let Reply::Respond(status, body) = f(request).await {
                    let status_text = match status {
                        200 => "200 OK",
                        404 => "404 Not Found",
                        500 => "500 Internal Server Error",
                        503 => "503 Service Unavailable",
                        _ => "200 OK",
                    };
                    let response = format!(
                        "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        status_text,
                        body.len(),
                        body
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                }
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}

/// Whether `raw` holds a whole request, judged by `Content-Length` or the
/// final chunk of a chunked body.
fn request_complete(raw: &[u8]) -> bool {
    let Some(end) = raw.windows(4).position(|w| w == b"\r\n\r\n") else {
        return false;
    };
    let head = String::from_utf8_lossy(&raw[..end]).to_ascii_lowercase();
    let body = &raw[end + 4..];

    if head.contains("transfer-encoding: chunked") {
        return body.ends_with(b"0\r\n\r\n");
    }
    let length = head
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);
    body.len() >= length
}

/// Body of a raw request, with chunked framing removed.
#[allow(dead_code)]
pub fn request_body(raw: &str) -> String {
    let Some((head, body)) = raw.split_once("\r\n\r\n") else {
        return String::new();
    };
    if !head.to_ascii_lowercase().contains("transfer-encoding: chunked") {
        return body.to_string();
    }

    let mut decoded = String::new();
    let mut rest = body;
    while let Some((size, tail)) = rest.split_once("\r\n") {
        let Ok(size) = usize::from_str_radix(size.trim(), 16) else {
            break;
        };
        if size == 0 || tail.len() < size {
            break;
        }
        decoded.push_str(&tail[..size]);
        rest = tail[size..].trim_start_matches("\r\n");
    }
    decoded
}

/// Start a backend that answers every request with `name`.
#[allow(dead_code)]
pub async fn start_named_backend(name: &'static str) -> SocketAddr {
    start_backend(move |_| async move { Reply::Respond(200, name.to_string()) }).await
}

/// An address with nothing listening on it.
#[allow(dead_code)]
pub async fn dead_address() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Path from the request line of a raw request head.
#[allow(dead_code)]
pub fn request_path(head: &str) -> &str {
    head.split_whitespace().nth(1).unwrap_or("/")
}

pub fn config_for(backends: &[SocketAddr], algorithm: Algorithm) -> ConfigSnapshot {
    ConfigSnapshot {
        servers: backends.iter().map(|a| format!("http://{}", a)).collect(),
        algorithm,
        port: "0".to_string(),
        host: "127.0.0.1".to_string(),
        ..ConfigSnapshot::default()
    }
}

/// A running proxy and the handles to inspect and stop it.
#[allow(dead_code)]
pub struct Proxy {
    pub url: String,
    pub router: Arc<Router>,
    pub shutdown: Shutdown,
}

/// Start the proxy on an ephemeral port.
pub async fn start_proxy(config: ConfigSnapshot) -> Proxy {
    let router = Arc::new(Router::from_config(&config).unwrap());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let (_, config_updates) = tokio::sync::mpsc::unbounded_channel();
    let server = HttpServer::new(router.clone(), config);
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, config_updates, server_shutdown).await;
    });

    Proxy {
        url: format!("http://{}", addr),
        router,
        shutdown,
    }
}

#[allow(dead_code)]
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// Wait until every backend of `router` reports zero in-flight requests.
#[allow(dead_code)]
pub async fn wait_until_idle(router: &Router) -> bool {
    for _ in 0..100 {
        if router.backends().iter().all(|b| b.active_connections == 0) {
            return true;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    false
}
