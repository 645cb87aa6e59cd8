//! In-process mock HTTP server for integration tests
//!
//! Serves a fixed route table over plain HTTP/1.1 on a loopback port and
//! records every request target, so tests can assert which URLs were hit
//! and how often. Responses can optionally drip their body in delayed
//! chunks to exercise streaming paths.

#![allow(dead_code)] // each integration test binary uses a subset

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use url::Url;

#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: u16,
    pub content_type: String,
    pub body: Vec<u8>,
    pub omit_length: bool,
    pub chunking: Option<(usize, Duration)>,
}

impl MockResponse {
    pub fn ok(content_type: &str, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            content_type: content_type.to_string(),
            body: body.into(),
            omit_length: false,
            chunking: None,
        }
    }

    pub fn zip(body: impl Into<Vec<u8>>) -> Self {
        Self::ok("application/zip", body)
    }

    pub fn html(body: &str) -> Self {
        Self::ok("text/html; charset=utf-8", body.as_bytes().to_vec())
    }

    pub fn dns_json(body: &str) -> Self {
        Self::ok("application/dns-json", body.as_bytes().to_vec())
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            content_type: "text/plain".to_string(),
            body: Vec::new(),
            omit_length: false,
            chunking: None,
        }
    }

    /// Drops the content-length header from the response
    pub fn without_length(mut self) -> Self {
        self.omit_length = true;
        self
    }

    /// Streams the body in `size`-byte chunks, sleeping between them
    pub fn chunked(mut self, size: usize, delay: Duration) -> Self {
        self.chunking = Some((size, delay));
        self
    }
}

pub struct MockServer {
    addr: SocketAddr,
    hits: Arc<Mutex<Vec<String>>>,
    accept_task: JoinHandle<()>,
}

impl MockServer {
    pub async fn start(routes: Vec<(&str, MockResponse)>) -> Self {
        let routes: Arc<HashMap<String, MockResponse>> = Arc::new(
            routes
                .into_iter()
                .map(|(path, response)| (path.to_string(), response))
                .collect(),
        );
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock server");
        let addr = listener.local_addr().expect("mock server local addr");
        let hits = Arc::new(Mutex::new(Vec::new()));

        let accept_task = tokio::spawn({
            let hits = Arc::clone(&hits);
            async move {
                loop {
                    let Ok((stream, _)) = listener.accept().await else {
                        break;
                    };
                    tokio::spawn(serve_connection(
                        stream,
                        Arc::clone(&routes),
                        Arc::clone(&hits),
                    ));
                }
            }
        });

        Self {
            addr,
            hits,
            accept_task,
        }
    }

    /// Absolute URL for a path on this server
    pub fn url(&self, path: &str) -> Url {
        Url::parse(&self.endpoint(path)).expect("mock server URL")
    }

    /// Absolute URL for a path on this server, as a string
    pub fn endpoint(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    /// Request targets received so far, in arrival order
    pub fn hits(&self) -> Vec<String> {
        self.hits.lock().unwrap().clone()
    }

    pub fn hit_count(&self) -> usize {
        self.hits.lock().unwrap().len()
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.accept_task.abort();
    }
}

async fn serve_connection(
    mut stream: TcpStream,
    routes: Arc<HashMap<String, MockResponse>>,
    hits: Arc<Mutex<Vec<String>>>,
) {
    let mut request = Vec::new();
    let mut buf = [0u8; 1024];
    loop {
        match stream.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                request.extend_from_slice(&buf[..n]);
                if request.windows(4).any(|window| window == b"\r\n\r\n") {
                    break;
                }
            }
        }
    }

    let request = String::from_utf8_lossy(&request);
    let Some(target) = request.split_whitespace().nth(1) else {
        return;
    };
    hits.lock().unwrap().push(target.to_string());

    let path = target.split('?').next().unwrap_or("/");
    let response = routes
        .get(path)
        .cloned()
        .unwrap_or_else(|| MockResponse::status(404));

    let _ = write_response(&mut stream, &response).await;
    let _ = stream.shutdown().await;
}

async fn write_response(stream: &mut TcpStream, response: &MockResponse) -> std::io::Result<()> {
    let reason = match response.status {
        200 => "OK",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Error",
    };
    let mut head = format!(
        "HTTP/1.1 {} {reason}\r\ncontent-type: {}\r\n",
        response.status, response.content_type
    );
    if !response.omit_length {
        head.push_str(&format!("content-length: {}\r\n", response.body.len()));
    }
    head.push_str("connection: close\r\n\r\n");
    stream.write_all(head.as_bytes()).await?;

    match response.chunking {
        Some((size, delay)) => {
            for chunk in response.body.chunks(size.max(1)) {
                stream.write_all(chunk).await?;
                stream.flush().await?;
                tokio::time::sleep(delay).await;
            }
        }
        None => stream.write_all(&response.body).await?,
    }
    stream.flush().await
}
