#![allow(dead_code)]

use api_tester::app::App;
use api_tester::config::EngineConfig;
use api_tester::services::logger::Logger;
use api_tester::services::token::StaticTokenProvider;
use api_tester::stores::kv_store::{KeyValueStore, MemoryKvStore};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

pub static ENV_LOCK: Lazy<tokio::sync::Mutex<()>> = Lazy::new(|| tokio::sync::Mutex::new(()));

pub const SLOW_DELAY_MS: u64 = 300;

#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: String,
    pub path: String,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl CapturedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(String::as_str)
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Minimal HTTP/1.1 endpoint with canned routes. Every connection is closed
/// after one response.
pub struct StubServer {
    pub base_url: String,
    captured: Arc<Mutex<Vec<CapturedRequest>>>,
}

impl StubServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind stub");
        let addr = listener.local_addr().expect("stub addr");
        let captured = Arc::new(Mutex::new(Vec::new()));
        let sink = captured.clone();
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let sink = sink.clone();
                tokio::spawn(async move {
                    let _ = handle_connection(stream, sink).await;
                });
            }
        });
        Self {
            base_url: format!("http://{}", addr),
            captured,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.captured.lock().expect("captured").clone()
    }

    pub fn last_request(&self) -> CapturedRequest {
        self.requests().pop().expect("at least one request")
    }
}

async fn handle_connection(
    stream: TcpStream,
    sink: Arc<Mutex<Vec<CapturedRequest>>>,
) -> std::io::Result<()> {
    let mut reader = BufReader::new(stream);
    let mut request_line = String::new();
    reader.read_line(&mut request_line).await?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or("").to_string();
    let path = parts.next().unwrap_or("/").to_string();

    let mut headers = HashMap::new();
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).await? == 0 {
            break;
        }
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.insert(name.trim().to_lowercase(), value.trim().to_string());
        }
    }

    let body = if headers
        .get("transfer-encoding")
        .map(|v| v.eq_ignore_ascii_case("chunked"))
        .unwrap_or(false)
    {
        read_chunked(&mut reader).await?
    } else {
        let length: usize = headers
            .get("content-length")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);
        let mut body = vec![0u8; length];
        reader.read_exact(&mut body).await?;
        body
    };

    let captured = CapturedRequest {
        method,
        path,
        headers,
        body,
    };
    sink.lock().expect("captured").push(captured.clone());

    let (status, content_type, payload) = route(&captured).await;
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nX-Stub: one\r\nX-Stub: two\r\nConnection: close\r\n\r\n",
        status,
        content_type,
        payload.len()
    );
    let mut stream = reader.into_inner();
    stream.write_all(response.as_bytes()).await?;
    stream.write_all(payload.as_bytes()).await?;
    stream.shutdown().await?;
    Ok(())
}

async fn read_chunked(reader: &mut BufReader<TcpStream>) -> std::io::Result<Vec<u8>> {
    let mut body = Vec::new();
    loop {
        let mut size_line = String::new();
        reader.read_line(&mut size_line).await?;
        let size = usize::from_str_radix(size_line.trim().split(';').next().unwrap_or("0"), 16)
            .unwrap_or(0);
        let mut chunk = vec![0u8; size + 2];
        reader.read_exact(&mut chunk).await?;
        if size == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..size]);
    }
    Ok(body)
}

async fn route(request: &CapturedRequest) -> (&'static str, &'static str, String) {
    let path = request.path.split('?').next().unwrap_or("");
    match path {
        "/json" => (
            "200 OK",
            "application/json; charset=utf-8",
            serde_json::json!({"ok": true, "path": request.path}).to_string(),
        ),
        "/text" => ("200 OK", "text/plain", "hello".to_string()),
        "/missing" => (
            "404 Not Found",
            "application/json",
            serde_json::json!({"error": "not found"}).to_string(),
        ),
        "/boom" => ("500 Internal Server Error", "text/plain", "boom".to_string()),
        "/broken-json" => ("200 OK", "application/json", "{oops".to_string()),
        "/slow" => {
            tokio::time::sleep(Duration::from_millis(SLOW_DELAY_MS)).await;
            ("200 OK", "text/plain", "slow".to_string())
        }
        _ => ("200 OK", "text/plain", "ok".to_string()),
    }
}

/// Port that nothing listens on.
pub async fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    format!("http://{}/gone", addr)
}

pub fn test_config(base_url: &str) -> EngineConfig {
    EngineConfig {
        base_url: base_url.to_string(),
        timeout_ms: 5_000,
        connect_timeout_ms: 2_000,
        store_path: std::env::temp_dir()
            .join(format!("api-tester-test-{}", uuid::Uuid::new_v4()))
            .join("store.json"),
        ..EngineConfig::default()
    }
}

pub fn test_app(base_url: &str, token: Option<&str>) -> (App, Arc<MemoryKvStore>) {
    let backend = Arc::new(MemoryKvStore::new());
    let app = App::assemble(
        Logger::silent("test"),
        test_config(base_url),
        backend.clone() as Arc<dyn KeyValueStore>,
        Arc::new(StaticTokenProvider::new(token.map(str::to_string))),
    )
    .expect("app");
    (app, backend)
}
