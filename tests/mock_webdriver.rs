//! Mock W3C WebDriver server
//!
//! A minimal HTTP/1.1 responder speaking enough of the WebDriver protocol to
//! drive `WebDriverBrowser` without a real browser. It also answers `/api/*`
//! so API tests can share it.

#![allow(dead_code)]

use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// 1x1 PNG, base64 encoded
const SCREENSHOT_PNG: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNk+M9QDwADhgGAWjR9awAAAABJRU5ErkJggg==";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub width: u32,
    pub height: u32,
}

/// What the server has seen
#[derive(Debug, Default)]
pub struct ServerState {
    session_failures: AtomicU32,
    stale_displays: AtomicU32,
    next_session: AtomicU32,
    pub deleted: Mutex<Vec<String>>,
    pub capabilities: Mutex<Vec<Value>>,
    pub urls: Mutex<HashMap<String, String>>,
    pub rects: Mutex<HashMap<String, Rect>>,
    pub requests: Mutex<Vec<String>>,
    /// Selector values that resolve to an element
    pub elements: Mutex<Vec<String>>,
}

impl ServerState {
    pub fn deleted_sessions(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }

    pub fn rect(&self, session: &str) -> Option<Rect> {
        self.rects.lock().unwrap().get(session).copied()
    }

    pub fn url(&self, session: &str) -> Option<String> {
        self.urls.lock().unwrap().get(session).cloned()
    }

    pub fn request_count(&self, prefix: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.starts_with(prefix))
            .count()
    }
}

/// Mock WebDriver server
pub struct MockWebDriverServer {
    endpoint: String,
    state: Arc<ServerState>,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl MockWebDriverServer {
    /// Start a new mock server on an ephemeral port
    pub async fn start() -> Result<Self, Box<dyn std::error::Error>> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let state = Arc::new(ServerState::default());

        let (shutdown_tx, mut shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        let server_state = state.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = listener.accept() => {
                        match result {
                            Ok((stream, _)) => {
                                tokio::spawn(Self::handle_connection(stream, server_state.clone()));
                            }
                            Err(e) => {
                                tracing::error!("Mock WebDriver: Accept error: {}", e);
                                break;
                            }
                        }
                    }
                    _ = &mut shutdown_rx => {
                        tracing::info!("Mock WebDriver: Shutdown signal received");
                        break;
                    }
                }
            }
        });

        Ok(Self {
            endpoint: format!("http://{}", addr),
            state,
            shutdown_tx: Some(shutdown_tx),
        })
    }

    /// Base URL of the server
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn state(&self) -> &Arc<ServerState> {
        &self.state
    }

    /// Reject the next `n` new-session requests
    pub fn fail_sessions(&self, n: u32) {
        self.state.session_failures.store(n, Ordering::SeqCst);
    }

    /// Answer the next `n` displayed checks with a stale element reference
    pub fn stale_displays(&self, n: u32) {
        self.state.stale_displays.store(n, Ordering::SeqCst);
    }

    /// Make a CSS selector resolve to an element
    pub fn add_element(&self, selector: &str) {
        self.state.elements.lock().unwrap().push(selector.to_string());
    }

    /// Stop accepting connections
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }

    async fn handle_connection(mut stream: TcpStream, state: Arc<ServerState>) {
        let Some((method, path, body)) = read_request(&mut stream).await else {
            return;
        };

        state
            .requests
            .lock()
            .unwrap()
            .push(format!("{} {}", method, path));

        let (status, payload) = route(&state, &method, &path, body);
        let body = payload.to_string();
        let response = format!(
            "HTTP/1.1 {} {}\r\nContent-Type: application/json; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            reason(status),
            body.len(),
            body
        );

        if let Err(e) = stream.write_all(response.as_bytes()).await {
            tracing::error!("Mock WebDriver: Write error: {}", e);
        }
        let _ = stream.shutdown().await;
    }
}

impl Drop for MockWebDriverServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn read_request(stream: &mut TcpStream) -> Option<(String, String, Value)> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.lines();
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let path = request_line.next()?.to_string();

    let content_length = lines
        .filter_map(|l| l.split_once(':'))
        .find(|(k, _)| k.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let body = serde_json::from_slice(&buf[header_end..]).unwrap_or(Value::Null);
    Some((method, path, body))
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        404 => "Not Found",
        _ => "Internal Server Error",
    }
}

fn ok(value: Value) -> (u16, Value) {
    (200, json!({ "value": value }))
}

fn wire_error(status: u16, error: &str, message: &str) -> (u16, Value) {
    (status, json!({ "value": { "error": error, "message": message } }))
}

fn route(state: &ServerState, method: &str, path: &str, body: Value) -> (u16, Value) {
    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();

    match (method, segments.as_slice()) {
        ("GET", ["api", ..]) => (200, json!({ "page": 1, "data": [{ "id": 1 }] })),
        ("POST", ["api", ..]) => (201, json!({ "id": "42", "echo": body })),
        ("POST", ["session"]) => {
            let remaining = state.session_failures.load(Ordering::SeqCst);
            if remaining > 0 {
                state.session_failures.store(remaining - 1, Ordering::SeqCst);
                return wire_error(500, "session not created", "browser failed to start");
            }

            let caps = body["capabilities"]["alwaysMatch"].clone();
            state.capabilities.lock().unwrap().push(caps.clone());
            let n = state.next_session.fetch_add(1, Ordering::SeqCst) + 1;
            let id = format!("mock-session-{}", n);
            state
                .rects
                .lock()
                .unwrap()
                .insert(id.clone(), Rect { width: 800, height: 600 });
            ok(json!({ "sessionId": id, "capabilities": caps }))
        }
        ("DELETE", ["session", id]) => {
            state.deleted.lock().unwrap().push(id.to_string());
            ok(Value::Null)
        }
        ("POST", ["session", id, "url"]) => {
            let url = body["url"].as_str().unwrap_or_default().to_string();
            state.urls.lock().unwrap().insert(id.to_string(), url);
            ok(Value::Null)
        }
        ("GET", ["session", id, "url"]) => {
            ok(json!(state.url(id).unwrap_or_else(|| "about:blank".to_string())))
        }
        ("GET", ["session", _, "title"]) => ok(json!("Swag Labs")),
        ("POST", ["session", _, "element"]) => {
            let selector = body["value"].as_str().unwrap_or_default();
            if state.elements.lock().unwrap().iter().any(|e| e == selector) {
                ok(json!({ ELEMENT_KEY: format!("el-{}", selector.len()) }))
            } else {
                wire_error(404, "no such element", &format!("Unable to locate {}", selector))
            }
        }
        ("GET", ["session", _, "element", _, "displayed"]) => {
            let remaining = state.stale_displays.load(Ordering::SeqCst);
            if remaining > 0 {
                state.stale_displays.store(remaining - 1, Ordering::SeqCst);
                return wire_error(
                    404,
                    "stale element reference",
                    "element is not attached to the page document",
                );
            }
            ok(json!(true))
        }
        ("GET", ["session", _, "element", _, "enabled"]) => ok(json!(true)),
        ("POST", ["session", _, "element", _, "click"]) => ok(Value::Null),
        ("POST", ["session", _, "element", _, "value"]) => ok(Value::Null),
        ("POST", ["session", _, "execute", "sync"]) => {
            if body["script"].as_str().unwrap_or_default().contains("readyState") {
                ok(json!("complete"))
            } else {
                ok(Value::Null)
            }
        }
        ("GET", ["session", _, "screenshot"]) => ok(json!(SCREENSHOT_PNG)),
        ("POST", ["session", id, "window", "maximize"]) => {
            let rect = Rect { width: 1920, height: 1080 };
            state.rects.lock().unwrap().insert(id.to_string(), rect);
            ok(json!({ "x": 0, "y": 0, "width": rect.width, "height": rect.height }))
        }
        ("POST", ["session", id, "window", "rect"]) => {
            let rect = Rect {
                width: body["width"].as_u64().unwrap_or(0) as u32,
                height: body["height"].as_u64().unwrap_or(0) as u32,
            };
            state.rects.lock().unwrap().insert(id.to_string(), rect);
            ok(json!({ "x": 0, "y": 0, "width": rect.width, "height": rect.height }))
        }
        ("GET", ["session", id, "window", "rect"]) => {
            let rect = state.rect(id).unwrap_or(Rect { width: 0, height: 0 });
            ok(json!({ "x": 0, "y": 0, "width": rect.width, "height": rect.height }))
        }
        _ => wire_error(404, "unknown command", &format!("{} {}", method, path)),
    }
}
