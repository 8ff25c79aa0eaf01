#![allow(dead_code)]

//! Local stand-ins for broadcaster APIs and Icecast streams.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use nowplaying::{MetadataSource, StationDescriptor};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

// ── JSON provider server ──────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Endpoint {
    pub body: String,
    pub delay: Duration,
    pub status: u16,
}

impl Endpoint {
    pub fn json(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            delay: Duration::ZERO,
            status: 200,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }
}

#[derive(Default)]
struct JsonState {
    endpoints: HashMap<String, Endpoint>,
    hits: Mutex<HashMap<String, usize>>,
    total_hits: AtomicUsize,
}

#[derive(Clone)]
pub struct JsonServer {
    pub base: String,
    state: Arc<JsonState>,
}

impl JsonServer {
    pub fn url(&self, name: &str) -> String {
        format!("{}/{}", self.base, name)
    }

    pub fn hits(&self, name: &str) -> usize {
        self.state
            .hits
            .lock()
            .unwrap()
            .get(name)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_hits(&self) -> usize {
        self.state.total_hits.load(Ordering::SeqCst)
    }

    pub fn rest_station(&self, station_name: &str, endpoint: &str) -> StationDescriptor {
        StationDescriptor::new(
            station_name,
            self.url("stream"),
            MetadataSource::Rest(self.url(endpoint)),
        )
    }
}

async fn serve_endpoint(
    Path(name): Path<String>,
    State(state): State<Arc<JsonState>>,
) -> Response {
    state.total_hits.fetch_add(1, Ordering::SeqCst);
    *state.hits.lock().unwrap().entry(name.clone()).or_default() += 1;

    let Some(endpoint) = state.endpoints.get(&name).cloned() else {
        return StatusCode::NOT_FOUND.into_response();
    };

    if !endpoint.delay.is_zero() {
        tokio::time::sleep(endpoint.delay).await;
    }

    let status = StatusCode::from_u16(endpoint.status).unwrap_or(StatusCode::OK);
    (
        status,
        [(header::CONTENT_TYPE, "application/json")],
        endpoint.body,
    )
        .into_response()
}

pub async fn spawn_json_server(endpoints: Vec<(&str, Endpoint)>) -> JsonServer {
    let state = Arc::new(JsonState {
        endpoints: endpoints
            .into_iter()
            .map(|(name, ep)| (name.to_string(), ep))
            .collect(),
        ..JsonState::default()
    });

    let app = Router::new()
        .route("/{name}", get(serve_endpoint))
        .with_state(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    JsonServer {
        base: format!("http://{}", addr),
        state,
    }
}

// ── ICY stream server ─────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct IcyResponse {
    /// Raw `icy-metaint` header value; `None` omits the header.
    pub metaint: Option<String>,
    pub body: Vec<u8>,
    /// Keep the socket open after the body instead of closing it.
    pub hold_open: bool,
}

impl IcyResponse {
    /// A well-formed stream: `metaint` bytes of audio, then one block.
    pub fn with_metadata(metaint: usize, metadata: &[u8]) -> Self {
        Self {
            metaint: Some(metaint.to_string()),
            body: icy_body(metaint, metadata),
            hold_open: false,
        }
    }
}

/// Audio filler + length byte + metadata padded to a multiple of 16.
pub fn icy_body(metaint: usize, metadata: &[u8]) -> Vec<u8> {
    let blocks = metadata.len().div_ceil(16);
    let mut body = vec![0xFFu8; metaint];
    body.push(blocks as u8);
    body.extend_from_slice(metadata);
    body.resize(metaint + 1 + blocks * 16, 0);
    // Trailing audio, as a real stream would keep sending.
    body.extend_from_slice(&[0xFFu8; 64]);
    body
}

pub struct IcyServer {
    pub url: String,
    pub hits: Arc<AtomicUsize>,
    pub requests: Arc<Mutex<Vec<String>>>,
}

impl IcyServer {
    pub fn station(&self, station_name: &str) -> StationDescriptor {
        StationDescriptor::new(
            station_name,
            self.url.clone(),
            MetadataSource::Icy(self.url.clone()),
        )
    }

    pub fn last_request(&self) -> String {
        self.requests.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

pub async fn spawn_icy_server(response: IcyResponse) -> IcyServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let requests = Arc::new(Mutex::new(Vec::new()));

    let hits_ref = hits.clone();
    let requests_ref = requests.clone();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            hits_ref.fetch_add(1, Ordering::SeqCst);
            let response = response.clone();
            let requests = requests_ref.clone();
            tokio::spawn(async move {
                let _ = serve_icy(stream, response, requests).await;
            });
        }
    });

    IcyServer {
        url: format!("http://{}/stream", addr),
        hits,
        requests,
    }
}

async fn serve_icy(
    mut stream: TcpStream,
    response: IcyResponse,
    requests: Arc<Mutex<Vec<String>>>,
) -> std::io::Result<()> {
    let mut request = Vec::new();
    let mut buf = [0u8; 1024];
    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        request.extend_from_slice(&buf[..n]);
    }
    requests
        .lock()
        .unwrap()
        .push(String::from_utf8_lossy(&request).to_string());

    let mut head = String::from("HTTP/1.1 200 OK\r\nContent-Type: audio/mpeg\r\n");
    if let Some(metaint) = &response.metaint {
        head.push_str(&format!("icy-metaint: {}\r\n", metaint));
    }
    head.push_str("Connection: close\r\n\r\n");

    stream.write_all(head.as_bytes()).await?;
    stream.write_all(&response.body).await?;
    stream.flush().await?;

    if response.hold_open {
        tokio::time::sleep(Duration::from_secs(30)).await;
    }
    stream.shutdown().await
}
