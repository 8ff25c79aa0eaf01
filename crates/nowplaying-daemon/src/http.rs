use crate::core::DaemonEvent;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use nowplaying::protocol::Command;
use nowplaying::state::StateManager;
use serde::Serialize;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

#[derive(Clone)]
struct HttpState {
    state_manager: Arc<StateManager>,
    event_tx: mpsc::Sender<DaemonEvent>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

enum ApiError {
    NotFound(String),
    Unavailable,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            ApiError::Unavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "daemon is shutting down".to_string(),
            ),
        };
        (status, Json(ErrorResponse { error })).into_response()
    }
}

pub fn start_server(
    bind_address: String,
    port: u16,
    state_manager: Arc<StateManager>,
    event_tx: mpsc::Sender<DaemonEvent>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let addr = format!("{}:{}", bind_address, port);
        let listener = match TcpListener::bind(&addr).await {
            Ok(l) => l,
            Err(e) => {
                error!("Failed to bind HTTP API {}: {}", addr, e);
                return;
            }
        };

        info!("HTTP API listening at http://{}", addr);
        let app = router(state_manager, event_tx);
        if let Err(e) = axum::serve(listener, app).await {
            error!("HTTP API stopped: {}", e);
        }
    })
}

fn router(state_manager: Arc<StateManager>, event_tx: mpsc::Sender<DaemonEvent>) -> Router {
    Router::new()
        .route("/api/state", get(get_state))
        .route("/api/stations", get(get_stations))
        .route("/api/now-playing", get(get_now_playing))
        .route("/api/play/{idx}", post(play))
        .route("/api/pause", post(pause))
        .route("/api/resume", post(resume))
        .route("/api/stop", post(stop))
        .route("/api/next", post(next))
        .route("/api/prev", post(prev))
        .with_state(HttpState {
            state_manager,
            event_tx,
        })
        .layer(CorsLayer::permissive())
}

async fn get_state(State(app): State<HttpState>) -> Response {
    Json(app.state_manager.get_state().await).into_response()
}

async fn get_stations(State(app): State<HttpState>) -> Response {
    Json(app.state_manager.get_state().await.stations).into_response()
}

async fn get_now_playing(State(app): State<HttpState>) -> Response {
    Json(app.state_manager.get_state().await.now_playing).into_response()
}

async fn play(
    State(app): State<HttpState>,
    Path(idx): Path<usize>,
) -> Result<StatusCode, ApiError> {
    if app.state_manager.station(idx).await.is_none() {
        return Err(ApiError::NotFound(format!("no station at index {idx}")));
    }
    dispatch(&app, Command::Play { station_idx: idx }).await
}

async fn pause(State(app): State<HttpState>) -> Result<StatusCode, ApiError> {
    dispatch(&app, Command::Pause).await
}

async fn resume(State(app): State<HttpState>) -> Result<StatusCode, ApiError> {
    dispatch(&app, Command::Resume).await
}

async fn stop(State(app): State<HttpState>) -> Result<StatusCode, ApiError> {
    dispatch(&app, Command::Stop).await
}

async fn next(State(app): State<HttpState>) -> Result<StatusCode, ApiError> {
    dispatch(&app, Command::Next).await
}

async fn prev(State(app): State<HttpState>) -> Result<StatusCode, ApiError> {
    dispatch(&app, Command::Prev).await
}

/// Commands are applied asynchronously by the core, hence 202.
async fn dispatch(app: &HttpState, cmd: Command) -> Result<StatusCode, ApiError> {
    info!("HTTP command: {:?}", cmd);
    app.event_tx
        .send(DaemonEvent::ClientCommand(cmd))
        .await
        .map_err(|_| ApiError::Unavailable)?;
    Ok(StatusCode::ACCEPTED)
}
