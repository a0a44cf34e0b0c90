//! HTTP + WebSocket API for cell28
//!
//! Endpoints:
//! - GET /health - Health check
//! - POST /engine/new - Create an engine instance
//! - GET /engine/{id} - Engine status
//! - DELETE /engine/{id} - Drop an engine and close its frame stream
//! - POST /engine/{id}/tick - Advance one or more ticks
//! - GET /engine/{id}/frames - Sealed frame log
//! - GET /engine/{id}/verify - Verify the sealed frame log
//! - GET /engine/{id}/dump - Compact binary dump
//! - WS /ws/{id} - Live frame stream, one JSON frame per message

use axum::{
    extract::{Path, State, WebSocketUpgrade, ws::{Message, WebSocket}},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{broadcast, Mutex, RwLock};

use crate::core::{encode_dump, fingerprint, parse_tokens, verify, Engine, EngineConfig, TickReport};
use crate::types::{
    Answer, EngineError, Frame, Phase, TickInput, Token, VerifyFailure, VerifyReport,
};

/// Upper bound on ticks per request
pub const MAX_TICKS_PER_REQUEST: u64 = 600;

/// One engine instance and its live frame channel
#[derive(Debug)]
pub struct EngineSession {
    pub id: String,
    pub engine: Engine,
    pub frame_tx: broadcast::Sender<Frame>,
}

/// App state. Each session sits behind its own lock.
#[derive(Default)]
pub struct AppState {
    pub engines: RwLock<HashMap<String, Arc<Mutex<EngineSession>>>>,
    next_id: AtomicU64,
}

/// Create engine request
#[derive(Debug, Default, Deserialize)]
pub struct NewEngineRequest {
    pub config: Option<EngineConfig>,
}

/// Create engine response
#[derive(Debug, Serialize)]
pub struct NewEngineResponse {
    pub engine_id: String,
    pub websocket_url: String,
}

/// Engine status response
#[derive(Debug, Serialize)]
pub struct EngineStatusResponse {
    pub engine_id: String,
    pub cluster_id: u32,
    pub cluster_count: u32,
    pub policy_hash: String,
    pub tick: u64,
    pub phase: Phase,
    pub frames: usize,
    pub last_proof_hash: String,
    pub last_answer: Option<Answer>,
}

/// Delete engine response
#[derive(Debug, Serialize)]
pub struct DeleteEngineResponse {
    pub engine_id: String,
    pub ticks: u64,
    pub frames: usize,
}

/// Tick request. Omitted fields fall back to the engine's defaults.
#[derive(Debug, Deserialize)]
pub struct TickRequest {
    pub entropy: f64,
    #[serde(default)]
    pub reward_bias: f64,
    pub tokens: Option<Vec<Token>>,
    /// `glyph:weight,...`; ignored when `tokens` is present
    pub token_spec: Option<String>,
    pub cluster_id: Option<u32>,
    pub ticks: Option<u64>,
}

/// Tick response
#[derive(Debug, Serialize)]
pub struct TickResponse {
    pub engine_id: String,
    pub reports: Vec<TickReport>,
    pub next_tick: u64,
    pub next_phase: Phase,
}

/// Verify response
#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub engine_id: String,
    pub ok: bool,
    pub fingerprint: String,
    pub report: Option<VerifyReport>,
    pub failure: Option<VerifyFailure>,
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub engines_active: usize,
}

/// Create the API router
pub fn create_router() -> Router {
    let state = Arc::new(AppState::default());

    Router::new()
        .route("/health", get(health))
        .route("/engine/new", post(create_engine))
        .route("/engine/:id", get(get_engine).delete(delete_engine))
        .route("/engine/:id/tick", post(tick_engine))
        .route("/engine/:id/frames", get(get_frames))
        .route("/engine/:id/verify", get(verify_engine))
        .route("/engine/:id/dump", get(dump_engine))
        .route("/ws/:id", get(websocket_handler))
        .with_state(state)
}

async fn find_session(state: &AppState, id: &str) -> Result<Arc<Mutex<EngineSession>>, StatusCode> {
    let engines = state.engines.read().await;
    engines.get(id).cloned().ok_or(StatusCode::NOT_FOUND)
}

/// Health check endpoint
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let engines = state.engines.read().await;
    Json(HealthResponse {
        status: "ok".to_string(),
        version: crate::VERSION.to_string(),
        engines_active: engines.len(),
    })
}

/// Create an engine
async fn create_engine(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NewEngineRequest>,
) -> Result<Json<NewEngineResponse>, StatusCode> {
    let config = req.config.unwrap_or_default();
    let engine = Engine::new(config).map_err(|e| {
        tracing::warn!(error = %e, "engine rejected");
        StatusCode::BAD_REQUEST
    })?;

    let engine_id = generate_engine_id(&state);
    let (frame_tx, _) = broadcast::channel(1024);
    let session = EngineSession {
        id: engine_id.clone(),
        engine,
        frame_tx,
    };

    let mut engines = state.engines.write().await;
    engines.insert(engine_id.clone(), Arc::new(Mutex::new(session)));
    tracing::info!(engine = %engine_id, "engine created");

    Ok(Json(NewEngineResponse {
        websocket_url: format!("/ws/{}", engine_id),
        engine_id,
    }))
}

/// Get engine status
async fn get_engine(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<EngineStatusResponse>, StatusCode> {
    let session = find_session(&state, &id).await?;
    let session = session.lock().await;
    let engine = &session.engine;
    let config = engine.config();

    Ok(Json(EngineStatusResponse {
        engine_id: id,
        cluster_id: config.cluster_id,
        cluster_count: config.cluster_count,
        policy_hash: config.policy_hash.clone(),
        tick: engine.current_tick(),
        phase: engine.phase(),
        frames: engine.frames().len(),
        last_proof_hash: engine.last_proof_hash().to_string(),
        last_answer: engine.last_answer().cloned(),
    }))
}

/// Drop an engine. Open frame streams end when the session's sender goes away.
async fn delete_engine(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DeleteEngineResponse>, StatusCode> {
    let removed = state.engines.write().await.remove(&id).ok_or(StatusCode::NOT_FOUND)?;
    let session = removed.lock().await;
    tracing::info!(engine = %id, "engine deleted");

    Ok(Json(DeleteEngineResponse {
        engine_id: id,
        ticks: session.engine.current_tick(),
        frames: session.engine.frames().len(),
    }))
}

/// Advance an engine
async fn tick_engine(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<TickRequest>,
) -> Result<Json<TickResponse>, StatusCode> {
    let ticks = req.ticks.unwrap_or(1);
    if ticks == 0 || ticks > MAX_TICKS_PER_REQUEST {
        return Err(StatusCode::BAD_REQUEST);
    }

    let tokens = match (req.tokens, req.token_spec) {
        (Some(tokens), _) => Some(tokens),
        (None, Some(spec)) => Some(parse_tokens(&spec).map_err(|e| {
            tracing::warn!(error = %e, "bad token spec");
            StatusCode::BAD_REQUEST
        })?),
        (None, None) => None,
    };

    let session = find_session(&state, &id).await?;
    let mut session = session.lock().await;

    let config = session.engine.config();
    let mut input = TickInput::new(
        req.entropy,
        req.reward_bias,
        req.cluster_id.unwrap_or(config.cluster_id),
    )
    .with_cluster_count(config.cluster_count);
    if let Some(tokens) = tokens {
        input = input.with_tokens(tokens);
    }

    let start = session.engine.frames().len();
    let reports = session.engine.run_constant(&input, ticks).map_err(|e| {
        tracing::warn!(engine = %id, error = %e, "tick failed");
        match e {
            EngineError::Input(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    })?;

    // No subscribers is not an error
    for frame in &session.engine.frames()[start..] {
        let _ = session.frame_tx.send(frame.clone());
    }

    Ok(Json(TickResponse {
        engine_id: id,
        reports,
        next_tick: session.engine.current_tick(),
        next_phase: session.engine.phase(),
    }))
}

/// Get the sealed frame log
async fn get_frames(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Frame>>, StatusCode> {
    let session = find_session(&state, &id).await?;
    let session = session.lock().await;
    Ok(Json(session.engine.sealed_log()))
}

/// Verify the sealed frame log
async fn verify_engine(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<VerifyResponse>, StatusCode> {
    let session = find_session(&state, &id).await?;
    let frames = session.lock().await.engine.sealed_log();

    let fingerprint = fingerprint(&frames).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    let (report, failure) = match verify(&frames) {
        Ok(report) => (Some(report), None),
        Err(failure) => (None, Some(failure)),
    };

    Ok(Json(VerifyResponse {
        engine_id: id,
        ok: failure.is_none(),
        fingerprint,
        report,
        failure,
    }))
}

/// Get the binary dump
async fn dump_engine(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, StatusCode> {
    let session = find_session(&state, &id).await?;
    let frames = session.lock().await.engine.sealed_log();
    let bytes = encode_dump(&frames).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok((StatusCode::OK, [(header::CONTENT_TYPE, "application/octet-stream")], bytes))
}

/// WebSocket handler for the live frame stream
async fn websocket_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ws: WebSocketUpgrade,
) -> Result<impl IntoResponse, StatusCode> {
    let session = find_session(&state, &id).await?;
    let rx = session.lock().await.frame_tx.subscribe();

    Ok(ws.on_upgrade(move |socket| handle_websocket(socket, rx)))
}

/// Forward frames until either side hangs up
async fn handle_websocket(socket: WebSocket, mut rx: broadcast::Receiver<Frame>) {
    let (mut sender, mut receiver) = socket.split();

    let mut send_task = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(frame) => {
                    let Ok(json) = serde_json::to_string(&frame) else {
                        continue;
                    };
                    if sender.send(Message::Text(json)).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "websocket subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(message)) = receiver.next().await {
            if matches!(message, Message::Close(_)) {
                break;
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }
}

/// Generate an engine ID
fn generate_engine_id(state: &AppState) -> String {
    let nanos = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
    let seq = state.next_id.fetch_add(1, Ordering::Relaxed);
    format!("engine_{:x}_{}", nanos as u64, seq)
}

/// Run the API server
pub async fn run_server(addr: &str) -> Result<(), Box<dyn std::error::Error>> {
    let router = create_router();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr, "api listening");
    println!("cell28 API running on {}", addr);
    println!("  POST /engine/new         - Create engine");
    println!("  GET  /engine/:id         - Get status");
    println!("  DEL  /engine/:id         - Delete engine");
    println!("  POST /engine/:id/tick    - Advance ticks");
    println!("  GET  /engine/:id/frames  - Frame log");
    println!("  GET  /engine/:id/verify  - Verify log");
    println!("  GET  /engine/:id/dump    - Binary dump");
    println!("  WS   /ws/:id             - Live frames");
    println!("  GET  /health             - Health check");
    axum::serve(listener, router).await?;
    Ok(())
}
