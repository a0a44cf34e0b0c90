//! Integration tests for Slice 5 - HTTP API
//!
//! Tests engine lifecycle endpoints

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use cell28::core::{create_router, decode_dump};
use cell28::types::Frame;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tower::ServiceExt;

async fn body_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn new_engine(app: &axum::Router, body: Value) -> String {
    let response = app.clone().oneshot(post("/engine/new", body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    json["engine_id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_router();

    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["engines_active"], 0);
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_create_engine() {
    let app = create_router();

    let response = app
        .clone()
        .oneshot(post("/engine/new", json!({"config": {"cluster_id": 4, "cluster_count": 8}})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let id = json["engine_id"].as_str().unwrap().to_string();
    assert!(id.starts_with("engine_"));
    assert_eq!(json["websocket_url"], format!("/ws/{}", id));

    let status = body_json(app.oneshot(get(&format!("/engine/{}", id))).await.unwrap()).await;
    assert_eq!(status["cluster_id"], 4);
    assert_eq!(status["cluster_count"], 8);
    assert_eq!(status["tick"], 0);
    assert_eq!(status["phase"], "perceive");
    assert_eq!(status["frames"], 1);
}

#[tokio::test]
async fn test_engine_ids_unique() {
    let app = create_router();
    let a = new_engine(&app, json!({})).await;
    let b = new_engine(&app, json!({})).await;
    assert_ne!(a, b);
}

#[tokio::test]
async fn test_bad_config_rejected() {
    let app = create_router();
    let response = app
        .oneshot(post("/engine/new", json!({"config": {"learning_rate": -1.0}})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_engine() {
    let app = create_router();
    let response = app.oneshot(get("/engine/engine_missing")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_tick_cycle() {
    let app = create_router();
    let id = new_engine(&app, json!({"config": {"cluster_id": 1}})).await;

    let response = app
        .clone()
        .oneshot(post(&format!("/engine/{}/tick", id), json!({"entropy": 0.32, "ticks": 6})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let reports = json["reports"].as_array().unwrap();
    assert_eq!(reports.len(), 6);
    assert_eq!(reports[3]["phase"], "decide");
    assert!(reports[3]["answer"]["proof_hash"].is_string());
    assert!(reports[5]["reward"]["proof_hash"].is_string());
    assert_eq!(json["next_tick"], 6);
    assert_eq!(json["next_phase"], "perceive");
}

#[tokio::test]
async fn test_tick_with_token_spec() {
    let app = create_router();
    let id = new_engine(&app, json!({})).await;

    let ok = app
        .clone()
        .oneshot(post(
            &format!("/engine/{}/tick", id),
            json!({"entropy": 0.4, "token_spec": "a:1.0, b:0.25"}),
        ))
        .await
        .unwrap();
    assert_eq!(ok.status(), StatusCode::OK);

    let bad = app
        .oneshot(post(
            &format!("/engine/{}/tick", id),
            json!({"entropy": 0.4, "token_spec": "a:1.0,"}),
        ))
        .await
        .unwrap();
    assert_eq!(bad.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_tick_limits() {
    let app = create_router();
    let id = new_engine(&app, json!({})).await;

    for ticks in [0, 10_000] {
        let response = app
            .clone()
            .oneshot(post(&format!("/engine/{}/tick", id), json!({"entropy": 0.3, "ticks": ticks})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn test_frames_verify_dump() {
    let app = create_router();
    let id = new_engine(&app, json!({"config": {"cluster_id": 1}})).await;
    app.clone()
        .oneshot(post(&format!("/engine/{}/tick", id), json!({"entropy": 0.32, "ticks": 12})))
        .await
        .unwrap();

    let frames_response = app.clone().oneshot(get(&format!("/engine/{}/frames", id))).await.unwrap();
    assert_eq!(frames_response.status(), StatusCode::OK);
    let frames: Vec<Frame> = serde_json::from_value(body_json(frames_response).await).unwrap();
    assert!(matches!(frames.first(), Some(Frame::Header { .. })));
    assert!(matches!(frames.last(), Some(Frame::End { tick: 12, .. })));

    let verify = body_json(app.clone().oneshot(get(&format!("/engine/{}/verify", id))).await.unwrap()).await;
    assert_eq!(verify["ok"], true);
    assert_eq!(verify["report"]["stage"], "S8_OK");
    assert_eq!(verify["report"]["answers"], 2);
    assert!(verify["fingerprint"].as_str().unwrap().starts_with("SCXQ2-v1:"));

    let dump = app.oneshot(get(&format!("/engine/{}/dump", id))).await.unwrap();
    assert_eq!(dump.status(), StatusCode::OK);
    assert_eq!(dump.headers()["content-type"], "application/octet-stream");
    let bytes = axum::body::to_bytes(dump.into_body(), usize::MAX).await.unwrap();
    assert_eq!(decode_dump(&bytes).unwrap().len(), frames.len());
}

#[tokio::test]
async fn test_engines_isolated() {
    let app = create_router();
    let a = new_engine(&app, json!({})).await;
    let b = new_engine(&app, json!({})).await;

    app.clone()
        .oneshot(post(&format!("/engine/{}/tick", a), json!({"entropy": 0.5, "ticks": 3})))
        .await
        .unwrap();

    let status_a = body_json(app.clone().oneshot(get(&format!("/engine/{}", a))).await.unwrap()).await;
    let status_b = body_json(app.oneshot(get(&format!("/engine/{}", b))).await.unwrap()).await;
    assert_eq!(status_a["tick"], 3);
    assert_eq!(status_b["tick"], 0);
}

#[tokio::test]
async fn test_delete_engine() {
    let app = create_router();
    let id = new_engine(&app, json!({})).await;
    let keep = new_engine(&app, json!({})).await;
    app.clone()
        .oneshot(post(&format!("/engine/{}/tick", id), json!({"entropy": 0.32, "ticks": 4})))
        .await
        .unwrap();

    let delete = |uri: String| Request::builder().method("DELETE").uri(uri).body(Body::empty()).unwrap();

    let response = app.clone().oneshot(delete(format!("/engine/{}", id))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["engine_id"], id.as_str());
    assert_eq!(json["ticks"], 4);

    let gone = app.clone().oneshot(get(&format!("/engine/{}", id))).await.unwrap();
    assert_eq!(gone.status(), StatusCode::NOT_FOUND);
    let again = app.clone().oneshot(delete(format!("/engine/{}", id))).await.unwrap();
    assert_eq!(again.status(), StatusCode::NOT_FOUND);

    let health = body_json(app.clone().oneshot(get("/health")).await.unwrap()).await;
    assert_eq!(health["engines_active"], 1);
    let kept = app.oneshot(get(&format!("/engine/{}", keep))).await.unwrap();
    assert_eq!(kept.status(), StatusCode::OK);
}
