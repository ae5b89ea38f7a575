//! Shared test helpers: stub prediction and storage backends
//!
//! Each stub is a real axum server on an ephemeral port so the reqwest
//! clients exercise their actual transport paths.

#![allow(dead_code)]

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

use cid_analysis::config::StorageConfig;

/// Controllable prediction service stub
pub struct PredictStub {
    /// Health body reports "healthy" when true, "degraded" otherwise
    pub healthy: AtomicBool,
    pub model_loaded: AtomicBool,
    /// Artificial latency on /health, for in-flight overlap tests
    pub health_delay_ms: AtomicU64,
    /// When true, /predict returns 500 {"message": "model timeout"}
    pub fail_predict: AtomicBool,
    pub health_calls: AtomicUsize,
    pub predict_calls: AtomicUsize,
}

impl PredictStub {
    fn new() -> Self {
        Self {
            healthy: AtomicBool::new(true),
            model_loaded: AtomicBool::new(true),
            health_delay_ms: AtomicU64::new(0),
            fail_predict: AtomicBool::new(false),
            health_calls: AtomicUsize::new(0),
            predict_calls: AtomicUsize::new(0),
        }
    }
}

async fn stub_health(State(stub): State<Arc<PredictStub>>) -> Json<Value> {
    stub.health_calls.fetch_add(1, Ordering::SeqCst);
    let delay = stub.health_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
    }
    let status = if stub.healthy.load(Ordering::SeqCst) {
        "healthy"
    } else {
        "degraded"
    };
    Json(json!({
        "status": status,
        "model_loaded": stub.model_loaded.load(Ordering::SeqCst),
    }))
}

async fn stub_predict(
    State(stub): State<Arc<PredictStub>>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    stub.predict_calls.fetch_add(1, Ordering::SeqCst);

    if stub.fail_predict.load(Ordering::SeqCst) {
        return Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "message": "model timeout" })),
        ));
    }

    let agar = body["agar"].as_str().unwrap_or_default().to_string();
    let colony_age = body["colony_age"].as_str().unwrap_or_default().to_string();
    let characteristics = body["characteristics"].clone();
    let hours: f64 = colony_age.trim_end_matches('h').parse().unwrap_or(0.0);

    Ok(Json(json!({
        "result": "B. pseudomallei",
        "confidence": 92.0,
        "is_bpseudo": true,
        "metadata": {
            "agar": agar,
            "colony_age": colony_age,
            "time_hours": hours,
            "characteristics": characteristics,
        },
        "interpretation": "Colony morphology consistent with B. pseudomallei",
        "recommendations": ["Confirm with PCR", "Notify clinician"],
    })))
}

/// Start a prediction stub; returns its base URL and control handle
pub async fn spawn_predict_stub() -> (String, Arc<PredictStub>) {
    let stub = Arc::new(PredictStub::new());

    let app = Router::new()
        .route("/health", get(stub_health))
        .route("/predict", post(stub_predict))
        .with_state(stub.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), stub)
}

/// In-memory object storage stub (upload / sign / fetch)
#[derive(Default)]
pub struct StorageStub {
    pub objects: Mutex<HashMap<String, Vec<u8>>>,
    /// When true, uploads return 500
    pub fail_upload: AtomicBool,
    /// When true, signing returns 500 (after a successful upload)
    pub fail_sign: AtomicBool,
}

async fn stub_upload(
    State(stub): State<Arc<StorageStub>>,
    Path((bucket, key)): Path<(String, String)>,
    body: axum::body::Bytes,
) -> Result<Json<Value>, (StatusCode, String)> {
    if stub.fail_upload.load(Ordering::SeqCst) {
        return Err((StatusCode::INTERNAL_SERVER_ERROR, "bucket offline".to_string()));
    }
    let full_key = format!("{}/{}", bucket, key);
    let mut objects = stub.objects.lock().await;
    if objects.contains_key(&full_key) {
        // Non-overwriting contract
        return Err((StatusCode::CONFLICT, "object exists".to_string()));
    }
    objects.insert(full_key.clone(), body.to_vec());
    Ok(Json(json!({ "Key": full_key })))
}

async fn stub_sign(
    State(stub): State<Arc<StorageStub>>,
    Path((bucket, key)): Path<(String, String)>,
) -> Result<Json<Value>, (StatusCode, String)> {
    if stub.fail_sign.load(Ordering::SeqCst) {
        return Err((StatusCode::INTERNAL_SERVER_ERROR, "signing offline".to_string()));
    }
    Ok(Json(json!({
        "signedURL": format!("/object/sign/{}/{}?token=test", bucket, key)
    })))
}

async fn stub_fetch(
    State(stub): State<Arc<StorageStub>>,
    Path((bucket, key)): Path<(String, String)>,
    Query(_params): Query<HashMap<String, String>>,
) -> Result<Vec<u8>, StatusCode> {
    let full_key = format!("{}/{}", bucket, key);
    stub.objects
        .lock()
        .await
        .get(&full_key)
        .cloned()
        .ok_or(StatusCode::NOT_FOUND)
}

/// Start a storage stub; returns its base URL and control handle
pub async fn spawn_storage_stub() -> (String, Arc<StorageStub>) {
    let stub = Arc::new(StorageStub::default());

    let app = Router::new()
        .route("/object/:bucket/*key", post(stub_upload))
        .route("/object/sign/:bucket/*key", post(stub_sign).get(stub_fetch))
        .with_state(stub.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), stub)
}

/// Storage config pointed at a stub
pub fn stub_storage_config(base_url: &str) -> StorageConfig {
    StorageConfig {
        base_url: base_url.to_string(),
        bucket: "colony-images".to_string(),
        service_key: "test-key".to_string(),
        signed_url_ttl_secs: 3600,
    }
}
