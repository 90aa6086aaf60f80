//! Local stand-in for the analysis backend, bound to an ephemeral port.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Multipart, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};

use crate::config::ANALYZE_PATH;

#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub file_name: String,
    pub file_len: usize,
    pub report_format: String,
    pub analysis_type: String,
    pub authorization: Option<String>,
}

#[derive(Debug, Clone)]
pub struct MockServerConfig {
    pub status: u16,
    /// Fixed body; `None` echoes a successful analysis of the uploaded file.
    pub body: Option<serde_json::Value>,
    /// Answer the first N requests with 503 before behaving normally.
    pub fail_first: usize,
    pub delay: Duration,
}

impl Default for MockServerConfig {
    fn default() -> Self {
        Self {
            status: 200,
            body: None,
            fail_first: 0,
            delay: Duration::ZERO,
        }
    }
}

struct ServerState {
    config: MockServerConfig,
    seen: Mutex<Vec<SeenRequest>>,
}

pub struct MockServer {
    pub base_url: String,
    state: Arc<ServerState>,
}

impl MockServer {
    pub fn requests(&self) -> Vec<SeenRequest> {
        self.state.seen.lock().unwrap().clone()
    }
}

pub async fn spawn_backend(config: MockServerConfig) -> MockServer {
    let state = Arc::new(ServerState {
        config,
        seen: Mutex::new(Vec::new()),
    });

    let app = Router::new()
        .route(ANALYZE_PATH, post(handle_analyze))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockServer {
        base_url: format!("http://{addr}"),
        state,
    }
}

/// Base URL of a port nothing listens on.
pub async fn refused_base_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

async fn handle_analyze(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> impl IntoResponse {
    let mut seen = SeenRequest {
        file_name: String::new(),
        file_len: 0,
        report_format: String::new(),
        analysis_type: String::new(),
        authorization: headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    };

    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                seen.file_name = field.file_name().unwrap_or("").to_string();
                seen.file_len = field.bytes().await.map(|b| b.len()).unwrap_or(0);
            }
            "report_format" => seen.report_format = field.text().await.unwrap_or_default(),
            "analysis_type" => seen.analysis_type = field.text().await.unwrap_or_default(),
            _ => {}
        }
    }

    let file_name = seen.file_name.clone();
    let index = {
        let mut all = state.seen.lock().unwrap();
        all.push(seen);
        all.len()
    };

    if !state.config.delay.is_zero() {
        tokio::time::sleep(state.config.delay).await;
    }

    if index <= state.config.fail_first {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({"detail": "backend busy"})),
        );
    }

    let status = StatusCode::from_u16(state.config.status).unwrap();
    let body = state.config.body.clone().unwrap_or_else(|| {
        serde_json::json!({
            "success": true,
            "analysis_result": {
                "file_name": file_name,
                "status": "completed",
                "confidence_score": 0.91,
                "tags_extracted": 12,
                "values_extracted": 30,
                "components_identified": 7,
                "risk_level": "Low",
                "recommendations": ["Confirm line numbering on sheet 2"]
            },
            "report": {"report_id": "rpt-test", "report_data": {}}
        })
    });
    (status, Json(body))
}
