//! REST endpoints for student messages and document uploads.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tracing::{Instrument, debug, info_span, warn};
use uuid::Uuid;

use crate::error::{PipelineError, UploadError};
use crate::pipeline::{StudentMessage, TriagePipeline, TriageStatus};
use crate::uploads::UploadStore;

/// Largest accepted upload body.
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<TriagePipeline>,
    pub uploads: Arc<UploadStore>,
}

/// Build the Axum router with all API routes behind `cors`.
pub fn api_routes(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/message", post(handle_message))
        .route(
            "/upload",
            post(upload_file).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .with_state(state)
        .layer(cors)
}

// ── Info ────────────────────────────────────────────────────────────────

async fn root() -> impl IntoResponse {
    Json(json!({"message": "Illini Prompt Nurse API"}))
}

async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "prompt-nurse"
    }))
}

// ── Messages ────────────────────────────────────────────────────────────

/// POST /message
///
/// 400 for rejected messages, 202 for escalations, 200 for answers and
/// 502 when the response generator fails.
async fn handle_message(
    State(state): State<AppState>,
    Json(req): Json<StudentMessage>,
) -> Response {
    let request_id = Uuid::new_v4();
    let span = info_span!("message", %request_id);
    match state.pipeline.process(&req).instrument(span).await {
        Ok(result) => {
            let status = match result.status {
                TriageStatus::Blocked => StatusCode::BAD_REQUEST,
                TriageStatus::Escalated => StatusCode::ACCEPTED,
                TriageStatus::Answered => StatusCode::OK,
            };
            (status, Json(result)).into_response()
        }
        Err(PipelineError::GenerationFailed(e)) => {
            warn!(student_id = %req.student_id, error = %e, "Message generation failed");
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({"error": format!("Response generation failed: {e}")})),
            )
                .into_response()
        }
    }
}

// ── Uploads ─────────────────────────────────────────────────────────────

/// POST /upload
///
/// Expects a multipart `file` field; other fields are ignored.
async fn upload_file(State(state): State<AppState>, multipart: Multipart) -> Response {
    match store_upload(&state.uploads, multipart).await {
        Ok(stored) => Json(stored).into_response(),
        Err(e) => {
            let status = match e {
                UploadError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
                _ => StatusCode::BAD_REQUEST,
            };
            warn!(error = %e, "Upload rejected");
            (status, Json(json!({"error": e.to_string()}))).into_response()
        }
    }
}

async fn store_upload(
    uploads: &UploadStore,
    mut multipart: Multipart,
) -> Result<crate::uploads::StoredUpload, UploadError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| UploadError::Multipart(e.to_string()))?
    {
        if field.name() != Some("file") {
            debug!(field = ?field.name(), "Skipping multipart field");
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let contents = field
            .bytes()
            .await
            .map_err(|e| UploadError::Multipart(e.to_string()))?;
        return uploads.save(&filename, &contents).await;
    }
    Err(UploadError::MissingField("file".to_string()))
}
