use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::error;

use draftsmith_agent::{DraftOrchestrator, DraftOutcome};
use draftsmith_core::domain::request::EmailDraftRequest;

#[derive(Clone)]
pub struct ApiState {
    pub orchestrator: Arc<DraftOrchestrator>,
}

pub fn router(orchestrator: Arc<DraftOrchestrator>) -> Router {
    Router::new()
        .route("/api/agents/email-draft", post(draft_email))
        .with_state(ApiState { orchestrator })
}

/// 200 with the full envelope on delivery, 400 with the rejection envelope on
/// invalid or disallowed input, 500 only for programming-error-class
/// failures inside the generator.
pub async fn draft_email(
    State(state): State<ApiState>,
    Json(request): Json<EmailDraftRequest>,
) -> (StatusCode, Json<Value>) {
    match state.orchestrator.handle(request).await {
        Ok(DraftOutcome::Delivered(envelope)) => (StatusCode::OK, Json(payload(&envelope))),
        Ok(DraftOutcome::Rejected(rejection)) => {
            (StatusCode::BAD_REQUEST, Json(payload(&rejection)))
        }
        Err(failure) => {
            error!(
                event_name = "api.email_draft.internal_error",
                error = %failure,
                "email draft request failed unexpectedly"
            );
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "An unexpected internal error occurred." })),
            )
        }
    }
}

fn payload<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value)
        .unwrap_or_else(|_| json!({ "error": "response serialization failed" }))
}
