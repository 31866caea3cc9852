use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::warn;

use chatlog_capture::{CaptureOutcome, CaptureService};
use chatlog_db::StoreStatus;
use chatlog_types::events::{BotResponse, GroupMessage};

pub type AppState = Arc<CaptureService>;

pub fn router(service: AppState) -> Router {
    Router::new()
        .route("/events/group-message", post(group_message))
        .route("/events/bot-response", post(bot_response))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

#[derive(Debug, Serialize)]
pub struct OutcomeResponse {
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
}

impl From<CaptureOutcome> for OutcomeResponse {
    fn from(outcome: CaptureOutcome) -> Self {
        match outcome {
            CaptureOutcome::Recorded(id) => Self {
                outcome: "recorded",
                id: Some(id),
                reason: None,
            },
            CaptureOutcome::Skipped(reason) => Self {
                outcome: "skipped",
                id: None,
                reason: Some(reason.as_str()),
            },
            CaptureOutcome::Dropped => Self {
                outcome: "dropped",
                id: None,
                reason: None,
            },
        }
    }
}

/// Per-event failures never surface as errors to the dispatcher: every
/// event is acknowledged with what happened to it.
pub async fn group_message(State(service): State<AppState>, body: Bytes) -> impl IntoResponse {
    let outcome = match parse_event::<GroupMessage>(&body, "group message") {
        Some(event) => service.on_group_message(event).await.into(),
        None => malformed(),
    };
    (StatusCode::ACCEPTED, Json(outcome))
}

pub async fn bot_response(State(service): State<AppState>, body: Bytes) -> impl IntoResponse {
    let outcome = match parse_event::<BotResponse>(&body, "bot response") {
        Some(event) => service.on_bot_response(event).await.into(),
        None => malformed(),
    };
    (StatusCode::ACCEPTED, Json(outcome))
}

pub async fn health(State(service): State<AppState>) -> impl IntoResponse {
    let (status, store) = match service.store().status() {
        StoreStatus::Ready => (StatusCode::OK, "ready"),
        StoreStatus::Uninitialized => (StatusCode::SERVICE_UNAVAILABLE, "uninitialized"),
        StoreStatus::Closed => (StatusCode::SERVICE_UNAVAILABLE, "closed"),
    };
    (status, Json(json!({ "store": store })))
}

fn parse_event<T: DeserializeOwned>(body: &[u8], kind: &str) -> Option<T> {
    serde_json::from_slice(body)
        .inspect_err(|e| warn!("Dropping malformed {} event: {}", kind, e))
        .ok()
}

fn malformed() -> OutcomeResponse {
    OutcomeResponse {
        outcome: "dropped",
        id: None,
        reason: Some("malformed_event"),
    }
}
