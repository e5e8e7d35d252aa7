//! HTTP handlers.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, Instrument};
use uuid::Uuid;

use super::types::{ChatRequest, ChatResponse, ErrorResponse, HealthResponse};
use super::AppState;

/// GET /api/health - Liveness check.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// POST /chat - Run the agent on one message.
///
/// If the client disconnects, axum drops this future; the drop guard then
/// cancels the in-flight model or tool call.
pub async fn chat(State(state): State<Arc<AppState>>, Json(req): Json<ChatRequest>) -> Response {
    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("chat", %request_id);

    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    async move {
        info!("Received chat message ({} chars)", req.message.len());

        match state.agent.invoke_with_cancel(&req.message, &cancel).await {
            Ok(response) => (StatusCode::OK, Json(ChatResponse { response })).into_response(),
            Err(e) => {
                error!("Error processing request: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse {
                        detail: e.to_string(),
                    }),
                )
                    .into_response()
            }
        }
    }
    .instrument(span)
    .await
}
