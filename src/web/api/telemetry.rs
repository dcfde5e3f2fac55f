use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
    Json,
};
use tokio::sync::broadcast::error::RecvError;

use crate::telemetry::{StatusSnapshot, TelemetryRecord};
use crate::web::api::error::{ApiError, ApiResult, ErrorResponse};
use crate::web::auth::AppState;

#[utoipa::path(
    get,
    path = "/api/telemetry",
    responses(
        (status = 200, description = "Latest telemetry record", body = TelemetryRecord),
        (status = 503, description = "No record yet", body = ErrorResponse)
    ),
    tag = "telemetry"
)]
pub async fn latest(State(state): State<AppState>) -> ApiResult<Json<TelemetryRecord>> {
    let record = state.telemetry.latest.borrow().clone();
    record.map(Json).ok_or(ApiError::NotReady("no_telemetry_yet"))
}

#[utoipa::path(
    get,
    path = "/api/status",
    responses(
        (status = 200, description = "Tracker status", body = StatusSnapshot)
    ),
    tag = "telemetry"
)]
pub async fn status(State(state): State<AppState>) -> Json<StatusSnapshot> {
    Json(state.telemetry.status.borrow().clone())
}

#[utoipa::path(
    get,
    path = "/api/telemetry/ws",
    responses(
        (status = 101, description = "WebSocket stream of telemetry records as JSON text frames")
    ),
    tag = "telemetry"
)]
pub async fn stream(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| forward_records(socket, state))
}

async fn forward_records(mut socket: WebSocket, state: AppState) {
    let mut records = state.telemetry.records.subscribe();
    log::info!("Telemetry subscriber connected");
    loop {
        let record = match records.recv().await {
            Ok(record) => record,
            Err(RecvError::Lagged(skipped)) => {
                log::debug!("Telemetry subscriber skipped {} records", skipped);
                continue;
            }
            Err(RecvError::Closed) => break,
        };
        let text = match serde_json::to_string(&record) {
            Ok(text) => text,
            Err(e) => {
                log::warn!("Failed to encode telemetry: {}", e);
                continue;
            }
        };
        if socket.send(Message::Text(text.into())).await.is_err() {
            break;
        }
    }
    log::info!("Telemetry subscriber disconnected");
}
