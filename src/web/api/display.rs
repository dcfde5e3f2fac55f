use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::config::Permission;
use crate::display::InputEvent;
use crate::web::api::error::{ApiError, ApiResult, ErrorResponse};
use crate::web::auth::{AppState, Operator};

#[derive(Debug, Serialize, ToSchema)]
pub struct ControlResponse {
    /// Queued for the next tick; debouncing may still drop it.
    pub queued: String,
}

fn queue(state: &AppState, event: InputEvent, name: &str) -> ApiResult<(StatusCode, Json<ControlResponse>)> {
    state
        .input
        .send(event)
        .map_err(|_| ApiError::TrackerStopped)?;
    Ok((
        StatusCode::ACCEPTED,
        Json(ControlResponse {
            queued: name.to_string(),
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/api/display/advance",
    security(
        ("api_key" = [])
    ),
    responses(
        (status = 202, description = "Advance queued", body = ControlResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Forbidden", body = ErrorResponse),
        (status = 503, description = "Tracker stopped", body = ErrorResponse)
    ),
    tag = "display"
)]
pub async fn advance(
    State(state): State<AppState>,
    operator: Operator,
) -> ApiResult<(StatusCode, Json<ControlResponse>)> {
    operator.require(Permission::ControlDisplay)?;
    log::info!("{} advanced the page", operator.name);
    queue(&state, InputEvent::Advance, "advance")
}

#[utoipa::path(
    post,
    path = "/api/display/alert",
    security(
        ("api_key" = [])
    ),
    responses(
        (status = 202, description = "Alert toggle queued", body = ControlResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Forbidden", body = ErrorResponse),
        (status = 503, description = "Tracker stopped", body = ErrorResponse)
    ),
    tag = "display"
)]
pub async fn toggle_alert(
    State(state): State<AppState>,
    operator: Operator,
) -> ApiResult<(StatusCode, Json<ControlResponse>)> {
    operator.require(Permission::ControlDisplay)?;
    log::info!("{} toggled the pass alert", operator.name);
    queue(&state, InputEvent::ToggleAlert, "toggle_alert")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::telemetry::TelemetryHub;
    use std::collections::HashSet;
    use std::sync::mpsc::{self, Receiver};
    use std::sync::Arc;

    fn state() -> (AppState, Receiver<InputEvent>) {
        let config = Config::from_yaml("satellite:\n  catalog_id: 25544\nobserver:\n  coordinates: \"46.5, 6.9\"\n").unwrap();
        let (input, rx) = mpsc::channel();
        let state = AppState {
            config: Arc::new(config),
            telemetry: TelemetryHub::new().handle(),
            input,
        };
        (state, rx)
    }

    fn operator(permissions: &[Permission]) -> Operator {
        Operator {
            name: "operator".into(),
            permissions: permissions.iter().copied().collect::<HashSet<_>>(),
        }
    }

    #[tokio::test]
    async fn advance_is_queued_for_the_loop() {
        let (state, rx) = state();
        let result = advance(State(state), operator(&[Permission::ControlDisplay])).await;
        assert!(matches!(result, Ok((StatusCode::ACCEPTED, _))));
        assert_eq!(rx.try_recv().unwrap(), InputEvent::Advance);
    }

    #[tokio::test]
    async fn toggle_needs_permission() {
        let (state, rx) = state();
        let result = toggle_alert(State(state), operator(&[])).await;
        assert!(matches!(result, Err(ApiError::Forbidden)));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn stopped_loop_is_reported() {
        let (state, rx) = state();
        drop(rx);
        let result = toggle_alert(State(state), operator(&[Permission::ControlDisplay])).await;
        assert!(matches!(result, Err(ApiError::TrackerStopped)));
    }
}
