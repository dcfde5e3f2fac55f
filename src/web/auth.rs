use axum::{extract::FromRequestParts, http::request::Parts};
use std::collections::HashSet;
use std::sync::mpsc::Sender;
use std::sync::Arc;

use crate::config::{Config, Permission};
use crate::display::InputEvent;
use crate::telemetry::TelemetryHandle;
use crate::web::api::error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub telemetry: TelemetryHandle,
    /// Operator input into the control loop.
    pub input: Sender<InputEvent>,
}

/// Holder of a configured API key, resolved from `Authorization: Bearer`.
#[derive(Debug, Clone)]
pub struct Operator {
    pub name: String,
    pub permissions: HashSet<Permission>,
}

impl Operator {
    pub fn require(&self, permission: Permission) -> Result<(), ApiError> {
        if self.permissions.contains(&permission) {
            return Ok(());
        }
        log::warn!("{} lacks permission {:?}", self.name, permission);
        Err(ApiError::Forbidden)
    }
}

impl FromRequestParts<AppState> for Operator {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .ok_or(ApiError::Unauthorized("missing_authorization"))?;
        let key = header
            .to_str()
            .ok()
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or(ApiError::Unauthorized("malformed_authorization"))?;
        let api_key = state
            .config
            .find_api_key(key)
            .ok_or(ApiError::Unauthorized("unknown_api_key"))?;

        Ok(Operator {
            name: api_key.name.clone(),
            permissions: api_key.permissions.clone(),
        })
    }
}
