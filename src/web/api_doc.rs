use utoipa::{
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
    Modify, OpenApi,
};

use super::api::display::ControlResponse;
use super::api::error::ErrorResponse;

#[derive(OpenApi)]
#[openapi(
    paths(
        super::api::telemetry::latest,
        super::api::telemetry::status,
        super::api::telemetry::stream,
        super::api::display::advance,
        super::api::display::toggle_alert,
    ),
    components(
        schemas(
            ControlResponse,
            ErrorResponse,
            crate::telemetry::TelemetryRecord,
            crate::telemetry::StatusSnapshot,
            crate::telemetry::ElementSummary,
            crate::predict::PassEvent,
            crate::predict::Visibility,
            crate::display::PageId,
        )
    ),
    modifiers(&SecurityAddon),
    info(
        title = "Pass-O-Mat API",
        description = "Live telemetry and operator control for the satellite pass tracker",
        version = "0.1.0"
    ),
    tags(
        (name = "telemetry", description = "Position, pass and status reports"),
        (name = "display", description = "Operator input for the panel")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "api_key",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}
