use axum::{routing::get, routing::post, Router};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::Config;
use crate::display::InputEvent;
use crate::telemetry::TelemetryHandle;

use super::api::display as display_handlers;
use super::api::telemetry as telemetry_handlers;
use super::api_doc::ApiDoc;
use super::auth::AppState;

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Telemetry
        .route("/api/telemetry", get(telemetry_handlers::latest))
        .route("/api/telemetry/ws", get(telemetry_handlers::stream))
        .route("/api/status", get(telemetry_handlers::status))
        // Operator input
        .route("/api/display/advance", post(display_handlers::advance))
        .route("/api/display/alert", post(display_handlers::toggle_alert))
        // OpenAPI / Swagger
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        // Middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_server(
    config: Arc<Config>,
    telemetry: TelemetryHandle,
    input: Sender<InputEvent>,
) -> std::io::Result<()> {
    let bind_addr = config.web.bind.clone();
    let app = router(AppState {
        config,
        telemetry,
        input,
    });

    log::info!("Starting server on {}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await
}

/// Runs the server on its own runtime so the control loop keeps the main
/// thread.
pub fn spawn_server(
    config: Arc<Config>,
    telemetry: TelemetryHandle,
    input: Sender<InputEvent>,
) -> std::io::Result<JoinHandle<()>> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("web")
        .enable_all()
        .build()?;
    std::thread::Builder::new()
        .name("web-server".into())
        .spawn(move || {
            if let Err(e) = runtime.block_on(run_server(config, telemetry, input)) {
                log::error!("Web server stopped: {}", e);
            }
        })
}
