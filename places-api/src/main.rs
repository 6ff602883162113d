//! Places API Server Entry Point
//!
//! Sets up telemetry, wires the search stack from the environment and
//! starts the Axum HTTP server.

use std::future::IntoFuture;

use places_api::{
    create_api_router, init_telemetry, ApiConfig, ApiError, ApiResult, AppState, TelemetryConfig,
};

#[tokio::main]
async fn main() -> ApiResult<()> {
    let telemetry = init_telemetry(&TelemetryConfig::default())?;
    let logger = telemetry.logger.clone();

    let config = ApiConfig::from_env();
    let state = AppState::build(&config, logger.clone())?;
    let app = create_api_router(state, &config);

    let addr = config.bind_addr()?;
    logger.in_scope(|| tracing::info!(%addr, "Starting places API server"));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    let server = axum::serve(listener, app).into_future();
    tokio::select! {
        result = server => {
            result.map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;
        }
        _ = tokio::signal::ctrl_c() => {
            logger.in_scope(|| tracing::info!("Shutdown signal received"));
        }
    }

    telemetry.shutdown();
    Ok(())
}
