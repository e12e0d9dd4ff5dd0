//! Health check endpoint.
//!
//! Probes a Scheduling Store round-trip rather than just reporting the
//! process is alive.

use axum::{extract::Extension, http::StatusCode, Json};
use serde::Serialize;

use crate::server::app::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    scheduling_store: SchedulingStoreHealth,
}

#[derive(Serialize)]
pub struct SchedulingStoreHealth {
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Returns 200 OK if the Scheduling Store answers a round-trip `set`/`get`
/// within 5s, 503 Service Unavailable otherwise.
pub async fn health_handler(
    Extension(state): Extension<AppState>,
) -> (StatusCode, Json<HealthResponse>) {
    const PROBE_KEY: &str = "internalHealthCheck:probe";

    let store_health = match tokio::time::timeout(
        std::time::Duration::from_secs(5),
        state.kernel.store.set_kv(PROBE_KEY, "ok"),
    )
    .await
    {
        Ok(Ok(())) => SchedulingStoreHealth {
            status: "ok".to_string(),
            error: None,
        },
        Ok(Err(err)) => SchedulingStoreHealth {
            status: "error".to_string(),
            error: Some(err.to_string()),
        },
        Err(_) => SchedulingStoreHealth {
            status: "error".to_string(),
            error: Some("scheduling store probe timed out (>5s)".to_string()),
        },
    };

    let is_healthy = store_health.status == "ok";
    let status_code = if is_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status_code,
        Json(HealthResponse {
            status: if is_healthy { "healthy" } else { "unhealthy" }.to_string(),
            scheduling_store: store_health,
        }),
    )
}
