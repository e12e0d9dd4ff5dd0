//! `GET /status` — read-only dispatcher/planner introspection. Pure
//! observability: it does not change scheduling behaviour.

use axum::{extract::Extension, Json};
use serde::Serialize;

use crate::kernel::scheduling::JobStatus;
use crate::server::app::AppState;

#[derive(Serialize)]
pub struct StatusResponse {
    registered_helpers: usize,
    queued: usize,
    running: usize,
}

#[derive(Serialize)]
pub struct HelperStatusResponse {
    helper_id: String,
    registered: bool,
    queued: usize,
    running: usize,
}

pub async fn status_handler(Extension(state): Extension<AppState>) -> Json<StatusResponse> {
    let jobs = state.kernel.queue.queued_and_running().await.unwrap_or_default();
    let (queued, running) = count_by_status(&jobs, None);

    Json(StatusResponse {
        registered_helpers: state.kernel.registry.len(),
        queued,
        running,
    })
}

pub async fn helper_status_handler(
    Extension(state): Extension<AppState>,
    axum::extract::Path(helper_id): axum::extract::Path<String>,
) -> Json<HelperStatusResponse> {
    let jobs = state.kernel.queue.queued_and_running().await.unwrap_or_default();
    let (queued, running) = count_by_status(&jobs, Some(&helper_id));

    Json(HelperStatusResponse {
        registered: state.kernel.registry.get(&helper_id).is_some(),
        helper_id,
        queued,
        running,
    })
}

fn count_by_status(
    jobs: &[crate::kernel::scheduling::JobRecord],
    helper_id: Option<&str>,
) -> (usize, usize) {
    let matching = jobs
        .iter()
        .filter(|j| helper_id.map(|id| j.helper_id == id).unwrap_or(true));
    let queued = matching.clone().filter(|j| j.status == JobStatus::Queued).count();
    let running = matching.filter(|j| j.status == JobStatus::Running).count();
    (queued, running)
}
