//! Mutation API boundary routes. Each handler requires an authenticated
//! [`CallerContext`]; validation failures surface synchronously as 4xx
//! responses and never touch the queue.

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    Json,
};
use serde::Serialize;

use crate::domains::helpers::{AdminToggleRequest, MutationError, RegisterHelperRequest, UpdateHelperRequest};
use crate::server::app::AppState;
use crate::server::middleware::CallerContext;

#[derive(Serialize)]
pub struct ErrorResponse {
    error: String,
}

impl MutationError {
    fn status_code(&self) -> StatusCode {
        match self {
            MutationError::UnknownHelper(_) | MutationError::UnknownUser(_) => StatusCode::NOT_FOUND,
            MutationError::NotAnAdmin
            | MutationError::AdminOnly(_)
            | MutationError::RequiresAdminActivation(_) => StatusCode::FORBIDDEN,
            MutationError::Directory(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

fn mutation_error_response(err: MutationError) -> (StatusCode, Json<ErrorResponse>) {
    (
        err.status_code(),
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
}

fn require_caller(
    caller: Option<CallerContext>,
) -> Result<CallerContext, (StatusCode, Json<ErrorResponse>)> {
    caller.ok_or_else(|| {
        (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse {
                error: "missing or invalid bearer token".to_string(),
            }),
        )
    })
}

pub async fn register_helper_handler(
    Extension(state): Extension<AppState>,
    caller: Option<Extension<CallerContext>>,
    Path(helper_id): Path<String>,
    Json(request): Json<RegisterHelperRequest>,
) -> Result<StatusCode, (StatusCode, Json<ErrorResponse>)> {
    let caller = require_caller(caller.map(|Extension(c)| c))?;
    state
        .mutations
        .register(&caller.user_id, caller.is_admin, &helper_id, request)
        .await
        .map_err(mutation_error_response)?;
    Ok(StatusCode::CREATED)
}

pub async fn unregister_helper_handler(
    Extension(state): Extension<AppState>,
    caller: Option<Extension<CallerContext>>,
    Path(helper_id): Path<String>,
) -> Result<StatusCode, (StatusCode, Json<ErrorResponse>)> {
    let caller = require_caller(caller.map(|Extension(c)| c))?;
    state
        .mutations
        .unregister(&caller.user_id, &helper_id)
        .await
        .map_err(mutation_error_response)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn update_helper_handler(
    Extension(state): Extension<AppState>,
    caller: Option<Extension<CallerContext>>,
    Path(helper_id): Path<String>,
    Json(request): Json<UpdateHelperRequest>,
) -> Result<StatusCode, (StatusCode, Json<ErrorResponse>)> {
    let caller = require_caller(caller.map(|Extension(c)| c))?;
    state
        .mutations
        .update(&caller.user_id, caller.is_admin, &helper_id, request)
        .await
        .map_err(mutation_error_response)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn admin_toggle_helper_handler(
    Extension(state): Extension<AppState>,
    caller: Option<Extension<CallerContext>>,
    Path(helper_id): Path<String>,
    Json(request): Json<AdminToggleRequest>,
) -> Result<StatusCode, (StatusCode, Json<ErrorResponse>)> {
    let caller = require_caller(caller.map(|Extension(c)| c))?;
    state
        .mutations
        .admin_toggle(caller.is_admin, &helper_id, request)
        .await
        .map_err(mutation_error_response)?;
    Ok(StatusCode::NO_CONTENT)
}
