//! Application setup and HTTP router assembly for the Mutation API boundary
//! and health/status routes.

use std::sync::Arc;

use axum::{
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware,
    routing::{delete, get, patch, post},
    Extension, Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::domains::helpers::HelperMutationService;
use crate::kernel::server_kernel::SchedulingKernel;
use crate::server::middleware::{extract_client_ip, jwt_auth_middleware, JwtVerifier};
use crate::server::routes::{
    admin_toggle_helper_handler, health_handler, helper_status_handler, register_helper_handler,
    status_handler, unregister_helper_handler, update_helper_handler,
};

/// Shared application state injected into every handler via [`Extension`].
#[derive(Clone)]
pub struct AppState {
    pub kernel: SchedulingKernel,
    pub mutations: Arc<HelperMutationService>,
}

/// Builds the Mutation API + health/status router. `allowed_origins` empty
/// means "any origin" (a development default; tighten via deployment
/// config for production).
pub fn build_app(
    kernel: SchedulingKernel,
    jwt_verifier: Arc<JwtVerifier>,
    allowed_origins: Vec<String>,
) -> Router {
    let mutations = Arc::new(HelperMutationService::new(
        kernel.catalogue.clone(),
        kernel.user_directory.clone(),
        kernel.replan_tx.clone(),
    ));
    let state = AppState { kernel, mutations };

    let cors = if allowed_origins.is_empty() {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
            .allow_headers([AUTHORIZATION, CONTENT_TYPE])
    };

    Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .route("/status/helpers/:helperId", get(helper_status_handler))
        .route("/helpers/:helperId/register", post(register_helper_handler))
        .route("/helpers/:helperId", patch(update_helper_handler))
        .route("/helpers/:helperId", delete(unregister_helper_handler))
        .route("/admin/helpers/:helperId", patch(admin_toggle_helper_handler))
        .layer(middleware::from_fn(move |request, next| {
            let verifier = jwt_verifier.clone();
            jwt_auth_middleware(verifier, request, next)
        }))
        .layer(middleware::from_fn(extract_client_ip))
        .layer(Extension(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
