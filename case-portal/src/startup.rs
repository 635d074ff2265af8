use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use portal_core::middleware::{
    metrics::metrics_middleware, security_headers::security_headers_middleware,
    tracing::{request_id_middleware, RequestId},
};
use tower_http::trace::TraceLayer;

use crate::handlers::{
    admin::{
        admin_dashboard, create_case, create_chapter, delete_case, delete_chapter, update_case,
        update_chapter,
    },
    app::{health_check, index, not_found},
    auth::{
        callback_handler, login_handler, login_page, logout_handler, signup_handler, signup_page,
    },
    content::chapter_page,
    metrics::metrics,
};
use crate::middleware::gate::access_gate_middleware;
use crate::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/chapter/:slug", get(chapter_page))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        .route("/auth/login", get(login_page).post(login_handler))
        .route("/auth/signup", get(signup_page).post(signup_handler))
        .route("/auth/callback", get(callback_handler))
        .route("/auth/logout", post(logout_handler))
        .route("/admin", get(admin_dashboard))
        .route("/admin/chapters", post(create_chapter))
        .route("/admin/chapters/:id", post(update_chapter))
        .route("/admin/chapters/:id/delete", post(delete_chapter))
        .route("/admin/cases", post(create_case))
        .route("/admin/cases/:id", post(update_case))
        .route("/admin/cases/:id/delete", post(delete_case))
        .fallback(not_found)
        .layer(from_fn_with_state(state.clone(), access_gate_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(from_fn(metrics_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .extensions()
                    .get::<RequestId>()
                    .map(|id| id.0.as_str())
                    .unwrap_or("unknown");

                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}
