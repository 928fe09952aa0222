// src/lib.rs

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod common;
pub mod config;
pub mod db;
pub mod docs;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use crate::{config::AppState, docs::ApiDoc, middleware::auth::auth_guard};

/// Monta todas as rotas da API sobre o estado já construído.
pub fn app(app_state: AppState) -> Router {
    // Define as rotas de autenticação (públicas)
    let auth_routes = Router::new().route("/login", post(handlers::auth::login));

    // A vitrine recebe as mensagens do transporte de chat, sem JWT
    let storefront_routes =
        Router::new().route("/updates", post(handlers::storefront::handle_update));

    // Todas as demais rotas exigem o token
    let protected_routes = Router::new()
        .route("/users/me", get(handlers::auth::get_me))
        .route("/sales", get(handlers::sales::list_sales))
        .route("/sales/sync", post(handlers::sales::sync_pending))
        .route("/sales/{id}/confirm", post(handlers::sales::confirm_sale))
        .route("/sales/{id}/reject", post(handlers::sales::reject_sale))
        .route(
            "/payouts",
            get(handlers::payouts::list_payouts).post(handlers::payouts::request_payout),
        )
        .route("/payouts/{id}", get(handlers::payouts::get_payout))
        .route("/payouts/{id}/approve", post(handlers::payouts::approve_payout))
        .route("/payouts/{id}/reject", post(handlers::payouts::reject_payout))
        .route(
            "/retention-rates",
            get(handlers::retention::current_rate).post(handlers::retention::set_rate),
        )
        .route(
            "/protocols",
            get(handlers::protocols::list_protocols).post(handlers::protocols::open_protocol),
        )
        .route("/protocols/{id}", get(handlers::protocols::view_protocol))
        .route("/protocols/{id}/comments", post(handlers::protocols::add_comment))
        .route("/protocols/{id}/close", post(handlers::protocols::close_protocol))
        .route("/audit-logs", get(handlers::audit::list_audit_logs))
        .route("/reports/summary", get(handlers::reports::finance_summary))
        .route("/apartments/{id}/summary", get(handlers::reports::apartment_summary))
        .route("/notifications/stream", get(handlers::notifications::stream))
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), auth_guard));

    let upload_routes = Router::new()
        .route("/{file}", get(handlers::uploads::serve_upload))
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), auth_guard));

    // Combina tudo no router principal
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/auth", auth_routes)
        .nest("/api/storefront", storefront_routes)
        .nest("/api", protected_routes)
        .nest("/_uploads", upload_routes)
        .with_state(app_state)
}
