pub mod card;
pub mod config;
pub mod crypto;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod services;
pub mod txid;
pub mod utils;
pub mod validation;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;

use crate::config::Config;
use crate::crypto::CardCipher;

#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub config: Config,
    pub cipher: CardCipher,
}

pub fn create_app(state: AppState) -> Router {
    // Everything except the health probe and the pure card check requires a
    // verified caller identity.
    let protected = Router::new()
        .route("/payments/create", post(handlers::payments::create_payment))
        .route(
            "/payments/status/:transaction_id",
            get(handlers::payments::payment_status),
        )
        .route(
            "/payments/history/:user_id",
            get(handlers::payments::payment_history),
        )
        .route("/payments/refund", post(handlers::payments::refund_payment))
        .route("/payments/stats", get(handlers::payments::payment_stats))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_auth,
        ));

    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/payments/validate-card",
            post(handlers::payments::validate_card),
        )
        .merge(protected)
        .layer(axum::middleware::from_fn(
            middleware::request_logger::request_logger_middleware,
        ))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
