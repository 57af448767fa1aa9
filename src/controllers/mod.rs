pub mod agreements;
pub mod analytics;
pub mod announcements;
pub mod apartments;
pub mod auth;
pub mod booked_apartments;
pub mod coupons;
pub mod payment;
pub mod users;


use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub fn routes() -> Router<Arc<crate::AppState>> {
    Router::new()
        .merge(auth::routes())
        .merge(users::routes())
        .merge(coupons::routes())
        .merge(apartments::routes())
        .merge(booked_apartments::routes())
        .merge(agreements::routes())
        .merge(announcements::routes())
        .merge(payment::routes())
        .merge(analytics::routes())
}

/// Полное приложение: маршруты, состояние и HTTP-слои.
pub fn app(state: Arc<crate::AppState>) -> Router {
    Router::new()
        .route("/", get(|| async { "Building management API is running" }))
        .route("/health", get(|| async { "OK" }))
        .merge(routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        // Фронтенд ходит с другого origin
        .layer(CorsLayer::permissive())
}
