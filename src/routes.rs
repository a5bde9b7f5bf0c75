use axum::{
    routing::{get, put},
    Router,
};

use crate::{catalog, notifications, renewals};

pub async fn root() -> &'static str {
    "Subscription Backend API"
}

pub fn api_routes() -> Router {
    Router::new()
        .route(
            "/api/services/:service_id/plans",
            get(catalog::api::list_service_plans),
        )
        .route(
            "/api/notifications/stream",
            get(notifications::stream_notifications),
        )
        .route(
            "/api/session/account",
            put(renewals::api::update_session_account),
        )
}
