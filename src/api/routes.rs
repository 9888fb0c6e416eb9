use axum::{
    extract::Request,
    middleware::{self, Next},
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::session::session_middleware;

use super::handlers::{
    create_channel, create_locations, health_check, list_locations, list_properties, login,
    oauth_callback, register_application, AppState,
};
use super::reports::active_visitors;

pub fn create_api_router(state: Arc<AppState>) -> Router {
    let sessions = Arc::clone(&state.sessions);

    let channel_routes = Router::new()
        .route("/channels/google-analytics/create", get(create_channel))
        .route(
            "/channels/google-analytics/application",
            put(register_application),
        )
        .route("/channels/google-analytics/login", get(login))
        .route("/channels/google-analytics/callback", get(oauth_callback))
        .route("/channels/google-analytics/properties", get(list_properties))
        .route("/channels/google-analytics/locations", post(create_locations))
        .route("/locations", get(list_locations))
        .route(
            "/locations/{id}/reports/active-visitors",
            get(active_visitors),
        )
        .with_state(state);

    Router::new()
        .route("/health", get(health_check))
        .merge(channel_routes)
        .layer(middleware::from_fn(move |req: Request, next: Next| {
            session_middleware(Arc::clone(&sessions), req, next)
        }))
        .layer(TraceLayer::new_for_http())
}
