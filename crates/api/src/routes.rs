use axum::middleware;
use axum::routing::{delete, get};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::auth::middleware::require_auth;
use crate::handlers;
use crate::state::AppState;

/// All routes under `/api`. Everything except the auth endpoints themselves
/// sits behind the session middleware.
pub fn create_api_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/queries", get(handlers::queries::get_queries))
        .route("/queries/suggestions", get(handlers::queries::get_suggestions))
        .route("/stats/summary", get(handlers::stats::get_summary))
        .route("/history", get(handlers::stats::get_history))
        .route("/history/clients", get(handlers::stats::get_client_history))
        .route(
            "/config",
            get(handlers::config::get_config).patch(handlers::config::patch_config),
        )
        .route("/auth/sessions", get(handlers::auth::list_sessions))
        .route("/auth/sessions/{id}", delete(handlers::auth::delete_session))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route(
            "/auth",
            get(handlers::auth::status)
                .post(handlers::auth::login)
                .delete(handlers::auth::logout),
        )
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
