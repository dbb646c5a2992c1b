use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    routing::{get, patch},
    Router,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{config::Config, handlers, middleware, state::AppState};

pub fn build_router(state: AppState) -> Router {
    // Public routes (no session)
    let public_routes = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/auth/validate", get(handlers::auth::validate))
        .route("/auth/logout/{provider}", get(handlers::auth::logout))
        .route("/auth/{provider}", get(handlers::auth::begin_login))
        .route("/auth/{provider}/callback", get(handlers::auth::callback));

    // Session-protected routes
    let todo_routes = Router::new()
        .route(
            "/api/todos",
            get(handlers::todos::list_todos).post(handlers::todos::create_todo),
        )
        .route("/api/todos/{id}/done", patch(handlers::todos::mark_done))
        .route("/api/todos/{id}/edit", patch(handlers::todos::edit_todo))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_session,
        ));

    let cors = cors_layer(&state.config);

    Router::new()
        .merge(public_routes)
        .merge(todo_routes)
        .layer(
            ServiceBuilder::new()
                .layer(axum_middleware::from_fn(middleware::request_id::request_id))
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// Credentialed CORS needs an explicit origin list; wildcards are rejected by
/// browsers once cookies are involved.
fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_allow_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PATCH])
        .allow_headers([header::ORIGIN, header::CONTENT_TYPE, header::ACCEPT])
        .max_age(Duration::from_secs(24 * 60 * 60))
}
