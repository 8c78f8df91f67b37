//! Application setup and server configuration.

use std::sync::Arc;

use axum::{
    extract::Extension,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware,
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::kernel::ServerDeps;
use crate::server::middleware::jwt_auth_middleware;
use crate::server::routes::*;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub deps: Arc<ServerDeps>,
    /// Present when the stores are Postgres-backed; used by the health check
    pub db_pool: Option<PgPool>,
}

impl AppState {
    pub fn new(deps: ServerDeps, db_pool: Option<PgPool>) -> Self {
        Self {
            deps: Arc::new(deps),
            db_pool,
        }
    }
}

/// Build the Axum application router
pub fn build_app(state: AppState, allowed_origins: &[String]) -> Router {
    let jwt_service = state.deps.jwt_service.clone();

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE]);

    let v1 = Router::new()
        .route(
            "/user-providers",
            post(register_provider_handler).get(list_my_providers_handler),
        )
        .route("/user-providers/all", get(list_all_providers_handler))
        .route(
            "/user-providers/:id",
            get(get_provider_handler).delete(delete_provider_handler),
        )
        .route(
            "/templates",
            post(create_template_handler).get(list_my_templates_handler),
        )
        .route("/templates/all", get(list_all_templates_handler))
        .route("/templates/sync", post(sync_templates_handler))
        .route("/templates/approve/:id", post(approve_template_handler))
        .route("/templates/webhook/:id", post(provider_webhook_handler))
        .route(
            "/templates/:id",
            get(get_template_handler)
                .put(update_template_handler)
                .delete(delete_template_handler),
        )
        .route("/messages", post(send_messages_handler))
        .route("/messages/to-list", post(send_to_list_handler))
        .route("/contacts/validate", post(validate_numbers_handler));

    Router::new()
        .route("/health", get(health_handler))
        .nest("/v1", v1)
        // Middleware layers (applied in reverse order - last added runs first)
        .layer(middleware::from_fn(move |req, next| {
            jwt_auth_middleware(jwt_service.clone(), req, next)
        }))
        .layer(Extension(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
