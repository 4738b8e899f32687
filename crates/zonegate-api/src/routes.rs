//! API route definitions

use crate::auth::{admin_middleware, rate_limit_middleware, AppState};
use crate::handlers;
use crate::openapi::create_openapi_routes;
use axum::http::{header, HeaderName, Method};
use axum::middleware;
use axum::routing::{delete, get, post, put};
use axum::Router;
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use zonegate_common::Config;
use zonegate_storage::DatabasePool;

/// Create the API router with all routes
pub fn create_router(config: Arc<Config>, db_pool: DatabasePool) -> Router {
    let state = Arc::new(AppState::new(config, db_pool));

    // Probes stay outside the metered surface
    let health_routes = Router::new()
        .route("/", get(handlers::health))
        .route("/live", get(handlers::liveness))
        .route("/ready", get(handlers::readiness));

    let domain_admin = Router::new()
        .route("/:name", delete(handlers::delete_domain))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            admin_middleware,
        ));

    let domain_routes = Router::new()
        .route(
            "/",
            get(handlers::list_domains).post(handlers::create_domain),
        )
        .merge(domain_admin);

    let email_routes = Router::new()
        .route("/", post(handlers::ingest_email))
        .route("/:recipient", get(handlers::list_emails))
        .route("/:recipient/:id", delete(handlers::delete_email));

    let link_routes = Router::new()
        .route("/", post(handlers::create_link))
        .route("/:code", get(handlers::get_link))
        .route("/:code/redirect", get(handlers::resolve_link))
        .route("/:code/stats", get(handlers::link_stats));

    let dns_routes = Router::new()
        .route("/", post(handlers::create_dns_record))
        .route("/public/list", get(handlers::list_public_records))
        .route("/check/:subdomain", get(handlers::check_subdomain))
        .route("/:id/resolve", get(handlers::resolve_records))
        .route("/user/:id", delete(handlers::delete_own_record))
        .route(
            "/:id",
            put(handlers::update_dns_record).delete(handlers::admin_delete_record),
        );

    let api_routes = Router::new()
        .nest("/domains", domain_routes)
        .nest("/emails", email_routes)
        .nest("/links", link_routes)
        .nest("/dns", dns_routes)
        .merge(create_openapi_routes())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static("x-admin-key")]);

    Router::new()
        .nest("/health", health_routes)
        .nest("/api", api_routes)
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
