//! API Router configuration

use super::handlers;
use super::state::AppState;
use crate::config::ServerConfig;
use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Create the main API router
pub fn create_router(state: AppState, server: &ServerConfig) -> Router {
    let api_routes = Router::new()
        // Health
        .route("/health", get(handlers::health_check))
        // Reloads
        .route("/bricks/reload", post(handlers::reload_basic))
        .route("/bricks/reload/detail/:record_id", post(handlers::reload_detail))
        .route("/bricks/reload/home", post(handlers::reload_home))
        .route("/bricks/reload/mypage", post(handlers::reload_mypage))
        // States
        .route("/bricks/state", post(handlers::set_brick_state))
        // Pages
        .route("/pages/detail/:record_id", get(handlers::detail_page))
        .route("/pages/home", get(handlers::home_page))
        .route("/pages/mypage", get(handlers::my_page))
        // Placement configuration
        .route(
            "/config/detail",
            get(handlers::get_detail_config)
                .put(handlers::put_detail_config)
                .delete(handlers::delete_detail_config),
        )
        .route(
            "/config/home",
            get(handlers::get_home_config)
                .put(handlers::put_home_config)
                .delete(handlers::delete_home_config),
        )
        .route(
            "/config/mypage",
            get(handlers::get_mypage_config).put(handlers::put_mypage_config),
        )
        // Config items
        .route("/config/items/instance", post(handlers::create_instance_item))
        .route("/config/items/instance/:id", delete(handlers::delete_instance_item))
        .route("/config/items/relation", post(handlers::create_relation_item))
        .route("/config/items/relation/:id", delete(handlers::delete_relation_item))
        .route("/config/items/custom", post(handlers::create_custom_item))
        .route("/config/items/custom/:id", delete(handlers::delete_custom_item));

    let mut router = Router::new()
        .nest("/api/v1", api_routes)
        .layer(DefaultBodyLimit::max(server.max_body_size))
        .layer(TimeoutLayer::new(Duration::from_secs(server.request_timeout_secs)))
        .layer(TraceLayer::new_for_http());

    if server.enable_cors {
        router = router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }

    router.with_state(state)
}
