//! API router.
//!
//! Returns a composable `Router` that can be mounted on any axum server.
//! Routes are nested under `/api/`; recipe routes sit behind the identity
//! middleware, health and shared-recipe reads are public.

use std::sync::Arc;

use axum::http::{header, HeaderValue};
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;
use crate::core_state::CoreState;

/// Build the API router.
pub fn api_router(core: Arc<CoreState>) -> Router {
    let ctx = ApiContext::new(core);

    // `route_layer` so unknown paths still fall through to 404.
    let user_routes = Router::new()
        .route("/generate-recipe", post(endpoints::recipes::generate))
        .route("/my-recipes", get(endpoints::recipes::list_mine))
        .route("/recipes/:id", delete(endpoints::recipes::remove))
        .route("/recipes/:id/share", post(endpoints::recipes::share))
        .with_state(ctx.clone())
        .route_layer(axum::middleware::from_fn(middleware::auth::require_user))
        .route_layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ));

    let public_routes = Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/shared/:share_id", get(endpoints::recipes::shared))
        .with_state(ctx);

    Router::new()
        .nest("/api", user_routes.merge(public_routes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
