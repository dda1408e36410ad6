//! HTTP API router.
//!
//! Returns a composable `Router` with all endpoints nested under `/api/`.
//! Middleware uses `Extension<ApiContext>` (injected as the outermost layer);
//! endpoint handlers use `State<ApiContext>` (provided via `with_state`).

use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::Router;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;

/// Build the API router. All endpoints require bearer token authentication.
pub fn api_router(ctx: ApiContext) -> Router {
    // Multipart framing adds overhead on top of the image payload itself;
    // the pipeline enforces the exact image ceiling.
    let body_limit = ctx.max_upload_bytes + 64 * 1024;

    let protected = Router::new()
        .route(
            "/receipts",
            get(endpoints::receipts::list).post(endpoints::receipts::upload),
        )
        .route(
            "/receipts/:id",
            get(endpoints::receipts::detail).patch(endpoints::receipts::correct),
        )
        .with_state(ctx.clone())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(axum::middleware::from_fn(middleware::auth::require_auth))
        // Extension must be outermost so middleware can extract ApiContext
        .layer(axum::Extension(ctx.clone()));

    // Health is a liveness probe for load balancers, no auth required
    let unprotected = Router::new()
        .route("/health", get(endpoints::health::check))
        .with_state(ctx);

    Router::new().nest("/api", protected).nest("/api", unprotected)
}
