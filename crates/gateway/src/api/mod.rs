pub mod admin;
pub mod auth;
pub mod media_stream;
pub mod voice;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

/// Build the full API router.
///
/// Routes are split into **public** (no auth required — the telephony
/// webhooks carry their own signature check, the media stream is
/// authenticated implicitly by knowing the conversation id it was handed)
/// and **admin** (gated behind the `AdminGuard` extractor on each handler).
pub fn router(state: AppState) -> Router<AppState> {
    let webhooks = Router::new()
        .route("/voice/incoming", post(voice::incoming))
        .route("/voice/status", post(voice::status))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_webhook_signature,
        ));

    let public = Router::new()
        .route("/healthz", get(admin::health))
        .route("/media-stream", get(media_stream::upgrade))
        .merge(webhooks);

    let admin_routes = Router::new()
        .route("/v1/metrics", get(admin::metrics))
        .route("/v1/orgs/:org_id/balance", get(admin::org_balance))
        .route("/v1/calls", get(admin::list_calls))
        .route("/v1/calls/:call_id", get(admin::get_call))
        .route("/v1/agents", post(admin::create_agent))
        .route("/v1/agents/:id", get(admin::get_agent))
        .route("/v1/kb/:kb_id/chunks", post(admin::ingest_chunk));

    public
        .merge(admin_routes)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
