//! Gateway authentication: telephony webhook signature validation and the
//! admin bearer-token guard.
//!
//! Both read their token hash once at startup (`bootstrap::build_app_state`)
//! and compare in constant time via `subtle::ConstantTimeEq`.

use async_trait::async_trait;
use axum::body::{Body, Bytes};
use axum::extract::{FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Json, Response};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::state::AppState;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the HMAC-SHA256 signature of the raw request body,
/// hex-encoded, keyed by the telephony account's auth token.
const SIGNATURE_HEADER: &str = "x-webhook-signature";

/// Axum middleware enforcing telephony webhook signature validation on
/// `/voice/incoming` and `/voice/status`.
///
/// If no auth token is configured (`telephony_token_hash` is `None`), the
/// check is skipped — dev mode, already warned about at startup.
pub async fn require_webhook_signature(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let Some(token_hash) = state.telephony_token_hash.clone() else {
        return next.run(req).await;
    };

    let provided_sig = req
        .headers()
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    let (parts, body) = req.into_parts();
    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(b) => b,
        Err(_) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "error": "unreadable request body" })),
            )
                .into_response();
        }
    };

    if !signature_valid(&token_hash, &bytes, &provided_sig) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({ "error": "invalid webhook signature" })),
        )
            .into_response();
    }

    let req = Request::from_parts(parts, Body::from(bytes));
    next.run(req).await
}

/// Recompute the HMAC over `body` using the token hash as the key (the raw
/// token is never retained past startup) and compare in constant time.
fn signature_valid(token_hash: &[u8], body: &Bytes, provided_hex: &str) -> bool {
    let Ok(provided) = hex::decode(provided_hex) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(token_hash) else {
        return false;
    };
    mac.update(body);
    let expected = mac.finalize().into_bytes();
    bool::from(expected.as_slice().ct_eq(&provided))
}

/// Axum extractor that enforces the admin bearer token.
///
/// If no admin token is configured (dev mode), all requests pass.
pub struct AdminGuard;

#[async_trait]
impl FromRequestParts<AppState> for AdminGuard {
    type Rejection = (StatusCode, Json<serde_json::Value>);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let expected_hash = match &state.admin_token_hash {
            Some(h) => h,
            None => return Ok(AdminGuard),
        };

        let provided = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .unwrap_or("");

        let provided_hash = Sha256::digest(provided.as_bytes());

        if !bool::from(provided_hash.ct_eq(expected_hash.as_slice())) {
            return Err((
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({ "error": "invalid admin token" })),
            ));
        }
        Ok(AdminGuard)
    }
}
