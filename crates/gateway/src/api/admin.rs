//! Operational endpoints: liveness, metrics, and the admin-guarded
//! read/write surface over orgs, in-flight calls, agents, and knowledge
//! chunks.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use serde::Deserialize;
use uuid::Uuid;

use voice_domain::billing::Organization;
use voice_domain::call::Agent;
use voice_domain::knowledge::KnowledgeChunk;

use crate::api::auth::AdminGuard;
use crate::state::AppState;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GET /healthz — liveness probe (public, no auth)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GET /v1/metrics — coarse process metrics (admin-guarded)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn metrics(_guard: AdminGuard, State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "active_calls": state.calls.len(),
        "llm_providers": state.providers.len(),
    }))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GET /v1/orgs/:org_id/balance
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn org_balance(
    _guard: AdminGuard,
    State(state): State<AppState>,
    Path(org_id): Path<Uuid>,
) -> impl IntoResponse {
    let row: Option<Organization> =
        match sqlx::query_as("SELECT * FROM organizations WHERE id = $1")
            .bind(org_id)
            .fetch_optional(&state.pool)
            .await
        {
            Ok(row) => row,
            Err(e) => {
                tracing::error!(error = %e, "failed to read organization");
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(serde_json::json!({ "error": "database error" })),
                )
                    .into_response();
            }
        };

    match row {
        Some(org) => Json(serde_json::json!({
            "org_id": org.id,
            "credit_balance": org.credit_balance,
            "version": org.version,
        }))
        .into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": "organization not found" })),
        )
            .into_response(),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GET /v1/calls, GET /v1/calls/:call_id — in-flight call registry
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn list_calls(_guard: AdminGuard, State(state): State<AppState>) -> impl IntoResponse {
    Json(state.calls.list())
}

pub async fn get_call(
    _guard: AdminGuard,
    State(state): State<AppState>,
    Path(call_id): Path<String>,
) -> impl IntoResponse {
    match state.calls.info(&call_id) {
        Some(info) => Json(info).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": "call not found" })),
        )
            .into_response(),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// POST /v1/agents, GET /v1/agents/:id
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Deserialize)]
pub struct CreateAgentRequest {
    pub org_id: Uuid,
    pub name: String,
    pub phone_number: String,
    pub system_prompt: String,
    pub voice_id: String,
    #[serde(default)]
    pub tool_names: Vec<String>,
    #[serde(default)]
    pub kb_id: Option<Uuid>,
    #[serde(default)]
    pub billing_disabled: bool,
}

pub async fn create_agent(
    _guard: AdminGuard,
    State(state): State<AppState>,
    Json(req): Json<CreateAgentRequest>,
) -> impl IntoResponse {
    let result: Result<Agent, sqlx::Error> = sqlx::query_as(
        r#"
        INSERT INTO agents (id, org_id, name, phone_number, system_prompt, voice_id, tool_names, kb_id, is_active, billing_disabled, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, true, $9, now())
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(req.org_id)
    .bind(&req.name)
    .bind(&req.phone_number)
    .bind(&req.system_prompt)
    .bind(&req.voice_id)
    .bind(&req.tool_names)
    .bind(req.kb_id)
    .bind(req.billing_disabled)
    .fetch_one(&state.pool)
    .await;

    match result {
        Ok(agent) => (StatusCode::CREATED, Json(agent)).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to create agent");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": "failed to create agent" })),
            )
                .into_response()
        }
    }
}

pub async fn get_agent(
    _guard: AdminGuard,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    let row: Option<Agent> = match sqlx::query_as("SELECT * FROM agents WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.pool)
        .await
    {
        Ok(row) => row,
        Err(e) => {
            tracing::error!(error = %e, "failed to read agent");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": "database error" })),
            )
                .into_response();
        }
    };

    match row {
        Some(agent) => Json(agent).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": "agent not found" })),
        )
            .into_response(),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// POST /v1/kb/:kb_id/chunks — knowledge-chunk ingestion
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Deserialize)]
pub struct IngestChunkRequest {
    pub content: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Inserts the chunk with a null embedding; semantic search simply returns
/// no hits for it until an out-of-band embedding backfill runs.
pub async fn ingest_chunk(
    _guard: AdminGuard,
    State(state): State<AppState>,
    Path(kb_id): Path<Uuid>,
    Json(req): Json<IngestChunkRequest>,
) -> impl IntoResponse {
    let result: Result<KnowledgeChunk, sqlx::Error> = sqlx::query_as(
        r#"
        INSERT INTO knowledge_chunks (id, kb_id, content, metadata)
        VALUES ($1, $2, $3, $4)
        RETURNING id, kb_id, content, metadata
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(kb_id)
    .bind(&req.content)
    .bind(&req.metadata)
    .fetch_one(&state.pool)
    .await;

    match result {
        Ok(chunk) => (StatusCode::CREATED, Json(chunk)).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to ingest knowledge chunk");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": "failed to ingest chunk" })),
            )
                .into_response()
        }
    }
}
