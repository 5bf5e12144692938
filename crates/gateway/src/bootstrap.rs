//! `AppState` construction extracted from `main.rs` so the `serve` and
//! `config` CLI paths share the same boot sequence.

use std::sync::Arc;

use anyhow::Context;
use sha2::{Digest, Sha256};
use sqlx::postgres::PgPoolOptions;

use voice_billing::BillingLedger;
use voice_domain::config::{Config, ConfigSeverity};
use voice_orchestrator::{CallRegistry, LlmGenerator};
use voice_providers::registry::ProviderRegistry;
use voice_providers::router::LlmRouter;
use voice_retrieval::HybridRetriever;
use voice_sessions::CallSessionStore;
use voice_telephony::tts;

use crate::state::AppState;

/// The voice-id used to pre-generate the filler phrase at startup, before
/// any agent (and its configured voice-id) is known.
const STARTUP_FILLER_VOICE_ID: &str = "alloy";

/// Validate config, initialize every subsystem, and return a fully-wired
/// [`AppState`]. Shared by the `serve` and `config` CLI paths.
pub async fn build_app_state(config: Arc<Config>) -> anyhow::Result<AppState> {
    // ── Config validation ────────────────────────────────────────────
    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    if issues.iter().any(|i| i.severity == ConfigSeverity::Error) {
        anyhow::bail!(
            "config validation failed with {} error(s)",
            issues
                .iter()
                .filter(|i| i.severity == ConfigSeverity::Error)
                .count()
        );
    }

    // ── Postgres pool ─────────────────────────────────────────────────
    let database_url = std::env::var(&config.database.url_env)
        .with_context(|| format!("reading {}", config.database.url_env))?;
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&database_url)
        .await
        .context("connecting to postgres")?;
    tracing::info!(max_connections = config.database.max_connections, "postgres pool ready");

    // ── Redis-backed call session store ──────────────────────────────
    let redis_url = std::env::var(&config.database.redis_url_env)
        .with_context(|| format!("reading {}", config.database.redis_url_env))?;
    let sessions = CallSessionStore::connect(&redis_url)
        .await
        .context("connecting to redis")?;
    tracing::info!("call session store ready");

    // ── LLM providers + router ────────────────────────────────────────
    let providers = Arc::new(
        ProviderRegistry::from_config(&config.llm).context("initializing LLM providers")?,
    );
    if providers.is_empty() {
        tracing::warn!("no LLM providers initialized — calls will fail to generate responses");
    } else {
        tracing::info!(providers = providers.len(), "LLM provider registry ready");
    }
    let router = Arc::new(LlmRouter::from_config(&config.llm).context("building LLM router")?);

    // ── Tool registry ─────────────────────────────────────────────────
    let tools = Arc::new(voice_tools::builtin_registry(pool.clone()));
    tracing::info!("tool registry ready");

    // ── Hybrid retrieval ──────────────────────────────────────────────
    let retriever = Arc::new(HybridRetriever::new(
        pool.clone(),
        providers.clone(),
        config.retrieval.clone(),
    ));

    // ── Billing ledger ────────────────────────────────────────────────
    let billing = Arc::new(BillingLedger::new(pool.clone(), config.billing.clone()));

    // ── Turn generator ────────────────────────────────────────────────
    let generator = Arc::new(LlmGenerator::new(router.clone(), tools.clone()));

    // ── In-flight call registry ───────────────────────────────────────
    let calls = Arc::new(CallRegistry::new());

    // ── Filler audio preload ──────────────────────────────────────────
    tts::preload_filler(STARTUP_FILLER_VOICE_ID, config.tts.clone()).await;

    // ── Telephony webhook token (read once, hash for constant-time compare) ──
    let telephony_token_hash = match std::env::var(&config.telephony.auth_token_env) {
        Ok(token) if !token.is_empty() => {
            tracing::info!(env_var = %config.telephony.auth_token_env, "telephony webhook signature check enabled");
            Some(Sha256::digest(token.as_bytes()).to_vec())
        }
        _ => {
            tracing::warn!(
                env_var = %config.telephony.auth_token_env,
                "telephony webhook signature check DISABLED — webhooks accepted unauthenticated"
            );
            None
        }
    };

    // ── Admin token ───────────────────────────────────────────────────
    let admin_token_hash = match std::env::var(&config.admin.token_env) {
        Ok(token) if !token.is_empty() => {
            tracing::info!("admin bearer-token auth enabled");
            Some(Sha256::digest(token.as_bytes()).to_vec())
        }
        _ => {
            tracing::warn!(
                "admin bearer-token auth DISABLED — admin endpoints accept any caller"
            );
            None
        }
    };

    Ok(AppState {
        config,
        pool,
        sessions,
        providers,
        router,
        tools,
        retriever,
        billing,
        generator,
        calls,
        telephony_token_hash,
        admin_token_hash,
    })
}
