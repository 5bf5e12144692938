use std::sync::Arc;

use sqlx::PgPool;

use voice_billing::BillingLedger;
use voice_domain::config::Config;
use voice_orchestrator::{CallRegistry, LlmGenerator};
use voice_providers::registry::ProviderRegistry;
use voice_providers::router::LlmRouter;
use voice_retrieval::HybridRetriever;
use voice_sessions::CallSessionStore;
use voice_tools::ToolRegistry;

/// Shared application state passed to all API handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub pool: PgPool,
    pub sessions: CallSessionStore,

    pub providers: Arc<ProviderRegistry>,
    pub router: Arc<LlmRouter>,
    pub tools: Arc<ToolRegistry>,
    pub retriever: Arc<HybridRetriever>,
    pub billing: Arc<BillingLedger>,
    pub generator: Arc<LlmGenerator>,
    pub calls: Arc<CallRegistry>,

    /// SHA-256 hash of the telephony webhook auth token (read once at
    /// startup). `None` means signature checks are disabled (dev mode).
    pub telephony_token_hash: Option<Vec<u8>>,
    /// SHA-256 hash of the admin bearer token.
    pub admin_token_hash: Option<Vec<u8>>,
}
