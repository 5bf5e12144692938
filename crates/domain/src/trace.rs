use serde::Serialize;

/// Structured trace events emitted across the voice-orchestrator crates.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    CallStarted {
        call_id: String,
        agent_id: String,
        conversation_id: Option<String>,
        org_id: Option<String>,
    },
    CallEnded {
        call_id: String,
        duration_ms: u64,
        reason: String,
    },
    TurnStarted {
        call_id: String,
        turn_index: u64,
    },
    TurnCompleted {
        call_id: String,
        turn_index: u64,
        duration_ms: u64,
        sentence_count: usize,
    },
    TurnCancelled {
        call_id: String,
        turn_index: u64,
        stage: String,
    },
    BargeIn {
        call_id: String,
        turn_index: u64,
        interrupt_count: u64,
    },
    SttReconnect {
        call_id: String,
        attempt: u32,
        delay_ms: u64,
    },
    SttExhausted {
        call_id: String,
        attempts: u32,
    },
    ToolInvoked {
        call_id: String,
        tool: String,
        duration_ms: u64,
        ok: bool,
    },
    RetrievalCompleted {
        call_id: String,
        kb_id: String,
        keyword_hits: usize,
        semantic_hits: usize,
        fused_hits: usize,
        duration_ms: u64,
    },
    LlmRequest {
        provider: String,
        model: String,
        role: String,
        streaming: bool,
        duration_ms: u64,
        prompt_tokens: Option<u32>,
        completion_tokens: Option<u32>,
    },
    LlmFallback {
        from_provider: String,
        from_model: String,
        to_provider: String,
        to_model: String,
        reason: String,
    },
    BillingDebit {
        org_id: String,
        conversation_id: Option<String>,
        amount: String,
        balance_after: Option<String>,
        ok: bool,
        retries: u32,
    },
    BillingCreditRefused {
        org_id: String,
        requested: String,
        reason: String,
    },
    GhostCallClosed {
        call_id: String,
        seconds_since_audio: u64,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "voice_event");
    }
}
