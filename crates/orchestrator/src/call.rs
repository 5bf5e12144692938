//! The per-call state machine: turn handling, barge-in, the billing
//! ticker, and the ghost-call watchdog.

use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use voice_billing::BillingLedger;
use voice_domain::call::{Agent, Conversation, ConversationStatus, MessageRole, Stage};
use voice_domain::config::{BillingConfig, SttConfig, TtsConfig};
use voice_domain::trace::TraceEvent;
use voice_providers::traits::SttCallbacks;
use voice_retrieval::HybridRetriever;
use voice_sessions::CallSessionStore;
use voice_telephony::{SttStreamClient, TtsStreamClient};

use crate::generator::{LlmGenerator, TurnEvent};
use crate::transport::CallTransport;

/// The standard STT streaming endpoint. A real deployment would make this
/// provider-selectable the way TTS selects by voice-id prefix; one
/// provider is wired up here.
const STT_WS_BASE_URL: &str = "wss://api.deepgram.com/v1/listen";

/// One active phone call. Constructed with [`Call::start`], which spawns
/// its background tasks and returns the shared handle.
pub struct Call {
    call_id: String,
    conversation_id: Uuid,
    org_id: Uuid,
    agent: Agent,
    billing_disabled: bool,

    pool: PgPool,
    sessions: CallSessionStore,
    billing: Arc<BillingLedger>,
    retriever: Arc<HybridRetriever>,
    generator: Arc<LlmGenerator>,
    transport: Arc<dyn CallTransport>,
    tts: Arc<TtsStreamClient>,
    stt: Mutex<Option<Arc<SttStreamClient>>>,

    stage: Mutex<Stage>,
    turn_index: AtomicU64,
    last_audio_at: Mutex<Instant>,
    deducted_minutes: Mutex<Decimal>,
    stopped: AtomicBool,
    started_at: Instant,
    started_at_utc: chrono::DateTime<chrono::Utc>,
}

impl Call {
    /// Admit and start a new call. Wires the STT client's callbacks to a
    /// [`Weak`] reference so the client never holds the call alive by
    /// itself — the cycle is broken at construction via
    /// [`Arc::new_cyclic`].
    #[allow(clippy::too_many_arguments)]
    pub fn start(
        call_id: String,
        conversation: Conversation,
        agent: Agent,
        pool: PgPool,
        sessions: CallSessionStore,
        billing: Arc<BillingLedger>,
        retriever: Arc<HybridRetriever>,
        generator: Arc<LlmGenerator>,
        transport: Arc<dyn CallTransport>,
        stt_config: SttConfig,
        stt_api_key: String,
        tts_config: TtsConfig,
    ) -> Arc<Self> {
        let billing_config = billing.config().clone();
        let voice_id = agent.voice_id.clone();
        let call = Arc::new_cyclic(|weak: &Weak<Call>| {
            let stt_callbacks = stt_callbacks_for(weak.clone());
            let stt = SttStreamClient::connect(
                call_id.clone(),
                STT_WS_BASE_URL.to_string(),
                stt_api_key,
                stt_config,
                stt_callbacks,
            );
            Call {
                call_id: call_id.clone(),
                conversation_id: conversation.id,
                org_id: conversation.org_id,
                billing_disabled: agent.billing_disabled,
                agent,
                pool,
                sessions,
                billing,
                retriever,
                generator,
                transport,
                tts: Arc::new(TtsStreamClient::new(voice_id, tts_config)),
                stt: Mutex::new(Some(stt)),
                stage: Mutex::new(Stage::Listening),
                turn_index: AtomicU64::new(0),
                last_audio_at: Mutex::new(Instant::now()),
                deducted_minutes: Mutex::new(Decimal::ZERO),
                stopped: AtomicBool::new(false),
                started_at: Instant::now(),
                started_at_utc: chrono::Utc::now(),
            }
        });

        TraceEvent::CallStarted {
            call_id: call.call_id.clone(),
            agent_id: call.agent.id.to_string(),
            conversation_id: Some(call.conversation_id.to_string()),
            org_id: Some(call.org_id.to_string()),
        }
        .emit();

        tokio::spawn(run_session_init(call.clone()));
        tokio::spawn(run_billing_ticker(call.clone(), billing_config.clone()));
        tokio::spawn(run_ghost_watchdog(call.clone(), billing_config));

        call
    }

    /// Snapshot of identifying fields, for admin listing endpoints.
    pub fn info(&self) -> crate::registry::CallInfo {
        crate::registry::CallInfo {
            call_id: self.call_id.clone(),
            agent_id: self.agent.id.to_string(),
            conversation_id: self.conversation_id.to_string(),
            org_id: self.org_id.to_string(),
            started_at: self.started_at_utc,
        }
    }

    /// Forward one inbound audio frame to the STT client and refresh the
    /// ghost-call watchdog's last-audio timestamp.
    pub fn handle_audio(&self, frame: &[u8]) {
        *self.last_audio_at.lock() = Instant::now();
        if let Some(stt) = self.stt.lock().as_ref() {
            stt.send(frame);
        }
    }

    /// Idempotent teardown. Safe to call more than once — only the first
    /// call has effect.
    pub async fn stop(self: &Arc<Self>, reason: &str) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }

        if let Some(stt) = self.stt.lock().take() {
            stt.close().await;
        }
        self.tts.abort().await;

        let duration_ms = self.started_at.elapsed().as_millis() as u64;
        if !self.billing_disabled {
            let already = *self.deducted_minutes.lock();
            self.billing
                .reconcile_end_of_call(self.org_id, self.conversation_id, duration_ms, already)
                .await;
        }

        if let Err(e) = self.sessions.delete(&self.call_id).await {
            tracing::warn!(call_id = %self.call_id, error = %e, "failed to delete session record");
        }

        let status = match reason {
            "normal" | "insufficient balance" => ConversationStatus::Completed,
            _ => ConversationStatus::Abandoned,
        };
        if let Err(e) = sqlx::query(
            "UPDATE conversations SET status = $1, end_time = now() WHERE id = $2",
        )
        .bind(status)
        .bind(self.conversation_id)
        .execute(&self.pool)
        .await
        {
            tracing::warn!(call_id = %self.call_id, error = %e, "failed to persist conversation end");
        }

        TraceEvent::CallEnded {
            call_id: self.call_id.clone(),
            duration_ms,
            reason: reason.to_string(),
        }
        .emit();

        let close_code = match reason {
            "insufficient balance" | "ghost call timeout" => 1008,
            _ => 1000,
        };
        self.transport.close(close_code, reason).await;
    }

    // ── STT callbacks ───────────────────────────────────────────────

    fn on_final_transcript(self: &Arc<Self>, text: String) {
        if text.trim().is_empty() {
            return;
        }
        // Increment synchronously, on the callback thread, so that a
        // speech-started event racing in right behind this one is
        // guaranteed to observe (and invalidate) this turn's index rather
        // than a stale one from before the transcript arrived.
        let turn_index = self.turn_index.fetch_add(1, Ordering::SeqCst) + 1;
        let call = self.clone();
        tokio::spawn(async move { call.run_turn(turn_index, text).await });
    }

    fn on_speech_started(self: &Arc<Self>) {
        let call = self.clone();
        tokio::spawn(async move { call.barge_in().await });
    }

    async fn barge_in(self: &Arc<Self>) {
        self.tts.abort().await;
        let turn_index = self.turn_index.fetch_add(1, Ordering::SeqCst) + 1;
        self.transport.send_clear().await;

        let interrupt_count = match self.sessions.incr_interrupt_count(&self.call_id).await {
            Ok(n) => n as u64,
            Err(e) => {
                tracing::warn!(call_id = %self.call_id, error = %e, "failed to record interrupt count");
                0
            }
        };
        self.set_stage(Stage::Listening).await;

        TraceEvent::BargeIn {
            call_id: self.call_id.clone(),
            turn_index,
            interrupt_count,
        }
        .emit();
    }

    async fn run_turn(self: &Arc<Self>, turn_index: u64, user_text: String) {
        let turn_start = Instant::now();
        TraceEvent::TurnStarted {
            call_id: self.call_id.clone(),
            turn_index,
        }
        .emit();

        // Fire-and-forget: a persistence failure must not add DB latency
        // to the turn's critical path ahead of retrieval/generation.
        let persist_call = self.clone();
        let persist_text = user_text.clone();
        tokio::spawn(async move {
            persist_call.persist_message(MessageRole::User, &persist_text).await;
        });
        self.set_stage(Stage::Thinking).await;

        let context = self
            .retriever
            .retrieve(&self.call_id, &user_text, self.agent.kb_id, None)
            .await;

        if self.is_stale(turn_index) {
            self.emit_cancelled(turn_index, Stage::Thinking).await;
            return;
        }

        let mut rx = self.generator.generate(
            self.agent.system_prompt.clone(),
            context,
            user_text,
            self.agent.tool_names.clone(),
        );

        let mut sentence_count = 0usize;
        let mut answer_sentences: Vec<String> = Vec::new();
        while let Some(event) = rx.recv().await {
            if self.is_stale(turn_index) {
                self.emit_cancelled(turn_index, Stage::Speaking).await;
                return;
            }
            match event {
                TurnEvent::ToolStarted { tool_name } => {
                    self.set_stage(Stage::ToolExecution).await;
                    tracing::debug!(call_id = %self.call_id, tool = %tool_name, "tool invoked");
                }
                TurnEvent::Filler(filler) => {
                    self.set_stage(Stage::Speaking).await;

                    // Use the preloaded clip to cover tool latency without
                    // paying for a live TTS round-trip first; fall back to
                    // synthesizing the chosen phrase live if nothing was
                    // preloaded yet.
                    let audio = match voice_telephony::filler_audio() {
                        Some(audio) => Some(audio),
                        None => match self.tts.generate_audio(&filler).await {
                            Ok(audio) => audio,
                            Err(e) => {
                                tracing::warn!(call_id = %self.call_id, error = %e, "tts generation failed");
                                None
                            }
                        },
                    };

                    if self.is_stale(turn_index) {
                        self.emit_cancelled(turn_index, Stage::Speaking).await;
                        return;
                    }

                    if let Some(audio) = audio {
                        self.transport.send_media(&audio).await;
                        let _ = self.sessions.incr_sequence(&self.call_id).await;
                        sentence_count += 1;
                    }
                }
                TurnEvent::Sentence(sentence) => {
                    self.set_stage(Stage::Speaking).await;
                    answer_sentences.push(sentence.clone());

                    let audio = match self.tts.generate_audio(&sentence).await {
                        Ok(audio) => audio,
                        Err(e) => {
                            tracing::warn!(call_id = %self.call_id, error = %e, "tts generation failed");
                            None
                        }
                    };

                    if self.is_stale(turn_index) {
                        self.emit_cancelled(turn_index, Stage::Speaking).await;
                        return;
                    }

                    if let Some(audio) = audio {
                        self.transport.send_media(&audio).await;
                        let _ = self.sessions.incr_sequence(&self.call_id).await;
                        sentence_count += 1;
                    }
                }
            }
        }

        if !answer_sentences.is_empty() {
            self.persist_message(MessageRole::Assistant, &answer_sentences.join(" ")).await;
        }

        self.set_stage(Stage::Listening).await;
        TraceEvent::TurnCompleted {
            call_id: self.call_id.clone(),
            turn_index,
            duration_ms: turn_start.elapsed().as_millis() as u64,
            sentence_count,
        }
        .emit();
    }

    fn is_stale(&self, turn_index: u64) -> bool {
        self.turn_index.load(Ordering::SeqCst) != turn_index
    }

    async fn emit_cancelled(&self, turn_index: u64, stage: Stage) {
        TraceEvent::TurnCancelled {
            call_id: self.call_id.clone(),
            turn_index,
            stage: stage.as_str().to_string(),
        }
        .emit();
    }

    async fn set_stage(&self, stage: Stage) {
        *self.stage.lock() = stage;
        if let Err(e) = self.sessions.set_stage(&self.call_id, stage).await {
            tracing::warn!(call_id = %self.call_id, error = %e, "failed to persist stage");
        }
    }

    async fn persist_message(&self, role: MessageRole, content: &str) {
        if let Err(e) = sqlx::query(
            "INSERT INTO messages (id, conversation_id, role, content, latency_ms, created_at) \
             VALUES ($1, $2, $3, $4, $5, now())",
        )
        .bind(Uuid::new_v4())
        .bind(self.conversation_id)
        .bind(role)
        .bind(content)
        .bind(Option::<i32>::None)
        .execute(&self.pool)
        .await
        {
            tracing::warn!(call_id = %self.call_id, error = %e, "failed to persist message");
        }
    }
}

/// Turns a [`Weak<Call>`] into the callback pair the STT client expects.
/// Each invocation upgrades the weak reference inside a spawned task; a
/// dead call (already torn down) silently drops the event.
fn stt_callbacks_for(weak: Weak<Call>) -> SttCallbacks {
    let transcript_weak = weak.clone();
    let speech_weak = weak;
    SttCallbacks {
        on_final_transcript: Box::new(move |text: String| {
            if let Some(call) = transcript_weak.upgrade() {
                call.on_final_transcript(text);
            }
        }),
        on_speech_started: Box::new(move || {
            if let Some(call) = speech_weak.upgrade() {
                call.on_speech_started();
            }
        }),
    }
}

async fn run_session_init(call: Arc<Call>) {
    if let Err(e) = call.sessions.init(&call.call_id, &call.agent.id.to_string()).await {
        tracing::warn!(call_id = %call.call_id, error = %e, "failed to initialize session record");
    }
}

/// Every `ticker_interval_secs`, debit `ticker_deduct_minutes` from the
/// org's balance. A `false` result means the org is out of credit — the
/// call is terminated with close code 1008.
async fn run_billing_ticker(call: Arc<Call>, config: BillingConfig) {
    if call.billing_disabled {
        return;
    }
    let deduct_minutes = Decimal::from_str(&config.ticker_deduct_minutes).unwrap_or(Decimal::ZERO);
    let mut interval = tokio::time::interval(Duration::from_secs(config.ticker_interval_secs));
    interval.tick().await; // first tick fires immediately; skip it
    loop {
        interval.tick().await;
        if call.stopped.load(Ordering::SeqCst) {
            return;
        }
        match call
            .billing
            .deduct(call.org_id, deduct_minutes, Some(call.conversation_id))
            .await
        {
            Ok(true) => {
                *call.deducted_minutes.lock() += deduct_minutes;
            }
            Ok(false) => {
                let call = call.clone();
                tokio::spawn(async move { call.stop("insufficient balance").await });
                return;
            }
            Err(e) => {
                tracing::error!(call_id = %call.call_id, error = %e, "billing ticker deduct failed");
            }
        }
    }
}

/// Every `ghost_watchdog_interval_secs`, close the call if no audio frame
/// has arrived in `ghost_silence_threshold_secs` — guards against a
/// telephony-side connection that never sends a `stop` event.
async fn run_ghost_watchdog(call: Arc<Call>, config: BillingConfig) {
    let threshold = Duration::from_secs(config.ghost_silence_threshold_secs);
    let mut interval = tokio::time::interval(Duration::from_secs(config.ghost_watchdog_interval_secs));
    loop {
        interval.tick().await;
        if call.stopped.load(Ordering::SeqCst) {
            return;
        }
        let silence = call.last_audio_at.lock().elapsed();
        if silence > threshold {
            TraceEvent::GhostCallClosed {
                call_id: call.call_id.clone(),
                seconds_since_audio: silence.as_secs(),
            }
            .emit();
            let call = call.clone();
            tokio::spawn(async move { call.stop("ghost call timeout").await });
            return;
        }
    }
}
