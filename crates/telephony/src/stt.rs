//! Bidirectional streaming STT client with bounded auto-reconnect.
//!
//! Provider wire format modeled generically: `Results` events carry
//! `is_final` + a transcript alternative, `SpeechStarted` is the sole
//! barge-in trigger, `UtteranceEnd` is observability-only.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;

use voice_domain::config::SttConfig;
use voice_domain::trace::TraceEvent;
use voice_providers::traits::SttCallbacks;

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum SttEvent {
    #[serde(rename = "Results")]
    Results {
        #[serde(default)]
        is_final: bool,
        channel: SttChannel,
    },
    #[serde(rename = "SpeechStarted")]
    SpeechStarted,
    #[serde(rename = "UtteranceEnd")]
    UtteranceEnd,
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct SttChannel {
    alternatives: Vec<SttAlternative>,
}

#[derive(Debug, Deserialize)]
struct SttAlternative {
    transcript: String,
}

/// A live streaming STT session. Owns exactly one underlying WebSocket at a
/// time; reconnects on unexpected close per `SttConfig`'s backoff schedule.
pub struct SttStreamClient {
    call_id: String,
    ws_url: String,
    api_key: String,
    config: SttConfig,
    callbacks: Arc<SttCallbacks>,
    outbound: Mutex<Option<mpsc::UnboundedSender<Vec<u8>>>>,
    intentional_close: Arc<AtomicBool>,
    attempt: Arc<AtomicU32>,
}

impl SttStreamClient {
    /// Open a session and spawn its connect/reconnect loop in the
    /// background. `ws_base_url` is the provider's streaming endpoint
    /// (without query parameters — this client appends the μ-law 8 kHz /
    /// endpointing / VAD configuration).
    pub fn connect(
        call_id: String,
        ws_base_url: String,
        api_key: String,
        config: SttConfig,
        callbacks: SttCallbacks,
    ) -> Arc<Self> {
        let ws_url = format!(
            "{ws_base_url}?encoding=mulaw&sample_rate=8000&endpointing={}&utterance_end_ms={}&interim_results=true&vad_events=true",
            config.endpointing_ms, config.utterance_end_ms,
        );
        let client = Arc::new(Self {
            call_id,
            ws_url,
            api_key,
            config,
            callbacks: Arc::new(callbacks),
            outbound: Mutex::new(None),
            intentional_close: Arc::new(AtomicBool::new(false)),
            attempt: Arc::new(AtomicU32::new(0)),
        });
        let loop_handle = client.clone();
        tokio::spawn(async move { loop_handle.run_loop().await });
        client
    }

    /// Forward one encoded audio frame. No-op if not currently connected
    /// (mid-reconnect or closed) — never suspends the caller.
    pub fn send(&self, frame: &[u8]) {
        if let Some(tx) = self.outbound.lock().as_ref() {
            let _ = tx.send(frame.to_vec());
        }
    }

    /// Intentional close: suppresses reconnect and drops the write half,
    /// which ends the current connection.
    pub async fn close(&self) {
        self.intentional_close.store(true, Ordering::SeqCst);
        self.outbound.lock().take();
    }

    async fn run_loop(self: Arc<Self>) {
        loop {
            let closed_cleanly = self.open_once().await;
            if self.intentional_close.load(Ordering::SeqCst) {
                return;
            }
            if closed_cleanly {
                // Unexpected close after a prior successful open; attempt
                // counter was already reset inside `open_once`.
            }

            let attempt_index = self.attempt.fetch_add(1, Ordering::SeqCst);
            if attempt_index >= self.config.max_reconnect_attempts {
                TraceEvent::SttExhausted {
                    call_id: self.call_id.clone(),
                    attempts: attempt_index,
                }
                .emit();
                tracing::error!(call_id = %self.call_id, "stt reconnect attempts exhausted");
                return;
            }
            let delay_ms = self.config.reconnect_base_delay_ms * (attempt_index as u64 + 1);
            TraceEvent::SttReconnect {
                call_id: self.call_id.clone(),
                attempt: attempt_index + 1,
                delay_ms,
            }
            .emit();
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }
    }

    /// Open one connection and run it to completion. Returns once the
    /// connection closes (cleanly or with an error) — the caller decides
    /// whether to reconnect.
    async fn open_once(&self) -> bool {
        let connect_result = tokio_tungstenite::connect_async(
            http_request_with_auth(&self.ws_url, &self.api_key),
        )
        .await;

        let ws_stream = match connect_result {
            Ok((stream, _resp)) => stream,
            Err(e) => {
                tracing::warn!(call_id = %self.call_id, error = %e, "stt connect failed");
                return false;
            }
        };

        // Successful open resets the reconnect attempt counter.
        self.attempt.store(0, Ordering::SeqCst);

        let (mut write, mut read) = ws_stream.split();
        let (tx, mut rx) = mpsc::unbounded_channel::<Vec<u8>>();
        *self.outbound.lock() = Some(tx);

        let writer = tokio::spawn(async move {
            while let Some(frame) = rx.recv().await {
                if write.send(WsMessage::Binary(frame)).await.is_err() {
                    break;
                }
            }
            let _ = write.close().await;
        });

        while let Some(msg) = read.next().await {
            let msg = match msg {
                Ok(m) => m,
                Err(_) => break,
            };
            let WsMessage::Text(text) = msg else {
                continue;
            };
            self.handle_event(&text);
        }

        writer.abort();
        self.outbound.lock().take();
        true
    }

    fn handle_event(&self, raw: &str) {
        let Ok(event) = serde_json::from_str::<SttEvent>(raw) else {
            return;
        };
        match event {
            SttEvent::Results { is_final, channel } => {
                if !is_final {
                    return;
                }
                if let Some(alt) = channel.alternatives.into_iter().next() {
                    (self.callbacks.on_final_transcript)(alt.transcript);
                }
            }
            SttEvent::SpeechStarted => {
                (self.callbacks.on_speech_started)();
            }
            SttEvent::UtteranceEnd => {
                tracing::debug!(call_id = %self.call_id, "utterance end (observability only)");
            }
            SttEvent::Other => {}
        }
    }
}

/// Build the WS handshake request with the provider auth header attached.
fn http_request_with_auth(
    url: &str,
    api_key: &str,
) -> tokio_tungstenite::tungstenite::handshake::client::Request {
    use tokio_tungstenite::tungstenite::client::IntoClientRequest;
    let mut request = url.into_client_request().expect("valid ws url");
    request.headers_mut().insert(
        "Authorization",
        format!("Token {api_key}")
            .parse()
            .expect("valid header value"),
    );
    request
}
