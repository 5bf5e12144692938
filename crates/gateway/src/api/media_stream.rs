//! `/media-stream` — the bidirectional telephony media WebSocket.
//!
//! One connection per call. The upgraded socket is wrapped as a
//! [`CallTransport`] and handed to [`Call::start`]; inbound frames are
//! decoded here and forwarded into the `Call`.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use base64::Engine;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use rust_decimal::Decimal;
use tokio::sync::Mutex as AsyncMutex;
use uuid::Uuid;

use voice_domain::call::{Agent, Conversation};
use voice_orchestrator::{Call, CallTransport};
use voice_telephony::{InboundFrame, OutboundFrame};

use crate::state::AppState;

pub async fn upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Wraps the write half of the WebSocket so `Call` can send frames without
/// knowing anything about axum or the stream-sid bookkeeping.
struct WsTransport {
    stream_sid: String,
    sink: AsyncMutex<SplitSink<WebSocket, Message>>,
}

#[async_trait]
impl CallTransport for WsTransport {
    async fn send_media(&self, audio: &[u8]) {
        let frame = OutboundFrame::media(self.stream_sid.clone(), audio);
        self.send_json(&frame).await;
    }

    async fn send_clear(&self) {
        let frame = OutboundFrame::clear(self.stream_sid.clone());
        self.send_json(&frame).await;
    }

    async fn close(&self, code: u16, reason: &str) {
        let mut sink = self.sink.lock().await;
        let _ = sink
            .send(Message::Close(Some(CloseFrame {
                code,
                reason: reason.to_string().into(),
            })))
            .await;
    }
}

impl WsTransport {
    async fn send_json(&self, frame: &OutboundFrame) {
        let Ok(text) = serde_json::to_string(frame) else {
            return;
        };
        let mut sink = self.sink.lock().await;
        if sink.send(Message::Text(text)).await.is_err() {
            tracing::warn!("media-stream send failed, socket likely closed");
        }
    }
}

/// Reads frames until the `start` event arrives, closing the raw socket
/// (with the provider-facing reason) on any admission failure that
/// precedes knowing the call's `streamSid`.
async fn read_start_frame(
    sink: &mut SplitSink<WebSocket, Message>,
    stream: &mut SplitStream<WebSocket>,
) -> Option<voice_telephony::StartPayload> {
    loop {
        match stream.next().await {
            Some(Ok(Message::Text(text))) => match serde_json::from_str::<InboundFrame>(&text) {
                Ok(InboundFrame::Connected) => continue,
                Ok(InboundFrame::Start { start, .. }) => {
                    if start.call_sid.is_empty() {
                        close_raw(sink, 1008, "Missing callSid").await;
                        return None;
                    }
                    return Some(start);
                }
                Ok(_) => {
                    close_raw(sink, 1008, "Missing callSid").await;
                    return None;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "failed to parse media-stream frame");
                    close_raw(sink, 1008, "Missing callSid").await;
                    return None;
                }
            },
            Some(Ok(Message::Close(_))) | None => return None,
            Some(Ok(_)) => continue,
            Some(Err(e)) => {
                tracing::warn!(error = %e, "media-stream read error");
                return None;
            }
        }
    }
}

async fn close_raw(sink: &mut SplitSink<WebSocket, Message>, code: u16, reason: &str) {
    let _ = sink
        .send(Message::Close(Some(CloseFrame {
            code,
            reason: reason.to_string().into(),
        })))
        .await;
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sink, mut stream) = socket.split();

    let Some(start) = read_start_frame(&mut sink, &mut stream).await else {
        return;
    };

    let admitted = admit(&state, &start).await;
    let Some((agent, conversation, org_id)) = admitted else {
        close_raw(&mut sink, 1008, "Conversation not found").await;
        return;
    };

    if !agent.billing_disabled {
        let min_minutes = Decimal::from_str(&state.config.billing.ticker_deduct_minutes)
            .unwrap_or(Decimal::ONE);
        if !matches!(state.billing.has_credits(org_id, min_minutes).await, Ok(true)) {
            close_raw(&mut sink, 1008, "Insufficient balance").await;
            return;
        }
    }

    let transport = Arc::new(WsTransport {
        stream_sid: start.stream_sid.clone(),
        sink: AsyncMutex::new(sink),
    });

    let stt_api_key = std::env::var(&state.config.stt.api_key_env).unwrap_or_default();

    let call = Call::start(
        start.call_sid.clone(),
        conversation,
        agent,
        state.pool.clone(),
        state.sessions.clone(),
        state.billing.clone(),
        state.retriever.clone(),
        state.generator.clone(),
        transport,
        state.config.stt.clone(),
        stt_api_key,
        state.config.tts.clone(),
    );
    state.calls.insert(start.call_sid.clone(), call.clone());

    while let Some(msg) = stream.next().await {
        match msg {
            Ok(Message::Text(text)) => match serde_json::from_str::<InboundFrame>(&text) {
                Ok(InboundFrame::Media { media }) => {
                    match base64::engine::general_purpose::STANDARD.decode(&media.payload) {
                        Ok(bytes) => call.handle_audio(&bytes),
                        Err(e) => tracing::warn!(error = %e, "failed to decode media payload"),
                    }
                }
                Ok(InboundFrame::Stop) => break,
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "failed to parse media-stream frame"),
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(error = %e, "media-stream read error");
                break;
            }
        }
    }

    state.calls.remove(&start.call_sid);
    call.stop("normal").await;
}

/// Resolves the `start` frame's identifiers to real rows. `None` covers
/// every admission failure that reports as "Conversation not found":
/// malformed ids, an unknown agent, or a conversation/org mismatch.
async fn admit(
    state: &AppState,
    start: &voice_telephony::StartPayload,
) -> Option<(Agent, Conversation, Uuid)> {
    let agent_id = Uuid::parse_str(start.agent_id()?).ok()?;
    let conversation_id = Uuid::parse_str(start.conversation_id()?).ok()?;
    let org_id = Uuid::parse_str(start.org_id()?).ok()?;

    let agent: Agent = sqlx::query_as("SELECT * FROM agents WHERE id = $1 AND org_id = $2")
        .bind(agent_id)
        .bind(org_id)
        .fetch_optional(&state.pool)
        .await
        .ok()??;

    let conversation: Conversation =
        sqlx::query_as("SELECT * FROM conversations WHERE id = $1 AND org_id = $2")
            .bind(conversation_id)
            .bind(org_id)
            .fetch_optional(&state.pool)
            .await
            .ok()??;

    Some((agent, conversation, org_id))
}
