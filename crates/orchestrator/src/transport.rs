//! The media transport seam between a [`crate::call::Call`] and whatever
//! carries audio frames to the telephony provider. Kept separate from
//! `voice_telephony::frames` so the orchestrator never depends on a
//! specific wire format.

use async_trait::async_trait;

/// Sink for a single call's outbound media. One instance per call.
#[async_trait]
pub trait CallTransport: Send + Sync {
    /// Send a chunk of outbound audio (mu-law, 8kHz) to the caller.
    async fn send_media(&self, audio: &[u8]);

    /// Tell the telephony provider to flush/discard any buffered audio it
    /// hasn't played yet (barge-in).
    async fn send_clear(&self);

    /// Close the underlying connection with a reason, e.g. a WebSocket
    /// close frame carrying code 1008.
    async fn close(&self, code: u16, reason: &str);
}
