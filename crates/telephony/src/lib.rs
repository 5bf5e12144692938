//! Telephony-facing pieces of the voice pipeline: the media-stream frame
//! wire format, the streaming STT client (with auto-reconnect), and the
//! cancellable TTS client.

pub mod frames;
pub mod stt;
pub mod tts;

pub use frames::{InboundFrame, OutboundFrame, StartPayload};
pub use stt::SttStreamClient;
pub use tts::{filler_audio, TtsStreamClient};
