use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Streaming speech-to-text
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SttConfig {
    /// Env var holding the STT provider API key.
    #[serde(default = "d_stt_key_env")]
    pub api_key_env: String,
    #[serde(default = "d_endpointing_ms")]
    pub endpointing_ms: u32,
    #[serde(default = "d_utterance_end_ms")]
    pub utterance_end_ms: u32,
    /// `base_delay_ms * (attempt_index + 1)`, capped at `max_attempts`.
    #[serde(default = "d_reconnect_base_ms")]
    pub reconnect_base_delay_ms: u64,
    #[serde(default = "d_max_attempts")]
    pub max_reconnect_attempts: u32,
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            api_key_env: d_stt_key_env(),
            endpointing_ms: d_endpointing_ms(),
            utterance_end_ms: d_utterance_end_ms(),
            reconnect_base_delay_ms: d_reconnect_base_ms(),
            max_reconnect_attempts: d_max_attempts(),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Streaming text-to-speech
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtsConfig {
    /// Env var holding the default TTS provider API key.
    #[serde(default = "d_tts_key_env")]
    pub api_key_env: String,
    /// Env var holding the alternate (`el_`-prefixed voice-id) TTS provider key.
    #[serde(default = "d_tts_alt_key_env")]
    pub alt_api_key_env: String,
    /// Voice-id prefix that routes to the alternate provider.
    #[serde(default = "d_alt_prefix")]
    pub alt_voice_prefix: String,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            api_key_env: d_tts_key_env(),
            alt_api_key_env: d_tts_alt_key_env(),
            alt_voice_prefix: d_alt_prefix(),
        }
    }
}

fn d_stt_key_env() -> String {
    "STT_API_KEY".into()
}
fn d_endpointing_ms() -> u32 {
    300
}
fn d_utterance_end_ms() -> u32 {
    1000
}
fn d_reconnect_base_ms() -> u64 {
    1000
}
fn d_max_attempts() -> u32 {
    3
}
fn d_tts_key_env() -> String {
    "TTS_API_KEY".into()
}
fn d_tts_alt_key_env() -> String {
    "TTS_ALT_API_KEY".into()
}
fn d_alt_prefix() -> String {
    "el_".into()
}
