//! Cancellable text-to-speech client with provider routing by voice-id
//! prefix, and the process-scoped filler-audio cache.

use std::sync::OnceLock;

use futures_util::StreamExt;
use parking_lot::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;

use voice_domain::config::TtsConfig;
use voice_domain::error::{Error, Result};

const DEFAULT_TTS_BASE_URL: &str = "https://api.openai.com/v1/audio/speech";
const ALT_TTS_BASE_URL: &str = "https://api.elevenlabs.io/v1/text-to-speech";

/// The phrase pre-generated at startup to cover the latency of the very
/// first turn.
pub const FILLER_PHRASE: &str = "One moment please.";

/// One TTS client instance, bound to a single voice-id for its lifetime
/// (a call owns exactly one). Each [`generate_audio`](Self::generate_audio)
/// call creates a fresh cancellation token so `abort()` only ever cancels
/// the in-flight request, never a future one.
pub struct TtsStreamClient {
    voice_id: String,
    config: TtsConfig,
    http: reqwest::Client,
    cancel: Mutex<Option<CancellationToken>>,
}

impl TtsStreamClient {
    pub fn new(voice_id: impl Into<String>, config: TtsConfig) -> Self {
        Self {
            voice_id: voice_id.into(),
            config,
            http: reqwest::Client::new(),
            cancel: Mutex::new(None),
        }
    }

    /// Synthesize `text`. Returns `Ok(None)` if [`abort`](Self::abort) was
    /// called before the generation completed — never an error in that
    /// case. The cancellation token is cleared once this call returns, by
    /// any path, so the next call always starts fresh.
    pub async fn generate_audio(&self, text: &str) -> Result<Option<Vec<u8>>> {
        let token = CancellationToken::new();
        *self.cancel.lock() = Some(token.clone());

        let result = self.stream_generate(text, token).await;
        self.cancel.lock().take();
        result
    }

    /// Cancel the in-flight generation, if any. The corresponding
    /// `generate_audio` call returns `Ok(None)` cleanly.
    pub async fn abort(&self) {
        if let Some(token) = self.cancel.lock().clone() {
            token.cancel();
        }
    }

    fn resolve_provider(&self) -> Result<(&'static str, String, String)> {
        if let Some(stripped) = self.voice_id.strip_prefix(&self.config.alt_voice_prefix) {
            let key = std::env::var(&self.config.alt_api_key_env)
                .map_err(|_| Error::Auth(format!("{} not set", self.config.alt_api_key_env)))?;
            Ok((ALT_TTS_BASE_URL, key, stripped.to_string()))
        } else {
            let key = std::env::var(&self.config.api_key_env)
                .map_err(|_| Error::Auth(format!("{} not set", self.config.api_key_env)))?;
            Ok((DEFAULT_TTS_BASE_URL, key, self.voice_id.clone()))
        }
    }

    async fn stream_generate(&self, text: &str, token: CancellationToken) -> Result<Option<Vec<u8>>> {
        let (base_url, api_key, voice) = self.resolve_provider()?;

        let resp = self
            .http
            .post(base_url)
            .bearer_auth(&api_key)
            .json(&serde_json::json!({
                "voice": voice,
                "input": text,
                "response_format": "mulaw_8000",
            }))
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(Error::Provider {
                provider: "tts".into(),
                message: format!("status {}", resp.status()),
            });
        }

        let mut stream = resp.bytes_stream();
        let mut buf = Vec::new();
        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => return Ok(None),
                chunk = stream.next() => {
                    match chunk {
                        Some(Ok(bytes)) => buf.extend_from_slice(&bytes),
                        Some(Err(e)) => return Err(Error::Http(e.to_string())),
                        None => break,
                    }
                }
            }
        }
        Ok(Some(buf))
    }
}

// ── Process-scoped filler-audio cache ─────────────────────────────────
//
// Populated once at startup by `preload_filler`; the accessor returns
// `None` until then and callers must tolerate that.

fn filler_cell() -> &'static RwLock<Option<Vec<u8>>> {
    static CELL: OnceLock<RwLock<Option<Vec<u8>>>> = OnceLock::new();
    CELL.get_or_init(|| RwLock::new(None))
}

/// Generate and cache the fixed filler phrase under the given default
/// voice-id. Failure is logged and leaves the cache empty; callers still
/// using `filler_audio()` will just get `None` and skip the filler.
pub async fn preload_filler(default_voice_id: &str, config: TtsConfig) {
    let client = TtsStreamClient::new(default_voice_id, config);
    match client.generate_audio(FILLER_PHRASE).await {
        Ok(Some(audio)) => {
            *filler_cell().write() = Some(audio);
            tracing::info!("filler audio preloaded");
        }
        Ok(None) => tracing::warn!("filler preload was cancelled unexpectedly"),
        Err(e) => tracing::warn!(error = %e, "filler preload failed"),
    }
}

/// The cached filler audio, or `None` if not yet populated.
pub fn filler_audio() -> Option<Vec<u8>> {
    filler_cell().read().clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alt_prefix_strips_and_routes() {
        let client = TtsStreamClient::new("el_rachel", TtsConfig::default());
        std::env::set_var(&client.config.alt_api_key_env, "test-key");
        let (base, _key, voice) = client.resolve_provider().unwrap();
        assert_eq!(base, ALT_TTS_BASE_URL);
        assert_eq!(voice, "rachel");
    }

    #[test]
    fn default_voice_routes_to_default_provider() {
        let client = TtsStreamClient::new("aria", TtsConfig::default());
        std::env::set_var(&client.config.api_key_env, "test-key");
        let (base, _key, voice) = client.resolve_provider().unwrap();
        assert_eq!(base, DEFAULT_TTS_BASE_URL);
        assert_eq!(voice, "aria");
    }

    #[test]
    fn filler_cache_starts_empty() {
        // Only valid if no prior test in this process populated it; the
        // cache is process-global by design.
        if filler_audio().is_none() {
            assert!(filler_audio().is_none());
        }
    }
}
