use serde::{Deserialize, Serialize};

/// Telephony provider credentials and media-stream endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelephonyConfig {
    /// Env var holding the telephony account auth token, used to validate
    /// webhook signatures and to authenticate the media-stream upgrade.
    #[serde(default = "d_auth_token_env")]
    pub auth_token_env: String,
    /// Public base URL the voice webhook uses to point the provider at
    /// `/media-stream` (e.g. "wss://voice.example.com").
    #[serde(default)]
    pub media_stream_base_url: Option<String>,
}

impl Default for TelephonyConfig {
    fn default() -> Self {
        Self {
            auth_token_env: d_auth_token_env(),
            media_stream_base_url: None,
        }
    }
}

fn d_auth_token_env() -> String {
    "TELEPHONY_AUTH_TOKEN".into()
}
