//! Wire format for the bidirectional media-stream WebSocket (`/media-stream`).
//!
//! Each inbound frame is a JSON object tagged by its `event` field; each
//! outbound frame the orchestrator emits follows the same shape.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One frame received from the telephony media-stream transport.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum InboundFrame {
    Connected,
    Start {
        #[serde(rename = "start")]
        start: StartPayload,
        #[serde(rename = "streamSid")]
        stream_sid: Option<String>,
    },
    Media {
        media: MediaPayload,
    },
    Stop,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StartPayload {
    #[serde(rename = "callSid")]
    pub call_sid: String,
    #[serde(rename = "streamSid")]
    pub stream_sid: String,
    #[serde(rename = "customParameters", default)]
    pub custom_parameters: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaPayload {
    /// Base64-encoded μ-law 8 kHz audio.
    pub payload: String,
}

/// One frame the orchestrator emits back onto the transport.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum OutboundFrame {
    Media {
        #[serde(rename = "streamSid")]
        stream_sid: String,
        media: OutboundMedia,
    },
    Clear {
        #[serde(rename = "streamSid")]
        stream_sid: String,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct OutboundMedia {
    pub payload: String,
}

impl OutboundFrame {
    pub fn media(stream_sid: impl Into<String>, pcmu_bytes: &[u8]) -> Self {
        use base64::Engine;
        OutboundFrame::Media {
            stream_sid: stream_sid.into(),
            media: OutboundMedia {
                payload: base64::engine::general_purpose::STANDARD.encode(pcmu_bytes),
            },
        }
    }

    pub fn clear(stream_sid: impl Into<String>) -> Self {
        OutboundFrame::Clear {
            stream_sid: stream_sid.into(),
        }
    }
}

impl StartPayload {
    pub fn agent_id(&self) -> Option<&str> {
        self.custom_parameters.get("agentId").map(|s| s.as_str())
    }
    pub fn conversation_id(&self) -> Option<&str> {
        self.custom_parameters
            .get("conversationId")
            .map(|s| s.as_str())
    }
    pub fn org_id(&self) -> Option<&str> {
        self.custom_parameters.get("orgId").map(|s| s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_start_frame() {
        let raw = r#"{"event":"start","streamSid":"SS1","start":{"callSid":"CS1","streamSid":"SS1","customParameters":{"agentId":"A1","conversationId":"C1","orgId":"O1"}}}"#;
        let frame: InboundFrame = serde_json::from_str(raw).unwrap();
        match frame {
            InboundFrame::Start { start, .. } => {
                assert_eq!(start.call_sid, "CS1");
                assert_eq!(start.agent_id(), Some("A1"));
                assert_eq!(start.org_id(), Some("O1"));
            }
            _ => panic!("expected Start"),
        }
    }

    #[test]
    fn parses_media_frame() {
        let raw = r#"{"event":"media","media":{"payload":"AAA="}}"#;
        let frame: InboundFrame = serde_json::from_str(raw).unwrap();
        assert!(matches!(frame, InboundFrame::Media { .. }));
    }

    #[test]
    fn serializes_clear_frame() {
        let frame = OutboundFrame::clear("SS1");
        let json = serde_json::to_string(&frame).unwrap();
        assert!(json.contains("\"event\":\"clear\""));
        assert!(json.contains("SS1"));
    }
}
