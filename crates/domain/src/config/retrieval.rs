use serde::{Deserialize, Serialize};

/// Hybrid keyword + vector retrieval tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Reciprocal Rank Fusion constant.
    #[serde(default = "d_rrf_k")]
    pub rrf_k: u32,
    /// Results returned per `retrieve()` call.
    #[serde(default = "d_limit")]
    pub limit: usize,
    /// Semantic-branch results with `1 - cosine_distance` at or below this
    /// floor are discarded before fusion.
    #[serde(default = "d_similarity_floor")]
    pub similarity_floor: f32,
    #[serde(default = "d_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            rrf_k: d_rrf_k(),
            limit: d_limit(),
            similarity_floor: d_similarity_floor(),
            timeout_ms: d_timeout_ms(),
        }
    }
}

fn d_rrf_k() -> u32 {
    60
}
fn d_limit() -> usize {
    3
}
fn d_similarity_floor() -> f32 {
    0.7
}
fn d_timeout_ms() -> u64 {
    3000
}
