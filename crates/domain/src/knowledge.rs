use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One retrievable unit of knowledge-base content.
///
/// `embedding` and `content_tsv` are maintained alongside `content` at
/// write time (see `voice-retrieval`'s ingestion path); `content_tsv` is not
/// modeled here since it is a database-side generated column, never read
/// back into application code.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct KnowledgeChunk {
    pub id: Uuid,
    pub kb_id: Uuid,
    pub content: String,
    pub metadata: serde_json::Value,
}

/// A single fused retrieval hit, tagged with which sub-query surfaced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub chunk_id: Uuid,
    pub content: String,
    pub rrf_score: f64,
    pub origin: RetrievalOrigin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalOrigin {
    Keyword,
    Semantic,
    Both,
}
