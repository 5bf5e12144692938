//! Hybrid retrieval against a knowledge base: parallel keyword + semantic
//! sub-queries, fused with RRF, assembled into a context string.

use std::sync::Arc;
use std::time::Instant;

use pgvector::Vector;
use sqlx::PgPool;
use uuid::Uuid;

use voice_domain::config::RetrievalConfig;
use voice_domain::error::{Error, Result};
use voice_domain::trace::TraceEvent;
use voice_providers::registry::ProviderRegistry;
use voice_providers::traits::EmbeddingsRequest;

use crate::fusion::{fuse_rrf, RankedDoc};
use crate::identifier::looks_like_specific_identifier;

/// Fuses keyword full-text search with pgvector cosine similarity over
/// `knowledge_chunks`, scoped to a single knowledge base.
pub struct HybridRetriever {
    pool: PgPool,
    providers: Arc<ProviderRegistry>,
    config: RetrievalConfig,
}

impl HybridRetriever {
    pub fn new(pool: PgPool, providers: Arc<ProviderRegistry>, config: RetrievalConfig) -> Self {
        Self {
            pool,
            providers,
            config,
        }
    }

    /// Retrieve and concatenate the top `limit` (default from config) chunks
    /// relevant to `query` within `kb_id`. Returns the empty string when
    /// `kb_id` is `None`, `query` is empty, or retrieval fails for any reason
    /// (failure is swallowed — callers treat it as "no context").
    pub async fn retrieve(
        &self,
        call_id: &str,
        query: &str,
        kb_id: Option<Uuid>,
        limit: Option<usize>,
    ) -> String {
        let Some(kb_id) = kb_id else {
            return String::new();
        };
        if query.trim().is_empty() {
            return String::new();
        }
        match self.try_retrieve(call_id, query, kb_id, limit).await {
            Ok(chunks) => chunks,
            Err(e) => {
                tracing::warn!(kb_id = %kb_id, error = %e, "retrieval failed, continuing with empty context");
                String::new()
            }
        }
    }

    async fn try_retrieve(
        &self,
        call_id: &str,
        query: &str,
        kb_id: Uuid,
        limit: Option<usize>,
    ) -> Result<String> {
        let start = Instant::now();
        let limit = limit.unwrap_or(self.config.limit);
        let fetch_limit = (limit * 2) as i64;

        let specific = looks_like_specific_identifier(query);
        tracing::debug!(kb_id = %kb_id, specific, "query-aware selection (advisory)");

        let (keyword, semantic) = tokio::join!(
            self.keyword_search(query, kb_id, fetch_limit),
            self.semantic_search(query, kb_id, fetch_limit),
        );
        let keyword = keyword.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "keyword search failed");
            Vec::new()
        });
        let semantic = semantic.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "semantic search failed");
            Vec::new()
        });

        let fused = fuse_rrf(&keyword, &semantic, self.config.rrf_k, limit);

        TraceEvent::RetrievalCompleted {
            call_id: call_id.to_string(),
            kb_id: kb_id.to_string(),
            keyword_hits: keyword.len(),
            semantic_hits: semantic.len(),
            fused_hits: fused.len(),
            duration_ms: start.elapsed().as_millis() as u64,
        }
        .emit();

        let context = fused
            .iter()
            .map(|c| c.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        Ok(context)
    }

    /// Full-text rank search, ordered by relevance descending, all bound
    /// values (never string-interpolated).
    async fn keyword_search(&self, query: &str, kb_id: Uuid, limit: i64) -> Result<Vec<RankedDoc>> {
        let rows: Vec<(Uuid, String)> = sqlx::query_as(
            r#"
            SELECT id, content
            FROM knowledge_chunks
            WHERE kb_id = $1 AND content_tsv @@ plainto_tsquery('english', $2)
            ORDER BY ts_rank_cd(content_tsv, plainto_tsquery('english', $2)) DESC
            LIMIT $3
            "#,
        )
        .bind(kb_id)
        .bind(query)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

        Ok(rows
            .into_iter()
            .enumerate()
            .map(|(i, (chunk_id, content))| RankedDoc {
                chunk_id,
                content,
                rank: i + 1,
            })
            .collect())
    }

    /// Cosine-distance nearest-neighbor search, ordered ascending by
    /// distance. Results at or below `similarity_floor` are discarded
    /// before ranking (deliberate tightening over a naive 0.3 threshold).
    async fn semantic_search(&self, query: &str, kb_id: Uuid, limit: i64) -> Result<Vec<RankedDoc>> {
        let provider = self.providers.for_role("embedder").ok_or_else(|| {
            Error::Config("no provider assigned to the 'embedder' role".into())
        })?;
        let resp = provider
            .embeddings(EmbeddingsRequest {
                input: vec![query.to_string()],
                model: None,
            })
            .await?;
        let embedding = resp
            .embeddings
            .into_iter()
            .next()
            .ok_or_else(|| Error::Provider {
                provider: provider.provider_id().to_string(),
                message: "embeddings response was empty".into(),
            })?;
        let vector = Vector::from(embedding);

        let rows: Vec<(Uuid, String, f32)> = sqlx::query_as(
            r#"
            SELECT id, content, 1.0 - (embedding <=> $1) AS similarity
            FROM knowledge_chunks
            WHERE kb_id = $2
            ORDER BY embedding <=> $1
            LIMIT $3
            "#,
        )
        .bind(vector)
        .bind(kb_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

        Ok(rows
            .into_iter()
            .filter(|(_, _, similarity)| *similarity > self.config.similarity_floor)
            .enumerate()
            .map(|(i, (chunk_id, content, _))| RankedDoc {
                chunk_id,
                content,
                rank: i + 1,
            })
            .collect())
    }
}
