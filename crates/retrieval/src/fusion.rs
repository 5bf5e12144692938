//! Reciprocal Rank Fusion.

use std::collections::HashMap;
use uuid::Uuid;
use voice_domain::knowledge::{RetrievalOrigin, RetrievedChunk};

/// One document surfaced by a single sub-query, at its 1-based rank.
#[derive(Debug, Clone)]
pub struct RankedDoc {
    pub chunk_id: Uuid,
    pub content: String,
    pub rank: usize,
}

/// Fuse keyword and semantic result lists via Reciprocal Rank Fusion.
///
/// For each document appearing in either list at rank `r` (1-based),
/// contribute `1 / (k + r)`; contributions from both lists are summed.
/// The merged set is sorted by descending score and truncated to `limit`.
pub fn fuse_rrf(
    keyword: &[RankedDoc],
    semantic: &[RankedDoc],
    k: u32,
    limit: usize,
) -> Vec<RetrievedChunk> {
    let mut scores: HashMap<Uuid, (f64, String, bool, bool)> = HashMap::new();

    for doc in keyword {
        let entry = scores
            .entry(doc.chunk_id)
            .or_insert((0.0, doc.content.clone(), false, false));
        entry.0 += 1.0 / (k as f64 + doc.rank as f64);
        entry.2 = true;
    }
    for doc in semantic {
        let entry = scores
            .entry(doc.chunk_id)
            .or_insert((0.0, doc.content.clone(), false, false));
        entry.0 += 1.0 / (k as f64 + doc.rank as f64);
        entry.3 = true;
    }

    let mut fused: Vec<RetrievedChunk> = scores
        .into_iter()
        .map(|(chunk_id, (score, content, from_keyword, from_semantic))| {
            let origin = match (from_keyword, from_semantic) {
                (true, true) => RetrievalOrigin::Both,
                (true, false) => RetrievalOrigin::Keyword,
                (false, true) => RetrievalOrigin::Semantic,
                (false, false) => unreachable!("every entry originates from at least one list"),
            };
            RetrievedChunk {
                chunk_id,
                content,
                rrf_score: score,
                origin,
            }
        })
        .collect();

    fused.sort_by(|a, b| {
        b.rrf_score
            .partial_cmp(&a.rrf_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    fused.truncate(limit);
    fused
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: Uuid, rank: usize) -> RankedDoc {
        RankedDoc {
            chunk_id: id,
            content: "content".into(),
            rank,
        }
    }

    #[test]
    fn identical_lists_double_the_score() {
        let id = Uuid::new_v4();
        let keyword = vec![doc(id, 1)];
        let semantic = vec![doc(id, 1)];
        let fused = fuse_rrf(&keyword, &semantic, 60, 10);
        assert_eq!(fused.len(), 1);
        assert!((fused[0].rrf_score - 2.0 / 61.0).abs() < 1e-9);
        assert_eq!(fused[0].origin, RetrievalOrigin::Both);
    }

    #[test]
    fn disjoint_lists_rank_one_outranks_rank_three() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let keyword = vec![doc(a, 1)];
        let semantic = vec![doc(b, 3)];
        let fused = fuse_rrf(&keyword, &semantic, 60, 10);
        assert_eq!(fused[0].chunk_id, a);
        assert_eq!(fused[1].chunk_id, b);
    }

    #[test]
    fn truncates_to_limit() {
        let docs: Vec<RankedDoc> = (0..10).map(|i| doc(Uuid::new_v4(), i + 1)).collect();
        let fused = fuse_rrf(&docs, &[], 60, 3);
        assert_eq!(fused.len(), 3);
    }

    #[test]
    fn empty_inputs_yield_empty_output() {
        let fused = fuse_rrf(&[], &[], 60, 3);
        assert!(fused.is_empty());
    }
}
