//! Hybrid (keyword + vector) knowledge-base retrieval.
//!
//! Two sub-queries run in parallel against a knowledge base: a full-text
//! keyword search and a cosine-similarity nearest-neighbor search. Results
//! are fused with Reciprocal Rank Fusion (RRF) and assembled into a single
//! context string for prompt injection.

pub mod fusion;
pub mod identifier;
pub mod retriever;

pub use fusion::{fuse_rrf, RankedDoc};
pub use identifier::looks_like_specific_identifier;
pub use retriever::HybridRetriever;
