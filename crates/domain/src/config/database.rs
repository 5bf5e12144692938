use serde::{Deserialize, Serialize};

/// Connection settings for the durable store (Organization, Agent,
/// Conversation, Message, Transaction, KnowledgeChunk) and the short-lived
/// call-state KV.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Env var holding the Postgres connection string.
    #[serde(default = "d_database_url_env")]
    pub url_env: String,
    #[serde(default = "d_pool_size")]
    pub max_connections: u32,
    /// Env var holding the Redis connection string (Session Store).
    #[serde(default = "d_redis_url_env")]
    pub redis_url_env: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url_env: d_database_url_env(),
            max_connections: d_pool_size(),
            redis_url_env: d_redis_url_env(),
        }
    }
}

fn d_database_url_env() -> String {
    "DATABASE_URL".into()
}
fn d_pool_size() -> u32 {
    10
}
fn d_redis_url_env() -> String {
    "REDIS_URL".into()
}
