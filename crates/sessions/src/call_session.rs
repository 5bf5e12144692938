//! The short-lived call-state KV: stage,
//! sequence-id, interrupt-count, keyed by `call:<provider-call-id>`,
//! TTL'd an hour past last write.

use chrono::Utc;
use redis::AsyncCommands;
use voice_domain::call::Stage;
use voice_domain::error::{Error, Result};

const TTL_SECONDS: i64 = 60 * 60;

/// A snapshot of one call's session record.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub stage: Stage,
    pub sequence_id: i64,
    pub interrupt_count: i64,
    pub agent_id: String,
}

/// Redis-backed session store. Cheap to clone — wraps a
/// [`redis::aio::ConnectionManager`], which multiplexes and auto-reconnects
/// under the hood.
#[derive(Clone)]
pub struct CallSessionStore {
    conn: redis::aio::ConnectionManager,
}

impl CallSessionStore {
    pub async fn connect(redis_url: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| Error::Config(format!("invalid redis url: {e}")))?;
        let conn = client
            .get_connection_manager()
            .await
            .map_err(|e| Error::Database(format!("redis connect: {e}")))?;
        Ok(Self { conn })
    }

    fn key(call_id: &str) -> String {
        format!("call:{call_id}")
    }

    /// Initialize the record for a newly-started call. Stage starts at
    /// `Listening`.
    pub async fn init(&self, call_id: &str, agent_id: &str) -> Result<()> {
        let key = Self::key(call_id);
        let mut conn = self.conn.clone();
        let () = redis::pipe()
            .atomic()
            .hset(&key, "stage", Stage::Listening.as_str())
            .hset(&key, "sequence_id", 0i64)
            .hset(&key, "interrupt_count", 0i64)
            .hset(&key, "agent_id", agent_id)
            .hset(&key, "start_time", Utc::now().to_rfc3339())
            .expire(&key, TTL_SECONDS)
            .query_async(&mut conn)
            .await
            .map_err(|e| Error::Database(format!("session init: {e}")))?;
        Ok(())
    }

    /// Overwrite the stage field. Only the Orchestrator calls this.
    pub async fn set_stage(&self, call_id: &str, stage: Stage) -> Result<()> {
        let key = Self::key(call_id);
        let mut conn = self.conn.clone();
        let () = redis::pipe()
            .atomic()
            .hset(&key, "stage", stage.as_str())
            .expire(&key, TTL_SECONDS)
            .query_async(&mut conn)
            .await
            .map_err(|e| Error::Database(format!("session set_stage: {e}")))?;
        Ok(())
    }

    /// Atomically increment `interrupt_count` (barge-in) and return the new
    /// value.
    pub async fn incr_interrupt_count(&self, call_id: &str) -> Result<i64> {
        let key = Self::key(call_id);
        let mut conn = self.conn.clone();
        let new_value: i64 = conn
            .hincr(&key, "interrupt_count", 1i64)
            .await
            .map_err(|e| Error::Database(format!("session incr interrupt_count: {e}")))?;
        let _: std::result::Result<bool, redis::RedisError> =
            conn.expire(&key, TTL_SECONDS).await;
        Ok(new_value)
    }

    /// Atomically increment `sequence_id` (audio-frame counter) and return
    /// the new value.
    pub async fn incr_sequence(&self, call_id: &str) -> Result<i64> {
        let key = Self::key(call_id);
        let mut conn = self.conn.clone();
        let new_value: i64 = conn
            .hincr(&key, "sequence_id", 1i64)
            .await
            .map_err(|e| Error::Database(format!("session incr sequence_id: {e}")))?;
        let _: std::result::Result<bool, redis::RedisError> =
            conn.expire(&key, TTL_SECONDS).await;
        Ok(new_value)
    }

    pub async fn get(&self, call_id: &str) -> Result<Option<SessionRecord>> {
        let key = Self::key(call_id);
        let mut conn = self.conn.clone();
        let fields: std::collections::HashMap<String, String> = conn
            .hgetall(&key)
            .await
            .map_err(|e| Error::Database(format!("session get: {e}")))?;
        if fields.is_empty() {
            return Ok(None);
        }
        let stage = fields
            .get("stage")
            .and_then(|s| s.parse::<Stage>().ok())
            .unwrap_or(Stage::Listening);
        let sequence_id = fields
            .get("sequence_id")
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);
        let interrupt_count = fields
            .get("interrupt_count")
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);
        let agent_id = fields.get("agent_id").cloned().unwrap_or_default();
        Ok(Some(SessionRecord {
            stage,
            sequence_id,
            interrupt_count,
            agent_id,
        }))
    }

    /// Remove the record outright (idempotent teardown may call this).
    pub async fn delete(&self, call_id: &str) -> Result<()> {
        let key = Self::key(call_id);
        let mut conn = self.conn.clone();
        let _: i64 = conn
            .del(&key)
            .await
            .map_err(|e| Error::Database(format!("session delete: {e}")))?;
        Ok(())
    }
}
