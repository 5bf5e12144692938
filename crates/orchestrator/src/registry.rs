//! In-memory registry of in-flight calls: a thread-safe map keyed by the
//! provider's call-sid, used by admin listing endpoints and to guarantee
//! only one `Call` exists per telephony connection.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;

use crate::call::Call;

/// Summary info returned by `GET /v1/calls` and `/v1/calls/:call_id`.
#[derive(Debug, Clone, Serialize)]
pub struct CallInfo {
    pub call_id: String,
    pub agent_id: String,
    pub conversation_id: String,
    pub org_id: String,
    pub started_at: DateTime<Utc>,
}

#[derive(Default)]
pub struct CallRegistry {
    calls: RwLock<HashMap<String, Arc<Call>>>,
}

impl CallRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, call_id: String, call: Arc<Call>) {
        self.calls.write().insert(call_id, call);
    }

    pub fn remove(&self, call_id: &str) {
        self.calls.write().remove(call_id);
    }

    pub fn get(&self, call_id: &str) -> Option<Arc<Call>> {
        self.calls.read().get(call_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.calls.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn list(&self) -> Vec<CallInfo> {
        self.calls
            .read()
            .values()
            .map(|c| c.info())
            .collect()
    }

    pub fn info(&self, call_id: &str) -> Option<CallInfo> {
        self.calls.read().get(call_id).map(|c| c.info())
    }
}
