//! Declarative tool registry: a static name → `{schema, implementation}`
//! mapping with a uniform dispatch entry point.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use voice_domain::error::{Error, Result};
use voice_domain::tool::ToolDefinition;

/// One callable tool: its JSON-schema contract plus its async implementation.
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    fn definition(&self) -> ToolDefinition;
    async fn execute(&self, args: Value) -> Result<Value>;
}

/// Holds every built-in tool, keyed by name. Immutable after construction —
/// built once at startup and shared behind an `Arc`.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new(tools: Vec<Arc<dyn Tool>>) -> Self {
        let tools = tools
            .into_iter()
            .map(|t| (t.definition().name.clone(), t))
            .collect();
        Self { tools }
    }

    /// Uniform dispatch: `execute(toolName, argsJson) -> resultJson`.
    /// Unknown tool names surface as [`Error::ToolNotFound`], which the
    /// LLM tool loop treats as "unknown tool, break the loop".
    pub async fn execute(&self, name: &str, args: Value) -> Result<Value> {
        match self.tools.get(name) {
            Some(tool) => tool.execute(args).await,
            None => Err(Error::ToolNotFound(name.to_string())),
        }
    }

    /// Definitions for the subset of registered tools named in
    /// `enabled_names` (an agent's `tool_names`), in the order they were
    /// registered.
    pub fn definitions_for(&self, enabled_names: &[String]) -> Vec<ToolDefinition> {
        let wanted: std::collections::HashSet<&str> =
            enabled_names.iter().map(|s| s.as_str()).collect();
        self.tools
            .values()
            .filter(|t| wanted.contains(t.definition().name.as_str()))
            .map(|t| t.definition())
            .collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }
}
