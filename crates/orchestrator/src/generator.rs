//! Turn generation: prompt assembly, the tool loop, and the sentence
//! emitter. Modeled as a bounded channel of [`TurnEvent`]s closed on turn
//! completion.

use std::sync::Arc;

use rand::seq::SliceRandom;
use tokio::sync::mpsc;

use voice_domain::capability::ModelRole;
use voice_domain::tool::Message;
use voice_providers::router::LlmRouter;
use voice_providers::traits::ChatRequest;
use voice_tools::ToolRegistry;

use crate::sentence::split_sentences;

const RAG_HEADER: &str = "<<<RETRIEVED_CONTEXT>>>";
const RAG_FOOTER: &str = "<<<END_RETRIEVED_CONTEXT>>>";
const MAX_TOOL_ITERATIONS: usize = 5;
const FALLBACK_APOLOGY: &str = "I'm having trouble connecting right now.";

const FILLER_PHRASES: &[&str] = &[
    "Let me check on that for you.",
    "One moment while I look into that.",
    "Just a second, please.",
    "Give me a moment to check.",
];

/// One emission from an in-flight turn generation.
#[derive(Debug, Clone)]
pub enum TurnEvent {
    /// A tool call was picked and is about to execute; a `Filler` event
    /// follows immediately.
    ToolStarted { tool_name: String },
    /// A canned latency-covering phrase spoken while a tool call runs —
    /// synthesized and spoken like any other sentence, but not part of the
    /// turn's transcript (it's not something the model said).
    Filler(String),
    /// A sentence of the model's actual response, ready to synthesize and
    /// speak, and to be folded into the turn's persisted assistant message.
    Sentence(String),
}

/// Drives one turn's LLM generation, including the tool-calling loop.
pub struct LlmGenerator {
    router: Arc<LlmRouter>,
    tools: Arc<ToolRegistry>,
}

impl LlmGenerator {
    pub fn new(router: Arc<LlmRouter>, tools: Arc<ToolRegistry>) -> Self {
        Self { router, tools }
    }

    /// Start generating a turn. Returns immediately with a receiver; the
    /// generation itself runs in a spawned task and closes the channel
    /// when the turn is fully consumed (success, tool-loop exhaustion, or
    /// error — every path ends with the channel closing).
    pub fn generate(
        self: &Arc<Self>,
        system_prompt: String,
        rag_context: String,
        user_text: String,
        tool_names: Vec<String>,
    ) -> mpsc::Receiver<TurnEvent> {
        let (tx, rx) = mpsc::channel(16);
        let generator = self.clone();
        tokio::spawn(async move {
            generator
                .run(system_prompt, rag_context, user_text, tool_names, tx)
                .await;
        });
        rx
    }

    async fn run(
        &self,
        system_prompt: String,
        rag_context: String,
        user_text: String,
        tool_names: Vec<String>,
        tx: mpsc::Sender<TurnEvent>,
    ) {
        let tool_defs = self.tools.definitions_for(&tool_names);
        let mut messages = vec![
            Message::system(assemble_system_prompt(&system_prompt, &rag_context)),
            Message::user(user_text.clone()),
        ];

        for _ in 0..MAX_TOOL_ITERATIONS {
            let req = ChatRequest {
                messages: messages.clone(),
                tools: tool_defs.clone(),
                ..Default::default()
            };
            let resp = match self.router.chat_for_role(ModelRole::Executor, req).await {
                Ok(resp) => resp,
                Err(e) => {
                    tracing::error!(error = %e, "llm generation failed");
                    let _ = tx.send(TurnEvent::Sentence(FALLBACK_APOLOGY.to_string())).await;
                    return;
                }
            };

            let Some(call) = resp.tool_calls.first().cloned() else {
                for sentence in split_sentences(&resp.content) {
                    if tx.send(TurnEvent::Sentence(sentence)).await.is_err() {
                        return;
                    }
                }
                return;
            };

            if !self.tools.contains(&call.tool_name) {
                tracing::warn!(tool = %call.tool_name, "unknown tool requested by model, breaking loop");
                return;
            }

            if tx
                .send(TurnEvent::ToolStarted {
                    tool_name: call.tool_name.clone(),
                })
                .await
                .is_err()
            {
                return;
            }
            let filler = FILLER_PHRASES
                .choose(&mut rand::thread_rng())
                .copied()
                .unwrap_or(FILLER_PHRASES[0]);
            if tx.send(TurnEvent::Filler(filler.to_string())).await.is_err() {
                return;
            }

            let tool_result = self.tools.execute(&call.tool_name, call.arguments.clone()).await;
            let result_json = match tool_result {
                Ok(v) => v,
                Err(e) => serde_json::json!({ "error": e.to_string() }),
            };

            messages.push(Message::assistant(resp.content.clone()));
            messages.push(Message::tool_result(call.call_id.clone(), result_json.to_string()));
        }

        tracing::warn!("tool loop exceeded max iterations, falling back");
        let _ = tx.send(TurnEvent::Sentence(FALLBACK_APOLOGY.to_string())).await;
    }
}

fn assemble_system_prompt(system_prompt: &str, rag_context: &str) -> String {
    if rag_context.trim().is_empty() {
        system_prompt.to_string()
    } else {
        format!("{system_prompt}\n\n{RAG_HEADER}\n{rag_context}\n{RAG_FOOTER}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_without_context_is_unchanged() {
        assert_eq!(assemble_system_prompt("You are helpful.", ""), "You are helpful.");
    }

    #[test]
    fn prompt_with_context_is_delimited() {
        let prompt = assemble_system_prompt("You are helpful.", "30 day returns");
        assert!(prompt.contains(RAG_HEADER));
        assert!(prompt.contains(RAG_FOOTER));
        assert!(prompt.contains("30 day returns"));
    }
}
