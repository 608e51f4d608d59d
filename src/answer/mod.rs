//! Answer generator trait and implementations
//!
//! The pipeline treats answer generation as an opaque collaborator:
//! `(chunk, history_summary) -> answer`. Implementations may call a hosted
//! model, a retrieval chain, or return scripted replies.

use crate::error::AnswerGenerationError;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

pub mod llm;
pub use llm::{LanguageModel, LlmAnswerer, Retriever};

/// Produces an answer for one query chunk given the conversation so far
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    async fn answer(
        &self,
        query_chunk: &str,
        history_summary: &str,
    ) -> std::result::Result<String, AnswerGenerationError>;
}

/// Replays a fixed list of outcomes, then echoes the chunk.
/// Keeps the pipeline usable without a model behind it.
#[derive(Debug, Default)]
pub struct ScriptedAnswerer {
    script: Mutex<VecDeque<std::result::Result<String, AnswerGenerationError>>>,
}

impl ScriptedAnswerer {
    pub fn new(
        script: impl IntoIterator<Item = std::result::Result<String, AnswerGenerationError>>,
    ) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
        }
    }

    /// Answerer with an empty script that echoes every chunk
    pub fn echo() -> Self {
        Self::default()
    }

    fn next_scripted(&self) -> Option<std::result::Result<String, AnswerGenerationError>> {
        match self.script.lock() {
            Ok(mut script) => script.pop_front(),
            Err(poisoned) => poisoned.into_inner().pop_front(),
        }
    }
}

#[async_trait]
impl AnswerGenerator for ScriptedAnswerer {
    async fn answer(
        &self,
        query_chunk: &str,
        _history_summary: &str,
    ) -> std::result::Result<String, AnswerGenerationError> {
        self.next_scripted()
            .unwrap_or_else(|| Ok(format!("Echo: {}", query_chunk)))
    }
}
