//! LLM-backed answer generation
//!
//! Combines optional retrieved context, the history summary and the query chunk
//! into one prompt and sends it to a [`LanguageModel`].

use crate::answer::AnswerGenerator;
use crate::error::AnswerGenerationError;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

/// Prompt in, text out
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn generate(&self, prompt: &str) -> crate::Result<String>;
}

/// Source of context documents for a query (e.g. a vector index over CSV rows)
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn retrieve(&self, query: &str, limit: usize) -> crate::Result<Vec<String>>;
}

const DEFAULT_CONTEXT_DOCUMENTS: usize = 4;

const INSTRUCTIONS: &str = "Use the following pieces of context and the chat history to answer \
the question at the end. If you don't know the answer, just say that you don't know, \
don't try to make up an answer.";

/// [`AnswerGenerator`] over any language model, with optional retrieval
pub struct LlmAnswerer {
    model: Arc<dyn LanguageModel>,
    retriever: Option<Arc<dyn Retriever>>,
    context_documents: usize,
}

impl LlmAnswerer {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self {
            model,
            retriever: None,
            context_documents: DEFAULT_CONTEXT_DOCUMENTS,
        }
    }

    pub fn with_retriever(mut self, retriever: Arc<dyn Retriever>) -> Self {
        self.retriever = Some(retriever);
        self
    }

    pub fn with_context_documents(mut self, count: usize) -> Self {
        self.context_documents = count;
        self
    }

    async fn context_for(&self, query_chunk: &str) -> Result<Vec<String>, AnswerGenerationError> {
        let Some(retriever) = &self.retriever else {
            return Ok(Vec::new());
        };

        retriever
            .retrieve(query_chunk, self.context_documents)
            .await
            .map_err(|e| {
                warn!("Context retrieval failed: {}", e);
                AnswerGenerationError::from(e)
            })
    }
}

#[async_trait]
impl AnswerGenerator for LlmAnswerer {
    async fn answer(
        &self,
        query_chunk: &str,
        history_summary: &str,
    ) -> Result<String, AnswerGenerationError> {
        let documents = self.context_for(query_chunk).await?;
        let prompt = build_prompt(&documents, history_summary, query_chunk);
        debug!(
            "Answer prompt built ({} context docs, {} chars)",
            documents.len(),
            prompt.len()
        );

        let answer = self.model.generate(&prompt).await?;
        let answer = answer.trim();

        if answer.is_empty() {
            return Err(AnswerGenerationError::MalformedOutput(
                "model returned an empty answer".to_string(),
            ));
        }

        Ok(answer.to_string())
    }
}

fn build_prompt(documents: &[String], history_summary: &str, question: &str) -> String {
    let mut prompt = String::from(INSTRUCTIONS);
    prompt.push_str("\n\n");

    if !documents.is_empty() {
        prompt.push_str("Context:\n");
        prompt.push_str(&documents.join("\n\n"));
        prompt.push_str("\n\n");
    }

    if !history_summary.is_empty() {
        prompt.push_str("Chat history: ");
        prompt.push_str(history_summary);
        prompt.push_str("\n\n");
    }

    prompt.push_str("Question: ");
    prompt.push_str(question);
    prompt.push_str("\nHelpful answer:");
    prompt
}
