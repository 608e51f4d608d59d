//! Conversational query pipeline
//!
//! Chunks a query, asks the answer generator about each chunk in order with
//! the current history summary, records successful turns and joins the answers.
//! A failing chunk is reported back and never aborts the rest of the batch.

use crate::answer::AnswerGenerator;
use crate::chunker::{QueryChunk, QueryChunker};
use crate::error::AnswerGenerationError;
use crate::memory::{ConversationTurn, HistoryManager};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// A chunk whose answer could not be produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkFailure {
    pub chunk: QueryChunk,
    pub error: AnswerGenerationError,
}

/// Serializable view of a chunk failure for API responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkFailureReport {
    pub index: usize,
    pub chunk: String,
    pub error: String,
}

impl From<&ChunkFailure> for ChunkFailureReport {
    fn from(failure: &ChunkFailure) -> Self {
        Self {
            index: failure.chunk.index,
            chunk: failure.chunk.text.clone(),
            error: failure.error.to_string(),
        }
    }
}

/// Result of processing one query
#[derive(Debug, Clone, Default)]
pub struct QueryOutcome {
    /// Answers of the successful chunks, space-joined in chunk order
    pub answer: String,
    pub chunk_count: usize,
    pub failures: Vec<ChunkFailure>,
}

impl QueryOutcome {
    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty()
    }

    pub fn answered_count(&self) -> usize {
        self.chunk_count - self.failures.len()
    }

    pub fn failure_reports(&self) -> Vec<ChunkFailureReport> {
        self.failures.iter().map(ChunkFailureReport::from).collect()
    }
}

/// Chunk-by-chunk answering over a session's history
#[derive(Clone)]
pub struct ConversationPipeline {
    chunker: QueryChunker,
    answerer: Arc<dyn AnswerGenerator>,
}

impl ConversationPipeline {
    pub fn new(chunker: QueryChunker, answerer: Arc<dyn AnswerGenerator>) -> Self {
        Self { chunker, answerer }
    }

    pub fn chunker(&self) -> &QueryChunker {
        &self.chunker
    }

    /// Process `query` against `history`.
    ///
    /// Chunks run strictly in order. The summary is rebuilt before every chunk,
    /// so later chunks see the turns recorded by earlier ones.
    pub async fn process_query(&self, query: &str, history: &mut HistoryManager) -> QueryOutcome {
        let chunks = self.chunker.chunk(query);
        let chunk_count = chunks.len();
        let mut answers = Vec::with_capacity(chunk_count);
        let mut failures = Vec::new();

        info!("Processing query as {} chunk(s)", chunk_count);

        for chunk in chunks {
            let summary = history.summarize();

            match self.answerer.answer(&chunk.text, summary.as_str()).await {
                Ok(answer) => {
                    history.append(ConversationTurn::new(chunk.text.clone(), answer.clone()));
                    answers.push(answer);
                }
                Err(error) => {
                    warn!(
                        "Answer generation failed for chunk {}/{}: {}",
                        chunk.index + 1,
                        chunk_count,
                        error
                    );
                    failures.push(ChunkFailure { chunk, error });
                }
            }
        }

        if !failures.is_empty() {
            info!(
                "Query finished with {} of {} chunk(s) failed",
                failures.len(),
                chunk_count
            );
        }

        QueryOutcome {
            answer: answers.join(" "),
            chunk_count,
            failures,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::answer::ScriptedAnswerer;
    use crate::memory::HistoryConfig;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Answers "A<n>" and records the summary it was given
    #[derive(Default)]
    struct CountingAnswerer {
        seen_summaries: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl AnswerGenerator for CountingAnswerer {
        async fn answer(
            &self,
            _query_chunk: &str,
            history_summary: &str,
        ) -> Result<String, AnswerGenerationError> {
            let mut seen = self.seen_summaries.lock().unwrap();
            seen.push(history_summary.to_string());
            Ok(format!("A{}", seen.len()))
        }
    }

    fn three_chunk_query() -> String {
        // chunk size 10 -> "aaaa bbbb", "cccc dddd", "eeee"
        "aaaa bbbb cccc dddd eeee".to_string()
    }

    #[tokio::test]
    async fn test_single_chunk_query() {
        let pipeline = ConversationPipeline::new(
            QueryChunker::default(),
            Arc::new(ScriptedAnswerer::new(vec![Ok("There are 12 columns.".to_string())])),
        );
        let mut history = HistoryManager::new();

        let outcome = pipeline.process_query("How many columns?", &mut history).await;

        assert_eq!(outcome.answer, "There are 12 columns.");
        assert_eq!(outcome.chunk_count, 1);
        assert!(!outcome.is_partial());
        assert_eq!(history.len(), 1);
        assert_eq!(history.turns()[0].user_query(), "How many columns?");
    }

    #[tokio::test]
    async fn test_failed_middle_chunk_is_skipped() {
        let pipeline = ConversationPipeline::new(
            QueryChunker::new(10).unwrap(),
            Arc::new(ScriptedAnswerer::new(vec![
                Ok("first".to_string()),
                Err(AnswerGenerationError::Remote("model offline".to_string())),
                Ok("third".to_string()),
            ])),
        );
        let mut history = HistoryManager::new();

        let outcome = pipeline.process_query(&three_chunk_query(), &mut history).await;

        assert_eq!(outcome.answer, "first third");
        assert_eq!(outcome.chunk_count, 3);
        assert_eq!(outcome.answered_count(), 2);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].chunk.index, 1);
        assert_eq!(outcome.failures[0].chunk.text, "cccc dddd");

        let queries: Vec<String> = history
            .turns()
            .iter()
            .map(|t| t.user_query().to_string())
            .collect();
        assert_eq!(queries, vec!["aaaa bbbb", "eeee"]);

        let reports = outcome.failure_reports();
        assert_eq!(reports[0].index, 1);
        assert!(reports[0].error.contains("model offline"));
    }

    #[tokio::test]
    async fn test_all_chunks_fail() {
        let pipeline = ConversationPipeline::new(
            QueryChunker::new(10).unwrap(),
            Arc::new(ScriptedAnswerer::new(vec![
                Err(AnswerGenerationError::Timeout("slow".to_string())),
                Err(AnswerGenerationError::Timeout("slow".to_string())),
                Err(AnswerGenerationError::Timeout("slow".to_string())),
            ])),
        );
        let mut history = HistoryManager::new();

        let outcome = pipeline.process_query(&three_chunk_query(), &mut history).await;

        assert_eq!(outcome.answer, "");
        assert_eq!(outcome.failures.len(), 3);
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn test_empty_query_makes_no_calls() {
        let answerer = Arc::new(CountingAnswerer::default());
        let pipeline = ConversationPipeline::new(QueryChunker::default(), answerer.clone());
        let mut history = HistoryManager::new();

        let outcome = pipeline.process_query("   ", &mut history).await;

        assert_eq!(outcome.answer, "");
        assert_eq!(outcome.chunk_count, 0);
        assert!(answerer.seen_summaries.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_each_chunk_sees_current_summary() {
        let answerer = Arc::new(CountingAnswerer::default());
        let pipeline = ConversationPipeline::new(QueryChunker::new(10).unwrap(), answerer.clone());
        let mut history = HistoryManager::new();

        let outcome = pipeline.process_query(&three_chunk_query(), &mut history).await;
        assert_eq!(outcome.answer, "A1 A2 A3");

        let seen = answerer.seen_summaries.lock().unwrap().clone();
        assert_eq!(seen[0], "");
        assert_eq!(seen[1], "User: aaaa bbbb | Bot: A1");
        assert_eq!(seen[2], "User: aaaa bbbb | Bot: A1 User: cccc dddd | Bot: A2");
    }

    #[tokio::test]
    async fn test_history_window_holds_across_queries() {
        let pipeline = ConversationPipeline::new(
            QueryChunker::new(10).unwrap(),
            Arc::new(ScriptedAnswerer::echo()),
        );
        let mut history = HistoryManager::with_config(HistoryConfig::default().with_window(3));

        pipeline.process_query(&three_chunk_query(), &mut history).await;
        pipeline.process_query("ffff gggg", &mut history).await;

        assert_eq!(history.len(), 3);
        assert_eq!(history.turns()[0].user_query(), "cccc dddd");
        assert_eq!(history.turns()[2].answer(), "Echo: ffff gggg");
    }
}
