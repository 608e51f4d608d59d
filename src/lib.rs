//! Bounded Chat
//!
//! A conversational query pipeline that:
//! - Splits long queries into whitespace-bounded chunks
//! - Answers each chunk in order through a pluggable answer generator
//! - Keeps a fixed window of recent turns per session
//! - Feeds a size-capped summary of that window back into every call
//! - Reports failed chunks without aborting the rest of the query
//!
//! FLOW:
//! QUERY → CHUNK → ANSWER (per chunk) → APPEND → TRIM → JOIN

pub mod answer;
pub mod api;
pub mod ats;
pub mod chunker;
pub mod config;
pub mod conversational;
pub mod error;
pub mod gemini;
pub mod memory;
pub mod session;

pub use error::{AnswerGenerationError, PipelineError, Result};

// Re-export common types
pub use answer::{AnswerGenerator, LanguageModel, LlmAnswerer, Retriever, ScriptedAnswerer};
pub use chunker::{QueryChunk, QueryChunker};
pub use config::AppConfig;
pub use conversational::{ChunkFailure, ConversationPipeline, QueryOutcome};
pub use memory::{ConversationTurn, HistoryConfig, HistoryManager, HistorySummary};
pub use session::{SessionLimits, SessionStore};
