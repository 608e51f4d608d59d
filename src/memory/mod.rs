//! Conversation Memory
//!
//! Bounded per-session history of query/answer turns and the summary that is
//! fed back to the answer model on every chunk

pub mod store;
pub mod summarizer;
pub mod context_manager;

pub use store::{ConversationHistory, ConversationTurn};
pub use summarizer::{HistorySummary, SummaryLimits, SummaryTruncation};
pub use context_manager::{HistoryConfig, HistoryManager, DEFAULT_HISTORY_WINDOW};
