//! Bounded history management
//!
//! Keeps a session's history inside a fixed window of turns and produces the
//! summary handed to the answer model.

use crate::memory::store::{ConversationHistory, ConversationTurn};
use crate::memory::summarizer::{HistorySummary, SummaryLimits};
use tracing::debug;

/// Default number of retained turns
pub const DEFAULT_HISTORY_WINDOW: usize = 3;

/// Configuration for history management
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryConfig {
    /// Maximum number of turns kept after each append
    pub window: usize,
    pub summary: SummaryLimits,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            window: DEFAULT_HISTORY_WINDOW,
            summary: SummaryLimits::default(),
        }
    }
}

impl HistoryConfig {
    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window;
        self
    }

    pub fn with_summary(mut self, summary: SummaryLimits) -> Self {
        self.summary = summary;
        self
    }
}

/// Owns one session's history; created at session start, dropped at session end
#[derive(Debug, Clone)]
pub struct HistoryManager {
    config: HistoryConfig,
    history: ConversationHistory,
}

impl HistoryManager {
    pub fn new() -> Self {
        Self::with_config(HistoryConfig::default())
    }

    pub fn with_config(config: HistoryConfig) -> Self {
        Self {
            config,
            history: ConversationHistory::new(),
        }
    }

    /// Append a turn, evicting the oldest turns beyond the window
    pub fn append(&mut self, turn: ConversationTurn) {
        self.history.add_turn(turn);

        let evicted = self.history.trim_to_recent(self.config.window);
        if evicted > 0 {
            debug!(
                "Evicted {} turn(s) to keep history window at {}",
                evicted, self.config.window
            );
        }
    }

    /// Summary of the current (already windowed) history
    pub fn summarize(&self) -> HistorySummary {
        HistorySummary::from_turns(self.history.turns(), &self.config.summary)
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    pub fn turns(&self) -> Vec<ConversationTurn> {
        self.history.turns().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn clear(&mut self) {
        self.history.clear();
    }

    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new()
    }
}
