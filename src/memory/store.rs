//! Conversation history storage
//!
//! Stores completed query/answer turns in insertion order, oldest first.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use uuid::Uuid;

/// One completed query/answer round. Fields are read-only once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    turn_id: Uuid,
    timestamp: DateTime<Utc>,
    user_query: String,
    answer: String,
}

impl ConversationTurn {
    /// Create a new turn
    pub fn new(user_query: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            turn_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            user_query: user_query.into(),
            answer: answer.into(),
        }
    }

    pub fn turn_id(&self) -> Uuid {
        self.turn_id
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn user_query(&self) -> &str {
        &self.user_query
    }

    pub fn answer(&self) -> &str {
        &self.answer
    }
}

/// Ordered turns for one session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationHistory {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// VecDeque so eviction from the front stays O(1)
    turns: VecDeque<ConversationTurn>,
}

impl ConversationHistory {
    /// Create an empty history
    pub fn new() -> Self {
        Self {
            created_at: Utc::now(),
            updated_at: Utc::now(),
            turns: VecDeque::new(),
        }
    }

    /// Add a turn to the end
    pub fn add_turn(&mut self, turn: ConversationTurn) {
        self.turns.push_back(turn);
        self.updated_at = Utc::now();
    }

    /// Iterate over all turns, oldest first
    pub fn turns(&self) -> impl DoubleEndedIterator<Item = &ConversationTurn> {
        self.turns.iter()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Drop oldest turns until at most `keep_count` remain.
    /// Returns the number of evicted turns.
    pub fn trim_to_recent(&mut self, keep_count: usize) -> usize {
        let mut evicted = 0;

        while self.turns.len() > keep_count {
            self.turns.pop_front();
            evicted += 1;
        }

        if evicted > 0 {
            self.updated_at = Utc::now();
        }

        evicted
    }

    /// Clear history
    pub fn clear(&mut self) {
        self.turns.clear();
        self.updated_at = Utc::now();
    }
}

impl Default for ConversationHistory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_creation() {
        let turn = ConversationTurn::new("How many rows?", "There are 120 rows.");
        assert_eq!(turn.user_query(), "How many rows?");
        assert_eq!(turn.answer(), "There are 120 rows.");
        assert!(turn.timestamp() <= Utc::now());
    }

    #[test]
    fn test_history_order() {
        let mut history = ConversationHistory::new();
        history.add_turn(ConversationTurn::new("q1", "a1"));
        history.add_turn(ConversationTurn::new("q2", "a2"));

        let queries: Vec<&str> = history.turns().map(|t| t.user_query()).collect();
        assert_eq!(queries, vec!["q1", "q2"]);
    }

    #[test]
    fn test_trim_to_recent() {
        let mut history = ConversationHistory::new();

        for i in 0..10 {
            history.add_turn(ConversationTurn::new(format!("Question {}", i), "ok"));
        }

        let evicted = history.trim_to_recent(4);
        assert_eq!(evicted, 6);
        assert_eq!(history.len(), 4);
        assert_eq!(history.turns().next().unwrap().user_query(), "Question 6");
    }

    #[test]
    fn test_trim_noop_and_clear() {
        let mut history = ConversationHistory::new();
        assert_eq!(history.trim_to_recent(3), 0);

        history.add_turn(ConversationTurn::new("q1", "a1"));
        history.add_turn(ConversationTurn::new("q2", "a2"));
        assert_eq!(history.trim_to_recent(3), 0);
        assert_eq!(history.len(), 2);

        history.clear();
        assert!(history.is_empty());
    }
}
