//! History summarization
//!
//! Flattens the windowed history into a single prompt-friendly string and caps
//! its size so the summary cannot bloat the answer model's input.

use crate::memory::store::ConversationTurn;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How an over-long summary is cut down
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryTruncation {
    /// Measure in words, then keep the trailing `keep_chars` characters.
    /// Mixed units are the historical behaviour and stay the default.
    #[default]
    LegacyTrailingChars,
    /// Measure in words, keep the trailing `word_cap` words.
    TrailingWords,
}

impl SummaryTruncation {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "legacy" | "chars" | "legacy_trailing_chars" => Some(Self::LegacyTrailingChars),
            "words" | "trailing_words" => Some(Self::TrailingWords),
            _ => None,
        }
    }
}

/// Limits applied to the summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryLimits {
    /// Word count above which the summary is truncated
    pub word_cap: usize,
    /// Trailing characters kept by the legacy policy
    pub keep_chars: usize,
    pub truncation: SummaryTruncation,
}

impl Default for SummaryLimits {
    fn default() -> Self {
        Self {
            word_cap: 200,
            keep_chars: 200,
            truncation: SummaryTruncation::LegacyTrailingChars,
        }
    }
}

/// Text passed to the answer function as conversational context
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HistorySummary(String);

impl HistorySummary {
    /// Build a summary from turns in order, applying `limits`
    pub fn from_turns<'a>(
        turns: impl IntoIterator<Item = &'a ConversationTurn>,
        limits: &SummaryLimits,
    ) -> Self {
        let text = turns
            .into_iter()
            .map(format_turn)
            .collect::<Vec<_>>()
            .join(" ");

        Self(truncate(text, limits))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for HistorySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for HistorySummary {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn format_turn(turn: &ConversationTurn) -> String {
    format!("User: {} | Bot: {}", turn.user_query(), turn.answer())
}

fn truncate(text: String, limits: &SummaryLimits) -> String {
    let word_count = text.split_whitespace().count();
    if word_count <= limits.word_cap {
        return text;
    }

    match limits.truncation {
        SummaryTruncation::LegacyTrailingChars => trailing_chars(&text, limits.keep_chars),
        SummaryTruncation::TrailingWords => {
            let words: Vec<&str> = text.split_whitespace().collect();
            words[words.len() - limits.word_cap..].join(" ")
        }
    }
}

/// Last `count` chars of `text`, cut on a char boundary
fn trailing_chars(text: &str, count: usize) -> String {
    let total = text.chars().count();
    if total <= count {
        return text.to_string();
    }

    match text.char_indices().nth(total - count) {
        Some((start, _)) => text[start..].to_string(),
        None => String::new(),
    }
}
