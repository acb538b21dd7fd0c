use std::collections::VecDeque;

use dashmap::DashMap;
use switchboard_core::{ConversationId, ConversationTurn};

pub const DEFAULT_MAX_TURNS: usize = 100;

const SUMMARY_TURNS: usize = 6;
const SUMMARY_CHARS_PER_TURN: usize = 280;

/// Bounded, per-conversation turn log.
///
/// Each conversation key is independent: appends and reads on different keys
/// never contend on the same entry. Turns are kept in arrival order and the
/// oldest turn is evicted once the cap is exceeded.
pub struct ConversationMemory {
    max_turns: usize,
    conversations: DashMap<ConversationId, VecDeque<ConversationTurn>>,
}

impl Default for ConversationMemory {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TURNS)
    }
}

impl ConversationMemory {
    pub fn new(max_turns: usize) -> Self {
        Self { max_turns: max_turns.max(1), conversations: DashMap::new() }
    }

    pub fn max_turns(&self) -> usize {
        self.max_turns
    }

    /// Appends a turn. A timestamp earlier than the previous turn's is raised
    /// to it so the log stays non-decreasing under clock skew.
    pub fn append(&self, conversation: &ConversationId, mut turn: ConversationTurn) {
        let mut turns = self.conversations.entry(conversation.clone()).or_default();
        if let Some(last) = turns.back() {
            if turn.timestamp < last.timestamp {
                turn.timestamp = last.timestamp;
            }
        }
        turns.push_back(turn);
        while turns.len() > self.max_turns {
            turns.pop_front();
        }
    }

    /// Up to `limit` most recent turns, oldest first.
    pub fn recent(&self, conversation: &ConversationId, limit: usize) -> Vec<ConversationTurn> {
        self.conversations
            .get(conversation)
            .map(|turns| {
                let skip = turns.len().saturating_sub(limit);
                turns.iter().skip(skip).cloned().collect()
            })
            .unwrap_or_default()
    }

    pub fn len(&self, conversation: &ConversationId) -> usize {
        self.conversations.get(conversation).map(|turns| turns.len()).unwrap_or(0)
    }

    pub fn is_empty(&self, conversation: &ConversationId) -> bool {
        self.len(conversation) == 0
    }

    /// Drops every turn of one conversation. Returns how many were removed.
    pub fn reset(&self, conversation: &ConversationId) -> usize {
        self.conversations.remove(conversation).map(|(_, turns)| turns.len()).unwrap_or(0)
    }

    /// Short plain-text rendering of the latest turns, used as context for
    /// the completion backend.
    pub fn context_summary(&self, conversation: &ConversationId) -> String {
        self.recent(conversation, SUMMARY_TURNS)
            .iter()
            .map(|turn| format!("{}: {}", turn.role.as_str(), clip(&turn.content)))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn clip(content: &str) -> String {
    let single_line = content.split_whitespace().collect::<Vec<_>>().join(" ");
    if single_line.chars().count() <= SUMMARY_CHARS_PER_TURN {
        return single_line;
    }
    let mut clipped: String = single_line.chars().take(SUMMARY_CHARS_PER_TURN).collect();
    clipped.push('…');
    clipped
}
