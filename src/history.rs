//! Per-user conversation history, capped at the most recent turns.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;

pub const DEFAULT_HISTORY_LIMIT: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversationTurn {
    pub user_text: String,
    pub bot_text: String,
    pub timestamp: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn new(user_text: impl Into<String>, bot_text: impl Into<String>) -> Self {
        Self {
            user_text: user_text.into(),
            bot_text: bot_text.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Per-user turn log the engine reads context from.
///
/// Implementations own retention. The engine only appends and reads the
/// most recent turns.
pub trait ConversationHistory: Send + Sync {
    fn append(&self, user_id: &str, turn: ConversationTurn);

    /// Up to `n` most recent turns, oldest first.
    fn last_n(&self, user_id: &str, n: usize) -> Vec<ConversationTurn>;
}

/// Process-local history bounded to the most recent `limit` turns per user.
///
/// The map shards its locks and each user has their own mutex, so turns for
/// different users never wait on each other.
#[derive(Debug)]
pub struct InMemoryHistory {
    limit: usize,
    sessions: DashMap<String, Arc<Mutex<VecDeque<ConversationTurn>>>>,
}

impl InMemoryHistory {
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
            sessions: DashMap::new(),
        }
    }

    pub fn len(&self, user_id: &str) -> usize {
        self.sessions
            .get(user_id)
            .map(|session| session.lock().len())
            .unwrap_or(0)
    }

    pub fn users(&self) -> usize {
        self.sessions.len()
    }

    fn session(&self, user_id: &str) -> Arc<Mutex<VecDeque<ConversationTurn>>> {
        if let Some(session) = self.sessions.get(user_id) {
            return Arc::clone(&session);
        }
        Arc::clone(
            &self
                .sessions
                .entry(user_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(VecDeque::with_capacity(self.limit)))),
        )
    }
}

impl Default for InMemoryHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl ConversationHistory for InMemoryHistory {
    fn append(&self, user_id: &str, turn: ConversationTurn) {
        let session = self.session(user_id);
        let mut turns = session.lock();
        turns.push_back(turn);
        while turns.len() > self.limit {
            turns.pop_front();
        }
    }

    fn last_n(&self, user_id: &str, n: usize) -> Vec<ConversationTurn> {
        let Some(session) = self.sessions.get(user_id).map(|s| Arc::clone(&s)) else {
            return Vec::new();
        };
        let turns = session.lock();
        let skip = turns.len().saturating_sub(n);
        turns.iter().skip(skip).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn keeps_only_the_most_recent_turns() {
        let history = InMemoryHistory::new(3);
        for i in 0..5 {
            history.append("u1", ConversationTurn::new(format!("q{i}"), format!("a{i}")));
        }
        assert_eq!(history.len("u1"), 3);
        let texts: Vec<_> = history
            .last_n("u1", 10)
            .into_iter()
            .map(|t| t.user_text)
            .collect();
        assert_eq!(texts, vec!["q2", "q3", "q4"]);
    }

    #[test]
    fn default_limit_is_fifty() {
        let history = InMemoryHistory::default();
        for i in 0..60 {
            history.append("u", ConversationTurn::new(i.to_string(), ""));
        }
        assert_eq!(history.len("u"), 50);
        assert_eq!(history.last_n("u", 1)[0].user_text, "59");
    }

    #[test]
    fn last_n_returns_oldest_first() {
        let history = InMemoryHistory::default();
        history.append("u", ConversationTurn::new("first", "a"));
        history.append("u", ConversationTurn::new("second", "b"));
        let turns = history.last_n("u", 2);
        assert_eq!(turns[0].user_text, "first");
        assert_eq!(turns[1].user_text, "second");
    }

    #[test]
    fn unknown_user_has_no_turns() {
        let history = InMemoryHistory::default();
        assert!(history.last_n("nobody", 3).is_empty());
        assert_eq!(history.users(), 0);
    }

    #[test]
    fn users_are_isolated_across_threads() {
        let history = Arc::new(InMemoryHistory::default());
        let handles: Vec<_> = (0..8)
            .map(|u| {
                let history = Arc::clone(&history);
                thread::spawn(move || {
                    for i in 0..20 {
                        history.append(&format!("user-{u}"), ConversationTurn::new(i.to_string(), ""));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(history.users(), 8);
        for u in 0..8 {
            assert_eq!(history.len(&format!("user-{u}")), 20);
        }
    }
}
