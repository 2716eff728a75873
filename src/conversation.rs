//! Follow-up handling: which answer the last bot turn gave, and what a short
//! reply such as "نعم" or "المرافق" asks for against it.

use crate::gazetteer::Gazetteer;
use crate::history::{ConversationHistory, ConversationTurn};
use crate::normalize::{normalize, token_count};
use crate::vocab::{FacilityKind, CONTINUATION_KEYWORDS};
use log::{debug, info};
use once_cell::sync::Lazy;
use std::sync::Arc;

const FOLLOW_UP_MAX_TOKENS: usize = 2;

static ALL_FACILITIES: Lazy<String> = Lazy::new(|| normalize("المرافق"));

static RECOMMENDATION_MARKERS: Lazy<Vec<String>> = Lazy::new(|| {
    ["اقترح", "أقترح", "أفضل حي", "أنصحك"]
        .iter()
        .map(|w| normalize(w))
        .collect()
});

static NEIGHBORHOOD_REFERENCES: Lazy<Vec<String>> = Lazy::new(|| {
    ["هذا الحي", "هذه المنطقة", "نفس الحي", "الحي"]
        .iter()
        .map(|w| normalize(w))
        .collect()
});

/// Where a turn sits in the dialogue, recomputed for every message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogueState {
    AwaitingNewTopic,
    FollowingUp,
}

/// What a neighborhood follow-up should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Overview,
    AllFacilities,
    Facility(FacilityKind),
}

/// The context a short reply was resolved against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FollowUp {
    Neighborhood { name: String, focus: Focus },
    FacilityType(FacilityKind),
    /// The previous answer proposed neighborhoods; `seed` is that answer.
    Recommendation { seed: String },
}

pub struct ContextResolver {
    history: Arc<dyn ConversationHistory>,
    gazetteer: Arc<Gazetteer>,
    window: usize,
}

impl ContextResolver {
    pub fn new(history: Arc<dyn ConversationHistory>, gazetteer: Arc<Gazetteer>, window: usize) -> Self {
        Self {
            history,
            gazetteer,
            window: window.max(1),
        }
    }

    pub fn history(&self) -> &Arc<dyn ConversationHistory> {
        &self.history
    }

    pub fn state(text: &str) -> DialogueState {
        let text = normalize(text);
        let text = text.trim();
        if token_count(text) <= FOLLOW_UP_MAX_TOKENS && CONTINUATION_KEYWORDS.any_in(text) {
            DialogueState::FollowingUp
        } else {
            DialogueState::AwaitingNewTopic
        }
    }

    /// Resolves a short continuation ("نعم", "المزيد") against the recent
    /// bot answers. `None` means the message is not a follow-up and should
    /// be classified normally.
    pub fn resolve(&self, user_id: &str, text: &str) -> Option<FollowUp> {
        // Rule 1: only terse continuations are follow-ups
        if Self::state(text) != DialogueState::FollowingUp {
            return None;
        }
        let turns = self.recent(user_id);
        let last = turns.first()?;
        let message = normalize(text);

        // Rule 2: a neighborhood named in the recent answers, newest first
        let neighborhood = turns
            .iter()
            .find_map(|turn| self.gazetteer.first_in(&turn.bot_text));
        if let Some(name) = neighborhood {
            let focus = if message.contains(ALL_FACILITIES.as_str()) {
                Focus::AllFacilities
            } else if let Some(kind) = FacilityKind::score(&message) {
                Focus::Facility(kind)
            } else {
                Focus::Overview
            };
            info!("follow-up resolved to neighborhood {} ({:?})", name, focus);
            return Some(FollowUp::Neighborhood {
                name: name.to_string(),
                focus,
            });
        }

        // Rule 3: a facility type the last answer talked about
        let last_bot = normalize(&last.bot_text);
        if let Some(kind) = FacilityKind::score(&last_bot) {
            info!("follow-up resolved to facility type {}", kind);
            return Some(FollowUp::FacilityType(kind));
        }

        // Rule 4: the last answer was itself a recommendation
        if RECOMMENDATION_MARKERS.iter().any(|m| last_bot.contains(m.as_str())) {
            return Some(FollowUp::Recommendation {
                seed: last.bot_text.clone(),
            });
        }

        debug!("no context recoverable for follow-up {:?}", text);
        None
    }

    /// Resolves "هذا الحي" style references to the neighborhood most
    /// recently named by either side of the conversation.
    pub fn resolve_reference(&self, user_id: &str, text: &str) -> Option<String> {
        let message = normalize(text);
        if !NEIGHBORHOOD_REFERENCES.iter().any(|r| message.contains(r.as_str())) {
            return None;
        }
        if self.gazetteer.mentions_any(&message) {
            return None;
        }
        self.recent(user_id).iter().find_map(|turn| {
            self.gazetteer
                .first_in(&turn.bot_text)
                .or_else(|| self.gazetteer.first_in(&turn.user_text))
                .map(str::to_string)
        })
    }

    /// The context window, newest first.
    fn recent(&self, user_id: &str) -> Vec<ConversationTurn> {
        let mut turns = self.history.last_n(user_id, self.window);
        turns.reverse();
        turns
    }
}
