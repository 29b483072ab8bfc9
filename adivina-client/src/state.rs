//! Round state
//!
//! Everything the controller knows about the round in progress. A new
//! [`RoundState`] is built for every round, so nothing leaks from one round
//! into the next.

use crate::guard::HintToken;
use crate::text::normalize;
use adivina_common::api::AttemptRecord;
use adivina_common::events::{AttemptSlot, HistoryLine};
use adivina_common::MAX_ATTEMPTS;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use tracing::warn;
use uuid::Uuid;

/// One submitted guess
#[derive(Debug, Clone, PartialEq)]
pub struct Attempt {
    pub guess: String,
    pub correct: bool,
    /// Wrong guess that named the right artist
    pub partial: bool,
    /// Server record this attempt was built from (None when synthesized)
    pub record: Option<Value>,
}

impl Attempt {
    /// Build from a server record; an explicit `parcial` flag is kept as-is
    pub fn from_record(record: &AttemptRecord, raw: Option<Value>) -> Self {
        Self {
            guess: record.guess.clone(),
            correct: record.correcta,
            partial: !record.correcta && record.parcial == Some(true),
            record: raw,
        }
    }

    /// Local stand-in for a guess the server did not list yet
    pub fn synthesized(guess: &str, correct: bool) -> Self {
        Self {
            guess: guess.to_string(),
            correct,
            partial: false,
            record: None,
        }
    }

    pub fn slot(&self) -> AttemptSlot {
        if self.correct {
            AttemptSlot::Correct
        } else if self.partial {
            AttemptSlot::Partial
        } else {
            AttemptSlot::Wrong
        }
    }
}

/// Round state machine phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundPhase {
    /// No game running
    Idle,
    /// Waiting for the hint of the current attempt
    AwaitingHint,
    /// Hint applied; `fragment_loadable` once the preview is playable
    Ready { fragment_loadable: bool },
    /// Guess in flight, or hint unavailable while guesses remain
    Guessing,
    /// Song guessed
    Correct,
    /// Attempts used up, answer revealed
    Exhausted,
}

impl RoundPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RoundPhase::Correct | RoundPhase::Exhausted)
    }
}

/// Preview URL accepted from a hint response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedPreview {
    pub url: String,
    /// Token of the hint request that delivered it
    pub token: HintToken,
}

/// Mutable state of one round
#[derive(Debug, Clone)]
pub struct RoundState {
    pub round_id: Uuid,
    pub phase: RoundPhase,
    pub current_attempt: usize,
    pub history: Vec<Attempt>,
    /// False while a guess is in flight
    pub can_interact: bool,
    /// Guess input accepts submissions
    pub guess_enabled: bool,
    pub known_artist: Option<String>,
    pub candidate_artists: BTreeSet<String>,
    /// normalized guess -> partial decision
    pub partial_cache: HashMap<String, bool>,
    /// Raw text of the last accepted hint
    pub hint_text: Option<String>,
    pub staged_preview: Option<StagedPreview>,
    /// Staged preview reported ready and passed the guard check
    pub fragment_ready: bool,
}

impl RoundState {
    /// State before any game was started
    pub fn idle() -> Self {
        Self {
            round_id: Uuid::new_v4(),
            phase: RoundPhase::Idle,
            current_attempt: 0,
            history: Vec::new(),
            can_interact: true,
            guess_enabled: false,
            known_artist: None,
            candidate_artists: BTreeSet::new(),
            partial_cache: HashMap::new(),
            hint_text: None,
            staged_preview: None,
            fragment_ready: false,
        }
    }

    /// State at the start of a round, before its first hint arrives
    pub fn fresh_round() -> Self {
        Self {
            phase: RoundPhase::AwaitingHint,
            guess_enabled: true,
            ..Self::idle()
        }
    }

    pub fn remaining_attempts(&self) -> usize {
        MAX_ATTEMPTS.saturating_sub(self.current_attempt)
    }

    /// Round over: terminal phase or no attempts left
    pub fn is_finished(&self) -> bool {
        self.phase.is_terminal() || self.current_attempt >= MAX_ATTEMPTS
    }

    /// One slot per possible attempt
    pub fn attempt_slots(&self) -> Vec<AttemptSlot> {
        (0..MAX_ATTEMPTS)
            .map(|i| {
                self.history
                    .get(i)
                    .map(Attempt::slot)
                    .unwrap_or(AttemptSlot::Empty)
            })
            .collect()
    }

    pub fn history_lines(&self) -> Vec<HistoryLine> {
        self.history
            .iter()
            .enumerate()
            .map(|(i, attempt)| HistoryLine {
                number: i + 1,
                guess: attempt.guess.clone(),
                slot: attempt.slot(),
            })
            .collect()
    }

    /// Replace the history with the server's list
    ///
    /// Appends a synthesized attempt when the server's last entry is not the
    /// guess just submitted, caps the list at [`MAX_ATTEMPTS`] and keeps
    /// `current_attempt == history.len()`. Returns true when an entry had to
    /// be synthesized.
    pub fn replace_history(
        &mut self,
        mut attempts: Vec<Attempt>,
        submitted: &str,
        server_correct: bool,
    ) -> bool {
        let submitted_norm = normalize(submitted);
        let lagging = attempts
            .last()
            .map_or(true, |last| normalize(&last.guess) != submitted_norm);
        if lagging {
            attempts.push(Attempt::synthesized(submitted, server_correct));
        }

        if attempts.len() > MAX_ATTEMPTS {
            warn!(
                "Server returned {} attempts, keeping the first {}",
                attempts.len(),
                MAX_ATTEMPTS
            );
            attempts.truncate(MAX_ATTEMPTS);
        }

        self.history = attempts;
        self.current_attempt = self.history.len();
        lagging
    }
}

impl Default for RoundState {
    fn default() -> Self {
        Self::idle()
    }
}
