//! Event types for the Adivina event system
//!
//! The round controller never renders anything itself. Every change a front
//! end has to show is published as a [`GameEvent`] on the [`EventBus`], and
//! front ends (the terminal UI, tests) subscribe to it.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Display state of one attempt slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttemptSlot {
    Empty,
    Correct,
    Wrong,
    /// Wrong guess that named the right artist
    Partial,
}

impl AttemptSlot {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptSlot::Empty => "empty",
            AttemptSlot::Correct => "correct",
            AttemptSlot::Wrong => "wrong",
            AttemptSlot::Partial => "partial",
        }
    }
}

/// Styling of the result banner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultTone {
    Success,
    Failure,
    Neutral,
}

/// How a round ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoundOutcome {
    Correct,
    Exhausted,
}

/// One line of the current round's guess list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryLine {
    /// 1-based attempt number
    pub number: usize,
    pub guess: String,
    pub slot: AttemptSlot,
}

/// Entry of the session-wide solved list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolvedEntry {
    pub title: String,
    pub artist: String,
}

/// Adivina event types
///
/// Events are broadcast via EventBus and can be serialized for transmission
/// to an out-of-process front end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GameEvent {
    /// Server accepted a new game for a playlist
    PlaylistStarted { name: String },

    /// Round state was reset
    RoundStarted { round_id: Uuid },

    /// Hint area text (may contain `<br>` markup from the server)
    HintChanged { text: String },

    /// Autocomplete entries for the guess input
    SuggestionsChanged { candidates: Vec<String> },

    /// Whether the "play fragment" control is usable
    FragmentAvailability { enabled: bool },

    /// Whether the guess input accepts submissions
    GuessInputAvailability { enabled: bool },

    /// Attempt indicator row and remaining-attempts counter
    AttemptsChanged {
        slots: Vec<AttemptSlot>,
        remaining: usize,
    },

    /// Guess list of the current round
    HistoryChanged { lines: Vec<HistoryLine> },

    /// Result banner; empty text clears it
    ResultChanged { text: String, tone: ResultTone },

    /// "Next round" control should be shown
    NextRoundAvailable,

    /// Guess input should signal rejection (wrong or empty guess)
    InputRejected,

    /// Platform refused to start playback; the user has to retry
    PlaybackBlocked { message: String },

    /// Session-wide list of finished songs, split by outcome
    SolvedListChanged {
        solved: Vec<SolvedEntry>,
        missed: Vec<SolvedEntry>,
    },

    /// Round reached a terminal state
    RoundFinished {
        round_id: Uuid,
        outcome: RoundOutcome,
        answer: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

/// Broadcast channel carrying [`GameEvent`]s
///
/// # Examples
///
/// ```
/// use adivina_common::events::{EventBus, GameEvent};
///
/// let bus = EventBus::new(16);
/// let mut rx = bus.subscribe();
/// bus.emit_lossy(GameEvent::NextRoundAvailable);
/// assert_eq!(rx.try_recv().unwrap(), GameEvent::NextRoundAvailable);
/// ```
pub struct EventBus {
    tx: broadcast::Sender<GameEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<GameEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(&self, event: GameEvent) -> Result<usize, broadcast::error::SendError<GameEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: GameEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
