//! Round controller
//!
//! Owns the round state and the audio player, talks to the game server and
//! publishes every visible change on the event bus.
//!
//! State machine:
//!
//! ```text
//! Idle → AwaitingHint → Ready{fragment_loadable} → Guessing → Correct | Exhausted
//!   ↑                                                  │
//!   └──────────── start_round / leave_game ────────────┘
//! ```
//!
//! The state lock is never held across a server request, so hint loads,
//! guesses and media readiness may complete in any order. Hint effects are
//! protected by [`HintRequestGuard`]; guesses are single-flight.

use crate::audio::{fragment_duration, AudioFragmentPlayer, AudioOutput};
use crate::classifier::{payload_artist, resolve_known_artist, ClassifyContext, PartialMatchClassifier};
use crate::error::Result;
use crate::guard::HintRequestGuard;
use crate::server::GameServer;
use crate::state::{Attempt, RoundPhase, RoundState, StagedPreview};
use crate::text::{extract_artists_from_candidates, is_usable_suggestion};
use adivina_common::api::StartRequest;
use adivina_common::config::ClientConfig;
use adivina_common::events::{
    EventBus, GameEvent, ResultTone, RoundOutcome, SolvedEntry,
};
use adivina_common::MAX_ATTEMPTS;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, warn};

/// Hint text shown when the server sends no hint
pub const DEFAULT_PROMPT: &str = "Listen to the fragment and guess the song!";
const HINT_PREFIX: &str = "💡 ";
const HINT_FAILED: &str = "Could not load the hint. Try again.";
const PLAYBACK_BLOCKED: &str = "Playback was blocked. Press play again.";
const INCORRECT: &str = "Incorrect";

/// Result of [`RoundController::load_hint`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HintOutcome {
    /// Hint applied; `fragment_ready` when its preview became playable
    Applied { fragment_ready: bool },
    /// A newer hint request was issued before this one completed
    Stale,
    /// Server answered with an `error` field
    Rejected(String),
    /// Request failed
    Failed(String),
}

/// Result of [`RoundController::play_fragment`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FragmentOutcome {
    Played { duration: Duration },
    /// Interaction disabled, round over, or preview still loading
    Ignored,
    /// No preview staged for this attempt
    NothingStaged,
    /// Staged preview was stale; the hint was requested again
    Reloading,
    Blocked,
}

/// Result of [`RoundController::submit_guess`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuessOutcome {
    /// Not submitted (guess in flight, input disabled or round over)
    Ignored,
    Incorrect { partial: bool },
    Correct { answer: String },
    Exhausted { answer: String },
    Failed { message: String },
}

/// Round state machine
pub struct RoundController {
    server: Arc<dyn GameServer>,
    player: AudioFragmentPlayer,
    guard: HintRequestGuard,
    classifier: PartialMatchClassifier,
    events: Arc<EventBus>,
    state: RwLock<RoundState>,
    media_ready_timeout: Duration,
}

impl RoundController {
    pub fn new(
        server: Arc<dyn GameServer>,
        output: Arc<dyn AudioOutput>,
        events: Arc<EventBus>,
        config: &ClientConfig,
    ) -> Self {
        Self {
            server,
            player: AudioFragmentPlayer::new(output, config.fragment_volume),
            guard: HintRequestGuard::new(),
            classifier: PartialMatchClassifier::new(config.legacy_payload_scan),
            events,
            state: RwLock::new(RoundState::idle()),
            media_ready_timeout: config.media_ready_timeout(),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GameEvent> {
        self.events.subscribe()
    }

    /// Copy of the current round state
    pub async fn snapshot(&self) -> RoundState {
        self.state.read().await.clone()
    }

    pub async fn phase(&self) -> RoundPhase {
        self.state.read().await.phase
    }

    fn emit(&self, event: GameEvent) {
        self.events.emit_lossy(event);
    }

    fn emit_attempts(&self, state: &RoundState) {
        self.emit(GameEvent::AttemptsChanged {
            slots: state.attempt_slots(),
            remaining: state.remaining_attempts(),
        });
        self.emit(GameEvent::HistoryChanged {
            lines: state.history_lines(),
        });
    }

    // ========================================
    // Game lifecycle
    // ========================================

    /// Start a game for a playlist and begin its first round
    ///
    /// Returns the playlist name to display.
    pub async fn start_game(
        &self,
        playlist_id: Option<String>,
        playlist_name: Option<String>,
    ) -> Result<String> {
        let request = StartRequest::new(playlist_id, playlist_name);
        let response = self.server.start(&request).await?;

        let name = response
            .playlist_name
            .filter(|name| !name.trim().is_empty())
            .or_else(|| request.playlist_name.clone())
            .unwrap_or_else(|| match &request.playlist_id {
                Some(id) => format!("Playlist {}", id),
                None => "Playlist".to_string(),
            });
        info!(playlist = %name, "Game started");
        self.emit(GameEvent::PlaylistStarted { name: name.clone() });

        self.refresh_global_history().await;
        self.start_round().await;
        Ok(name)
    }

    /// Abandon the game; the server session reset is best effort
    pub async fn leave_game(&self) {
        self.guard.invalidate();
        {
            let mut state = self.state.write().await;
            *state = RoundState::idle();
        }
        self.player.detach();
        self.emit(GameEvent::FragmentAvailability { enabled: false });
        self.emit(GameEvent::GuessInputAvailability { enabled: false });
        self.emit(GameEvent::ResultChanged {
            text: String::new(),
            tone: ResultTone::Neutral,
        });

        if let Err(e) = self.server.reset().await {
            debug!("Session reset failed (ignored): {}", e);
        }
        info!("Left game");
    }

    /// Reset all round state and request the first hint
    pub async fn start_round(&self) {
        self.guard.invalidate();
        let state = {
            let mut state = self.state.write().await;
            *state = RoundState::fresh_round();
            self.player.detach();
            state.clone()
        };
        info!(round_id = %state.round_id, "Round started");

        self.emit(GameEvent::RoundStarted {
            round_id: state.round_id,
        });
        self.emit(GameEvent::ResultChanged {
            text: String::new(),
            tone: ResultTone::Neutral,
        });
        self.emit(GameEvent::HintChanged {
            text: DEFAULT_PROMPT.to_string(),
        });
        self.emit_attempts(&state);
        self.emit(GameEvent::FragmentAvailability { enabled: false });
        self.emit(GameEvent::GuessInputAvailability { enabled: true });

        self.load_hint(1).await;
    }

    /// Songs finished in this session; failures are only logged
    pub async fn refresh_global_history(&self) {
        match self.server.global_history().await {
            Ok(songs) => {
                let (solved, missed): (Vec<_>, Vec<_>) =
                    songs.into_iter().partition(|song| song.correcta);
                let entries = |songs: Vec<adivina_common::api::SolvedSong>| {
                    songs
                        .into_iter()
                        .map(|song| SolvedEntry {
                            title: song.titulo,
                            artist: song.artista,
                        })
                        .collect::<Vec<_>>()
                };
                self.emit(GameEvent::SolvedListChanged {
                    solved: entries(solved),
                    missed: entries(missed),
                });
            }
            Err(e) => warn!("Could not refresh global history: {}", e),
        }
    }

    // ========================================
    // Hints
    // ========================================

    /// Request the hint for a 1-based attempt number
    ///
    /// Only the most recently issued request may change state; earlier
    /// responses are dropped whenever they arrive.
    pub async fn load_hint(&self, attempt_number: usize) -> HintOutcome {
        let token = self.guard.next_request();
        {
            let mut state = self.state.write().await;
            state.staged_preview = None;
            state.fragment_ready = false;
            if !state.phase.is_terminal() {
                state.phase = RoundPhase::AwaitingHint;
            }
        }
        self.emit(GameEvent::FragmentAvailability { enabled: false });
        debug!(attempt = attempt_number, token = token.value(), "Requesting hint");

        let response = self.server.hint(attempt_number).await;

        let mut state = self.state.write().await;
        if !self.guard.is_current(token) {
            debug!(token = token.value(), "Discarding stale hint response");
            return HintOutcome::Stale;
        }

        let payload = match response {
            Ok(payload) => payload,
            Err(e) => {
                warn!(attempt = attempt_number, "Hint request failed: {}", e);
                if !state.phase.is_terminal() {
                    state.phase = RoundPhase::Guessing;
                }
                drop(state);
                self.emit(GameEvent::HintChanged {
                    text: HINT_FAILED.to_string(),
                });
                return HintOutcome::Failed(e.to_string());
            }
        };

        if let Some(error) = payload.error.as_deref().filter(|e| !e.trim().is_empty()) {
            warn!(attempt = attempt_number, "Server refused hint: {}", error);
            if !state.phase.is_terminal() {
                state.phase = RoundPhase::Guessing;
            }
            drop(state);
            self.emit(GameEvent::HintChanged {
                text: error.to_string(),
            });
            return HintOutcome::Rejected(error.to_string());
        }

        let hint = payload.pista.as_deref().filter(|p| !p.trim().is_empty());
        let text = match hint {
            Some(pista) => format!("{}{}", HINT_PREFIX, pista),
            None => DEFAULT_PROMPT.to_string(),
        };
        state.hint_text = hint.map(str::to_string);
        if state.known_artist.is_none() {
            state.known_artist = resolve_known_artist(None, payload.artist_name(), None, hint);
        }
        state.candidate_artists = extract_artists_from_candidates(&payload.canciones_posibles);
        state.phase = RoundPhase::Ready {
            fragment_loadable: false,
        };

        let staged = payload.preview().map(|url| StagedPreview {
            url: url.to_string(),
            token,
        });
        state.staged_preview = staged.clone();
        let ready = staged.as_ref().map(|staged| self.player.stage(&staged.url));
        drop(state);

        self.emit(GameEvent::HintChanged { text });
        self.emit(GameEvent::SuggestionsChanged {
            candidates: payload
                .canciones_posibles
                .iter()
                .filter(|c| is_usable_suggestion(c))
                .cloned()
                .collect(),
        });

        let (staged, ready) = match (staged, ready) {
            (Some(staged), Some(ready)) => (staged, ready),
            _ => {
                debug!(attempt = attempt_number, "Hint has no preview, fragment stays disabled");
                return HintOutcome::Applied {
                    fragment_ready: false,
                };
            }
        };

        if !ready.wait(self.media_ready_timeout).await {
            warn!(url = %staged.url, "Preview did not become playable");
            return HintOutcome::Applied {
                fragment_ready: false,
            };
        }

        let mut state = self.state.write().await;
        let source_matches = self.player.source().as_deref() == Some(staged.url.as_str());
        if !self.guard.is_current(token)
            || !source_matches
            || state.staged_preview.as_ref() != Some(&staged)
        {
            debug!(token = token.value(), "Ignoring readiness of a replaced preview");
            return HintOutcome::Stale;
        }
        state.fragment_ready = true;
        state.phase = RoundPhase::Ready {
            fragment_loadable: true,
        };
        drop(state);

        self.emit(GameEvent::FragmentAvailability { enabled: true });
        HintOutcome::Applied {
            fragment_ready: true,
        }
    }

    // ========================================
    // Playback
    // ========================================

    /// Play the fragment for the current attempt
    pub async fn play_fragment(&self) -> FragmentOutcome {
        let (staged, attempt_index, ready) = {
            let state = self.state.read().await;
            if !state.can_interact || state.is_finished() {
                debug!("Fragment request ignored");
                return FragmentOutcome::Ignored;
            }
            (
                state.staged_preview.clone(),
                state.current_attempt,
                state.fragment_ready,
            )
        };
        let Some(staged) = staged else {
            self.emit(GameEvent::InputRejected);
            return FragmentOutcome::NothingStaged;
        };

        let stale = !self.guard.is_current(staged.token)
            || self.player.source().as_deref() != Some(staged.url.as_str());
        if stale {
            info!("Staged preview is stale, reloading hint");
            self.load_hint(attempt_index + 1).await;
            return FragmentOutcome::Reloading;
        }
        if !ready {
            debug!("Preview still loading");
            return FragmentOutcome::Ignored;
        }

        let duration = fragment_duration(attempt_index);
        match self.player.play_bounded(duration).await {
            Ok(()) => {
                debug!(?duration, "Playing fragment");
                FragmentOutcome::Played { duration }
            }
            Err(blocked) => {
                warn!("{}", blocked);
                self.emit(GameEvent::PlaybackBlocked {
                    message: PLAYBACK_BLOCKED.to_string(),
                });
                FragmentOutcome::Blocked
            }
        }
    }

    // ========================================
    // Guesses
    // ========================================

    /// Submit a guess; at most one guess is in flight at a time
    pub async fn submit_guess(&self, text: &str) -> GuessOutcome {
        let guess = text.trim().to_string();
        let round_id = {
            let mut state = self.state.write().await;
            if !state.can_interact || !state.guess_enabled || state.is_finished() {
                debug!("Guess ignored");
                return GuessOutcome::Ignored;
            }
            state.can_interact = false;
            state.guess_enabled = false;
            state.phase = RoundPhase::Guessing;
            state.round_id
        };
        if guess.is_empty() {
            self.emit(GameEvent::InputRejected);
        }
        self.emit(GameEvent::GuessInputAvailability { enabled: false });

        let response = self.server.guess(&guess).await;

        let mut state = self.state.write().await;
        if state.round_id != round_id {
            debug!(%round_id, "Round replaced while guess was in flight");
            return GuessOutcome::Ignored;
        }
        state.can_interact = true;

        let reply = match response {
            Ok(reply) => reply,
            Err(e) => {
                state.guess_enabled = true;
                drop(state);
                warn!("Guess request failed: {}", e);
                let message = e.to_string();
                self.emit(GameEvent::ResultChanged {
                    text: format!("Something went wrong. {}", message),
                    tone: ResultTone::Failure,
                });
                self.emit(GameEvent::GuessInputAvailability { enabled: true });
                return GuessOutcome::Failed { message };
            }
        };
        let result = &reply.result;

        let attempts: Vec<Attempt> = result
            .jugadas
            .iter()
            .enumerate()
            .map(|(i, record)| Attempt::from_record(record, reply.attempt_record(i)))
            .collect();
        if state.replace_history(attempts, &guess, result.is_correct()) {
            debug!("Server history lagged behind, appended the submitted guess");
        }

        state.known_artist = resolve_known_artist(
            state.known_artist.as_deref(),
            payload_artist(&reply.raw),
            result.revealed_answer(),
            state.hint_text.as_deref(),
        );
        let round: &mut RoundState = &mut state;
        let ctx = ClassifyContext {
            known_artist: round.known_artist.as_deref(),
            candidate_artists: &round.candidate_artists,
            payload: Some(&reply.raw),
        };
        self.classifier
            .apply_all(&mut round.history, &ctx, &mut round.partial_cache);

        let outcome = if result.is_correct() {
            state.phase = RoundPhase::Correct;
            GuessOutcome::Correct {
                answer: result.revealed_answer().unwrap_or_default().to_string(),
            }
        } else if let Some(answer) = result.revealed_answer() {
            state.phase = RoundPhase::Exhausted;
            GuessOutcome::Exhausted {
                answer: answer.to_string(),
            }
        } else {
            state.phase = RoundPhase::Guessing;
            state.guess_enabled = true;
            GuessOutcome::Incorrect {
                partial: state.history.last().is_some_and(|a| a.partial),
            }
        };

        let snapshot = state.clone();
        drop(state);
        info!(
            round_id = %snapshot.round_id,
            attempt = snapshot.current_attempt,
            ?outcome,
            "Guess answered"
        );
        self.emit_attempts(&snapshot);

        match &outcome {
            GuessOutcome::Correct { answer } | GuessOutcome::Exhausted { answer } => {
                let (text, tone, round_outcome) = match outcome {
                    GuessOutcome::Correct { .. } if answer.is_empty() => (
                        "Correct!".to_string(),
                        ResultTone::Success,
                        RoundOutcome::Correct,
                    ),
                    GuessOutcome::Correct { .. } => (
                        format!("Correct! It was: {}", answer),
                        ResultTone::Success,
                        RoundOutcome::Correct,
                    ),
                    _ => (
                        format!("Game over. It was: {}", answer),
                        ResultTone::Failure,
                        RoundOutcome::Exhausted,
                    ),
                };
                self.finish_round(&snapshot, text, tone, round_outcome, answer, result.preview_url.as_deref())
                    .await;
            }
            GuessOutcome::Incorrect { .. } => {
                self.emit(GameEvent::InputRejected);
                self.emit(GameEvent::ResultChanged {
                    text: INCORRECT.to_string(),
                    tone: ResultTone::Failure,
                });
                self.emit(GameEvent::GuessInputAvailability { enabled: true });
                if snapshot.current_attempt < MAX_ATTEMPTS {
                    self.load_hint(snapshot.current_attempt + 1).await;
                } else {
                    warn!("Attempts used up but the server revealed no answer");
                }
            }
            GuessOutcome::Ignored | GuessOutcome::Failed { .. } => {}
        }

        outcome
    }

    /// Reveal the answer, play the full preview and refresh the global list
    async fn finish_round(
        &self,
        state: &RoundState,
        text: String,
        tone: ResultTone,
        outcome: RoundOutcome,
        answer: &str,
        preview_url: Option<&str>,
    ) {
        // Pending hint loads must not restage audio over the full preview
        self.guard.invalidate();

        self.emit(GameEvent::ResultChanged { text, tone });
        self.emit(GameEvent::FragmentAvailability { enabled: false });
        self.emit(GameEvent::NextRoundAvailable);
        self.emit(GameEvent::RoundFinished {
            round_id: state.round_id,
            outcome,
            answer: answer.to_string(),
            timestamp: chrono::Utc::now(),
        });

        if let Some(url) = preview_url.filter(|url| !url.trim().is_empty()) {
            self.player.play_full(url).await;
        }
        self.refresh_global_history().await;
    }
}
