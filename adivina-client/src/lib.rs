//! Adivina client library
//!
//! Client-side controller for the "guess the song" game: round state
//! machine, hint request guard, artist-only match detection and the audio
//! fragment player. Rendering is left to whoever subscribes to the
//! [`EventBus`](adivina_common::events::EventBus).

pub mod audio;
pub mod classifier;
pub mod controller;
pub mod error;
pub mod guard;
pub mod server;
pub mod state;
pub mod terminal;
pub mod text;

pub use controller::{FragmentOutcome, GuessOutcome, HintOutcome, RoundController};
pub use error::{ClientError, Result};
pub use server::{GameServer, GuessReply, HttpGameServer};
pub use state::{Attempt, RoundPhase, RoundState};
