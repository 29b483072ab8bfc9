//! Game server API types
//!
//! The game server owns song selection and scoring; the client only consumes
//! the five endpoints described here. Field names follow the server's JSON
//! (Spanish) and are exposed unchanged through serde.

pub mod types;

pub use types::{
    AttemptRecord, ErrorBody, GuessRequest, GuessResult, HintPayload, SolvedSong, StartRequest,
    StartResponse,
};

/// `POST` - start a game for a playlist
pub const START_PATH: &str = "/start";
/// `GET ?attempt=N` - hint and preview for attempt N (1-based)
pub const HINT_PATH: &str = "/hint";
/// `POST` - submit a guess for the current song
pub const GUESS_PATH: &str = "/guess";
/// `GET` - songs finished during this session
pub const HISTORY_PATH: &str = "/historial-global";
/// `POST` - drop the server-side session
pub const RESET_PATH: &str = "/reset";
