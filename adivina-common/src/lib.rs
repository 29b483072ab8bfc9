//! # Adivina Common Library
//!
//! Shared code for the guess-the-song client:
//! - Wire types for the game server HTTP API
//! - Event types (GameEvent enum) and the EventBus
//! - Configuration loading
//! - Error types

pub mod api;
pub mod config;
pub mod error;
pub mod events;

pub use error::{Error, Result};

/// Number of guesses a round allows before the server reveals the answer
pub const MAX_ATTEMPTS: usize = 5;
