//! Audio playback
//!
//! The controller never touches an audio device directly. It drives an
//! [`AudioFragmentPlayer`], which owns one [`AudioOutput`] primitive (a media
//! element, a device sink, or the console stand-in used by the binary).

mod console;
mod player;

pub use console::ConsoleOutput;
pub use player::{fragment_duration, AudioFragmentPlayer, FRAGMENT_DURATIONS};

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::oneshot;

/// Platform refused to start playback (e.g. autoplay restrictions)
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Playback rejected: {reason}")]
pub struct PlaybackRejected {
    pub reason: String,
}

/// Resolves once a loaded source can be decoded
///
/// Dropping the sender side without signalling means the source never became
/// playable.
#[derive(Debug)]
pub struct MediaReady {
    rx: oneshot::Receiver<()>,
}

impl MediaReady {
    /// Pending signal and the sender that completes it
    pub fn channel() -> (oneshot::Sender<()>, MediaReady) {
        let (tx, rx) = oneshot::channel();
        (tx, MediaReady { rx })
    }

    /// Signal that is already complete
    pub fn ready() -> MediaReady {
        let (tx, ready) = Self::channel();
        let _ = tx.send(());
        ready
    }

    /// Wait for readiness; false on timeout or abandoned load
    pub async fn wait(self, timeout: Duration) -> bool {
        matches!(tokio::time::timeout(timeout, self.rx).await, Ok(Ok(())))
    }
}

/// Single audio resource the player drives
#[async_trait]
pub trait AudioOutput: Send + Sync {
    /// Replace the current source with `url` and start loading it
    fn load(&self, url: &str) -> MediaReady;

    /// Drop the current source
    fn detach(&self);

    /// URL of the current source
    fn source(&self) -> Option<String>;

    fn set_volume(&self, volume: f32);

    /// Seek to the start of the source
    fn rewind(&self);

    fn pause(&self);

    /// Start playback of the current source
    async fn play(&self) -> Result<(), PlaybackRejected>;
}
