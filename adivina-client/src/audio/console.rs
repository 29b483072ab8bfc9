//! Console audio stand-in
//!
//! Decoding and device output are outside this client, so the terminal
//! front end uses an output that tracks transport state and logs it. Sources
//! report ready as soon as they are loaded.

use super::{AudioOutput, MediaReady, PlaybackRejected};
use async_trait::async_trait;
use std::sync::Mutex;
use tracing::info;

#[derive(Debug, Default)]
struct ConsoleState {
    source: Option<String>,
    volume: f32,
    playing: bool,
}

/// [`AudioOutput`] that logs instead of producing sound
#[derive(Debug)]
pub struct ConsoleOutput {
    state: Mutex<ConsoleState>,
}

impl ConsoleOutput {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ConsoleState {
                volume: 1.0,
                ..ConsoleState::default()
            }),
        }
    }

    pub fn is_playing(&self) -> bool {
        self.state.lock().unwrap().playing
    }

    pub fn volume(&self) -> f32 {
        self.state.lock().unwrap().volume
    }
}

impl Default for ConsoleOutput {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AudioOutput for ConsoleOutput {
    fn load(&self, url: &str) -> MediaReady {
        let mut state = self.state.lock().unwrap();
        state.source = Some(url.to_string());
        state.playing = false;
        info!("Audio source loaded: {}", url);
        MediaReady::ready()
    }

    fn detach(&self) {
        let mut state = self.state.lock().unwrap();
        state.source = None;
        state.playing = false;
    }

    fn source(&self) -> Option<String> {
        self.state.lock().unwrap().source.clone()
    }

    fn set_volume(&self, volume: f32) {
        self.state.lock().unwrap().volume = volume.clamp(0.0, 1.0);
    }

    fn rewind(&self) {}

    fn pause(&self) {
        let mut state = self.state.lock().unwrap();
        if state.playing {
            info!("Audio paused");
        }
        state.playing = false;
    }

    async fn play(&self) -> Result<(), PlaybackRejected> {
        let mut state = self.state.lock().unwrap();
        match state.source.clone() {
            Some(url) => {
                state.playing = true;
                info!("♪ Playing {} (volume {:.2})", url, state.volume);
                Ok(())
            }
            None => Err(PlaybackRejected {
                reason: "no source loaded".to_string(),
            }),
        }
    }
}
