//! Fragment player
//!
//! Plays the preview of the current song in attempt-sized slices. Every
//! bounded play arms an auto-stop task; that task is cancelled by every later
//! stop, stage or play call so a stale timer can never pause an unrelated
//! playback. A play call that is superseded while the output is still
//! starting never arms its timer.

use super::{AudioOutput, MediaReady, PlaybackRejected};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

/// Fragment length in seconds per attempt index; later attempts hear more
pub const FRAGMENT_DURATIONS: [f64; 5] = [0.5, 1.0, 2.0, 4.0, 6.0];

/// Fragment length for attempt indexes past the table
const DEFAULT_FRAGMENT_SECS: f64 = 1.0;

/// Fragment length for a 0-based attempt index
pub fn fragment_duration(attempt_index: usize) -> Duration {
    let secs = FRAGMENT_DURATIONS
        .get(attempt_index)
        .copied()
        .unwrap_or(DEFAULT_FRAGMENT_SECS);
    Duration::from_secs_f64(secs)
}

/// Pending auto-stop and the counters that invalidate it
#[derive(Default)]
struct AutoStop {
    /// Bumped by every stop, stage and play call
    generation: u64,
    /// Generation of the latest play call
    last_play: u64,
    handle: Option<JoinHandle<()>>,
}

/// Owner of the audio resource
pub struct AudioFragmentPlayer {
    output: Arc<dyn AudioOutput>,
    volume: f32,
    auto_stop: Mutex<AutoStop>,
}

impl AudioFragmentPlayer {
    pub fn new(output: Arc<dyn AudioOutput>, volume: f32) -> Self {
        Self {
            output,
            volume: volume.clamp(0.0, 1.0),
            auto_stop: Mutex::new(AutoStop::default()),
        }
    }

    /// URL of the loaded source
    pub fn source(&self) -> Option<String> {
        self.output.source()
    }

    /// Replace the source with `url`; the returned signal completes once it
    /// is playable
    pub fn stage(&self, url: &str) -> MediaReady {
        self.cancel_auto_stop();
        self.output.pause();
        self.output.detach();
        debug!("Staging preview {}", url);
        self.output.load(url)
    }

    /// Pause, rewind and cancel any pending auto-stop
    pub fn stop(&self) {
        self.cancel_auto_stop();
        self.output.pause();
        self.output.rewind();
    }

    /// Stop and drop the current source
    pub fn detach(&self) {
        self.stop();
        self.output.detach();
    }

    /// Play the loaded source from the start for at most `duration`
    ///
    /// If a stop or stage call lands while the output is starting, the
    /// output is paused again; if a newer play call lands, it is left alone.
    /// Either way no auto-stop is armed for this call.
    pub async fn play_bounded(&self, duration: Duration) -> Result<(), PlaybackRejected> {
        let generation = self.begin_play();
        self.output.pause();
        self.output.rewind();
        self.output.set_volume(self.volume);

        let started = self.output.play().await;

        let mut auto_stop = self.auto_stop.lock().unwrap();
        if auto_stop.generation != generation {
            if auto_stop.last_play == generation {
                self.output.pause();
            }
            debug!("Fragment superseded while starting, not arming auto-stop");
            return Ok(());
        }
        started?;

        let output = Arc::clone(&self.output);
        auto_stop.handle = Some(tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            output.pause();
            output.rewind();
            debug!("Fragment stopped after {:?}", duration);
        }));
        Ok(())
    }

    /// Play `url` to the end; a rejected start is ignored
    pub async fn play_full(&self, url: &str) {
        self.begin_play();
        self.output.pause();
        self.output.detach();
        let _ready = self.output.load(url);
        if let Err(rejected) = self.output.play().await {
            debug!("Full preview did not start: {}", rejected);
        }
    }

    pub fn has_pending_auto_stop(&self) -> bool {
        self.auto_stop
            .lock()
            .unwrap()
            .handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    fn begin_play(&self) -> u64 {
        let mut auto_stop = self.auto_stop.lock().unwrap();
        let generation = Self::cancel_locked(&mut auto_stop);
        auto_stop.last_play = generation;
        generation
    }

    fn cancel_auto_stop(&self) {
        Self::cancel_locked(&mut self.auto_stop.lock().unwrap());
    }

    /// Abort the pending auto-stop and invalidate in-flight play calls;
    /// returns the new generation
    fn cancel_locked(auto_stop: &mut AutoStop) -> u64 {
        auto_stop.generation += 1;
        if let Some(handle) = auto_stop.handle.take() {
            handle.abort();
        }
        auto_stop.generation
    }
}

impl Drop for AudioFragmentPlayer {
    fn drop(&mut self) {
        self.cancel_auto_stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::ConsoleOutput;
    use async_trait::async_trait;
    use tokio::sync::oneshot;

    struct BlockedOutput;

    #[async_trait]
    impl AudioOutput for BlockedOutput {
        fn load(&self, _url: &str) -> MediaReady {
            MediaReady::ready()
        }
        fn detach(&self) {}
        fn source(&self) -> Option<String> {
            None
        }
        fn set_volume(&self, _volume: f32) {}
        fn rewind(&self) {}
        fn pause(&self) {}
        async fn play(&self) -> Result<(), PlaybackRejected> {
            Err(PlaybackRejected {
                reason: "autoplay disabled".to_string(),
            })
        }
    }

    /// Console output whose first `play` waits on a gate
    struct GatedOutput {
        inner: ConsoleOutput,
        gate: Mutex<Option<oneshot::Receiver<()>>>,
        waiting: Mutex<bool>,
    }

    impl GatedOutput {
        fn new(gate: oneshot::Receiver<()>) -> Self {
            Self {
                inner: ConsoleOutput::new(),
                gate: Mutex::new(Some(gate)),
                waiting: Mutex::new(false),
            }
        }

        fn is_waiting(&self) -> bool {
            *self.waiting.lock().unwrap()
        }
    }

    #[async_trait]
    impl AudioOutput for GatedOutput {
        fn load(&self, url: &str) -> MediaReady {
            self.inner.load(url)
        }
        fn detach(&self) {
            self.inner.detach()
        }
        fn source(&self) -> Option<String> {
            self.inner.source()
        }
        fn set_volume(&self, volume: f32) {
            self.inner.set_volume(volume)
        }
        fn rewind(&self) {
            self.inner.rewind()
        }
        fn pause(&self) {
            self.inner.pause()
        }
        async fn play(&self) -> Result<(), PlaybackRejected> {
            let gate = self.gate.lock().unwrap().take();
            if let Some(gate) = gate {
                *self.waiting.lock().unwrap() = true;
                let _ = gate.await;
            }
            self.inner.play().await
        }
    }

    fn console_player() -> (Arc<ConsoleOutput>, AudioFragmentPlayer) {
        let output = Arc::new(ConsoleOutput::new());
        let player = AudioFragmentPlayer::new(output.clone(), 0.7);
        (output, player)
    }

    #[test]
    fn test_fragment_duration_table() {
        assert_eq!(fragment_duration(0), Duration::from_millis(500));
        assert_eq!(fragment_duration(1), Duration::from_secs(1));
        assert_eq!(fragment_duration(2), Duration::from_secs(2));
        assert_eq!(fragment_duration(3), Duration::from_secs(4));
        assert_eq!(fragment_duration(4), Duration::from_secs(6));
        assert_eq!(fragment_duration(5), Duration::from_secs(1));
        assert_eq!(fragment_duration(42), Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_play_bounded_stops_after_duration() {
        let (output, player) = console_player();
        assert!(player.stage("http://x/a.mp3").wait(Duration::from_secs(1)).await);

        player.play_bounded(Duration::from_secs(2)).await.unwrap();
        assert!(output.is_playing());
        assert!((output.volume() - 0.7).abs() < f32::EPSILON);
        assert!(player.has_pending_auto_stop());

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(output.is_playing());

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert!(!output.is_playing());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_cancels_auto_stop() {
        let (output, player) = console_player();
        let _ = player.stage("http://x/a.mp3");

        player.play_bounded(Duration::from_secs(1)).await.unwrap();
        player.stop();
        assert!(!player.has_pending_auto_stop());
        assert!(!output.is_playing());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_timer_does_not_stop_full_preview() {
        let (output, player) = console_player();
        let _ = player.stage("http://x/a.mp3");
        player.play_bounded(Duration::from_secs(1)).await.unwrap();

        player.play_full("http://x/full.mp3").await;
        tokio::time::sleep(Duration::from_secs(3)).await;

        assert!(output.is_playing());
        assert_eq!(output.source().as_deref(), Some("http://x/full.mp3"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_fragment_replaces_previous_timer() {
        let (output, player) = console_player();
        let _ = player.stage("http://x/a.mp3");

        player.play_bounded(Duration::from_millis(500)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;
        player.play_bounded(Duration::from_secs(4)).await.unwrap();

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(output.is_playing());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fragment_superseded_while_starting_does_not_stop_full_preview() {
        let (release, gate) = oneshot::channel();
        let output = Arc::new(GatedOutput::new(gate));
        let player = Arc::new(AudioFragmentPlayer::new(output.clone(), 0.7));
        let _ = player.stage("http://x/a.mp3");

        let fragment = {
            let player = Arc::clone(&player);
            tokio::spawn(async move { player.play_bounded(Duration::from_secs(1)).await })
        };
        while !output.is_waiting() {
            tokio::task::yield_now().await;
        }

        player.play_full("http://x/full.mp3").await;
        let _ = release.send(());
        assert_eq!(fragment.await.unwrap(), Ok(()));
        assert!(!player.has_pending_auto_stop());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(output.source().as_deref(), Some("http://x/full.mp3"));
        assert!(output.inner.is_playing());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_while_starting_leaves_no_timer() {
        let (release, gate) = oneshot::channel();
        let output = Arc::new(GatedOutput::new(gate));
        let player = Arc::new(AudioFragmentPlayer::new(output.clone(), 0.7));
        let _ = player.stage("http://x/a.mp3");

        let fragment = {
            let player = Arc::clone(&player);
            tokio::spawn(async move { player.play_bounded(Duration::from_secs(1)).await })
        };
        while !output.is_waiting() {
            tokio::task::yield_now().await;
        }

        player.stop();
        let _ = release.send(());
        fragment.await.unwrap().unwrap();
        assert!(!player.has_pending_auto_stop());
        assert!(!output.inner.is_playing());
    }

    #[tokio::test]
    async fn test_rejected_start_is_reported() {
        let player = AudioFragmentPlayer::new(Arc::new(BlockedOutput), 0.7);
        let result = player.play_bounded(Duration::from_secs(1)).await;
        assert_eq!(
            result,
            Err(PlaybackRejected {
                reason: "autoplay disabled".to_string()
            })
        );
        assert!(!player.has_pending_auto_stop());

        // Full preview swallows the rejection
        player.play_full("http://x/full.mp3").await;
    }

    #[test]
    fn test_stage_detaches_previous_source() {
        let (output, player) = console_player();
        let _ = player.stage("http://x/a.mp3");
        let _ = player.stage("http://x/b.mp3");
        assert_eq!(output.source().as_deref(), Some("http://x/b.mp3"));

        player.detach();
        assert_eq!(output.source(), None);
    }
}
