//! Playback state carried between normalizer transitions

use serde::{Deserialize, Serialize};

/// Snapshot of where playback is and which emissions are still owed.
///
/// Values are replaced wholesale on every transition. `ended` is terminal
/// and `initial_play_triggered` is a one-way latch for the lifetime of the
/// value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlaybackState {
    /// A stall is in progress
    pub buffering: bool,
    /// `loaded` is owed once the playback rate turns positive
    pub defer_loaded_event: bool,
    /// A playing transition has been processed; re-checked on positive rate changes
    pub defer_playing_event: bool,
    /// `seeked` is owed once the playback rate turns positive
    pub defer_seeked_event: bool,
    /// End of stream reached
    pub ended: bool,
    /// The first genuine playing transition happened
    pub initial_play_triggered: bool,
    /// No ready signal has been seen yet
    pub loading: bool,
    pub paused: bool,
    /// A resume from pause was requested and awaits `playing`
    pub play_requested: bool,
    pub seeking: bool,
}

impl PlaybackState {
    /// Handlers suppress emission while loading or after the end of stream
    pub fn is_not_ready(&self) -> bool {
        self.loading || self.ended
    }
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            buffering: false,
            defer_loaded_event: false,
            defer_playing_event: false,
            defer_seeked_event: false,
            ended: false,
            initial_play_triggered: false,
            loading: true,
            paused: false,
            play_requested: false,
            seeking: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let state = PlaybackState::default();
        assert!(state.loading);
        assert!(state.is_not_ready());
        assert!(!state.paused);
        assert!(!state.initial_play_triggered);
    }

    #[test]
    fn test_readiness() {
        let ready = PlaybackState { loading: false, ..Default::default() };
        assert!(!ready.is_not_ready());

        let ended = PlaybackState { ended: true, ..ready };
        assert!(ended.is_not_ready());
    }
}
