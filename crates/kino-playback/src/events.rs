//! Raw and normalized playback event vocabularies
//!
//! Raw names follow the HTML media element event list:
//! <https://html.spec.whatwg.org/multipage/media.html#mediaevents>

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Raw lifecycle event fired by a media engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaEvent {
    Abort,
    CanPlay,
    CanPlayThrough,
    DurationChange,
    Emptied,
    Ended,
    Error,
    LoadedData,
    LoadedMetadata,
    LoadStart,
    Pause,
    Play,
    Playing,
    Progress,
    RateChange,
    Resize,
    Seeked,
    Seeking,
    Stalled,
    Suspend,
    TimeUpdate,
    VolumeChange,
    Waiting,
}

impl MediaEvent {
    /// Every raw event an engine may fire
    pub const ALL: [MediaEvent; 23] = [
        MediaEvent::Abort,
        MediaEvent::CanPlay,
        MediaEvent::CanPlayThrough,
        MediaEvent::DurationChange,
        MediaEvent::Emptied,
        MediaEvent::Ended,
        MediaEvent::Error,
        MediaEvent::LoadedData,
        MediaEvent::LoadedMetadata,
        MediaEvent::LoadStart,
        MediaEvent::Pause,
        MediaEvent::Play,
        MediaEvent::Playing,
        MediaEvent::Progress,
        MediaEvent::RateChange,
        MediaEvent::Resize,
        MediaEvent::Seeked,
        MediaEvent::Seeking,
        MediaEvent::Stalled,
        MediaEvent::Suspend,
        MediaEvent::TimeUpdate,
        MediaEvent::VolumeChange,
        MediaEvent::Waiting,
    ];

    /// Raw events bound to a normalizer handler
    pub const NORMALIZED: [MediaEvent; 10] = [
        MediaEvent::CanPlayThrough,
        MediaEvent::Ended,
        MediaEvent::Pause,
        MediaEvent::Play,
        MediaEvent::Playing,
        MediaEvent::RateChange,
        MediaEvent::Seeked,
        MediaEvent::Seeking,
        MediaEvent::TimeUpdate,
        MediaEvent::Waiting,
    ];

    /// Wire name of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaEvent::Abort => "abort",
            MediaEvent::CanPlay => "canplay",
            MediaEvent::CanPlayThrough => "canplaythrough",
            MediaEvent::DurationChange => "durationchange",
            MediaEvent::Emptied => "emptied",
            MediaEvent::Ended => "ended",
            MediaEvent::Error => "error",
            MediaEvent::LoadedData => "loadeddata",
            MediaEvent::LoadedMetadata => "loadedmetadata",
            MediaEvent::LoadStart => "loadstart",
            MediaEvent::Pause => "pause",
            MediaEvent::Play => "play",
            MediaEvent::Playing => "playing",
            MediaEvent::Progress => "progress",
            MediaEvent::RateChange => "ratechange",
            MediaEvent::Resize => "resize",
            MediaEvent::Seeked => "seeked",
            MediaEvent::Seeking => "seeking",
            MediaEvent::Stalled => "stalled",
            MediaEvent::Suspend => "suspend",
            MediaEvent::TimeUpdate => "timeupdate",
            MediaEvent::VolumeChange => "volumechange",
            MediaEvent::Waiting => "waiting",
        }
    }

    /// Whether the normalizer has a handler for this event
    pub fn is_normalized(&self) -> bool {
        Self::NORMALIZED.contains(self)
    }
}

impl std::fmt::Display for MediaEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaEvent {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|event| event.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| Error::unknown_event(name))
    }
}

/// Semantic playback event delivered to consumers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NormalizedEvent {
    /// Buffering has ended
    Buffered,
    /// Buffering has started
    Buffering,
    /// The end of the stream was reached
    Ended,
    /// Loading is complete and playback is ready to start
    Loaded,
    /// The stream was paused
    Pause,
    /// A request to play was made
    Play,
    /// The stream started playing after load, or a paused stream resumed
    Playing,
    /// A seek has ended
    Seeked,
    /// A seek has started
    Seeking,
    /// Playback position advanced
    TimeUpdate,
}

impl NormalizedEvent {
    pub const ALL: [NormalizedEvent; 10] = [
        NormalizedEvent::Buffered,
        NormalizedEvent::Buffering,
        NormalizedEvent::Ended,
        NormalizedEvent::Loaded,
        NormalizedEvent::Pause,
        NormalizedEvent::Play,
        NormalizedEvent::Playing,
        NormalizedEvent::Seeked,
        NormalizedEvent::Seeking,
        NormalizedEvent::TimeUpdate,
    ];

    /// Wire name of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            NormalizedEvent::Buffered => "buffered",
            NormalizedEvent::Buffering => "buffering",
            NormalizedEvent::Ended => "ended",
            NormalizedEvent::Loaded => "loaded",
            NormalizedEvent::Pause => "pause",
            NormalizedEvent::Play => "play",
            NormalizedEvent::Playing => "playing",
            NormalizedEvent::Seeked => "seeked",
            NormalizedEvent::Seeking => "seeking",
            NormalizedEvent::TimeUpdate => "timeupdate",
        }
    }
}

impl std::fmt::Display for NormalizedEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NormalizedEvent {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|event| event.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| Error::unknown_event(name))
    }
}
