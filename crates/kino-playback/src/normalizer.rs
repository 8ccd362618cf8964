//! Playback Normalizer - raw media events in, semantic playback events out
//!
//! Media engines fire lifecycle events out of order, twice, or not at all.
//! Each handler here reads the live element attributes and the current
//! [`PlaybackState`], emits zero or more [`NormalizedEvent`]s and replaces the
//! state. The only side effect besides emission is the buffering debounce
//! timer armed on a zero playback rate.
//!
//! ```text
//! MediaEvent ──> handle() ──> on_*() ──> callback(NormalizedEvent)*
//!                                │
//!                     on_ratechange() re-drives deferred
//!                     load / seeked / playing handlers
//! ```

use crate::{
    config::NormalizerConfig,
    element::MediaElement,
    events::{MediaEvent, NormalizedEvent},
    state::PlaybackState,
    timer::{ManualScheduler, Scheduler, TimerId},
};
use std::time::Duration;
use tracing::{debug, trace};

/// Event normalizer for a single media element
pub struct Normalizer<E, S, F>
where
    E: MediaElement,
    S: Scheduler,
    F: FnMut(NormalizedEvent),
{
    /// Observed engine
    element: E,
    /// Debounce timer source
    scheduler: S,
    /// Consumer callback
    callback: F,
    config: NormalizerConfig,
    state: PlaybackState,
    /// Pending buffering debounce
    debounce: Option<TimerId>,
}

impl<E, S, F> Normalizer<E, S, F>
where
    E: MediaElement,
    S: Scheduler,
    F: FnMut(NormalizedEvent),
{
    /// Create a normalizer with the default debounce window
    pub fn new(element: E, scheduler: S, callback: F) -> Self {
        Self::with_config(element, scheduler, NormalizerConfig::default(), callback)
    }

    /// Create a normalizer with an explicit configuration
    pub fn with_config(element: E, scheduler: S, config: NormalizerConfig, callback: F) -> Self {
        Self {
            element,
            scheduler,
            callback,
            config,
            state: PlaybackState::default(),
            debounce: None,
        }
    }

    /// Current playback state
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn element(&self) -> &E {
        &self.element
    }

    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    /// Whether a buffering debounce is armed
    pub fn has_pending_debounce(&self) -> bool {
        self.debounce.is_some()
    }

    /// Route a raw event to its handler. Events outside the normalized
    /// vocabulary are ignored.
    pub fn handle(&mut self, event: MediaEvent) {
        trace!(event = %event, "Raw event");

        match event {
            MediaEvent::CanPlayThrough => self.on_can_play_through(),
            MediaEvent::Ended => self.on_ended(),
            MediaEvent::Pause => self.on_pause(),
            MediaEvent::Play => self.on_play(),
            MediaEvent::Playing => self.on_playing(),
            MediaEvent::RateChange => self.on_ratechange(),
            MediaEvent::Seeked => self.on_seeked(),
            MediaEvent::Seeking => self.on_seeking(),
            MediaEvent::TimeUpdate => self.on_timeupdate(),
            MediaEvent::Waiting => self.on_waiting(),
            _ => trace!(event = %event, "Ignoring unnormalized event"),
        }
    }

    /// Detach from the engine: disarm the pending debounce
    pub fn unsubscribe(&mut self) {
        self.cancel_debounce();
    }

    /// A debounce timer fired. Stale timers are ignored; otherwise the stall
    /// condition is re-checked before it is reported as buffering.
    pub fn on_debounce_elapsed(&mut self, id: TimerId) {
        if self.debounce != Some(id) {
            trace!(timer = %id, "Ignoring stale debounce timer");
            return;
        }
        self.debounce = None;

        if self.should_trigger_ratechange_buffer() {
            debug!(timer = %id, "Zero playback rate persisted, treating as waiting");
            self.on_waiting();
        }
    }

    pub fn on_can_play_through(&mut self) {
        if !self.state.loading {
            return;
        }

        // Some engines zero the rate while they still buffer internally
        if self.has_zero_rate() {
            debug!("Deferring loaded until the playback rate is positive");
            self.state = PlaybackState {
                defer_loaded_event: true,
                ..self.state
            };
        } else {
            self.state = PlaybackState {
                defer_loaded_event: false,
                loading: false,
                ..self.state
            };
            self.emit(NormalizedEvent::Loaded);
        }
    }

    pub fn on_ended(&mut self) {
        self.state = PlaybackState {
            buffering: false,
            ended: true,
            loading: false,
            paused: true,
            seeking: false,
            ..self.state
        };

        self.cancel_debounce();
        self.emit(NormalizedEvent::Ended);
    }

    /// Only a resume from pause is announced here; the first start is
    /// announced by `playing` alone.
    pub fn on_play(&mut self) {
        if self.state.is_not_ready() {
            return;
        }
        if !self.state.paused || !self.state.initial_play_triggered {
            return;
        }

        self.state = PlaybackState {
            play_requested: true,
            ..self.state
        };
        self.emit(NormalizedEvent::Play);
    }

    /// Closes out at most one of first start, buffering or seeking, then
    /// completes a pending resume. Up to two events in that order.
    pub fn on_playing(&mut self) {
        self.cancel_debounce();

        if self.state.is_not_ready() {
            trace!("Ignoring playing before ready");
            return;
        }

        let current = self.state;
        // Never reset: every later positive rate change re-checks this handler
        let mut next = PlaybackState {
            defer_playing_event: true,
            ..current
        };

        if !current.initial_play_triggered {
            next.initial_play_triggered = true;
            next.paused = false;
            next.play_requested = false;
            self.emit(NormalizedEvent::Playing);
        } else if current.buffering {
            next.buffering = false;
            self.emit(NormalizedEvent::Buffered);
        } else if current.seeking {
            next.seeking = false;
            next.defer_seeked_event = false;
            self.emit(NormalizedEvent::Seeked);
        }

        if current.paused && current.play_requested {
            next.paused = false;
            next.play_requested = false;
            self.emit(NormalizedEvent::Playing);
        }

        self.state = next;
    }

    pub fn on_pause(&mut self) {
        let current = self.state;
        if !current.play_requested && current.paused {
            return;
        }

        let mut next = PlaybackState {
            play_requested: false,
            ..current
        };

        if current.defer_loaded_event {
            // The stream paused before the rate recovered; release the load
            next.loading = false;
            next.defer_loaded_event = false;
            self.emit(NormalizedEvent::Loaded);

            if self.element.paused() {
                next.paused = true;
                self.emit(NormalizedEvent::Pause);
            }
        } else {
            next.paused = true;
            self.emit(NormalizedEvent::Pause);
        }

        self.state = next;
    }

    pub fn on_ratechange(&mut self) {
        self.cancel_debounce();

        let has_positive_rate = self.element.playback_rate() > 0.0;

        // Order matters: load, then seeked, then playing
        if self.state.defer_loaded_event && has_positive_rate {
            self.on_can_play_through();
        }
        if self.state.defer_seeked_event && has_positive_rate {
            self.on_seeked();
        }
        if self.state.defer_playing_event && has_positive_rate {
            self.on_playing();
        }

        if self.state.is_not_ready() {
            return;
        }

        if self.should_trigger_ratechange_buffer() {
            let delay = self.config.debounce();
            let id = self.scheduler.schedule(delay);
            debug!(timer = %id, delay_ms = self.config.debounce_ms, "Playback rate dropped to zero, debouncing");
            self.debounce = Some(id);
        } else if self.state.buffering && has_positive_rate {
            self.state = PlaybackState {
                buffering: false,
                ..self.state
            };
            self.emit(NormalizedEvent::Buffered);
        }
    }

    pub fn on_seeked(&mut self) {
        if self.state.is_not_ready() {
            return;
        }

        // A seeked without a seek in progress is reachable when a deferred
        // load resolves between seeking and seeked
        if !self.state.seeking {
            trace!("Ignoring seeked without a seek in progress");
            return;
        }

        if self.has_zero_rate() {
            debug!("Deferring seeked until the playback rate is positive");
            self.state = PlaybackState {
                defer_seeked_event: true,
                ..self.state
            };
            return;
        }

        self.state = PlaybackState {
            defer_seeked_event: false,
            seeking: false,
            ..self.state
        };
        self.emit(NormalizedEvent::Seeked);
    }

    pub fn on_seeking(&mut self) {
        if self.state.is_not_ready() {
            return;
        }

        // Close the buffer measurement before the seek starts
        if self.state.buffering {
            self.emit(NormalizedEvent::Buffered);
        }

        self.state = PlaybackState {
            buffering: false,
            seeking: true,
            ..self.state
        };
        self.emit(NormalizedEvent::Seeking);
    }

    pub fn on_timeupdate(&mut self) {
        if self.state.is_not_ready() {
            return;
        }

        if self.state.buffering && !self.element.paused() {
            self.state = PlaybackState {
                buffering: false,
                ..self.state
            };
            self.emit(NormalizedEvent::Buffered);
        }

        self.emit(NormalizedEvent::TimeUpdate);
    }

    pub fn on_waiting(&mut self) {
        self.cancel_debounce();

        if self.state.is_not_ready() {
            return;
        }
        // Stalls during a seek are part of the seek
        if self.state.seeking {
            return;
        }

        // Not every engine fires seeking before waiting
        if self.element.seeking() {
            debug!("Waiting arrived before seeking, treating as seeking");
            self.on_seeking();
            return;
        }

        if self.state.buffering {
            return;
        }

        self.state = PlaybackState {
            buffering: true,
            ..self.state
        };
        self.emit(NormalizedEvent::Buffering);
    }

    fn should_trigger_ratechange_buffer(&self) -> bool {
        !self.state.seeking
            && !self.state.buffering
            && self.has_zero_rate()
            && !self.element.seeking()
    }

    fn has_zero_rate(&self) -> bool {
        self.element.playback_rate() == 0.0
    }

    fn cancel_debounce(&mut self) {
        if let Some(id) = self.debounce.take() {
            trace!(timer = %id, "Cancelling debounce");
            self.scheduler.cancel(id);
        }
    }

    fn emit(&mut self, event: NormalizedEvent) {
        debug!(event = %event, "Normalized event");
        (self.callback)(event);
    }
}

impl<E, F> Normalizer<E, ManualScheduler, F>
where
    E: MediaElement,
    F: FnMut(NormalizedEvent),
{
    /// Advance virtual time, delivering any debounce timers that came due
    pub fn advance(&mut self, by: Duration) {
        let until = self.scheduler.now().saturating_add(by);
        while self.fire_next_due(until) {}
    }

    /// Deliver the earliest debounce timer due by `until` with the clock at
    /// its deadline. Once nothing is due the clock moves to `until` and this
    /// returns false.
    pub fn fire_next_due(&mut self, until: Duration) -> bool {
        match self.scheduler.fire_next(until) {
            Some(id) => {
                self.on_debounce_elapsed(id);
                true
            }
            None => {
                self.scheduler.advance_to(until);
                false
            }
        }
    }
}
