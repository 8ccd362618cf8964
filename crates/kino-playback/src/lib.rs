//! Kino Playback - Playback Event Normalization for Kino
//!
//! Media engines report their lifecycle through loosely specified raw events
//! that may arrive out of order, twice, or not at all. This crate turns them
//! into a small, ordered vocabulary of semantic playback events:
//! - `loaded`, `playing`, `pause`, `play`, `ended`
//! - `buffering` / `buffered`, `seeking` / `seeked`
//! - `timeupdate`
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       Kino Playback                             │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐          │
//! │  │    Media     │  │   Playback   │  │  Scheduler   │          │
//! │  │   Element    │  │    State     │  │  (debounce)  │          │
//! │  └──────┬───────┘  └──────┬───────┘  └──────┬───────┘          │
//! │         │                 │                 │                   │
//! │         └─────────────────┼─────────────────┘                   │
//! │                           │                                     │
//! │                    ┌──────┴──────┐                              │
//! │                    │ Normalizer  │                              │
//! │                    └──────┬──────┘                              │
//! │                           │                                     │
//! │           ┌───────────────┼───────────────┐                     │
//! │    ┌──────┴───────┐              ┌────────┴─────┐               │
//! │    │ Subscription │              │    Trace     │               │
//! │    │   (tokio)    │              │    Replay    │               │
//! │    └──────────────┘              └──────────────┘               │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use kino_playback::{ManualScheduler, MediaEvent, NormalizedEvent, Normalizer, SharedElement};
//!
//! let element = SharedElement::default();
//! let mut events = Vec::new();
//! {
//!     let mut normalizer = Normalizer::new(element.clone(), ManualScheduler::new(), |e| events.push(e));
//!     normalizer.handle(MediaEvent::CanPlayThrough);
//!     normalizer.handle(MediaEvent::Playing);
//! }
//! assert_eq!(events, vec![NormalizedEvent::Loaded, NormalizedEvent::Playing]);
//! ```

pub mod config;
pub mod element;
pub mod error;
pub mod events;
pub mod normalizer;
pub mod state;
pub mod subscription;
pub mod timer;
pub mod trace;

pub use config::{NormalizerConfig, DEFAULT_DEBOUNCE_MS};
pub use element::{ElementPatch, ElementSnapshot, MediaElement, SharedElement};
pub use error::{Error, Result};
pub use events::{MediaEvent, NormalizedEvent};
pub use normalizer::Normalizer;
pub use state::PlaybackState;
pub use subscription::{subscribe, Subscription, TokioScheduler};
pub use timer::{ManualScheduler, Scheduler, TimerId};
pub use trace::{Emission, Replay, Trace, TraceStep};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the playback library
pub fn init() {
    tracing::info!(version = VERSION, "Kino Playback initialized");
}
