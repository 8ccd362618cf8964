//! Subscription - wires a normalizer to a live media engine
//!
//! The engine broadcasts raw events; a spawned task owns the normalizer and
//! processes raw events and debounce firings one at a time, so handlers never
//! run concurrently. Must be called from within a Tokio runtime.

use crate::{
    config::NormalizerConfig,
    element::MediaElement,
    events::{MediaEvent, NormalizedEvent},
    normalizer::Normalizer,
    state::PlaybackState,
    timer::{Scheduler, TimerId},
    Result,
};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

/// Scheduler backed by Tokio timers.
///
/// Each timer is a task sleeping for its delay and then reporting its id on
/// the fired channel. Cancelling aborts the task.
pub struct TokioScheduler {
    next_id: u64,
    tasks: HashMap<TimerId, JoinHandle<()>>,
    fired_tx: mpsc::UnboundedSender<TimerId>,
}

impl TokioScheduler {
    pub fn new(fired_tx: mpsc::UnboundedSender<TimerId>) -> Self {
        Self {
            next_id: 0,
            tasks: HashMap::new(),
            fired_tx,
        }
    }

    /// Timers armed and not yet finished
    pub fn pending(&self) -> usize {
        self.tasks.values().filter(|task| !task.is_finished()).count()
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&mut self, delay: Duration) -> TimerId {
        self.tasks.retain(|_, task| !task.is_finished());

        self.next_id += 1;
        let id = TimerId(self.next_id);
        let fired_tx = self.fired_tx.clone();

        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = fired_tx.send(id);
        });
        self.tasks.insert(id, task);

        id
    }

    fn cancel(&mut self, id: TimerId) {
        if let Some(task) = self.tasks.remove(&id) {
            task.abort();
        }
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        for (_, task) in self.tasks.drain() {
            task.abort();
        }
    }
}

/// Handle to a running subscription.
///
/// Dropping the handle also stops the task, but only
/// [`Subscription::unsubscribe`] reports the final state.
pub struct Subscription {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<PlaybackState>,
}

impl Subscription {
    /// Whether the task is still processing events
    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }

    /// Stop delivering raw events, cancel any pending timer and return the
    /// final playback state
    pub async fn unsubscribe(self) -> Result<PlaybackState> {
        let Subscription { shutdown, task } = self;
        let _ = shutdown.send(());
        let state = task.await?;
        info!("Unsubscribed from media element");
        Ok(state)
    }
}

/// Subscribe a fresh normalizer to an engine's raw events
#[instrument(skip(element, raw_events, callback))]
pub fn subscribe<E, F>(
    element: E,
    raw_events: broadcast::Receiver<MediaEvent>,
    config: NormalizerConfig,
    callback: F,
) -> Result<Subscription>
where
    E: MediaElement + Send + 'static,
    F: FnMut(NormalizedEvent) + Send + 'static,
{
    config.validate()?;

    let (fired_tx, fired_rx) = mpsc::unbounded_channel();
    let (shutdown, shutdown_rx) = oneshot::channel::<()>();

    info!(debounce_ms = config.debounce_ms, "Subscribing to media element");

    let normalizer =
        Normalizer::with_config(element, TokioScheduler::new(fired_tx), config, callback);
    let task = tokio::spawn(drive(normalizer, shutdown_rx, fired_rx, raw_events));

    Ok(Subscription { shutdown, task })
}

/// Process raw events and timer firings until shutdown or the source closes.
///
/// Raw events win over fired timers: a queued `playing` or `waiting` cancels
/// the debounce before its firing is looked at, which then finds it stale.
async fn drive<E, F>(
    mut normalizer: Normalizer<E, TokioScheduler, F>,
    mut shutdown_rx: oneshot::Receiver<()>,
    mut fired_rx: mpsc::UnboundedReceiver<TimerId>,
    mut raw_events: broadcast::Receiver<MediaEvent>,
) -> PlaybackState
where
    E: MediaElement,
    F: FnMut(NormalizedEvent),
{
    loop {
        tokio::select! {
            biased;

            _ = &mut shutdown_rx => {
                debug!("Shutdown requested");
                break;
            }
            received = raw_events.recv() => match received {
                Ok(event) => normalizer.handle(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Raw event receiver lagged, events were dropped");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    info!("Raw event source closed");
                    break;
                }
            },
            Some(id) = fired_rx.recv() => normalizer.on_debounce_elapsed(id),
        }
    }

    normalizer.unsubscribe();
    normalizer.state()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::SharedElement;
    use tokio::time::Instant;

    fn wire(
        element: &SharedElement,
    ) -> (
        broadcast::Sender<MediaEvent>,
        mpsc::UnboundedReceiver<NormalizedEvent>,
        Subscription,
    ) {
        let (raw_tx, raw_rx) = broadcast::channel(64);
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let subscription = subscribe(element.clone(), raw_rx, NormalizerConfig::default(), move |event| {
            let _ = out_tx.send(event);
        })
        .unwrap();
        (raw_tx, out_rx, subscription)
    }

    #[tokio::test(start_paused = true)]
    async fn test_events_flow_through_task() {
        let element = SharedElement::default();
        let (raw_tx, mut out_rx, subscription) = wire(&element);

        raw_tx.send(MediaEvent::LoadStart).unwrap();
        raw_tx.send(MediaEvent::CanPlayThrough).unwrap();
        raw_tx.send(MediaEvent::Playing).unwrap();

        assert_eq!(out_rx.recv().await, Some(NormalizedEvent::Loaded));
        assert_eq!(out_rx.recv().await, Some(NormalizedEvent::Playing));
        assert!(subscription.is_active());

        let state = tokio_test::assert_ok!(subscription.unsubscribe().await);
        assert!(state.initial_play_triggered);
        assert!(!state.loading);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_rate_reports_buffering_after_debounce() {
        let element = SharedElement::default();
        let (raw_tx, mut out_rx, subscription) = wire(&element);

        raw_tx.send(MediaEvent::CanPlayThrough).unwrap();
        raw_tx.send(MediaEvent::Playing).unwrap();
        assert_eq!(out_rx.recv().await, Some(NormalizedEvent::Loaded));
        assert_eq!(out_rx.recv().await, Some(NormalizedEvent::Playing));

        let started = Instant::now();
        element.set_playback_rate(0.0);
        raw_tx.send(MediaEvent::RateChange).unwrap();

        assert_eq!(out_rx.recv().await, Some(NormalizedEvent::Buffering));
        assert!(started.elapsed() >= Duration::from_millis(50));

        let state = subscription.unsubscribe().await.unwrap();
        assert!(state.buffering);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_blip_is_swallowed() {
        let element = SharedElement::default();
        let (raw_tx, mut out_rx, subscription) = wire(&element);

        raw_tx.send(MediaEvent::CanPlayThrough).unwrap();
        raw_tx.send(MediaEvent::Playing).unwrap();
        assert_eq!(out_rx.recv().await, Some(NormalizedEvent::Loaded));
        assert_eq!(out_rx.recv().await, Some(NormalizedEvent::Playing));

        element.set_playback_rate(0.0);
        raw_tx.send(MediaEvent::RateChange).unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        element.set_playback_rate(1.0);
        raw_tx.send(MediaEvent::RateChange).unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;

        let state = subscription.unsubscribe().await.unwrap();
        assert!(!state.buffering);
        assert!(out_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_queued_raw_event_handled_before_fired_timer() {
        let element = SharedElement::default();
        let (raw_tx, raw_rx) = broadcast::channel(8);
        let (fired_tx, fired_rx) = mpsc::unbounded_channel();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel();
        let (_shutdown, shutdown_rx) = oneshot::channel();

        let mut normalizer = Normalizer::new(
            element.clone(),
            TokioScheduler::new(fired_tx.clone()),
            move |event| {
                let _ = out_tx.send(event);
            },
        );
        normalizer.handle(MediaEvent::CanPlayThrough);
        normalizer.handle(MediaEvent::Playing);
        assert_eq!(out_rx.try_recv(), Ok(NormalizedEvent::Loaded));
        assert_eq!(out_rx.try_recv(), Ok(NormalizedEvent::Playing));

        element.set_playback_rate(0.0);
        normalizer.handle(MediaEvent::RateChange);
        assert!(normalizer.has_pending_debounce());

        // The timer fired while `playing` was already queued
        raw_tx.send(MediaEvent::Playing).unwrap();
        fired_tx.send(TimerId::new(1)).unwrap();
        drop(raw_tx);

        let state = drive(normalizer, shutdown_rx, fired_rx, raw_rx).await;
        assert!(!state.buffering);
        assert!(out_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_closed_source_ends_task() {
        let element = SharedElement::default();
        let (raw_tx, _out_rx, subscription) = wire(&element);

        drop(raw_tx);
        let state = subscription.unsubscribe().await.unwrap();
        assert_eq!(state, PlaybackState::default());
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let (_raw_tx, raw_rx) = broadcast::channel(4);
        let result = subscribe(
            SharedElement::default(),
            raw_rx,
            NormalizerConfig::with_debounce_ms(0),
            |_| {},
        );
        assert!(result.is_err());
    }
}
