//! Recorded raw-event traces and deterministic replay
//!
//! A trace is a sequence of steps against a simulated element: fire a raw
//! event, change element attributes, or let virtual time pass. Replaying runs
//! the normalizer on a [`ManualScheduler`] so debounce behaviour is exact.
//!
//! Two encodings are accepted. JSON:
//!
//! ```json
//! { "debounce_ms": 50, "element": { "playback_rate": 1.0 },
//!   "steps": [ { "event": "canplaythrough" }, { "set": { "playback_rate": 0 } },
//!              { "event": "ratechange" }, { "advance": { "ms": 60 } } ] }
//! ```
//!
//! and a line format, one step per line, `#` starting a comment:
//!
//! ```text
//! canplaythrough
//! rate 0
//! ratechange
//! advance 60
//! ```

use crate::{
    config::NormalizerConfig,
    element::{ElementPatch, ElementSnapshot, SharedElement},
    events::{MediaEvent, NormalizedEvent},
    normalizer::Normalizer,
    state::PlaybackState,
    timer::ManualScheduler,
    Error, Result,
};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

/// One step of a trace
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceStep {
    /// Deliver a raw event
    Event(MediaEvent),
    /// Change element attributes
    Set(ElementPatch),
    /// Let virtual time pass
    Advance { ms: u64 },
}

impl FromStr for TraceStep {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.split_whitespace();
        let head = parts
            .next()
            .ok_or_else(|| Error::Trace("empty step".to_string()))?;
        let arg = parts.next();
        if parts.next().is_some() {
            return Err(Error::Trace(format!("too many arguments in '{}'", s.trim())));
        }

        let step = match (head, arg) {
            ("rate", Some(value)) => TraceStep::Set(ElementPatch {
                playback_rate: Some(parse_value(head, value)?),
                ..Default::default()
            }),
            ("paused", Some(value)) => TraceStep::Set(ElementPatch {
                paused: Some(parse_value(head, value)?),
                ..Default::default()
            }),
            ("seeking", Some(value)) => TraceStep::Set(ElementPatch {
                seeking: Some(parse_value(head, value)?),
                ..Default::default()
            }),
            ("advance", Some(value)) => TraceStep::Advance {
                ms: parse_value(head, value)?,
            },
            (name, None) => TraceStep::Event(name.parse()?),
            (name, Some(_)) => {
                return Err(Error::Trace(format!("unexpected argument for '{}'", name)))
            }
        };

        Ok(step)
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| Error::Trace(format!("invalid value '{}' for '{}'", value, key)))
}

/// A recorded session against a simulated element
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    /// Debounce window override
    #[serde(default)]
    pub debounce_ms: Option<u64>,
    /// Element attributes before the first step
    #[serde(default)]
    pub element: ElementSnapshot,
    pub steps: Vec<TraceStep>,
}

/// A normalized event produced while replaying
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Emission {
    /// Index of the step that produced the event
    pub step: usize,
    /// Virtual time in milliseconds
    pub at_ms: u64,
    pub event: NormalizedEvent,
}

/// Outcome of a replay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Replay {
    pub emissions: Vec<Emission>,
    pub state: PlaybackState,
    pub elapsed_ms: u64,
}

impl Replay {
    /// Emitted events without step information
    pub fn events(&self) -> Vec<NormalizedEvent> {
        self.emissions.iter().map(|e| e.event).collect()
    }
}

impl Trace {
    pub fn new(steps: Vec<TraceStep>) -> Self {
        Self {
            steps,
            ..Default::default()
        }
    }

    /// Parse a JSON trace
    pub fn from_json(input: &str) -> Result<Self> {
        let trace: Trace = serde_json::from_str(input)?;
        trace.validate()?;
        Ok(trace)
    }

    /// Parse a line trace
    pub fn from_lines(input: &str) -> Result<Self> {
        let mut steps = Vec::new();

        for (index, raw) in input.lines().enumerate() {
            let line = raw.split('#').next().unwrap_or_default().trim();
            if line.is_empty() {
                continue;
            }
            let step = line.parse::<TraceStep>().map_err(|e| match e {
                Error::UnknownEvent { name } => {
                    Error::Trace(format!("line {}: unknown event '{}'", index + 1, name))
                }
                Error::Trace(msg) => Error::Trace(format!("line {}: {}", index + 1, msg)),
                other => other,
            })?;
            steps.push(step);
        }

        let trace = Trace::new(steps);
        trace.validate()?;
        Ok(trace)
    }

    /// Load a trace file; `.json` files are JSON, anything else is lines
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;

        let is_json = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        if is_json {
            Self::from_json(&contents)
        } else {
            Self::from_lines(&contents)
        }
    }

    /// Configuration the trace asks for
    pub fn config(&self) -> NormalizerConfig {
        self.debounce_ms
            .map(NormalizerConfig::with_debounce_ms)
            .unwrap_or_default()
    }

    pub fn validate(&self) -> Result<()> {
        self.config().validate()?;

        if self.steps.is_empty() {
            return Err(Error::Trace("trace has no steps".to_string()));
        }
        if self.element.playback_rate < 0.0 {
            return Err(Error::Trace("initial playback rate is negative".to_string()));
        }
        for (index, step) in self.steps.iter().enumerate() {
            if let TraceStep::Set(ElementPatch {
                playback_rate: Some(rate),
                ..
            }) = step
            {
                if !rate.is_finite() || *rate < 0.0 {
                    return Err(Error::Trace(format!(
                        "step {}: playback rate must be finite and non-negative",
                        index
                    )));
                }
            }
        }

        Ok(())
    }

    /// Replay with the trace's own configuration
    pub fn replay(&self) -> Replay {
        self.replay_with(self.config())
    }

    /// Replay with an explicit configuration
    pub fn replay_with(&self, config: NormalizerConfig) -> Replay {
        let element = SharedElement::new(self.element);
        let pending = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&pending);

        let mut normalizer = Normalizer::with_config(
            element.clone(),
            ManualScheduler::new(),
            config,
            move |event| sink.borrow_mut().push(event),
        );

        let mut emissions = Vec::new();
        let mut collect = |step: usize, at: Duration| {
            emissions.extend(pending.borrow_mut().drain(..).map(|event| Emission {
                step,
                at_ms: saturating_millis(at),
                event,
            }));
        };

        for (index, step) in self.steps.iter().enumerate() {
            match *step {
                TraceStep::Event(event) => normalizer.handle(event),
                TraceStep::Set(patch) => element.apply(patch),
                TraceStep::Advance { ms } => {
                    let until = normalizer
                        .scheduler()
                        .now()
                        .saturating_add(Duration::from_millis(ms));
                    while normalizer.fire_next_due(until) {
                        collect(index, normalizer.scheduler().now());
                    }
                }
            }
            collect(index, normalizer.scheduler().now());
        }

        let elapsed_ms = saturating_millis(normalizer.scheduler().now());
        debug!(steps = self.steps.len(), emitted = emissions.len(), "Trace replayed");

        Replay {
            emissions,
            state: normalizer.state(),
            elapsed_ms,
        }
    }
}

fn saturating_millis(at: Duration) -> u64 {
    u64::try_from(at.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_steps() {
        assert_eq!(
            "playing".parse::<TraceStep>().unwrap(),
            TraceStep::Event(MediaEvent::Playing)
        );
        assert_eq!(
            "advance 60".parse::<TraceStep>().unwrap(),
            TraceStep::Advance { ms: 60 }
        );
        assert_eq!(
            "rate 0".parse::<TraceStep>().unwrap(),
            TraceStep::Set(ElementPatch {
                playback_rate: Some(0.0),
                ..Default::default()
            })
        );
        assert!("paused maybe".parse::<TraceStep>().is_err());
        assert!("playing now".parse::<TraceStep>().is_err());
    }

    #[test]
    fn test_line_trace_reports_line_numbers() {
        let err = Trace::from_lines("canplaythrough\n\nrewind\n").unwrap_err();
        assert_eq!(err.to_string(), "Invalid trace: line 3: unknown event 'rewind'");
    }

    #[test]
    fn test_line_trace_comments() {
        let trace = Trace::from_lines("# load\ncanplaythrough # ready\nplaying\n").unwrap();
        assert_eq!(trace.steps.len(), 2);
    }

    #[test]
    fn test_json_trace() {
        let trace = Trace::from_json(
            r#"{
                "debounce_ms": 80,
                "element": { "playback_rate": 1.0, "paused": false },
                "steps": [
                    { "event": "canplaythrough" },
                    { "set": { "playback_rate": 0.0 } },
                    { "advance": { "ms": 10 } }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(trace.config().debounce_ms, 80);
        assert!(!trace.element.paused);
        assert_eq!(trace.steps[2], TraceStep::Advance { ms: 10 });
    }

    #[test]
    fn test_invalid_traces() {
        assert!(Trace::from_json(r#"{ "steps": [] }"#).is_err());
        assert!(Trace::from_json(r#"{ "debounce_ms": 0, "steps": [ { "event": "play" } ] }"#).is_err());
        assert!(Trace::from_lines("rate -1\n").is_err());
    }

    #[test]
    fn test_replay_tags_steps_and_time() {
        let trace = Trace::from_lines(
            "canplaythrough\nplaying\nrate 0\nratechange\nadvance 50\n",
        )
        .unwrap();
        let replay = trace.replay();

        assert_eq!(
            replay.events(),
            vec![
                NormalizedEvent::Loaded,
                NormalizedEvent::Playing,
                NormalizedEvent::Buffering
            ]
        );
        assert_eq!(replay.emissions[2].step, 4);
        assert_eq!(replay.emissions[2].at_ms, 50);
        assert_eq!(replay.elapsed_ms, 50);
        assert!(replay.state.buffering);
    }

    #[test]
    fn test_debounce_stamped_at_deadline() {
        let trace = Trace::from_lines(
            "canplaythrough\nplaying\nrate 0\nratechange\nadvance 1000\n",
        )
        .unwrap();
        let replay = trace.replay();

        let buffering = &replay.emissions[2];
        assert_eq!(buffering.event, NormalizedEvent::Buffering);
        assert_eq!(buffering.step, 4);
        assert_eq!(buffering.at_ms, 50);
        assert_eq!(replay.elapsed_ms, 1000);
    }

    #[test]
    fn test_elapsed_time_saturates() {
        let trace = Trace::from_lines(&format!(
            "canplaythrough\nadvance {max}\nadvance {max}\ntimeupdate\n",
            max = u64::MAX
        ))
        .unwrap();
        let replay = trace.replay();

        assert_eq!(replay.elapsed_ms, u64::MAX);
        assert_eq!(replay.emissions.last().unwrap().at_ms, u64::MAX);
    }
}
