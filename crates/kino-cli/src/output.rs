//! Output formatting for CLI

use console::style;
use kino_playback::{MediaEvent, NormalizedEvent, PlaybackState, Replay};
use serde::Serialize;
use tabled::{Table, Tabled};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    Table,
}

impl From<&str> for OutputFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            "table" => OutputFormat::Table,
            _ => OutputFormat::Text,
        }
    }
}

/// Pretty JSON, falling back to an empty object
pub fn to_json<T: Serialize>(data: &T) -> String {
    serde_json::to_string_pretty(data).unwrap_or_else(|_| "{}".to_string())
}

#[derive(Tabled)]
struct EmissionRow {
    step: usize,
    #[tabled(rename = "time (ms)")]
    at_ms: u64,
    event: NormalizedEvent,
}

#[derive(Tabled)]
struct FlagRow {
    flag: &'static str,
    value: bool,
}

#[derive(Tabled)]
struct EventRow {
    event: MediaEvent,
    normalized: bool,
}

#[derive(Serialize)]
struct ReplayOutput<'a> {
    emissions: &'a [kino_playback::Emission],
    elapsed_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    state: Option<&'a PlaybackState>,
}

/// Colour an event by the kind of transition it reports
pub fn styled_event(event: NormalizedEvent) -> String {
    let styled = match event {
        NormalizedEvent::Loaded | NormalizedEvent::Playing | NormalizedEvent::Play => {
            style(event).green()
        }
        NormalizedEvent::Buffering | NormalizedEvent::Seeking => style(event).yellow(),
        NormalizedEvent::Buffered | NormalizedEvent::Seeked => style(event).cyan(),
        NormalizedEvent::Pause | NormalizedEvent::Ended => style(event).magenta(),
        NormalizedEvent::TimeUpdate => style(event).dim(),
    };
    styled.to_string()
}

pub fn print_replay(replay: &Replay, show_state: bool, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let output = ReplayOutput {
                emissions: &replay.emissions,
                elapsed_ms: replay.elapsed_ms,
                state: show_state.then_some(&replay.state),
            };
            println!("{}", to_json(&output));
        }
        OutputFormat::Table => {
            let rows = replay.emissions.iter().map(|e| EmissionRow {
                step: e.step,
                at_ms: e.at_ms,
                event: e.event,
            });
            println!("{}", Table::new(rows));
            if show_state {
                print_state(&replay.state, format);
            }
        }
        OutputFormat::Text => {
            for emission in &replay.emissions {
                println!(
                    "{:>6}ms  step {:<4} {}",
                    emission.at_ms,
                    emission.step,
                    styled_event(emission.event)
                );
            }
            println!(
                "\n{} events in {}ms",
                replay.emissions.len(),
                replay.elapsed_ms
            );
            if show_state {
                print_state(&replay.state, format);
            }
        }
    }
}

fn state_flags(state: &PlaybackState) -> [(&'static str, bool); 10] {
    [
        ("loading", state.loading),
        ("paused", state.paused),
        ("buffering", state.buffering),
        ("seeking", state.seeking),
        ("ended", state.ended),
        ("initial_play_triggered", state.initial_play_triggered),
        ("play_requested", state.play_requested),
        ("defer_loaded_event", state.defer_loaded_event),
        ("defer_seeked_event", state.defer_seeked_event),
        ("defer_playing_event", state.defer_playing_event),
    ]
}

pub fn print_state(state: &PlaybackState, format: OutputFormat) {
    match format {
        OutputFormat::Json => println!("{}", to_json(state)),
        OutputFormat::Table => {
            let rows = state_flags(state)
                .into_iter()
                .map(|(flag, value)| FlagRow { flag, value });
            println!("{}", Table::new(rows));
        }
        OutputFormat::Text => {
            println!("\nFinal state:");
            for (flag, value) in state_flags(state) {
                let value = if value {
                    style("yes").green()
                } else {
                    style("no").dim()
                };
                println!("  {:<24} {}", flag, value);
            }
        }
    }
}

/// Print one event as it is emitted by a live session
pub fn print_live(event: NormalizedEvent, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::json!({ "event": event }));
        }
        OutputFormat::Table | OutputFormat::Text => println!("{}", styled_event(event)),
    }
}

pub fn print_events(format: OutputFormat) {
    let rows: Vec<EventRow> = MediaEvent::ALL
        .iter()
        .map(|event| EventRow {
            event: *event,
            normalized: event.is_normalized(),
        })
        .collect();

    match format {
        OutputFormat::Json => {
            let entries: Vec<_> = rows
                .iter()
                .map(|row| serde_json::json!({ "event": row.event, "normalized": row.normalized }))
                .collect();
            println!("{}", to_json(&entries));
        }
        OutputFormat::Table => println!("{}", Table::new(rows)),
        OutputFormat::Text => {
            for row in rows {
                if row.normalized {
                    println!("  {} {}", style("*").green(), row.event);
                } else {
                    println!("    {}", style(row.event).dim());
                }
            }
            println!("\n{} normalized to:", style("*").green());
            for event in NormalizedEvent::ALL {
                println!("    {}", styled_event(event));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_parsing() {
        assert_eq!(OutputFormat::from("JSON"), OutputFormat::Json);
        assert_eq!(OutputFormat::from("table"), OutputFormat::Table);
        assert_eq!(OutputFormat::from("anything"), OutputFormat::Text);
    }

    #[test]
    fn test_state_json() {
        let json = to_json(&PlaybackState::default());
        assert!(json.contains("\"loading\": true"));
    }
}
