//! CLI command implementations

use crate::output::{self, OutputFormat};
use anyhow::Context;
use kino_playback::{subscribe, NormalizerConfig, SharedElement, Trace, TraceStep};
use std::path::Path;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tracing::{info, warn};

/// Resolve the debounce override against a fallback configuration
fn resolve_config(debounce_ms: Option<u64>, fallback: NormalizerConfig) -> anyhow::Result<NormalizerConfig> {
    let config = debounce_ms
        .map(NormalizerConfig::with_debounce_ms)
        .unwrap_or(fallback);
    config.validate()?;
    Ok(config)
}

/// Replay a trace file
pub fn replay(
    path: &Path,
    show_state: bool,
    debounce_ms: Option<u64>,
    format: &str,
) -> anyhow::Result<()> {
    let trace = Trace::load(path)
        .with_context(|| format!("Failed to load trace {}", path.display()))?;
    let config = resolve_config(debounce_ms, trace.config())?;

    info!(
        trace = %path.display(),
        steps = trace.steps.len(),
        debounce_ms = config.debounce_ms,
        "Replaying trace"
    );

    let replay = trace.replay_with(config);
    output::print_replay(&replay, show_state, OutputFormat::from(format));

    Ok(())
}

/// Run a live session fed from stdin
pub async fn watch(debounce_ms: Option<u64>, format: &str) -> anyhow::Result<()> {
    let config = resolve_config(debounce_ms, NormalizerConfig::default())?;
    let format = OutputFormat::from(format);

    let element = SharedElement::default();
    let (raw_tx, raw_rx) = broadcast::channel(256);
    let subscription = subscribe(element.clone(), raw_rx, config, move |event| {
        output::print_live(event, format)
    })?;

    eprintln!("Reading raw events from stdin (Ctrl-D to stop)");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.split('#').next().unwrap_or_default().trim();
        if line.is_empty() {
            continue;
        }

        match line.parse::<TraceStep>() {
            Ok(TraceStep::Event(event)) => {
                raw_tx.send(event).context("Normalizer stopped")?;
            }
            Ok(TraceStep::Set(patch)) => element.apply(patch),
            Ok(TraceStep::Advance { ms }) => tokio::time::sleep(Duration::from_millis(ms)).await,
            Err(e) => warn!(input = line, error = %e, "Ignoring input"),
        }
    }

    let state = subscription.unsubscribe().await?;
    output::print_state(&state, format);

    Ok(())
}

/// List the raw event vocabulary
pub fn events(format: &str) {
    output::print_events(OutputFormat::from(format));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debounce_override() {
        let config = resolve_config(Some(120), NormalizerConfig::default()).unwrap();
        assert_eq!(config.debounce_ms, 120);

        let config = resolve_config(None, NormalizerConfig::with_debounce_ms(80)).unwrap();
        assert_eq!(config.debounce_ms, 80);

        assert!(resolve_config(Some(0), NormalizerConfig::default()).is_err());
    }
}
