//! `stream` command: drive a consumer and print its log

use std::io::Write;

use anyhow::{Context, Result};
use tracing::info;

use tally_core::{HttpEventSource, TimerStreamConsumer};

/// Stream from `url`, printing each new line until the stream stops
///
/// Ctrl+C or reaching `stop_after` lines calls `stop()` on the consumer.
pub async fn run(url: &str, stop_after: Option<usize>) -> Result<()> {
    let consumer = TimerStreamConsumer::new(HttpEventSource::new(url));
    consumer
        .start()
        .await
        .with_context(|| format!("Failed to open stream at {url}"))?;
    info!(url, "Streaming");

    let mut streaming = consumer.subscribe_streaming();
    let mut log_len = consumer.subscribe_log();
    let mut printed = 0;
    let mut stdout = std::io::stdout();

    loop {
        printed = print_new_lines(&consumer.log(), printed, stop_after, &mut stdout)?;

        if stop_after.is_some_and(|limit| printed >= limit) {
            info!(printed, "Line limit reached, stopping");
            consumer.stop();
            break;
        }
        if !*streaming.borrow_and_update() {
            break;
        }

        tokio::select! {
            changed = log_len.changed() => changed.context("Consumer dropped")?,
            changed = streaming.changed() => changed.context("Consumer dropped")?,
            ctrl_c = tokio::signal::ctrl_c() => {
                ctrl_c.context("Failed to listen for Ctrl+C")?;
                info!("Interrupted, stopping");
                consumer.stop();
            }
        }
    }

    // Lines that landed between the last print and the stop
    print_new_lines(&consumer.log(), printed, stop_after, &mut stdout)?;

    if consumer.exits_received() > 0 {
        info!("Stream finished");
    }
    Ok(())
}

/// Print `log` lines past `printed`, never beyond `limit`; returns the new count
fn print_new_lines(
    log: &[String],
    printed: usize,
    limit: Option<usize>,
    out: &mut impl Write,
) -> Result<usize> {
    let end = limit.map_or(log.len(), |limit| log.len().min(limit));
    for line in log.iter().take(end).skip(printed) {
        writeln!(out, "{line}")?;
    }
    out.flush()?;
    Ok(end.max(printed))
}
