//! Live reading stream.

use chrono::Utc;
use tokio::sync::broadcast::error::RecvError;

use controlcore_config::Config;
use controlcore_core::{Client, Freshness, Reading};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::config;
use crate::error::CliError;
use crate::output;

use super::util;

/// One line per reading. Structured formats emit one document per line.
fn render_line(
    reading: &Reading,
    format: &OutputFormat,
    stale_after: f64,
    color: bool,
) -> Result<String, CliError> {
    match format {
        OutputFormat::Table => {
            let now = Utc::now();
            let freshness = Freshness::evaluate_at(reading.captured_at, now, stale_after);
            Ok(format!(
                "{}  {}/{}  {:<10} {:>12}  {}  {}",
                reading.captured_at.format("%H:%M:%S"),
                reading.station,
                reading.controller,
                reading.sensor_type,
                util::format_value(reading),
                output::paint_freshness(freshness, color),
                reading.sensor_id,
            ))
        }
        OutputFormat::Json | OutputFormat::JsonCompact => output::render_json(reading, true),
        OutputFormat::Yaml => Ok(format!("---\n{}", output::render_yaml(reading)?)),
        OutputFormat::Plain => Ok(format!("{} {}", reading.sensor_id, reading.value)),
    }
}

pub async fn handle(
    client: &Client,
    args: WatchArgs,
    cfg: &Config,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let stale_after = config::stale_after(args.stale_after, cfg)?;
    let color = output::should_color(&global.color);

    // Subscribe before connecting so nothing delivered in between is missed.
    let mut readings = client.readings();
    let mut state = client.watch_connection_state();
    client.connect().await?;

    if !global.quiet {
        eprintln!(
            "Watching {} on {} (Ctrl-C to stop)",
            client.namespace().data_filter(),
            client.config().broker
        );
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = *state.borrow_and_update();
                if !global.quiet {
                    eprintln!("[{}]", output::paint_state(current, color));
                }
            }
            received = readings.recv() => match received {
                Ok(reading) => {
                    if args
                        .sensor_type
                        .as_deref()
                        .is_some_and(|t| t != reading.sensor_type)
                    {
                        continue;
                    }
                    let line = render_line(&reading, &global.output, stale_after, color)?;
                    output::print_output(&line, global.quiet);
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "output fell behind; readings skipped");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    let stats = client.stats().snapshot();
    tracing::info!(
        delivered = stats.delivered,
        decode_failures = stats.decode_failures,
        reconnects = stats.reconnects,
        "watch finished"
    );
    Ok(())
}
