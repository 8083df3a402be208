//! Collect-then-print view of the reading set.

use std::borrow::Borrow;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use controlcore_config::Config;
use controlcore_core::{Client, Freshness, Reading, group_by_logical, group_by_physical};

use crate::cli::{GlobalOpts, GroupBy, OutputFormat, SnapshotArgs};
use crate::config;
use crate::error::CliError;
use crate::output;

use super::util::{self, ReadingRow};

/// A reading with its freshness at render time, for structured output.
#[derive(Serialize)]
struct ReadingView {
    #[serde(flatten)]
    reading: Arc<Reading>,
    freshness: Freshness,
}

impl Borrow<Reading> for ReadingView {
    fn borrow(&self) -> &Reading {
        &self.reading
    }
}

fn view(reading: &Arc<Reading>, now: DateTime<Utc>, stale_after: f64) -> ReadingView {
    ReadingView {
        reading: Arc::clone(reading),
        freshness: Freshness::evaluate_at(reading.captured_at, now, stale_after),
    }
}

fn section(title: &str, rows: Vec<ReadingRow>) -> String {
    format!("{title}\n{}", output::render_table(&rows))
}

/// Render `readings` grouped as requested.
fn render(
    readings: &[Arc<Reading>],
    group: GroupBy,
    format: &OutputFormat,
    now: DateTime<Utc>,
    stale_after: f64,
    color: bool,
) -> Result<String, CliError> {
    let row = |r: &Arc<Reading>| ReadingRow::new(r, now, stale_after, color);
    let to_view = |r: &Arc<Reading>| view(r, now, stale_after);

    match (group, format) {
        (GroupBy::None, _) | (_, OutputFormat::Plain) => {
            let views: Vec<ReadingView> = readings.iter().map(to_view).collect();
            output::render_list(
                format,
                &views,
                |v| row(&v.reading),
                |v| format!("{} {}", v.reading.sensor_id, v.freshness),
            )
        }

        (GroupBy::Physical, OutputFormat::Table) => {
            let grouped = group_by_physical(readings.iter().cloned());
            let sections: Vec<String> = grouped
                .iter()
                .flat_map(|(station, controllers)| {
                    controllers.iter().map(move |(controller, items)| {
                        section(
                            &format!("{station} / {controller}"),
                            items.iter().map(row).collect(),
                        )
                    })
                })
                .collect();
            Ok(sections.join("\n\n"))
        }

        (GroupBy::Physical, _) => {
            let grouped = group_by_physical(readings.iter().map(to_view));
            output::render_single(format, &grouped, |_| String::new(), |_| String::new())
        }

        (GroupBy::Logical, OutputFormat::Table) => {
            let grouped = group_by_logical(readings.iter().cloned());
            let sections: Vec<String> = grouped
                .iter()
                .map(|(sensor_type, items)| {
                    let title = if sensor_type.is_empty() {
                        "(untyped)"
                    } else {
                        sensor_type.as_str()
                    };
                    section(
                        &format!("{title} ({})", items.len()),
                        items.iter().map(row).collect(),
                    )
                })
                .collect();
            Ok(sections.join("\n\n"))
        }

        (GroupBy::Logical, _) => {
            let grouped = group_by_logical(readings.iter().map(to_view));
            output::render_single(format, &grouped, |_| String::new(), |_| String::new())
        }
    }
}

pub async fn handle(
    client: &Client,
    args: SnapshotArgs,
    cfg: &Config,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let stale_after = config::stale_after(args.stale_after, cfg)?;

    util::connect(client, args.listen).await?;
    if !global.quiet {
        eprintln!(
            "Listening on {} for {}...",
            client.namespace().data_filter(),
            humantime::format_duration(args.listen)
        );
    }
    tokio::time::sleep(args.listen).await;

    let now = Utc::now();
    let snapshot = client.store().snapshot();
    let readings: Vec<Arc<Reading>> = snapshot
        .iter()
        .filter(|r| !args.fresh_only || r.is_fresh(stale_after))
        .cloned()
        .collect();

    if readings.is_empty() {
        if !global.quiet {
            eprintln!("No readings received.");
        }
        return Ok(());
    }

    let out = render(
        &readings,
        args.group,
        &global.output,
        now,
        stale_after,
        output::should_color(&global.color),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
