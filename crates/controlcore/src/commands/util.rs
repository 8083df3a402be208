//! Shared helpers for command handlers.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tabled::Tabled;

use controlcore_core::{Client, Freshness, Reading};

use crate::error::CliError;
use crate::output;

/// Start the session and wait for the broker to accept it.
pub async fn connect(client: &Client, wait: Duration) -> Result<(), CliError> {
    client.connect().await?;
    client.wait_until_connected(wait).await.map_err(|e| match e {
        controlcore_core::CoreError::Timeout { .. } => CliError::ConnectionFailed {
            url: client.config().broker.clone(),
            reason: format!("no answer within {}", humantime::format_duration(wait)),
        },
        other => other.into(),
    })?;
    tracing::info!(broker = %client.config().broker, "connected");
    Ok(())
}

// ── Reading rows ────────────────────────────────────────────────────

#[derive(Tabled)]
pub struct ReadingRow {
    #[tabled(rename = "Sensor")]
    pub sensor_id: String,
    #[tabled(rename = "Station")]
    pub station: String,
    #[tabled(rename = "Controller")]
    pub controller: String,
    #[tabled(rename = "Type")]
    pub sensor_type: String,
    #[tabled(rename = "Value")]
    pub value: String,
    #[tabled(rename = "Pin")]
    pub pin: String,
    #[tabled(rename = "Captured")]
    pub captured: String,
    #[tabled(rename = "Status")]
    pub status: String,
}

impl ReadingRow {
    pub fn new(reading: &Reading, now: DateTime<Utc>, stale_after: f64, color: bool) -> Self {
        let freshness = Freshness::evaluate_at(reading.captured_at, now, stale_after);
        Self {
            sensor_id: reading.sensor_id.clone(),
            station: reading.station.clone(),
            controller: reading.controller.clone(),
            sensor_type: reading.sensor_type.clone(),
            value: format_value(reading),
            pin: reading
                .pin_number()
                .map_or_else(|| "-".into(), |p| p.to_string()),
            captured: format_age(reading, now),
            status: output::paint_freshness(freshness, color),
        }
    }
}

pub fn format_value(reading: &Reading) -> String {
    if reading.unit.is_empty() {
        format!("{}", reading.value)
    } else {
        format!("{} {}", reading.value, reading.unit)
    }
}

/// Capture time plus a coarse age, e.g. `12:04:05 (3m ago)`.
pub fn format_age(reading: &Reading, now: DateTime<Utc>) -> String {
    let age = reading.age_at(now);
    let clock = reading.captured_at.format("%H:%M:%S");
    match age.to_std() {
        Ok(age) => {
            let rounded = Duration::from_secs(age.as_secs());
            format!("{clock} ({} ago)", humantime::format_duration(rounded))
        }
        Err(_) => format!("{clock} (in the future)"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn reading(value: f64, unit: &str, captured_secs: i64) -> Reading {
        let body = format!(
            r#"{{"sensor_id":"north_pad7_ctrl3_flow_tank1","value":{value},"unit":"{unit}",
                "timestamp":{captured_secs}}}"#
        );
        Reading::from_payload(serde_json::from_str(&body).unwrap()).unwrap()
    }

    #[test]
    fn value_includes_unit_when_present() {
        assert_eq!(format_value(&reading(3.5, "L/min", 0)), "3.5 L/min");
        assert_eq!(format_value(&reading(2.0, "", 0)), "2");
    }

    #[test]
    fn age_is_rounded_to_seconds() {
        let now = DateTime::from_timestamp(1_000 + 185, 0).unwrap();
        let text = format_age(&reading(1.0, "", 1_000), now);
        assert!(text.ends_with("(3m 5s ago)"), "{text}");
    }

    #[test]
    fn future_capture_is_labelled() {
        let now = DateTime::from_timestamp(1_000, 0).unwrap();
        assert!(format_age(&reading(1.0, "", 2_000), now).ends_with("(in the future)"));
    }

    #[test]
    fn row_marks_stale_readings() {
        let now = DateTime::from_timestamp(10_000, 0).unwrap();
        let row = ReadingRow::new(&reading(1.0, "C", 10_000 - 600), now, 5.0, false);
        assert_eq!(row.status, "stale");
        assert_eq!(row.pin, "-");
    }
}
