//! Reading freshness.
//!
//! Freshness is evaluated on demand against the clock, never stored: a
//! reading turns stale purely through the passage of time. Age is measured
//! from the controller's capture timestamp, so clock skew between
//! controller and consumer shifts the result.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Threshold used when the caller has no preference.
pub const DEFAULT_MAX_AGE_MINUTES: f64 = 5.0;

const MILLIS_PER_MINUTE: f64 = 60_000.0;

/// Two-state result for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Freshness {
    Fresh,
    Stale,
}

impl Freshness {
    pub fn evaluate_at(
        captured_at: DateTime<Utc>,
        now: DateTime<Utc>,
        max_age_minutes: f64,
    ) -> Self {
        if is_fresh_at(captured_at, now, max_age_minutes) {
            Self::Fresh
        } else {
            Self::Stale
        }
    }

    pub fn is_fresh(self) -> bool {
        matches!(self, Self::Fresh)
    }
}

/// `true` iff the reading is at most `max_age_minutes` old right now.
pub fn is_fresh(captured_at: DateTime<Utc>, max_age_minutes: f64) -> bool {
    is_fresh_at(captured_at, Utc::now(), max_age_minutes)
}

/// `true` iff `now - captured_at` is at most `max_age_minutes` (inclusive).
///
/// A capture time in the future gives a negative age and is reported fresh.
pub fn is_fresh_at(captured_at: DateTime<Utc>, now: DateTime<Utc>, max_age_minutes: f64) -> bool {
    age_minutes(captured_at, now) <= max_age_minutes
}

/// Fractional minutes between `captured_at` and `now`.
#[allow(clippy::cast_precision_loss, clippy::as_conversions)]
pub fn age_minutes(captured_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    (now - captured_at).num_milliseconds() as f64 / MILLIS_PER_MINUTE
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_760_000_000, 0).unwrap()
    }

    #[test]
    fn four_minutes_is_fresh() {
        assert!(is_fresh_at(now() - Duration::minutes(4), now(), 5.0));
    }

    #[test]
    fn six_minutes_is_stale() {
        assert!(!is_fresh_at(now() - Duration::minutes(6), now(), 5.0));
    }

    #[test]
    fn exactly_at_threshold_is_fresh() {
        assert!(is_fresh_at(now() - Duration::minutes(5), now(), 5.0));
        assert!(!is_fresh_at(
            now() - Duration::minutes(5) - Duration::milliseconds(1),
            now(),
            5.0
        ));
    }

    #[test]
    fn future_capture_is_fresh() {
        assert!(is_fresh_at(now() + Duration::hours(3), now(), 5.0));
        assert!(age_minutes(now() + Duration::minutes(2), now()) < 0.0);
    }

    #[test]
    fn wall_clock_variant_uses_current_time() {
        assert!(is_fresh(Utc::now() - Duration::minutes(1), DEFAULT_MAX_AGE_MINUTES));
        assert!(!is_fresh(Utc::now() - Duration::minutes(10), DEFAULT_MAX_AGE_MINUTES));
    }

    #[test]
    fn freshness_enum_matches_predicate() {
        let captured = now() - Duration::minutes(7);
        assert_eq!(Freshness::evaluate_at(captured, now(), 5.0), Freshness::Stale);
        assert_eq!(Freshness::evaluate_at(captured, now(), 10.0), Freshness::Fresh);
        assert_eq!(Freshness::Fresh.to_string(), "fresh");
    }
}
