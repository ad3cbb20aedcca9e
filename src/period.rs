use std::fmt::{Display, Formatter};

use chrono::{DateTime, TimeDelta, Utc};
use serde_with::serde_as;

use crate::prelude::*;

/// One planning period: a start instant plus a fixed duration.
///
/// Periods are immutable and totally ordered by their start. All periods of one
/// planning window share the same duration and lie on a common grid anchored at the
/// window's starting period.
#[serde_as]
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, serde::Serialize)]
pub struct Period {
    start: DateTime<Utc>,

    #[serde_as(as = "serde_with::DurationSeconds<i64>")]
    duration: TimeDelta,
}

impl Period {
    pub fn new(start: DateTime<Utc>, duration: TimeDelta) -> Result<Self> {
        ensure!(duration > TimeDelta::zero(), "period duration must be positive, got {duration}");
        ensure!(
            duration.subsec_nanos() == 0,
            "period duration must be a whole number of seconds, got {duration}",
        );
        Ok(Self { start, duration })
    }

    pub const fn start(self) -> DateTime<Utc> {
        self.start
    }

    pub const fn duration(self) -> TimeDelta {
        self.duration
    }

    pub fn end(self) -> DateTime<Utc> {
        self.start + self.duration
    }

    /// Shift the period by the given number of whole periods (negative shifts back).
    #[must_use]
    pub fn shift_by(self, count: i64) -> Self {
        Self {
            start: self.start + TimeDelta::seconds(self.duration.num_seconds() * count),
            duration: self.duration,
        }
    }

    /// Offset of this period from the given origin, counted in whole periods.
    ///
    /// Fails when the offset is negative or not an exact multiple of the duration.
    #[expect(clippy::cast_sign_loss)]
    pub fn index_from(self, origin: Self) -> Result<usize> {
        let offset_seconds = (self.start - origin.start).num_seconds();
        let period_seconds = origin.duration.num_seconds();
        ensure!(
            offset_seconds % period_seconds == 0,
            "period starting at {self} is not aligned with the planning grid starting at {origin}",
        );
        ensure!(
            offset_seconds >= 0,
            "period starting at {self} lies before the planning grid starting at {origin}",
        );
        Ok((offset_seconds / period_seconds) as usize)
    }

    /// How many whole periods of this duration fit into the given horizon.
    #[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn count_in_hours(self, horizon_hours: f64) -> usize {
        let periods_per_hour = 3600.0 / self.duration.as_seconds_f64();
        (horizon_hours * periods_per_hour) as usize
    }
}

impl Display for Period {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} (+{} min)",
            self.start.format("%Y-%m-%dT%H:%M:%SZ"),
            self.duration.num_minutes(),
        )
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn hourly(hour: u32) -> Period {
        let start = Utc.with_ymd_and_hms(2030, 1, 1, hour, 0, 0).unwrap();
        Period::new(start, TimeDelta::hours(1)).unwrap()
    }

    #[test]
    fn test_shift_by() {
        assert_eq!(hourly(0).shift_by(5), hourly(5));
        assert_eq!(hourly(5).shift_by(-3), hourly(2));
        assert_eq!(hourly(7).shift_by(0), hourly(7));
    }

    #[test]
    fn test_index_from() {
        assert_eq!(hourly(7).index_from(hourly(0)).unwrap(), 7);
        assert_eq!(hourly(0).index_from(hourly(0)).unwrap(), 0);
    }

    #[test]
    fn test_index_from_misaligned() {
        let start = Utc.with_ymd_and_hms(2030, 1, 1, 0, 30, 0).unwrap();
        let misaligned = Period::new(start, TimeDelta::hours(1)).unwrap();
        let error = misaligned.index_from(hourly(0)).unwrap_err();
        assert!(error.to_string().contains("not aligned"));
    }

    #[test]
    fn test_index_from_before_origin() {
        assert!(hourly(0).index_from(hourly(2)).is_err());
    }

    #[test]
    fn test_count_in_hours() {
        assert_eq!(hourly(0).count_in_hours(24.0), 24);
        let quarterly =
            Period::new(hourly(0).start(), TimeDelta::minutes(15)).unwrap();
        assert_eq!(quarterly.count_in_hours(2.0), 8);
        assert_eq!(hourly(0).count_in_hours(0.0), 0);
    }

    #[test]
    fn test_rejects_non_positive_duration() {
        assert!(Period::new(hourly(0).start(), TimeDelta::zero()).is_err());
    }
}
