use chrono::{DateTime, Utc};
use itertools::Itertools;

use crate::prelude::*;

/// Piecewise-linear time series for time-varying device parameters.
///
/// Values between two points are interpolated linearly; queries before the first or
/// after the last point return the boundary value.
#[derive(Clone, Debug)]
pub struct Profile {
    points: Vec<(DateTime<Utc>, f64)>,
}

impl Profile {
    pub fn constant(value: f64) -> Self {
        Self { points: vec![(DateTime::<Utc>::MIN_UTC, value)] }
    }

    pub fn try_from_points(mut points: Vec<(DateTime<Utc>, f64)>) -> Result<Self> {
        ensure!(!points.is_empty(), "a profile requires at least one point");
        points.sort_by_key(|(time, _)| *time);
        points.dedup_by_key(|(time, _)| *time);
        Ok(Self { points })
    }

    pub fn value_at(&self, time: DateTime<Utc>) -> f64 {
        let (first_time, first_value) = self.points[0];
        if time <= first_time {
            return first_value;
        }
        for ((start_time, start_value), (end_time, end_value)) in
            self.points.iter().copied().tuple_windows()
        {
            if time <= end_time {
                let elapsed = (time - start_time).as_seconds_f64();
                let segment = (end_time - start_time).as_seconds_f64();
                return start_value + (end_value - start_value) * elapsed / segment;
            }
        }
        self.points[self.points.len() - 1].1
    }
}
