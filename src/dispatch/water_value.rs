use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use ordered_float::OrderedFloat;

use crate::quantity::{Euro, MegawattHours};

/// Sampled value function of stored energy: the classical «water value» of a
/// reservoir, used to price states at the edge of the optimisation window.
///
/// Samples are kept unique and sorted ascending by energy content. An empty table is
/// a valid «no data» state and evaluates to zero everywhere.
#[derive(Clone, Debug, Default)]
pub struct WaterValues {
    energies: Vec<f64>,
    values: Vec<f64>,
}

impl WaterValues {
    pub fn new(samples: impl IntoIterator<Item = (MegawattHours, Euro)>) -> Self {
        let sorted: BTreeMap<OrderedFloat<f64>, f64> = samples
            .into_iter()
            .map(|(energy, value)| (OrderedFloat(energy.0), value.value()))
            .collect();
        let (energies, values) =
            sorted.into_iter().map(|(energy, value)| (energy.0, value)).unzip();
        Self { energies, values }
    }

    pub fn has_data(&self) -> bool {
        !self.energies.is_empty()
    }

    /// Interpolated value of the given energy content.
    ///
    /// The `time` argument is reserved for time-varying tables and has no effect yet.
    pub fn value_at(&self, _time: DateTime<Utc>, energy: MegawattHours) -> Euro {
        match self.energies.len() {
            0 => Euro::ZERO,
            1 => Euro::from(self.through_origin(energy.0)),
            _ => Euro::from(self.piecewise_linear(energy.0)),
        }
    }

    /// With a single sample, the value function is the line through the origin and
    /// that sample, in both directions.
    fn through_origin(&self, energy: f64) -> f64 {
        if self.energies[0] == 0.0 {
            return 0.0;
        }
        self.values[0] / self.energies[0] * energy
    }

    fn piecewise_linear(&self, energy: f64) -> f64 {
        let insertion_point = self.energies.partition_point(|&sample| sample < energy);
        if self.energies.get(insertion_point) == Some(&energy) {
            return self.values[insertion_point];
        }
        let lower = self.lower_segment_index(insertion_point);
        let upper = lower + 1;
        let (x0, y0) = (self.energies[lower], self.values[lower]);
        let (x1, y1) = (self.energies[upper], self.values[upper]);
        (y1 - y0) / (x1 - x0) * (energy - x0) + y0
    }

    /// Index of the segment start used for interpolation; queries outside the
    /// sampled range extrapolate along the first or last segment.
    fn lower_segment_index(&self, insertion_point: usize) -> usize {
        if insertion_point == 0 {
            0
        } else if insertion_point == self.energies.len() {
            self.energies.len() - 2
        } else {
            insertion_point - 1
        }
    }
}
