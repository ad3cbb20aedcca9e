use crate::quantity::Euro;

/// Dense per-optimisation result arena indexed by (time step, state index).
///
/// Step 0 covers the starting period, the last step the period furthest in the
/// future; the backward pass fills the table from the last step towards step 0. One
/// table is allocated per optimisation call and owned by that call exclusively.
#[derive(Debug)]
pub struct ValueTable {
    step_count: usize,
    state_count: usize,
    best_next_state: Vec<usize>,
    best_value: Vec<Euro>,
}

impl ValueTable {
    pub fn new(step_count: usize, state_count: usize) -> Self {
        Self {
            step_count,
            state_count,
            // States never visited by the backward pass keep their energy level
            // during trajectory reconstruction.
            best_next_state: (0..step_count * state_count).map(|i| i % state_count).collect(),
            best_value: vec![Euro::ZERO; step_count * state_count],
        }
    }

    pub const fn step_count(&self) -> usize {
        self.step_count
    }

    pub const fn state_count(&self) -> usize {
        self.state_count
    }

    fn index(&self, step: usize, state: usize) -> usize {
        debug_assert!(step < self.step_count && state < self.state_count);
        step * self.state_count + state
    }

    /// Record the winning transition for the given step and initial state.
    pub fn record(&mut self, step: usize, state: usize, best_next_state: usize, best_value: Euro) {
        let index = self.index(step, state);
        self.best_next_state[index] = best_next_state;
        self.best_value[index] = best_value;
    }

    pub fn best_next_state(&self, step: usize, state: usize) -> usize {
        self.best_next_state[self.index(step, state)]
    }

    pub fn best_value(&self, step: usize, state: usize) -> Euro {
        self.best_value[self.index(step, state)]
    }

    /// Best accumulated value of continuing from the given state in the period after
    /// `step`, or zero at the horizon boundary.
    pub fn best_value_next_period(&self, step: usize, state: usize) -> Euro {
        if step + 1 < self.step_count {
            self.best_value(step + 1, state)
        } else {
            Euro::ZERO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_read_back() {
        let mut table = ValueTable::new(3, 5);
        assert_eq!(table.state_count(), 5);
        table.record(1, 2, 4, Euro::from(13.5));
        assert_eq!(table.best_next_state(1, 2), 4);
        assert_eq!(table.best_value(1, 2), Euro::from(13.5));
        assert_eq!(table.best_value_next_period(0, 2), Euro::from(13.5));
    }

    #[test]
    fn test_boundary_continuation_is_zero() {
        let table = ValueTable::new(3, 5);
        assert_eq!(table.best_value_next_period(2, 4), Euro::ZERO);
    }

    #[test]
    fn test_unvisited_states_hold_their_level() {
        let table = ValueTable::new(2, 4);
        assert_eq!(table.best_next_state(0, 3), 3);
        assert_eq!(table.best_next_state(1, 0), 0);
    }

    #[test]
    fn test_empty_table() {
        let table = ValueTable::new(0, 0);
        assert_eq!(table.step_count(), 0);
    }
}
