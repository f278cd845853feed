//! Discrete-state interpolation for SPK data type 9
//!
//! A type 9 segment stores N six-element states at increasing epochs,
//! followed by the epochs themselves, an epoch directory, the polynomial
//! degree and N. Only degree 1 (piecewise-linear) segments are supported.

use crate::calendar::{seconds_to_jd, S_PER_DAY, T0};
use crate::daf::{DoubleArray, DAF};
use crate::errors::{out_of_range, JplephemError, Result};

/// States and epochs of a type 9 segment, mapped from the file
#[derive(Debug, Clone)]
pub struct DiscreteStates {
    states: DoubleArray,
    /// Epochs in seconds since J2000
    epochs: DoubleArray,
    n: usize,
}

impl DiscreteStates {
    pub fn load(daf: &DAF, start_i: usize, end_i: usize) -> Result<Self> {
        if end_i < start_i + 1 {
            return Err(JplephemError::InvalidFormat(format!(
                "Segment data too small for type 9: words {start_i}..{end_i}"
            )));
        }
        let trailer = daf.read_array(end_i - 1, end_i)?;
        let (degree, count) = (trailer[0], trailer[1]);
        if degree != 1.0 {
            return Err(JplephemError::UnsupportedDegree(degree as i32));
        }
        let span = end_i + 1 - start_i;
        if !(1.0..=span as f64).contains(&count) {
            return Err(JplephemError::InvalidFormat(format!(
                "Type 9 segment holds {count} states"
            )));
        }

        // Seven words per state plus the degree and count words.
        let n = count as usize;
        let needed = n.checked_mul(7).and_then(|words| words.checked_add(2));
        if needed.is_none_or(|words| words > span) {
            return Err(JplephemError::InvalidFormat(format!(
                "Type 9 segment of {n} states does not fit in words {start_i}..{end_i}"
            )));
        }
        let states = daf.map_array(start_i, start_i + 6 * n - 1)?;
        let epochs = daf.map_array(start_i + 6 * n, start_i + 7 * n - 1)?;
        Ok(DiscreteStates { states, epochs, n })
    }

    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    pub fn first_epoch(&self) -> f64 {
        self.epochs.at(0)
    }

    pub fn last_epoch(&self) -> f64 {
        self.epochs.at(self.n - 1)
    }

    fn state(&self, index: usize) -> [f64; 6] {
        std::array::from_fn(|axis| self.states.at(6 * index + axis))
    }

    /// Linear interpolation between the two states bracketing `seconds`
    ///
    /// Returns `None` outside the first..last epoch span.
    pub fn interpolate(&self, seconds: f64) -> Option<[f64; 6]> {
        if !(self.first_epoch()..=self.last_epoch()).contains(&seconds) {
            return None;
        }

        // First epoch strictly after `seconds`.
        let (mut lo, mut hi) = (0, self.n);
        while lo < hi {
            let mid = (lo + hi) / 2;
            if self.epochs.at(mid) <= seconds {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        if lo == self.n || self.epochs.at(lo - 1) == seconds {
            return Some(self.state(lo - 1));
        }

        let (e0, e1) = (self.epochs.at(lo - 1), self.epochs.at(lo));
        let (s0, s1) = (self.state(lo - 1), self.state(lo));
        Some(std::array::from_fn(|axis| {
            let slope = (s1[axis] - s0[axis]) / (e1 - e0);
            s0[axis] + slope * (seconds - e0)
        }))
    }

    /// Interpolate a batch of two-part Julian dates
    pub fn compute(&self, times: &[(f64, f64)]) -> Result<Vec<[f64; 6]>> {
        let states: Vec<Option<[f64; 6]>> = times
            .iter()
            .map(|&(tdb, tdb2)| self.interpolate((tdb - T0) * S_PER_DAY + tdb2 * S_PER_DAY))
            .collect();

        if states.iter().any(Option::is_none) {
            return Err(out_of_range(
                seconds_to_jd(self.first_epoch()),
                seconds_to_jd(self.last_epoch()),
                states.iter().map(Option::is_none).collect(),
            ));
        }
        Ok(states.into_iter().flatten().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{discrete_states_array, KernelBuilder};
    use approx::assert_relative_eq;

    fn load(array: Vec<f64>) -> Result<DiscreteStates> {
        let bytes = KernelBuilder::spk()
            .spk_segment("T9", 0.0, 200.0, -99, 399, 1, 9, array)
            .build();
        let daf = DAF::from_bytes(bytes).unwrap();
        let summary = daf.summaries().next().unwrap().unwrap();
        let (start, end) = summary.word_range().unwrap();
        DiscreteStates::load(&daf, start, end)
    }

    fn sample() -> DiscreteStates {
        let states = [
            [0.0, 0.0, 0.0, 1.0, 0.0, 0.0],
            [100.0, 10.0, -5.0, 1.0, 0.5, 0.0],
            [300.0, 10.0, 5.0, 2.0, 0.5, 1.0],
        ];
        load(discrete_states_array(&states, &[0.0, 100.0, 200.0], 1.0)).unwrap()
    }

    #[test]
    fn test_interpolates_linearly() {
        let table = sample();
        assert_eq!(table.len(), 3);
        let state = table.interpolate(150.0).unwrap();
        assert_relative_eq!(state[0], 200.0);
        assert_relative_eq!(state[1], 10.0);
        assert_relative_eq!(state[2], 0.0);
        assert_relative_eq!(state[3], 1.5);
        assert_relative_eq!(state[5], 0.5);
    }

    #[test]
    fn test_exact_epochs_return_stored_states() {
        let table = sample();
        assert_eq!(table.interpolate(0.0).unwrap()[0], 0.0);
        assert_eq!(table.interpolate(100.0).unwrap()[2], -5.0);
        assert_eq!(table.interpolate(200.0).unwrap()[0], 300.0);
        assert!(table.interpolate(200.5).is_none());
        assert!(table.interpolate(-0.5).is_none());
    }

    #[test]
    fn test_batch_mask() {
        let table = sample();
        let day = 1.0 / S_PER_DAY;
        let err = table
            .compute(&[(T0, -day), (T0, 50.0 * day), (T0, 250.0 * day)])
            .unwrap_err();
        match err {
            JplephemError::OutOfRange { out_of_range_times, .. } => {
                assert_eq!(out_of_range_times, vec![true, false, true])
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn test_corrupt_state_count_is_a_format_error() {
        let states = [[0.0; 6], [1.0; 6]];
        for count in [1e300, 1e19, 3.0, 0.0, -2.0, f64::NAN] {
            let mut array = discrete_states_array(&states, &[0.0, 100.0], 1.0);
            let last = array.len() - 1;
            array[last] = count;
            assert!(
                matches!(load(array), Err(JplephemError::InvalidFormat(_))),
                "count {count} was accepted"
            );
        }
    }

    #[test]
    fn test_degree_other_than_one_is_rejected() {
        let states = [[0.0; 6], [1.0; 6], [2.0; 6]];
        let err = load(discrete_states_array(&states, &[0.0, 100.0, 200.0], 2.0)).unwrap_err();
        assert!(matches!(err, JplephemError::UnsupportedDegree(2)));
    }
}
