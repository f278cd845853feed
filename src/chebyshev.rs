//! Chebyshev polynomial functionality for ephemeris interpolation
//!
//! SPK data types 2 and 3, and binary PCK data type 2, store each component
//! as a Chebyshev expansion over a fixed-length record interval. The block
//! of records ends with four directory words `INIT, INTLEN, RSIZE, N`.

use crate::calendar::{seconds_to_jd, S_PER_DAY, T0};
use crate::daf::{DoubleArray, DAF};
use crate::errors::{out_of_range, JplephemError, Result};

/// Chebyshev basis values at one point of `[-1, 1]`
///
/// Built once per requested time and shared by every component, since all
/// components of a record use the same number of coefficients.
#[derive(Debug, Clone)]
pub struct ChebyshevBasis {
    values: Vec<f64>,
    derivatives: Option<Vec<f64>>,
}

impl ChebyshevBasis {
    /// `T_0(s) .. T_{count-1}(s)` by the three-term recurrence
    /// `T_k = 2s T_{k-1} - T_{k-2}`
    pub fn new(s: f64, count: usize) -> Self {
        let mut values = Vec::with_capacity(count);
        for k in 0..count {
            let t = match k {
                0 => 1.0,
                1 => s,
                _ => 2.0 * s * values[k - 1] - values[k - 2],
            };
            values.push(t);
        }
        ChebyshevBasis {
            values,
            derivatives: None,
        }
    }

    /// Basis values plus their derivatives with respect to `s`,
    /// `dT_k = 2s dT_{k-1} - dT_{k-2} + 2 T_{k-1}`
    pub fn with_derivatives(s: f64, count: usize) -> Self {
        let mut basis = Self::new(s, count);
        let values = &basis.values;
        let mut derivatives = Vec::with_capacity(count);
        for k in 0..count {
            let dt = match k {
                0 => 0.0,
                1 => 1.0,
                _ => 2.0 * s * derivatives[k - 1] - derivatives[k - 2] + 2.0 * values[k - 1],
            };
            derivatives.push(dt);
        }
        basis.derivatives = Some(derivatives);
        basis
    }

    /// Number of basis terms
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Sum `c_k T_k(s)`
    pub fn evaluate(&self, coefficients: impl IntoIterator<Item = f64>) -> f64 {
        sum_high_to_low(coefficients, &self.values)
    }

    /// Sum `c_k dT_k(s)`; zero when derivatives were not requested
    pub fn differentiate(&self, coefficients: impl IntoIterator<Item = f64>) -> f64 {
        match &self.derivatives {
            Some(derivatives) => sum_high_to_low(coefficients, derivatives),
            None => 0.0,
        }
    }
}

/// Dot product accumulated from the highest degree down, so the large
/// low-degree terms are added last and round only once.
fn sum_high_to_low(coefficients: impl IntoIterator<Item = f64>, basis: &[f64]) -> f64 {
    let terms: Vec<f64> = coefficients
        .into_iter()
        .zip(basis)
        .map(|(c, t)| c * t)
        .collect();
    terms.iter().rev().sum()
}

/// Map an offset into a record interval of length `intlen` onto `[-1, 1]`
pub fn normalize_offset(offset: f64, intlen: f64) -> f64 {
    2.0 * offset / intlen - 1.0
}

/// Shape of a Chebyshev coefficient block
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChebyshevLayout {
    /// Start of the first record, seconds since J2000
    pub init: f64,
    /// Seconds covered by each record
    pub intlen: f64,
    /// Doubles per record, including the midpoint and radius words
    pub rsize: usize,
    /// Number of records
    pub n: usize,
    pub component_count: usize,
    pub coefficient_count: usize,
}

impl ChebyshevLayout {
    /// End of the last record, seconds since J2000
    pub fn final_epoch(&self) -> f64 {
        self.init + self.intlen * self.n as f64
    }

    /// Total coefficients across all records and components
    pub fn size(&self) -> usize {
        self.n * self.component_count * self.coefficient_count
    }
}

/// The record and offset within it selected for one time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecordOffset {
    pub index: usize,
    pub offset: f64,
}

/// Evaluated components for one time; `rates` are per second
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub components: Vec<f64>,
    pub rates: Option<Vec<f64>>,
}

/// A loaded block of Chebyshev records
#[derive(Debug, Clone)]
pub struct ChebyshevBlock {
    pub layout: ChebyshevLayout,
    /// Records without the directory words, still in file order
    coefficients: DoubleArray,
}

impl ChebyshevBlock {
    /// Read the directory words at `end_i - 3 ..= end_i` and map the records
    pub fn load(daf: &DAF, start_i: usize, end_i: usize, component_count: usize) -> Result<Self> {
        if end_i < start_i + 3 {
            return Err(JplephemError::InvalidFormat(format!(
                "Segment data too small for Chebyshev records: words {start_i}..{end_i}"
            )));
        }
        let directory = daf.read_array(end_i - 3, end_i)?;
        let (init, intlen, rsize, n) = (directory[0], directory[1], directory[2], directory[3]);

        // Neither the record size nor the record count can exceed the span.
        let span = (end_i + 1 - start_i) as f64;
        if intlen.is_nan()
            || intlen <= 0.0
            || !(2.0..=span).contains(&rsize)
            || !(0.0..=span).contains(&n)
        {
            return Err(JplephemError::InvalidFormat(format!(
                "Invalid Chebyshev directory: intlen={intlen}, rsize={rsize}, n={n}"
            )));
        }
        let rsize = rsize as usize;
        let n = n as usize;
        let coefficient_count = (rsize - 2) / component_count;
        if coefficient_count == 0 {
            return Err(JplephemError::InvalidFormat(format!(
                "Invalid record size for {component_count} components: {rsize}"
            )));
        }

        let coefficients = daf.map_array(start_i, end_i - 4)?;
        if n.checked_mul(rsize) != Some(coefficients.len()) {
            return Err(JplephemError::InvalidFormat(format!(
                "Inconsistent array size: {n} records of {rsize} words in {} words",
                coefficients.len()
            )));
        }

        Ok(ChebyshevBlock {
            layout: ChebyshevLayout {
                init,
                intlen,
                rsize,
                n,
                component_count,
                coefficient_count,
            },
            coefficients,
        })
    }

    /// Coefficients of `component` in `record`, lowest degree first
    pub fn coefficients(&self, record: usize, component: usize) -> impl Iterator<Item = f64> + '_ {
        let start = record * self.layout.rsize + 2 + component * self.layout.coefficient_count;
        (start..start + self.layout.coefficient_count).map(|i| self.coefficients.at(i))
    }

    /// Seconds past INIT for a two-part Julian date.
    ///
    /// INIT is subtracted before the fraction is added, so a small `tdb2`
    /// keeps its precision next to a large `tdb`.
    pub fn seconds_since_init(&self, tdb: f64, tdb2: f64) -> f64 {
        (tdb - T0) * S_PER_DAY - self.layout.init + tdb2 * S_PER_DAY
    }

    /// Select a record for every time, or report which times are out of range.
    ///
    /// Times in the interval following the last record are evaluated by
    /// extending that record past its right edge; anything later is out of
    /// range.
    pub fn locate(&self, times: &[(f64, f64)]) -> Result<Vec<RecordOffset>> {
        let ChebyshevLayout { intlen, n, .. } = self.layout;
        let split: Vec<(f64, f64)> = times
            .iter()
            .map(|&(tdb, tdb2)| {
                let seconds = self.seconds_since_init(tdb, tdb2);
                (seconds.div_euclid(intlen), seconds.rem_euclid(intlen))
            })
            .collect();

        let mask: Vec<bool> = split
            .iter()
            .map(|&(index, _)| {
                let n = n as f64;
                n == 0.0 || index < 0.0 || index > n
            })
            .collect();
        if mask.iter().any(|&bad| bad) {
            return Err(out_of_range(
                seconds_to_jd(self.layout.init),
                seconds_to_jd(self.layout.final_epoch()),
                mask,
            ));
        }

        Ok(split
            .into_iter()
            .map(|(index, offset)| {
                let index = index as usize;
                if index == n {
                    RecordOffset {
                        index: n - 1,
                        offset: offset + intlen,
                    }
                } else {
                    RecordOffset { index, offset }
                }
            })
            .collect())
    }

    /// Evaluate every component at an already located time
    pub fn evaluate(&self, at: RecordOffset, derivative: bool) -> Evaluation {
        let ChebyshevLayout {
            intlen,
            component_count,
            coefficient_count,
            ..
        } = self.layout;
        let s = normalize_offset(at.offset, intlen);
        let basis = if derivative {
            ChebyshevBasis::with_derivatives(s, coefficient_count)
        } else {
            ChebyshevBasis::new(s, coefficient_count)
        };

        let components = (0..component_count)
            .map(|c| basis.evaluate(self.coefficients(at.index, c)))
            .collect();
        let rates = derivative.then(|| {
            (0..component_count)
                .map(|c| basis.differentiate(self.coefficients(at.index, c)) * 2.0 / intlen)
                .collect()
        });

        Evaluation { components, rates }
    }

    /// Locate and evaluate a batch of times
    pub fn compute(&self, times: &[(f64, f64)], derivative: bool) -> Result<Vec<Evaluation>> {
        Ok(self
            .locate(times)?
            .into_iter()
            .map(|at| self.evaluate(at, derivative))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{chebyshev_array, KernelBuilder};
    use approx::assert_relative_eq;

    fn evaluate(coefficients: &[f64], x: f64) -> f64 {
        ChebyshevBasis::new(x, coefficients.len()).evaluate(coefficients.iter().copied())
    }

    fn derivative(coefficients: &[f64], x: f64) -> f64 {
        ChebyshevBasis::with_derivatives(x, coefficients.len())
            .differentiate(coefficients.iter().copied())
    }

    #[test]
    fn test_chebyshev_constant() {
        assert_eq!(evaluate(&[5.0], -1.0), 5.0);
        assert_eq!(evaluate(&[5.0], 0.0), 5.0);
        assert_eq!(evaluate(&[5.0], 1.0), 5.0);
        assert_eq!(derivative(&[5.0], 0.0), 0.0);
    }

    #[test]
    fn test_chebyshev_linear() {
        // f(x) = 3 + 2x
        assert_relative_eq!(evaluate(&[3.0, 2.0], -1.0), 1.0, epsilon = 1e-12);
        assert_relative_eq!(evaluate(&[3.0, 2.0], 0.0), 3.0, epsilon = 1e-12);
        assert_relative_eq!(evaluate(&[3.0, 2.0], 1.0), 5.0, epsilon = 1e-12);
        assert_relative_eq!(derivative(&[3.0, 2.0], 0.3), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_chebyshev_quadratic() {
        // T2(x) = 2x² - 1, so f(x) = 3 + 2x + (2x² - 1) = 2 + 2x + 2x²
        let c = [3.0, 2.0, 1.0];
        assert_relative_eq!(evaluate(&c, -1.0), 2.0, epsilon = 1e-12);
        assert_relative_eq!(evaluate(&c, 0.0), 2.0, epsilon = 1e-12);
        assert_relative_eq!(evaluate(&c, 1.0), 6.0, epsilon = 1e-12);
        // f'(x) = 2 + 4x
        assert_relative_eq!(derivative(&c, -1.0), -2.0, epsilon = 1e-12);
        assert_relative_eq!(derivative(&c, 0.0), 2.0, epsilon = 1e-12);
        assert_relative_eq!(derivative(&c, 1.0), 6.0, epsilon = 1e-12);
    }

    #[test]
    fn test_cubic_derivative() {
        // T3(x) = 4x³ - 3x, T3'(x) = 12x² - 3
        let c = [0.0, 0.0, 0.0, 1.0];
        for i in 0..=10 {
            let x = -1.0 + i as f64 * 0.2;
            assert_relative_eq!(evaluate(&c, x), 4.0 * x * x * x - 3.0 * x, epsilon = 1e-12);
            assert_relative_eq!(derivative(&c, x), 12.0 * x * x - 3.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_normalize_offset() {
        assert_eq!(normalize_offset(0.0, 10.0), -1.0);
        assert_eq!(normalize_offset(5.0, 10.0), 0.0);
        assert_eq!(normalize_offset(10.0, 10.0), 1.0);
    }

    fn sample_block() -> (DAF, ChebyshevBlock) {
        // Two records of one day each, starting at J2000.
        let array = chebyshev_array(
            0.0,
            86400.0,
            &[
                vec![vec![1.0, 2.0, 3.0], vec![0.0, 1.0, 0.0], vec![5.0, 0.0, 0.0]],
                vec![vec![4.0, 5.0, 6.0], vec![0.0, -1.0, 0.0], vec![6.0, 0.0, 0.5]],
            ],
        );
        let bytes = KernelBuilder::spk()
            .spk_segment("TEST", 0.0, 2.0 * 86400.0, 4, 0, 1, 2, array)
            .build();
        let daf = DAF::from_bytes(bytes).unwrap();
        let summary = daf.summaries().next().unwrap().unwrap();
        let (start, end) = summary.word_range().unwrap();
        let block = ChebyshevBlock::load(&daf, start, end, 3).unwrap();
        (daf, block)
    }

    #[test]
    fn test_load_layout() {
        let (_daf, block) = sample_block();
        assert_eq!(
            block.layout,
            ChebyshevLayout {
                init: 0.0,
                intlen: 86400.0,
                rsize: 11,
                n: 2,
                component_count: 3,
                coefficient_count: 3,
            }
        );
        assert_eq!(block.layout.final_epoch(), 172800.0);
        assert_eq!(block.layout.size(), 18);
        assert_eq!(block.coefficients(1, 2).collect::<Vec<_>>(), vec![6.0, 0.0, 0.5]);
    }

    #[test]
    fn test_locate_and_boundary_clamp() {
        let (_daf, block) = sample_block();
        let located = block
            .locate(&[(T0, 0.25), (T0 + 1.5, 0.0), (T0 + 2.0, 0.0), (T0 + 2.0, 0.25)])
            .unwrap();
        assert_eq!(located[0], RecordOffset { index: 0, offset: 21600.0 });
        assert_eq!(located[1], RecordOffset { index: 1, offset: 43200.0 });
        assert_eq!(located[2], RecordOffset { index: 1, offset: 86400.0 });
        assert_eq!(located[3], RecordOffset { index: 1, offset: 108000.0 });

        // At the right edge every T_k is 1, so each component is the sum
        // of its coefficients.
        let end = block.evaluate(located[2], false);
        assert_eq!(end.components, vec![15.0, -1.0, 6.5]);
    }

    fn load_raw(array: Vec<f64>) -> Result<ChebyshevBlock> {
        let bytes = KernelBuilder::spk()
            .spk_segment("RAW", 0.0, 86400.0, 4, 0, 1, 2, array)
            .build();
        let daf = DAF::from_bytes(bytes).unwrap();
        let summary = daf.summaries().next().unwrap().unwrap();
        let (start, end) = summary.word_range().unwrap();
        ChebyshevBlock::load(&daf, start, end, 3)
    }

    #[test]
    fn test_corrupt_directory_is_a_format_error() {
        let mut words = vec![43200.0, 43200.0, 1.0, 0.0, 0.0];
        for directory in [
            [0.0, 86400.0, 5.0, 1e19],
            [0.0, 86400.0, 1e300, 1.0],
            [0.0, 86400.0, f64::NAN, 1.0],
            [0.0, f64::NAN, 5.0, 1.0],
            [0.0, 86400.0, 5.0, -1.0],
            [0.0, 86400.0, 5.0, 2.0],
        ] {
            words.truncate(5);
            words.extend_from_slice(&directory);
            assert!(
                matches!(load_raw(words.clone()), Err(JplephemError::InvalidFormat(_))),
                "directory {directory:?} was accepted"
            );
        }

        words.truncate(5);
        words.extend_from_slice(&[0.0, 86400.0, 5.0, 1.0]);
        assert_eq!(load_raw(words).unwrap().layout.n, 1);
    }

    #[test]
    fn test_locate_reports_mask() {
        let (_daf, block) = sample_block();
        let err = block
            .locate(&[(T0 - 0.5, 0.0), (T0 + 1.0, 0.0), (T0 + 3.5, 0.0)])
            .unwrap_err();
        match err {
            JplephemError::OutOfRange {
                out_of_range_times,
                start_jd,
                end_jd,
                ..
            } => {
                assert_eq!(out_of_range_times, vec![true, false, true]);
                assert_eq!(start_jd, T0);
                assert_eq!(end_jd, T0 + 2.0);
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn test_rates_are_per_second() {
        let (_daf, block) = sample_block();
        let at = block.locate(&[(T0 + 0.5, 0.0)]).unwrap()[0];
        let result = block.evaluate(at, true);
        // x = 1 + 2s + 3(2s² - 1) at s = 0 is -2, dx/ds = 2 + 12s = 2.
        assert_relative_eq!(result.components[0], -2.0, epsilon = 1e-12);
        let rates = result.rates.unwrap();
        assert_relative_eq!(rates[0], 2.0 * 2.0 / 86400.0, epsilon = 1e-18);
        assert_relative_eq!(rates[1], 2.0 / 86400.0, epsilon = 1e-18);
        assert_eq!(rates[2], 0.0);
    }
}
