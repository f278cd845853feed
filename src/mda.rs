//! Modified Difference Array evaluation for SPK data type 1
//!
//! Each type 1 record is 71 doubles describing a variable-step
//! integrator's state: a reference epoch and state, the step sizes and a
//! table of modified divided differences per axis. Records are followed by
//! their final epochs, an epoch directory holding every 100th final epoch,
//! and the record count.

use std::sync::Mutex;

use crate::calendar::{seconds_to_jd, S_PER_DAY, T0};
use crate::daf::{DoubleArray, DAF};
use crate::errors::{out_of_range, JplephemError, Result};

/// Doubles per type 1 record
pub const MDA_RECORD_SIZE: usize = 71;
/// Maximum number of differences per axis
const MAXDIM: usize = 15;
const DIRECTORY_STRIDE: usize = 100;

/// One decoded type 1 record
#[derive(Debug, Clone, PartialEq)]
pub struct MdaRecord {
    /// Final epoch of the record, seconds since J2000
    pub reference_epoch: f64,
    pub stepsizes: [f64; MAXDIM],
    pub reference_position: [f64; 3],
    pub reference_velocity: [f64; 3],
    /// `differences[axis][j]`
    pub differences: [[f64; MAXDIM]; 3],
    pub kqmax1: usize,
    pub kq: [usize; 3],
}

impl MdaRecord {
    pub fn from_words(words: &[f64]) -> Result<Self> {
        if words.len() != MDA_RECORD_SIZE {
            return Err(JplephemError::InvalidFormat(format!(
                "Type 1 record holds {} doubles instead of {MDA_RECORD_SIZE}",
                words.len()
            )));
        }

        let kqmax1 = words[67];
        if !(2.0..=(MAXDIM + 1) as f64).contains(&kqmax1) {
            return Err(JplephemError::InvalidFormat(format!(
                "Type 1 record has integration order {kqmax1}"
            )));
        }
        let mut kq = [0usize; 3];
        for (axis, value) in words[68..71].iter().enumerate() {
            if !(0.0..=MAXDIM as f64).contains(value) {
                return Err(JplephemError::InvalidFormat(format!(
                    "Type 1 record has {value} differences on axis {axis}"
                )));
            }
            kq[axis] = *value as usize;
        }

        Ok(MdaRecord {
            reference_epoch: words[0],
            stepsizes: std::array::from_fn(|j| words[1 + j]),
            reference_position: std::array::from_fn(|axis| words[16 + 2 * axis]),
            reference_velocity: std::array::from_fn(|axis| words[17 + 2 * axis]),
            differences: std::array::from_fn(|axis| {
                std::array::from_fn(|j| words[22 + axis * MAXDIM + j])
            }),
            kqmax1: kqmax1 as usize,
            kq,
        })
    }

    /// State at `et` seconds past J2000: position in km, velocity in km/s
    pub fn evaluate(&self, et: f64) -> [f64; 6] {
        // Working arrays are indexed from 1 to keep the recurrence exact.
        let mut fc = [0.0; MAXDIM + 2];
        let mut wc = [0.0; MAXDIM + 1];
        let mut w = [0.0; MAXDIM + 3];
        let g = |j: usize| self.stepsizes[j - 1];
        let dt = |j: usize, axis: usize| self.differences[axis][j - 1];

        let delta = et - self.reference_epoch;
        let mut tp = delta;
        let mq2 = self.kqmax1 - 2;
        let mut ks = self.kqmax1 - 1;

        fc[1] = 1.0;
        for j in 1..=mq2 {
            fc[j + 1] = tp / g(j);
            wc[j] = delta / g(j);
            tp = delta + g(j);
        }
        for (j, value) in w.iter_mut().enumerate().take(self.kqmax1 + 1).skip(1) {
            *value = 1.0 / j as f64;
        }

        let mut jx = 0;
        let mut ks1 = ks - 1;
        while ks >= 2 {
            jx += 1;
            for j in 1..=jx {
                w[j + ks] = fc[j + 1] * w[j + ks1] - wc[j] * w[j + ks];
            }
            ks = ks1;
            ks1 -= 1;
        }

        let mut state = [0.0; 6];
        for axis in 0..3 {
            let mut sum = 0.0;
            for j in (1..=self.kq[axis]).rev() {
                sum += dt(j, axis) * w[j + ks];
            }
            state[axis] = self.reference_position[axis]
                + delta * (self.reference_velocity[axis] + delta * sum);
        }

        for j in 1..=jx {
            w[j + ks] = fc[j + 1] * w[j + ks1] - wc[j] * w[j + ks];
        }
        ks -= 1;

        for axis in 0..3 {
            let mut sum = 0.0;
            for j in (1..=self.kq[axis]).rev() {
                sum += dt(j, axis) * w[j + ks];
            }
            state[axis + 3] = self.reference_velocity[axis] + delta * sum;
        }
        state
    }
}

#[derive(Debug)]
struct CachedRecord {
    /// Valid for `lower <= et < upper`
    lower: f64,
    upper: f64,
    record: MdaRecord,
}

/// The records of one type 1 segment
#[derive(Debug)]
pub struct MdaTable {
    start_second: f64,
    end_second: f64,
    records: DoubleArray,
    final_epochs: DoubleArray,
    directory: DoubleArray,
    n: usize,
    last: Mutex<Option<CachedRecord>>,
}

impl MdaTable {
    /// Map the segment's arrays; `start_second..=end_second` is the coverage
    /// from the segment descriptor.
    pub fn load(
        daf: &DAF,
        start_i: usize,
        end_i: usize,
        start_second: f64,
        end_second: f64,
    ) -> Result<Self> {
        let span = end_i + 1 - start_i;
        let count = daf.read_array(end_i, end_i)?[0];
        if !(1.0..=span as f64).contains(&count) {
            return Err(JplephemError::InvalidFormat(format!(
                "Type 1 segment holds {count} records"
            )));
        }
        let n = count as usize;
        let directory_len = n / DIRECTORY_STRIDE;
        let expected = n
            .checked_mul(MDA_RECORD_SIZE + 1)
            .and_then(|words| words.checked_add(directory_len + 1));
        if expected != Some(span) {
            return Err(JplephemError::InvalidFormat(format!(
                "Type 1 segment of {n} records does not fit in {span} words"
            )));
        }

        let epochs_start = start_i + MDA_RECORD_SIZE * n;
        let records = daf.map_array(start_i, epochs_start - 1)?;
        let final_epochs = daf.map_array(epochs_start, epochs_start + n - 1)?;
        let directory = daf.map_array(epochs_start + n, epochs_start + n + directory_len)?;
        Ok(MdaTable {
            start_second,
            end_second,
            records,
            final_epochs,
            directory: directory.slice(0, directory_len),
            n,
            last: Mutex::new(None),
        })
    }

    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Index of the first record whose final epoch exceeds `et`, or the
    /// last record when `et` equals its final epoch.
    pub fn find_record(&self, et: f64) -> Option<usize> {
        let block = self.directory.iter().take_while(|&epoch| epoch <= et).count();
        let lo = block * DIRECTORY_STRIDE;
        let hi = (lo + DIRECTORY_STRIDE).min(self.n);
        (lo..hi)
            .find(|&i| self.final_epochs.at(i) > et)
            .or_else(|| (self.final_epochs.at(self.n - 1) == et).then_some(self.n - 1))
    }

    pub fn record(&self, index: usize) -> Result<MdaRecord> {
        let start = index * MDA_RECORD_SIZE;
        MdaRecord::from_words(&self.records.slice(start, start + MDA_RECORD_SIZE).to_vec())
    }

    fn state_at(&self, et: f64) -> Result<[f64; 6]> {
        let mut last = self
            .last
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(cached) = last.as_ref() {
            if cached.lower <= et && et < cached.upper {
                return Ok(cached.record.evaluate(et));
            }
        }

        let index = self.find_record(et).ok_or_else(|| {
            JplephemError::InvalidFormat(format!("No type 1 record covers {et} seconds"))
        })?;
        let record = self.record(index)?;
        let state = record.evaluate(et);
        *last = Some(CachedRecord {
            lower: if index == 0 { f64::NEG_INFINITY } else { self.final_epochs.at(index - 1) },
            upper: self.final_epochs.at(index),
            record,
        });
        Ok(state)
    }

    /// Evaluate a batch of two-part Julian dates
    pub fn compute(&self, times: &[(f64, f64)]) -> Result<Vec<[f64; 6]>> {
        let seconds: Vec<f64> = times
            .iter()
            .map(|&(tdb, tdb2)| (tdb - T0) * S_PER_DAY + tdb2 * S_PER_DAY)
            .collect();

        let mask: Vec<bool> = seconds
            .iter()
            .map(|&et| !(self.start_second..=self.end_second).contains(&et))
            .collect();
        if mask.iter().any(|&outside| outside) {
            return Err(out_of_range(
                seconds_to_jd(self.start_second),
                seconds_to_jd(self.end_second),
                mask,
            ));
        }

        seconds.into_iter().map(|et| self.state_at(et)).collect()
    }
}
