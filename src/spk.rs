//! Spacecraft Planet Kernel (SPK) format reader
//!
//! Reads NASA SPICE SPK files containing position and velocity data for
//! solar system bodies. Segments of data types 2 and 3 store Chebyshev
//! coefficients, type 9 stores discrete states for linear interpolation and
//! type 1 stores Modified Difference Arrays.
//!
//! Times are two-part TDB Julian dates `(tdb, tdb2)`; positions are in km
//! and velocities in km/day.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use nalgebra::Vector3;
use once_cell::sync::OnceCell;
use tracing::debug;

use crate::calendar::{broadcast_times, format_date, seconds_to_jd, S_PER_DAY};
use crate::chebyshev::{ChebyshevBlock, ChebyshevLayout};
use crate::daf::{OpenOptions, Summary, DAF};
use crate::errors::{JplephemError, Result};
use crate::lagrange::DiscreteStates;
use crate::mda::MdaTable;
use crate::names::body_label;

/// How a segment's data is interpolated, from its data type code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    /// Types 2 (3 position components) and 3 (6 state components)
    Chebyshev { component_count: usize },
    /// Type 9
    DiscreteStates,
    /// Type 1
    ModifiedDifference,
    Unsupported(i32),
}

impl SegmentKind {
    pub fn from_data_type(data_type: i32) -> Self {
        match data_type {
            2 => SegmentKind::Chebyshev { component_count: 3 },
            3 => SegmentKind::Chebyshev { component_count: 6 },
            9 => SegmentKind::DiscreteStates,
            1 => SegmentKind::ModifiedDifference,
            other => SegmentKind::Unsupported(other),
        }
    }
}

/// Loaded interpolation data for a segment
#[derive(Debug)]
enum SegmentData {
    Chebyshev(ChebyshevBlock),
    DiscreteStates(DiscreteStates),
    ModifiedDifference(MdaTable),
}

/// Spacecraft Planet Kernel (SPK) file reader
pub struct SPK {
    /// The underlying DAF file
    pub daf: Arc<DAF>,
    /// Segments in file order
    pub segments: Vec<Segment>,
    /// Map of (center, target) pairs to the index of their last segment
    pairs: HashMap<(i32, i32), usize>,
}

/// A segment containing ephemeris data for a specific body pair
pub struct Segment {
    daf: Arc<DAF>,
    /// Segment source label
    pub source: String,
    /// Start epoch in TDB seconds since J2000
    pub start_second: f64,
    /// End epoch in TDB seconds since J2000
    pub end_second: f64,
    /// Target body NAIF ID
    pub target: i32,
    /// Center body NAIF ID
    pub center: i32,
    /// Reference frame ID
    pub frame: i32,
    /// SPK data type code
    pub data_type: i32,
    /// Start index in file (1-indexed double-words)
    pub start_i: usize,
    /// End index in file (1-indexed double-words)
    pub end_i: usize,
    /// Start Julian date
    pub start_jd: f64,
    /// End Julian date
    pub end_jd: f64,
    pub kind: SegmentKind,
    data: OnceCell<SegmentData>,
}

impl SPK {
    /// Open an SPK file at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_daf(DAF::open(path)?)
    }

    /// Open an SPK file with explicit storage options
    pub fn open_with<P: AsRef<Path>>(path: P, options: &OpenOptions) -> Result<Self> {
        Self::from_daf(options.open(path)?)
    }

    /// Parse an SPK held in memory, e.g. from `include_bytes!()`
    pub fn from_bytes(data: impl Into<Bytes>) -> Result<Self> {
        Self::from_daf(DAF::from_bytes(data)?)
    }

    /// Build the segment list from every summary in the container
    pub fn from_daf(daf: DAF) -> Result<Self> {
        let daf = Arc::new(daf);
        let mut segments = Vec::new();
        for summary in daf.summaries() {
            segments.push(Segment::from_summary(&daf, &summary?)?);
        }

        let pairs = segments
            .iter()
            .enumerate()
            .map(|(idx, segment)| ((segment.center, segment.target), idx))
            .collect();
        debug!("parsed {} SPK segments", segments.len());

        Ok(SPK {
            daf,
            segments,
            pairs,
        })
    }

    /// The last segment in file order for the given center and target
    pub fn get_segment(&self, center: i32, target: i32) -> Result<&Segment> {
        self.pairs
            .get(&(center, target))
            .map(|&idx| &self.segments[idx])
            .ok_or(JplephemError::BodyNotFound { center, target })
    }

    /// Read comments from the underlying DAF file
    pub fn comments(&self) -> Result<String> {
        self.daf.comments()
    }

    /// Release the file and every segment's cached data
    pub fn close(&mut self) {
        self.daf.close();
        for segment in &mut self.segments {
            segment.data.take();
        }
    }
}

impl fmt::Display for SPK {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "File type {} and format {} with {} segments:",
            self.daf.locidw,
            self.daf.locfmt,
            self.segments.len()
        )?;
        for segment in &self.segments {
            write!(f, "\n{segment}")?;
        }
        Ok(())
    }
}

/// Position (km) and velocity (km/day)
type State = (Vector3<f64>, Vector3<f64>);

fn split_state(state: [f64; 6]) -> State {
    (
        Vector3::new(state[0], state[1], state[2]),
        Vector3::new(state[3], state[4], state[5]) * S_PER_DAY,
    )
}

/// Unwrap the result of a length-1 batch
pub(crate) fn single<T>(mut values: Vec<T>) -> Result<T> {
    values
        .pop()
        .ok_or_else(|| JplephemError::InvalidFormat("no value computed".to_string()))
}

impl Segment {
    fn from_summary(daf: &Arc<DAF>, summary: &Summary) -> Result<Self> {
        let (start_i, end_i) = summary.word_range()?;
        let (start_second, end_second, target, center, frame, data_type) =
            match (&summary.doubles[..], &summary.integers[..]) {
                (&[start, end], &[target, center, frame, data_type, _, _]) => {
                    (start, end, target, center, frame, data_type)
                }
                _ => {
                    return Err(JplephemError::InvalidFormat(format!(
                        "SPK summary {:?} has {} doubles and {} integers, expected 2 and 6",
                        summary.name_text(),
                        summary.doubles.len(),
                        summary.integers.len()
                    )))
                }
            };

        Ok(Segment {
            daf: Arc::clone(daf),
            source: summary.name_text(),
            start_second,
            end_second,
            target,
            center,
            frame,
            data_type,
            start_i,
            end_i,
            start_jd: seconds_to_jd(start_second),
            end_jd: seconds_to_jd(end_second),
            kind: SegmentKind::from_data_type(data_type),
            data: OnceCell::new(),
        })
    }

    fn data(&self) -> Result<&SegmentData> {
        if self.daf.is_closed() {
            return Err(JplephemError::Closed);
        }
        self.data.get_or_try_init(|| -> Result<SegmentData> {
            debug!(
                "loading type {} segment {} -> {} from words {}..{}",
                self.data_type, self.center, self.target, self.start_i, self.end_i
            );
            Ok(match self.kind {
                SegmentKind::Chebyshev { component_count } => SegmentData::Chebyshev(
                    ChebyshevBlock::load(&self.daf, self.start_i, self.end_i, component_count)?,
                ),
                SegmentKind::DiscreteStates => SegmentData::DiscreteStates(DiscreteStates::load(
                    &self.daf,
                    self.start_i,
                    self.end_i,
                )?),
                SegmentKind::ModifiedDifference => SegmentData::ModifiedDifference(MdaTable::load(
                    &self.daf,
                    self.start_i,
                    self.end_i,
                    self.start_second,
                    self.end_second,
                )?),
                SegmentKind::Unsupported(code) => {
                    return Err(JplephemError::UnsupportedDataType(code))
                }
            })
        })
    }

    fn positions(&self, times: &[(f64, f64)]) -> Result<Vec<Vector3<f64>>> {
        match self.data()? {
            SegmentData::Chebyshev(block) => Ok(block
                .compute(times, false)?
                .into_iter()
                .map(|e| Vector3::from_column_slice(&e.components[..3]))
                .collect()),
            SegmentData::DiscreteStates(table) => {
                Ok(table.compute(times)?.into_iter().map(|s| split_state(s).0).collect())
            }
            SegmentData::ModifiedDifference(table) => {
                Ok(table.compute(times)?.into_iter().map(|s| split_state(s).0).collect())
            }
        }
    }

    fn states(&self, times: &[(f64, f64)]) -> Result<Vec<State>> {
        match self.data()? {
            SegmentData::Chebyshev(block) => {
                let differentiate = block.layout.component_count == 3;
                Ok(block
                    .compute(times, differentiate)?
                    .into_iter()
                    .map(|e| {
                        let position = Vector3::from_column_slice(&e.components[..3]);
                        let velocity = match e.rates {
                            Some(rates) => Vector3::from_column_slice(&rates[..3]),
                            None => Vector3::from_column_slice(&e.components[3..6]),
                        };
                        (position, velocity * S_PER_DAY)
                    })
                    .collect())
            }
            SegmentData::DiscreteStates(table) => {
                Ok(table.compute(times)?.into_iter().map(split_state).collect())
            }
            SegmentData::ModifiedDifference(table) => {
                Ok(table.compute(times)?.into_iter().map(split_state).collect())
            }
        }
    }

    /// Compute position (km) at a two-part TDB Julian date
    pub fn compute(&self, tdb: f64, tdb2: f64) -> Result<Vector3<f64>> {
        single(self.positions(&[(tdb, tdb2)])?)
    }

    /// Compute position (km) and velocity (km/day) at a two-part TDB Julian date
    pub fn compute_and_differentiate(
        &self,
        tdb: f64,
        tdb2: f64,
    ) -> Result<(Vector3<f64>, Vector3<f64>)> {
        single(self.states(&[(tdb, tdb2)])?)
    }

    /// Compute positions for a batch of times
    ///
    /// Either slice may hold a single value that applies to every element of
    /// the other.
    pub fn compute_batch(&self, tdb: &[f64], tdb2: &[f64]) -> Result<Vec<Vector3<f64>>> {
        self.positions(&broadcast_times(tdb, tdb2)?)
    }

    /// Compute positions and velocities for a batch of times
    pub fn compute_and_differentiate_batch(
        &self,
        tdb: &[f64],
        tdb2: &[f64],
    ) -> Result<Vec<(Vector3<f64>, Vector3<f64>)>> {
        self.states(&broadcast_times(tdb, tdb2)?)
    }

    /// Record layout of a Chebyshev segment, or `None` for other data types
    pub fn chebyshev_layout(&self) -> Result<Option<ChebyshevLayout>> {
        if !matches!(self.kind, SegmentKind::Chebyshev { .. }) {
            return Ok(None);
        }
        match self.data()? {
            SegmentData::Chebyshev(block) => Ok(Some(block.layout)),
            _ => Ok(None),
        }
    }

    /// Return a human-readable description of this segment
    pub fn describe(&self, verbose: bool) -> String {
        let mut text = format!(
            "{}..{}  Type {}  {} -> {}",
            format_date(self.start_jd),
            format_date(self.end_jd),
            self.data_type,
            body_label(self.center, "Unknown center"),
            body_label(self.target, "Unknown target"),
        );
        if verbose {
            text.push_str(&format!("\n  frame={} source={}", self.frame, self.source));
        }
        text
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.describe(false))
    }
}

impl fmt::Debug for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.describe(true))
    }
}
