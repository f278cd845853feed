//! Binary Planetary Constants Kernel (PCK) reader
//!
//! Binary PCK segments store body orientation as Chebyshev series for three
//! Euler angles: pole right ascension, pole declination and the cumulative
//! rotation about the pole. Only data type 2 is supported.
//!
//! Angles are in radians and rates in radians per second.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use nalgebra::Vector3;
use once_cell::sync::OnceCell;
use tracing::debug;

use crate::calendar::{broadcast_times, format_date, seconds_to_jd};
use crate::chebyshev::{ChebyshevBlock, ChebyshevLayout};
use crate::daf::{OpenOptions, Summary, DAF};
use crate::errors::{JplephemError, Result};
use crate::names::body_label;
use crate::spk::single;

/// Binary PCK file reader
pub struct PCK {
    /// The underlying DAF file
    pub daf: Arc<DAF>,
    /// Segments in file order
    pub segments: Vec<Segment>,
    /// Map of (body, frame) pairs to the index of their last segment
    pairs: HashMap<(i32, i32), usize>,
}

/// Orientation data for one body relative to a reference frame
pub struct Segment {
    daf: Arc<DAF>,
    /// Segment source label
    pub source: String,
    /// Start epoch in TDB seconds since J2000
    pub start_second: f64,
    /// End epoch in TDB seconds since J2000
    pub end_second: f64,
    /// NAIF ID of the body or body-fixed frame
    pub body: i32,
    /// Reference frame ID
    pub frame: i32,
    /// PCK data type code
    pub data_type: i32,
    pub start_i: usize,
    pub end_i: usize,
    pub start_jd: f64,
    pub end_jd: f64,
    data: OnceCell<ChebyshevBlock>,
}

impl PCK {
    /// Open a binary PCK file at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_daf(DAF::open(path)?)
    }

    /// Open a binary PCK file with explicit storage options
    pub fn open_with<P: AsRef<Path>>(path: P, options: &OpenOptions) -> Result<Self> {
        Self::from_daf(options.open(path)?)
    }

    /// Parse a binary PCK held in memory
    pub fn from_bytes(data: impl Into<Bytes>) -> Result<Self> {
        Self::from_daf(DAF::from_bytes(data)?)
    }

    pub fn from_daf(daf: DAF) -> Result<Self> {
        let daf = Arc::new(daf);
        let mut segments = Vec::new();
        for summary in daf.summaries() {
            segments.push(Segment::from_summary(&daf, &summary?)?);
        }

        let pairs = segments
            .iter()
            .enumerate()
            .map(|(idx, segment)| ((segment.body, segment.frame), idx))
            .collect();
        debug!("parsed {} PCK segments", segments.len());

        Ok(PCK {
            daf,
            segments,
            pairs,
        })
    }

    /// The last segment in file order for the given body and frame
    pub fn get_segment(&self, body: i32, frame: i32) -> Result<&Segment> {
        self.pairs
            .get(&(body, frame))
            .map(|&idx| &self.segments[idx])
            .ok_or(JplephemError::FrameNotFound { body, frame })
    }

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

impl fmt::Display for PCK {
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

impl Segment {
    fn from_summary(daf: &Arc<DAF>, summary: &Summary) -> Result<Self> {
        let (start_i, end_i) = summary.word_range()?;
        let (start_second, end_second, body, frame, data_type) =
            match (&summary.doubles[..], &summary.integers[..]) {
                (&[start, end], &[body, frame, data_type, _, _]) => {
                    (start, end, body, frame, data_type)
                }
                _ => {
                    return Err(JplephemError::InvalidFormat(format!(
                        "PCK summary {:?} has {} doubles and {} integers, expected 2 and 5",
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
            body,
            frame,
            data_type,
            start_i,
            end_i,
            start_jd: seconds_to_jd(start_second),
            end_jd: seconds_to_jd(end_second),
            data: OnceCell::new(),
        })
    }

    fn block(&self) -> Result<&ChebyshevBlock> {
        if self.daf.is_closed() {
            return Err(JplephemError::Closed);
        }
        if self.data_type != 2 {
            return Err(JplephemError::UnsupportedDataType(self.data_type));
        }
        self.data.get_or_try_init(|| {
            debug!(
                "loading orientation segment body={} frame={} from words {}..{}",
                self.body, self.frame, self.start_i, self.end_i
            );
            ChebyshevBlock::load(&self.daf, self.start_i, self.end_i, 3)
        })
    }

    fn angles(&self, times: &[(f64, f64)]) -> Result<Vec<Vector3<f64>>> {
        Ok(self
            .block()?
            .compute(times, false)?
            .into_iter()
            .map(|e| Vector3::from_column_slice(&e.components))
            .collect())
    }

    fn angles_and_rates(&self, times: &[(f64, f64)]) -> Result<Vec<(Vector3<f64>, Vector3<f64>)>> {
        self.block()?
            .compute(times, true)?
            .into_iter()
            .map(|e| {
                let rates = e.rates.ok_or_else(|| {
                    JplephemError::InvalidFormat("orientation rates not computed".to_string())
                })?;
                Ok((
                    Vector3::from_column_slice(&e.components),
                    Vector3::from_column_slice(&rates),
                ))
            })
            .collect()
    }

    /// Right ascension, declination and rotation angle (radians)
    pub fn compute(&self, tdb: f64, tdb2: f64) -> Result<Vector3<f64>> {
        single(self.angles(&[(tdb, tdb2)])?)
    }

    /// Angles (radians) and their rates (radians per second)
    pub fn compute_and_differentiate(
        &self,
        tdb: f64,
        tdb2: f64,
    ) -> Result<(Vector3<f64>, Vector3<f64>)> {
        single(self.angles_and_rates(&[(tdb, tdb2)])?)
    }

    pub fn compute_batch(&self, tdb: &[f64], tdb2: &[f64]) -> Result<Vec<Vector3<f64>>> {
        self.angles(&broadcast_times(tdb, tdb2)?)
    }

    pub fn compute_and_differentiate_batch(
        &self,
        tdb: &[f64],
        tdb2: &[f64],
    ) -> Result<Vec<(Vector3<f64>, Vector3<f64>)>> {
        self.angles_and_rates(&broadcast_times(tdb, tdb2)?)
    }

    pub fn chebyshev_layout(&self) -> Result<ChebyshevLayout> {
        Ok(self.block()?.layout)
    }

    pub fn describe(&self, verbose: bool) -> String {
        let mut text = format!(
            "{}..{}  frame={}  {}",
            format_date(self.start_jd),
            format_date(self.end_jd),
            self.frame,
            body_label(self.body, "Unknown body"),
        );
        if verbose {
            text.push_str(&format!(
                "\n  data_type={} source={}",
                self.data_type, self.source
            ));
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
