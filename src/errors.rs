//! Error types for the jplephem crate

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for jplephem functionality
#[derive(Error, Debug)]
pub enum JplephemError {
    /// Error when a file I/O operation fails
    #[error("File I/O error on {path:?}: {source}")]
    FileError {
        path: PathBuf,
        source: std::io::Error,
    },

    /// I/O failure on a stream that has no path (in-memory buffers, writers)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error when the file format is invalid, damaged or unsupported
    #[error("Invalid file format: {0}")]
    InvalidFormat(String),

    /// The LOCFMT word names a byte order this reader does not know
    #[error("unknown format {0:?}")]
    UnknownEndianness(String),

    /// A memory map was explicitly requested but could not be created
    #[error("Memory mapping error: {0}")]
    MemoryMapError(String),

    /// One or more requested times fall outside the segment coverage
    ///
    /// `out_of_range_times` runs parallel to the requested times, with
    /// `true` marking each time that could not be computed.
    #[error("segment only covers dates {start_date} through {end_date}")]
    OutOfRange {
        start_jd: f64,
        end_jd: f64,
        start_date: String,
        end_date: String,
        out_of_range_times: Vec<bool>,
    },

    /// Error when no SPK segment links the requested bodies
    #[error("Body not found: center={center}, target={target}")]
    BodyNotFound { center: i32, target: i32 },

    /// Error when no PCK segment covers the requested body and frame
    #[error("No orientation segment for body={body}, frame={frame}")]
    FrameNotFound { body: i32, frame: i32 },

    /// Error when the data type is not supported
    #[error("jplephem cannot compute from segments of data type {0}")]
    UnsupportedDataType(i32),

    /// Type 9 segment whose interpolation degree is not 1
    #[error("Type 9 segments with a polynomial degree of {0} are not supported")]
    UnsupportedDegree(i32),

    /// The kernel was closed before this call
    #[error("the kernel has been closed")]
    Closed,

    /// Batch time arguments whose lengths cannot be paired
    #[error("cannot pair {tdb} tdb values with {tdb2} tdb2 values")]
    ShapeMismatch { tdb: usize, tdb2: usize },
}

impl JplephemError {
    /// Whether the error is a per-call coverage failure the caller can retry
    /// with different times, as opposed to a problem with the file itself.
    pub fn is_out_of_range(&self) -> bool {
        matches!(self, JplephemError::OutOfRange { .. })
    }
}

/// Result type for jplephem operations
pub type Result<T> = std::result::Result<T, JplephemError>;

/// Convert a std::io::Error to JplephemError with path context
pub fn io_err(path: impl Into<PathBuf>, err: std::io::Error) -> JplephemError {
    JplephemError::FileError {
        path: path.into(),
        source: err,
    }
}

/// Build an `OutOfRange` error for a coverage of `start_jd..end_jd`
pub fn out_of_range(start_jd: f64, end_jd: f64, out_of_range_times: Vec<bool>) -> JplephemError {
    JplephemError::OutOfRange {
        start_jd,
        end_jd,
        start_date: crate::calendar::format_date(start_jd),
        end_date: crate::calendar::format_date(end_jd),
        out_of_range_times,
    }
}
