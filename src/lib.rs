//! Reader for JPL ephemerides and other NAIF SPICE kernels
//!
//! This crate reads Double Array Files (DAF), the binary container behind
//! SPICE SPK and binary PCK kernels, and evaluates their segments: Chebyshev
//! series (SPK types 2 and 3, PCK type 2), discrete states with linear
//! interpolation (SPK type 9) and Modified Difference Arrays (SPK type 1).
//!
//! # Main Components
//!
//! - [`daf`] - Double Array File container reader and append-only writer
//! - [`storage`] - memory-mapped and buffered byte sources
//! - [`spk`] - Spacecraft Planet Kernel segments (positions and velocities)
//! - [`pck`] - binary Planetary Constants Kernel segments (orientation angles)
//! - [`chebyshev`], [`lagrange`], [`mda`] - interpolation engines
//! - [`excerpt`] - write a date-limited copy of an SPK
//! - [`names`] - NAIF body name/ID mappings
//! - [`calendar`] - Julian date and calendar conversions
//!
//! ```no_run
//! use jplephem::SPK;
//!
//! let kernel = SPK::open("de421.bsp")?;
//! let segment = kernel.get_segment(0, 4)?;
//! let (position, velocity) = segment.compute_and_differentiate(2457061.5, 0.0)?;
//! println!("{position} km, {velocity} km/day");
//! # Ok::<(), jplephem::JplephemError>(())
//! ```

pub mod calendar;
pub mod chebyshev;
pub mod daf;
pub mod errors;
pub mod excerpt;
pub mod lagrange;
pub mod mda;
pub mod names;
pub mod pck;
pub mod spk;
pub mod storage;

#[cfg(test)]
mod test_utils;

pub use self::daf::{OpenOptions, DAF};
pub use self::errors::{JplephemError, Result};
pub use self::excerpt::write_excerpt;
pub use self::pck::PCK;
pub use self::spk::SPK;
pub use self::storage::Backend;
