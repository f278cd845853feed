//! Calendar date, Julian date and TDB epoch conversions

use crate::errors::{JplephemError, Result};

/// J2000 epoch as Julian date
pub const T0: f64 = 2451545.0;
/// Seconds per day
pub const S_PER_DAY: f64 = 86400.0;

/// Convert seconds since J2000 to Julian date
pub fn seconds_to_jd(seconds: f64) -> f64 {
    T0 + seconds / S_PER_DAY
}

/// Convert Julian date to seconds since J2000
pub fn jd_to_seconds(jd: f64) -> f64 {
    (jd - T0) * S_PER_DAY
}

/// Pair up two-part TDB arguments for a batch computation.
///
/// Either slice may have length 1, in which case it is repeated to match
/// the other; otherwise both must have the same length.
pub fn broadcast_times(tdb: &[f64], tdb2: &[f64]) -> Result<Vec<(f64, f64)>> {
    match (tdb.len(), tdb2.len()) {
        (a, b) if a == b => Ok(tdb.iter().copied().zip(tdb2.iter().copied()).collect()),
        (_, 1) => Ok(tdb.iter().map(|&t| (t, tdb2[0])).collect()),
        (1, _) => Ok(tdb2.iter().map(|&t2| (tdb[0], t2)).collect()),
        (a, b) => Err(JplephemError::ShapeMismatch { tdb: a, tdb2: b }),
    }
}

/// Largest day number accepted by the calendar arithmetic; values past it
/// are clamped. A day-resolution `f64` date cannot get close to it.
const JD_LIMIT: i64 = 1 << 52;

/// Convert Julian day integer to calendar date (year, month, day)
///
/// Uses the proleptic Gregorian calendar unless `julian_before` is set to a
/// specific Julian day, in which case the Julian calendar is used for dates
/// older than that.
pub fn compute_calendar_date(jd_integer: i64, julian_before: Option<i64>) -> (i64, i64, i64) {
    let jd_integer = jd_integer.clamp(-JD_LIMIT, JD_LIMIT);
    let use_gregorian = julian_before.is_none_or(|jb| jd_integer >= jb);

    // See the Explanatory Supplement to the Astronomical Almanac 15.11.
    let mut f = jd_integer + 1401;
    if use_gregorian {
        f += (4 * jd_integer + 274277).div_euclid(146097) * 3 / 4 - 38;
    }
    let e = 4 * f + 3;
    let g = e.rem_euclid(1461) / 4;
    let h = 5 * g + 2;
    let day = h.rem_euclid(153) / 5 + 1;
    let month = (h.div_euclid(153) + 2).rem_euclid(12) + 1;
    let year = e.div_euclid(1461) - 4716 + (12 + 2 - month) / 12;

    (year, month, day)
}

/// Convert (year, month, day) to Julian day integer (proleptic Gregorian)
pub fn compute_julian_day(year: i64, month: i64, day: i64) -> i64 {
    let janfeb = i64::from(month < 3);
    (1461 * (year + 4800 - janfeb)).div_euclid(4)
        + (367 * (month - 2 + janfeb * 12)).div_euclid(12)
        - (3 * (year + 4900 - janfeb).div_euclid(100)).div_euclid(4)
        - 32075
        + day
}

/// Convert a proleptic Gregorian date to a Julian date float
///
/// The result is midnight at the start of `day`.
pub fn compute_julian_date(year: i64, month: i64, day: i64) -> f64 {
    compute_julian_day(year, month, day) as f64 - 0.5
}

/// Convert a floating-point Julian date to a calendar date
pub fn calendar_date_from_float(jd: f64) -> (i64, i64, i64) {
    compute_calendar_date((jd + 0.5).floor() as i64, None)
}

/// Format a Julian date as YYYY-MM-DD
pub fn format_date(jd: f64) -> String {
    let (year, month, day) = calendar_date_from_float(jd);
    format!("{year:04}-{month:02}-{day:02}")
}

/// Bound on each date field, far inside the range of the day arithmetic
const MAX_FIELD: i64 = 1_000_000_000;

/// Parse `YYYY`, `YYYY/MM` or `YYYY/MM/DD` into a Julian date
pub fn parse_date(text: &str) -> Option<f64> {
    let fields: Vec<i64> = text
        .split('/')
        .map(|field| field.trim().parse().ok())
        .collect::<Option<_>>()?;
    if fields.iter().any(|field| !(-MAX_FIELD..=MAX_FIELD).contains(field)) {
        return None;
    }
    match fields[..] {
        [year] => Some(compute_julian_date(year, 1, 1)),
        [year, month] => Some(compute_julian_date(year, month, 1)),
        [year, month, day] => Some(compute_julian_date(year, month, day)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_day_numbers_round_trip() {
        // DE421 coverage limits, a recent date and the start of the Julian period
        let cases = [
            (2414865, (1899, 7, 29)),
            (2471185, (2053, 10, 9)),
            (2460000, (2023, 2, 24)),
            (0, (-4713, 11, 24)),
        ];
        for (jd, (year, month, day)) in cases {
            assert_eq!(compute_calendar_date(jd, None), (year, month, day));
            assert_eq!(compute_julian_day(year, month, day), jd);
        }
        assert_eq!(compute_calendar_date(0, Some(2299161)), (-4712, 1, 1));
    }

    #[test]
    fn test_julian_calendar_before_switch() {
        // 1582-10-15 Gregorian follows 1582-10-04 Julian.
        let switch = 2299161;
        assert_eq!(compute_calendar_date(switch, Some(switch)), (1582, 10, 15));
        assert_eq!(compute_calendar_date(switch - 1, Some(switch)), (1582, 10, 4));
    }

    #[test]
    fn test_format_and_parse_dates() {
        assert_eq!(format_date(2414864.5), "1899-07-29");
        assert_eq!(format_date(2471184.5), "2053-10-09");
        assert_eq!(parse_date("2000/1/1"), Some(2451544.5));
        assert_eq!(parse_date("1969/07"), Some(2440403.5));
        assert_eq!(parse_date("2020"), Some(2458849.5));
        assert_eq!(parse_date("2020/1/1/1"), None);
        assert_eq!(parse_date("soon"), None);
    }

    #[test]
    fn test_garbage_dates_do_not_overflow() {
        // A corrupt segment epoch can reach the date formatter as +-inf or NaN.
        for jd in [f64::INFINITY, f64::NEG_INFINITY, f64::NAN, 1e300, -1e300] {
            let (_, month, day) = calendar_date_from_float(jd);
            assert!((1..=12).contains(&month), "{jd} gave month {month}");
            assert!((1..=31).contains(&day), "{jd} gave day {day}");
            assert!(!format_date(jd).is_empty());
        }
        assert_eq!(
            compute_calendar_date(i64::MAX, None),
            compute_calendar_date(JD_LIMIT, None)
        );
        assert_eq!(parse_date("99999999999999999"), None);
        assert_eq!(parse_date("-9223372036854775808/1/1"), None);
        assert_eq!(parse_date("2000/99999999999/1"), None);
    }

    #[test]
    fn test_seconds_round_trip() {
        assert_eq!(seconds_to_jd(0.0), T0);
        assert_eq!(jd_to_seconds(T0 + 1.0), S_PER_DAY);
    }

    #[test]
    fn test_broadcast_times() {
        assert_eq!(
            broadcast_times(&[1.0, 2.0], &[0.5]).unwrap(),
            vec![(1.0, 0.5), (2.0, 0.5)]
        );
        assert_eq!(
            broadcast_times(&[1.0], &[0.1, 0.2]).unwrap(),
            vec![(1.0, 0.1), (1.0, 0.2)]
        );
        assert!(matches!(
            broadcast_times(&[1.0, 2.0], &[0.1, 0.2, 0.3]),
            Err(JplephemError::ShapeMismatch { tdb: 2, tdb2: 3 })
        ));
    }
}
