//! Narrow an SPK to a date range
//!
//! The excerpt keeps the original file record, prepends a provenance note
//! to the comment area and copies only the Chebyshev records overlapping
//! the requested dates from each selected segment.

use std::io::{Read, Seek, SeekFrom, Write};

use tracing::{debug, info};

use crate::calendar::{compute_calendar_date, jd_to_seconds};
use crate::daf::{COMMENT_RECORD_TEXT, DAF, EOT, RECORD_SIZE};
use crate::errors::Result;
use crate::spk::{Segment, SPK};

fn preface(start_jd: f64, end_jd: f64) -> String {
    let (y1, m1, d1) = compute_calendar_date((start_jd + 0.5) as i64, None);
    let (y2, m2, d2) = compute_calendar_date((end_jd + 0.5) as i64, None);
    format!(
        ";\n\
         ; This is an ephemeris excerpt created by jplephem {}, which was\n\
         ; asked to narrow the ephemeris to Julian dates {start_jd:.1} - {end_jd:.1}\n\
         ; (proleptic Gregorian dates {y1}-{m1:02}-{d1:02} through {y2}-{m2:02}-{d2:02}).\n\
         ;\n\
         ; Here is the comments area from the original ephemeris file:\n\
         ; ----------------------------------------------------------------------\n",
        env!("CARGO_PKG_VERSION"),
    )
}

/// Comment text as space-padded records of 1000 characters each, with
/// newlines stored as NUL and an EOT byte at the end.
fn comment_records(text: &str) -> Vec<u8> {
    let mut data: Vec<u8> = text
        .bytes()
        .map(|b| if b == b'\n' { 0 } else { b })
        .collect();
    data.push(EOT);

    let mut out = Vec::with_capacity(data.len().div_ceil(COMMENT_RECORD_TEXT) * RECORD_SIZE);
    for block in data.chunks(COMMENT_RECORD_TEXT) {
        out.extend_from_slice(block);
        out.resize(out.len() + RECORD_SIZE - block.len(), b' ');
    }
    out
}

/// Write an excerpt of `spk` covering `start_jd..end_jd` to `output`.
///
/// `output` should be empty. Only Chebyshev segments accepted by `select`
/// are copied, and segments that do not overlap the dates are dropped. The
/// copied segments claim exactly the requested coverage even though their
/// records may extend past it. Returns the new file, open for appending.
pub fn write_excerpt<F>(
    spk: &SPK,
    mut output: F,
    start_jd: f64,
    end_jd: f64,
    select: impl Fn(&Segment) -> bool,
) -> Result<DAF>
where
    F: Read + Write + Seek + Send + 'static,
{
    let old = &spk.daf;
    let start_seconds = jd_to_seconds(start_jd);
    let end_seconds = jd_to_seconds(end_jd);

    let comment = preface(start_jd, end_jd) + &old.comments()?;
    let comments = comment_records(&comment);

    output.seek(SeekFrom::Start(0))?;
    output.write_all(&old.read_record(1)?)?;
    output.write_all(&comments)?;
    output.write_all(&[0u8; RECORD_SIZE])?;
    output.write_all(&[b' '; RECORD_SIZE])?;
    output.flush()?;
    output.seek(SeekFrom::Start(0))?;

    let mut daf = DAF::from_reader(output)?;
    daf.fward = (2 + comments.len() / RECORD_SIZE) as u32;
    daf.bward = daf.fward;
    daf.free = (daf.fward + 1) * (RECORD_SIZE / 8) as u32 + 1;
    daf.write_file_record()?;

    for segment in spk.segments.iter().filter(|s| select(s)) {
        let Some(layout) = segment.chebyshev_layout()? else {
            debug!("skipping type {} segment {segment}", segment.data_type);
            continue;
        };
        let n = layout.n as f64;
        let i = (start_seconds - layout.init).div_euclid(layout.intlen).clamp(0.0, n) as usize;
        let j = ((end_seconds - layout.init).div_euclid(layout.intlen) + 1.0).clamp(0.0, n) as usize;
        if i == j {
            debug!("no overlap with {segment}");
            continue;
        }

        let first = segment.start_i + layout.rsize * i;
        let mut excerpt = old.read_array(first, segment.start_i + layout.rsize * j + 3)?;
        let tail = excerpt.len() - 4;
        excerpt[tail..].copy_from_slice(&[
            layout.init + i as f64 * layout.intlen,
            layout.intlen,
            layout.rsize as f64,
            (j - i) as f64,
        ]);

        daf.add_array(
            segment.source.as_bytes(),
            &[start_seconds, end_seconds],
            &[segment.target, segment.center, segment.frame, segment.data_type],
            &excerpt,
        )?;
        info!("copied {} of {} records from {segment}", j - i, layout.n);
    }

    Ok(daf)
}
