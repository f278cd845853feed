//! Synthetic kernels for tests
//!
//! Real ephemerides are tens of megabytes, so most tests build small DAF
//! files in memory with exactly the records they need.

use crate::daf::{Endian, FTPSTR, RECORD_SIZE};

pub fn word_le(value: f64) -> [u8; 8] {
    value.to_le_bytes()
}

pub fn int_le(value: i32) -> [u8; 4] {
    value.to_le_bytes()
}

fn pad(mut bytes: Vec<u8>, len: usize, fill: u8) -> Vec<u8> {
    bytes.resize(len, fill);
    bytes
}

/// Two summary records, each with one summary, over two small arrays
pub fn sample_daf() -> Vec<u8> {
    let mut out = Vec::new();

    // Record 1 - file record
    out.extend_from_slice(b"DAF/SPK ");
    out.extend_from_slice(&2u32.to_le_bytes()); // ND
    out.extend_from_slice(&3u32.to_le_bytes()); // NI
    out.extend(pad(b"Internal Name".to_vec(), 60, b' '));
    out.extend_from_slice(&3u32.to_le_bytes()); // FWARD
    out.extend_from_slice(&7u32.to_le_bytes()); // BWARD
    out.extend_from_slice(&0x401u32.to_le_bytes()); // FREE
    out.extend_from_slice(b"LTL-IEEE");
    out.extend(vec![0u8; 603]);
    out.extend_from_slice(FTPSTR);
    out.extend(vec![0u8; 297]);

    // Record 2 - comments
    out.extend(pad(b"Comment Record".to_vec(), RECORD_SIZE, 0));

    // Record 3 - first summary record
    let mut record = Vec::new();
    record.extend_from_slice(&word_le(7.0));
    record.extend_from_slice(&word_le(0.0));
    record.extend_from_slice(&word_le(1.0));
    record.extend_from_slice(&word_le(101.0));
    record.extend_from_slice(&word_le(202.0));
    record.extend_from_slice(&int_le(303));
    record.extend_from_slice(&int_le(1024 * 4 / 8 + 1));
    record.extend_from_slice(&int_le(1024 * 5 / 8));
    record.extend_from_slice(&int_le(0));
    out.extend(pad(record, RECORD_SIZE, 0));

    // Record 4 - first name record
    out.extend(pad(b"Summary Name 1".to_vec(), RECORD_SIZE, b' '));

    // Records 5 and 6 - array data
    for value in [1001.0, 2002.0] {
        for _ in 0..128 {
            out.extend_from_slice(&word_le(value));
        }
    }

    // Record 7 - second summary record
    let mut record = Vec::new();
    record.extend_from_slice(&word_le(0.0));
    record.extend_from_slice(&word_le(3.0));
    record.extend_from_slice(&word_le(1.0));
    record.extend_from_slice(&word_le(111.0));
    record.extend_from_slice(&word_le(222.0));
    record.extend_from_slice(&int_le(333));
    record.extend_from_slice(&int_le(1024 * 5 / 8 + 1));
    record.extend_from_slice(&int_le(1024 * 6 / 8));
    record.extend_from_slice(&int_le(0));
    out.extend(pad(record, RECORD_SIZE, 0));

    // Record 8 - second name record
    out.extend(pad(b"Summary Name 2".to_vec(), RECORD_SIZE, b' '));

    out
}

struct PendingSegment {
    name: String,
    doubles: Vec<f64>,
    integers: Vec<i32>,
    array: Vec<f64>,
}

/// Builds a DAF holding one summary record and contiguous arrays
pub struct KernelBuilder {
    locidw: &'static str,
    nd: u32,
    ni: u32,
    endian: Endian,
    comment: Option<String>,
    segments: Vec<PendingSegment>,
}

impl KernelBuilder {
    pub fn spk() -> Self {
        KernelBuilder {
            locidw: "DAF/SPK",
            nd: 2,
            ni: 6,
            endian: Endian::Little,
            comment: None,
            segments: Vec::new(),
        }
    }

    pub fn pck() -> Self {
        KernelBuilder {
            locidw: "DAF/PCK",
            ni: 5,
            ..Self::spk()
        }
    }

    pub fn label(mut self, locidw: &'static str) -> Self {
        self.locidw = locidw;
        self
    }

    pub fn endian(mut self, endian: Endian) -> Self {
        self.endian = endian;
        self
    }

    pub fn comment(mut self, text: &str) -> Self {
        self.comment = Some(text.to_string());
        self
    }

    /// Add an SPK segment; the word range is filled in by `build`
    #[allow(clippy::too_many_arguments)]
    pub fn spk_segment(
        mut self,
        name: &str,
        start_second: f64,
        end_second: f64,
        target: i32,
        center: i32,
        frame: i32,
        data_type: i32,
        array: Vec<f64>,
    ) -> Self {
        self.segments.push(PendingSegment {
            name: name.to_string(),
            doubles: vec![start_second, end_second],
            integers: vec![target, center, frame, data_type],
            array,
        });
        self
    }

    /// Add a PCK segment; the word range is filled in by `build`
    #[allow(clippy::too_many_arguments)]
    pub fn pck_segment(
        mut self,
        name: &str,
        start_second: f64,
        end_second: f64,
        body: i32,
        frame: i32,
        data_type: i32,
        array: Vec<f64>,
    ) -> Self {
        self.segments.push(PendingSegment {
            name: name.to_string(),
            doubles: vec![start_second, end_second],
            integers: vec![body, frame, data_type],
            array,
        });
        self
    }

    fn word(&self, value: f64) -> [u8; 8] {
        let mut buf = [0u8; 8];
        self.endian.write_f64(&mut buf, value);
        buf
    }

    fn int(&self, value: i32) -> [u8; 4] {
        let mut buf = [0u8; 4];
        self.endian.write_i32(&mut buf, value);
        buf
    }

    fn uint(&self, value: u32) -> [u8; 4] {
        let mut buf = [0u8; 4];
        self.endian.write_u32(&mut buf, value);
        buf
    }

    pub fn build(&self) -> Vec<u8> {
        let comment_records: Vec<Vec<u8>> = match &self.comment {
            None => Vec::new(),
            Some(text) => {
                let mut data: Vec<u8> = text.replace('\n', "\0").into_bytes();
                data.push(0x04);
                data.chunks(1000)
                    .map(|chunk| pad(chunk.to_vec(), RECORD_SIZE, b' '))
                    .collect()
            }
        };

        let fward = 2 + comment_records.len() as u32;
        let mut next_word = (fward as usize + 1) * (RECORD_SIZE / 8) + 1;

        let summary_length = 8 * self.nd as usize + 4 * self.ni as usize;
        let step = summary_length.next_multiple_of(8);

        let mut summaries = Vec::new();
        summaries.extend_from_slice(&self.word(0.0));
        summaries.extend_from_slice(&self.word(0.0));
        summaries.extend_from_slice(&self.word(self.segments.len() as f64));
        let mut names = Vec::new();
        let mut arrays = Vec::new();

        for segment in &self.segments {
            let start = next_word;
            let end = start + segment.array.len() - 1;
            next_word = end + 1;

            let mut packed = Vec::new();
            for &value in &segment.doubles {
                packed.extend_from_slice(&self.word(value));
            }
            for &value in segment.integers.iter().chain(&[start as i32, end as i32]) {
                packed.extend_from_slice(&self.int(value));
            }
            summaries.extend(pad(packed, step, 0));
            names.extend(pad(segment.name.clone().into_bytes(), step, b' '));
            for &value in &segment.array {
                arrays.extend_from_slice(&self.word(value));
            }
        }

        let mut out = Vec::new();
        out.extend(pad(self.locidw.as_bytes().to_vec(), 8, b' '));
        out.extend_from_slice(&self.uint(self.nd));
        out.extend_from_slice(&self.uint(self.ni));
        out.extend(pad(b"synthetic kernel".to_vec(), 60, b' '));
        out.extend_from_slice(&self.uint(fward));
        out.extend_from_slice(&self.uint(fward));
        out.extend_from_slice(&self.uint(next_word as u32));
        if self.locidw == "NAIF/DAF" {
            out.extend(vec![0u8; RECORD_SIZE - out.len()]);
        } else {
            out.extend_from_slice(self.endian.locfmt().as_bytes());
            out.extend(vec![0u8; 603]);
            out.extend_from_slice(FTPSTR);
            out.extend(vec![0u8; 297]);
        }

        for record in comment_records {
            out.extend(record);
        }
        out.extend(pad(summaries, RECORD_SIZE, 0));
        out.extend(pad(names, RECORD_SIZE, b' '));
        out.extend(arrays);
        out
    }
}

/// Type 2/3 coefficient block: `records[r][c]` holds the coefficients of
/// component `c` in record `r`, all records sharing one coefficient count.
pub fn chebyshev_array(init: f64, intlen: f64, records: &[Vec<Vec<f64>>]) -> Vec<f64> {
    let components = records[0].len();
    let count = records[0][0].len();
    let rsize = 2 + components * count;
    let mut array = Vec::new();
    for (r, record) in records.iter().enumerate() {
        array.push(init + (r as f64 + 0.5) * intlen);
        array.push(intlen / 2.0);
        for component in record {
            assert_eq!(component.len(), count);
            array.extend_from_slice(component);
        }
    }
    array.extend_from_slice(&[init, intlen, rsize as f64, records.len() as f64]);
    array
}

/// Type 9 block: states, epochs, epoch directory, degree, count
pub fn discrete_states_array(states: &[[f64; 6]], epochs: &[f64], degree: f64) -> Vec<f64> {
    let mut array: Vec<f64> = states.iter().flatten().copied().collect();
    array.extend_from_slice(epochs);
    array.extend(epochs.iter().skip(99).step_by(100).take((epochs.len() - 1) / 100));
    array.push(degree);
    array.push(states.len() as f64);
    array
}

/// Type 1 block: 71-word records, final epochs, epoch directory, count
pub fn mda_array(records: &[[f64; 71]]) -> Vec<f64> {
    let mut array: Vec<f64> = records.iter().flatten().copied().collect();
    let epochs: Vec<f64> = records.iter().map(|r| r[0]).collect();
    array.extend_from_slice(&epochs);
    array.extend(epochs.iter().skip(99).step_by(100).take(records.len() / 100));
    array.push(records.len() as f64);
    array
}
