//! Double Array File (DAF) format reader for SPICE files
//!
//! Handles reading NAIF's DAF binary format, used for SPK and PCK files,
//! plus the append-only write path used when excerpting a kernel.
//!
//! A DAF is a sequence of 1024-byte records. Record 1 is the file record,
//! records `2..FWARD` hold comment text, and summary/name record pairs form
//! a doubly linked list starting at record `FWARD`. Array data is addressed
//! by 1-based double-precision word indices.

use std::collections::HashSet;
use std::fs::File;
use std::io::{Read, Seek, Write};
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use bytes::Bytes;
use tracing::{debug, warn};

use crate::errors::{io_err, JplephemError, Result};
use crate::storage::{Backend, BufferedStorage, MappedStorage, Storage};

pub(crate) const RECORD_SIZE: usize = 1024;
const DOUBLE_SIZE: usize = 8;
/// Bytes of comment text carried by each comment record
pub(crate) const COMMENT_RECORD_TEXT: usize = 1000;
/// End-of-transmission byte terminating the comment area
pub(crate) const EOT: u8 = 0x04;

/// FTP validation string, damaged if a file went through ASCII-mode transfer
pub const FTPSTR: &[u8] = b"FTPSTR:\r:\n:\r\n:\r\x00:\x81:\x10\xce:ENDFTP";

/// Environment variable that downgrades `Backend::Auto` to buffered reads
pub const NO_MMAP_ENV: &str = "JPLEPHEM_NO_MMAP";

/// DAF file endianness
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Endian {
    Big,
    Little,
}

impl Endian {
    /// The LOCFMT word naming this byte order
    pub fn locfmt(self) -> &'static str {
        match self {
            Endian::Big => "BIG-IEEE",
            Endian::Little => "LTL-IEEE",
        }
    }

    fn from_locfmt(locfmt: &[u8]) -> Option<Self> {
        match locfmt {
            b"BIG-IEEE" => Some(Endian::Big),
            b"LTL-IEEE" => Some(Endian::Little),
            _ => None,
        }
    }

    pub fn read_f64(self, bytes: &[u8]) -> f64 {
        match self {
            Endian::Big => BigEndian::read_f64(bytes),
            Endian::Little => LittleEndian::read_f64(bytes),
        }
    }

    pub fn read_i32(self, bytes: &[u8]) -> i32 {
        match self {
            Endian::Big => BigEndian::read_i32(bytes),
            Endian::Little => LittleEndian::read_i32(bytes),
        }
    }

    pub fn read_u32(self, bytes: &[u8]) -> u32 {
        match self {
            Endian::Big => BigEndian::read_u32(bytes),
            Endian::Little => LittleEndian::read_u32(bytes),
        }
    }

    pub fn write_f64(self, bytes: &mut [u8], value: f64) {
        match self {
            Endian::Big => BigEndian::write_f64(bytes, value),
            Endian::Little => LittleEndian::write_f64(bytes, value),
        }
    }

    pub fn write_i32(self, bytes: &mut [u8], value: i32) {
        match self {
            Endian::Big => BigEndian::write_i32(bytes, value),
            Endian::Little => LittleEndian::write_i32(bytes, value),
        }
    }

    pub fn write_u32(self, bytes: &mut [u8], value: u32) {
        match self {
            Endian::Big => BigEndian::write_u32(bytes, value),
            Endian::Little => LittleEndian::write_u32(bytes, value),
        }
    }
}

/// Byte-order candidates for the legacy `NAIF/DAF` label, in probe order
const NAIF_DAF_CANDIDATES: [Endian; 2] = [Endian::Big, Endian::Little];

/// Pick the byte order of a legacy `NAIF/DAF` file record.
///
/// Those files carry no LOCFMT word, but every one of them is an SPK
/// with ND = 2, so the first byte order that reads ND as 2 wins.
pub fn probe_naif_daf_endian(file_record: &[u8]) -> Result<Endian> {
    NAIF_DAF_CANDIDATES
        .into_iter()
        .find(|endian| endian.read_u32(&file_record[8..12]) == 2)
        .ok_or_else(|| {
            JplephemError::InvalidFormat(
                "neither a big- nor a little-endian scan of this file produces the expected ND=2"
                    .to_string(),
            )
        })
}

/// How to open a DAF file
#[derive(Clone, Debug, Default)]
pub struct OpenOptions {
    backend: Backend,
    writable: bool,
}

impl OpenOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Choose the storage backend
    pub fn backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    /// Open read+write for the append path; implies buffered storage
    pub fn writable(mut self, writable: bool) -> Self {
        self.writable = writable;
        self
    }

    /// The backend after applying `writable` and the environment override
    pub fn resolved_backend(&self) -> Backend {
        if self.writable {
            return Backend::Buffered;
        }
        match self.backend {
            Backend::Auto if std::env::var_os(NO_MMAP_ENV).is_some_and(|v| !v.is_empty()) => {
                Backend::Buffered
            }
            other => other,
        }
    }

    /// Open the DAF at `path`
    pub fn open<P: AsRef<Path>>(&self, path: P) -> Result<DAF> {
        let path = path.as_ref();
        let storage: Box<dyn Storage> = if self.writable {
            let file = File::options()
                .read(true)
                .write(true)
                .open(path)
                .map_err(|e| io_err(path, e))?;
            Box::new(BufferedStorage::with_path(file, path))
        } else {
            let file = File::open(path).map_err(|e| io_err(path, e))?;
            match self.resolved_backend() {
                Backend::Buffered => Box::new(BufferedStorage::with_path(file, path)),
                Backend::Mapped => Box::new(MappedStorage::map_file(&file, path)?),
                Backend::Auto => match MappedStorage::map_file(&file, path) {
                    Ok(mapped) => Box::new(mapped),
                    Err(e) => {
                        warn!("falling back to buffered reads: {e}");
                        Box::new(BufferedStorage::with_path(file, path))
                    }
                },
            }
        };
        DAF::from_storage(storage, Some(path.to_path_buf()))
    }
}

/// One summary from a summary record, with its name
#[derive(Clone, Debug, PartialEq)]
pub struct Summary {
    /// Name bytes with the space padding removed
    pub name: Vec<u8>,
    /// The ND double-precision components
    pub doubles: Vec<f64>,
    /// The NI integer components; the last two are the array's word range
    pub integers: Vec<i32>,
}

impl Summary {
    /// The name as text, decoded byte-for-byte as Latin-1
    pub fn name_text(&self) -> String {
        self.name.iter().map(|&b| b as char).collect()
    }

    /// Inclusive 1-based word range of the described array
    pub fn word_range(&self) -> Result<(usize, usize)> {
        match self.integers[..] {
            [.., start, end] if start >= 1 && end >= start - 1 => Ok((start as usize, end as usize)),
            _ => Err(JplephemError::InvalidFormat(format!(
                "summary {:?} has no valid array address in {:?}",
                self.name_text(),
                self.integers
            ))),
        }
    }
}

/// A summary record as read from the file
#[derive(Clone, Debug)]
pub struct SummaryRecord {
    pub number: usize,
    pub next: usize,
    pub previous: usize,
    pub n_summaries: usize,
    pub data: Bytes,
}

/// A lazily decoded run of doubles from the file
///
/// Backed by the memory map when the container is mapped, so elements are
/// only paged in as they are touched.
#[derive(Clone)]
pub struct DoubleArray {
    bytes: Bytes,
    endian: Endian,
}

impl DoubleArray {
    pub fn len(&self) -> usize {
        self.bytes.len() / DOUBLE_SIZE
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Element `index` (0-based); panics past the end like slice indexing
    pub fn at(&self, index: usize) -> f64 {
        let pos = index * DOUBLE_SIZE;
        self.endian.read_f64(&self.bytes[pos..pos + DOUBLE_SIZE])
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        (index < self.len()).then(|| self.at(index))
    }

    /// Zero-copy view of elements `start..end`
    pub fn slice(&self, start: usize, end: usize) -> DoubleArray {
        DoubleArray {
            bytes: self.bytes.slice(start * DOUBLE_SIZE..end * DOUBLE_SIZE),
            endian: self.endian,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.bytes
            .chunks_exact(DOUBLE_SIZE)
            .map(|chunk| self.endian.read_f64(chunk))
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.iter().collect()
    }
}

impl std::fmt::Debug for DoubleArray {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DoubleArray")
            .field("len", &self.len())
            .field("endian", &self.endian)
            .finish()
    }
}

/// Double Array File (DAF) reader
pub struct DAF {
    pub path: Option<PathBuf>,
    storage: RwLock<Option<Box<dyn Storage>>>,
    backend: Backend,
    /// Raw file record, kept so rewrites preserve every unparsed byte
    file_record: Vec<u8>,
    /// File ID word (e.g. "DAF/SPK", "DAF/PCK", "NAIF/DAF")
    pub locidw: String,
    /// Format word naming the byte order ("BIG-IEEE" or "LTL-IEEE")
    pub locfmt: String,
    /// Number of double-precision components per summary
    pub nd: u32,
    /// Number of integer components per summary
    pub ni: u32,
    /// Forward pointer to first summary record
    pub fward: u32,
    /// Backward pointer to last summary record
    pub bward: u32,
    /// First free address
    pub free: u32,
    /// Internal file name
    pub ifname: String,
    /// Byte order
    pub endian: Endian,
    /// Size of each packed summary in bytes, before padding
    summary_length: usize,
    /// Size of each summary slot in bytes, padded to whole doubles
    summary_step: usize,
    summaries_per_record: usize,
}

impl DAF {
    /// Open a DAF file at the given path, memory-mapping it when possible
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        OpenOptions::new().open(path)
    }

    /// Read a DAF from an in-memory buffer
    pub fn from_bytes(data: impl Into<Bytes>) -> Result<Self> {
        Self::from_storage(Box::new(MappedStorage::from_bytes(data)), None)
    }

    /// Read (and optionally append to) a DAF through a seekable handle
    pub fn from_reader<F>(inner: F) -> Result<Self>
    where
        F: Read + Write + Seek + Send + 'static,
    {
        Self::from_storage(Box::new(BufferedStorage::new(inner)), None)
    }

    /// Parse the file record from an already opened storage backend
    pub fn from_storage(storage: Box<dyn Storage>, path: Option<PathBuf>) -> Result<Self> {
        let backend = storage.backend();
        if storage.len()? < RECORD_SIZE as u64 {
            return Err(JplephemError::InvalidFormat(
                "file is shorter than one DAF record".to_string(),
            ));
        }
        let header = storage.read_at(0, RECORD_SIZE)?;

        let locidw = String::from_utf8_lossy(&header[0..8])
            .to_uppercase()
            .trim_end()
            .to_string();

        let endian = if locidw == "NAIF/DAF" {
            probe_naif_daf_endian(&header)?
        } else if locidw.starts_with("DAF/") {
            if trim_nul(&header[500..1000]) != FTPSTR {
                return Err(JplephemError::InvalidFormat(
                    "this SPK file has been damaged".to_string(),
                ));
            }
            Endian::from_locfmt(&header[88..96]).ok_or_else(|| {
                JplephemError::UnknownEndianness(String::from_utf8_lossy(&header[88..96]).into())
            })?
        } else {
            return Err(JplephemError::InvalidFormat(format!(
                "file starts with {locidw:?}, not \"NAIF/DAF\" or \"DAF/\""
            )));
        };

        // DAF file record layout:
        //   0..8    LOCIDW (8 bytes, ASCII)
        //   8..12   ND (u32)
        //   12..16  NI (u32)
        //   16..76  LOCIFN (60 bytes, internal filename)
        //   76..80  FWARD (u32, first summary record)
        //   80..84  BWARD (u32, last summary record)
        //   84..88  FREE (u32, first free address)
        //   88..96  LOCFMT (8 bytes, ASCII)
        //   500..1000 contains the FTP validation string
        let nd = endian.read_u32(&header[8..12]);
        let ni = endian.read_u32(&header[12..16]);
        let fward = endian.read_u32(&header[76..80]);
        let bward = endian.read_u32(&header[80..84]);
        let free = endian.read_u32(&header[84..88]);
        let ifname = String::from_utf8_lossy(&header[16..76])
            .trim_end()
            .to_string();

        let summary_length = DOUBLE_SIZE * nd as usize + 4 * ni as usize;
        let summary_step = summary_length.next_multiple_of(DOUBLE_SIZE);
        if summary_step == 0 || summary_step > RECORD_SIZE - 24 || ni < 2 {
            return Err(JplephemError::InvalidFormat(format!(
                "Invalid DAF summary shape: nd={nd}, ni={ni}"
            )));
        }
        let summaries_per_record = (RECORD_SIZE - 24) / summary_step;

        debug!(
            "opened {locidw} ({}) nd={nd} ni={ni} fward={fward} bward={bward} free={free} via {backend}",
            endian.locfmt()
        );

        Ok(DAF {
            path,
            storage: RwLock::new(Some(storage)),
            backend,
            file_record: header.to_vec(),
            locidw,
            locfmt: endian.locfmt().to_string(),
            nd,
            ni,
            fward,
            bward,
            free,
            ifname,
            endian,
            summary_length,
            summary_step,
            summaries_per_record,
        })
    }

    /// The backend serving this container
    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// How many summaries fit in one summary record
    pub fn summaries_per_record(&self) -> usize {
        self.summaries_per_record
    }

    /// Release the file and any memory map
    ///
    /// Arrays previously handed out keep their own reference to the mapped
    /// bytes; kernels drop theirs when they are closed.
    pub fn close(&self) {
        let mut storage = self.storage.write().unwrap_or_else(PoisonError::into_inner);
        if storage.take().is_some() {
            debug!("closed {}", self.locidw);
        }
    }

    pub fn is_closed(&self) -> bool {
        self.storage
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    fn read_bytes(&self, offset: u64, len: usize) -> Result<Bytes> {
        let storage = self.storage.read().unwrap_or_else(PoisonError::into_inner);
        storage.as_ref().ok_or(JplephemError::Closed)?.read_at(offset, len)
    }

    fn write_bytes(&self, offset: u64, data: &[u8]) -> Result<()> {
        let storage = self.storage.read().unwrap_or_else(PoisonError::into_inner);
        storage.as_ref().ok_or(JplephemError::Closed)?.write_at(offset, data)
    }

    /// Read a 1024-byte record at the given record number (1-indexed)
    pub fn read_record(&self, record_number: usize) -> Result<Bytes> {
        if record_number < 1 {
            return Err(JplephemError::InvalidFormat(format!(
                "Invalid record number: {record_number}"
            )));
        }
        self.read_bytes(((record_number - 1) * RECORD_SIZE) as u64, RECORD_SIZE)
    }

    /// Write `data` (at most one record) at the start of record `record_number`
    pub fn write_record(&self, record_number: usize, data: &[u8]) -> Result<()> {
        if record_number < 1 || data.len() > RECORD_SIZE {
            return Err(JplephemError::InvalidFormat(format!(
                "cannot write {} bytes to record {record_number}",
                data.len()
            )));
        }
        self.write_bytes(((record_number - 1) * RECORD_SIZE) as u64, data)
    }

    /// Rewrite the file record from the current ND/NI/FWARD/BWARD/FREE values
    pub fn write_file_record(&mut self) -> Result<()> {
        let endian = self.endian;
        let record = &mut self.file_record;
        endian.write_u32(&mut record[8..12], self.nd);
        endian.write_u32(&mut record[12..16], self.ni);
        endian.write_u32(&mut record[76..80], self.fward);
        endian.write_u32(&mut record[80..84], self.bward);
        endian.write_u32(&mut record[84..88], self.free);
        let record = self.file_record.clone();
        self.write_record(1, &record)
    }

    /// Raw bytes of the inclusive 1-based word range `start..=end`
    pub fn read_words(&self, start: usize, end: usize) -> Result<Bytes> {
        if start < 1 || end + 1 < start {
            return Err(JplephemError::InvalidFormat(format!(
                "Invalid array bounds: start={start}, end={end}"
            )));
        }
        let length = end + 1 - start;
        self.read_bytes(((start - 1) * DOUBLE_SIZE) as u64, length * DOUBLE_SIZE)
    }

    /// Read an array of f64 values from the file (1-indexed, inclusive)
    ///
    /// Every value is decoded immediately, which suits short reads such as
    /// the directory words at the end of a segment.
    pub fn read_array(&self, start: usize, end: usize) -> Result<Vec<f64>> {
        Ok(self.map_array(start, end)?.to_vec())
    }

    /// View an array of f64 values without decoding it (1-indexed, inclusive)
    ///
    /// With a memory-mapped backend no bytes are copied; values are decoded
    /// as they are accessed.
    pub fn map_array(&self, start: usize, end: usize) -> Result<DoubleArray> {
        Ok(DoubleArray {
            bytes: self.read_words(start, end)?,
            endian: self.endian,
        })
    }

    /// View the array a summary points at
    pub fn map(&self, summary: &Summary) -> Result<DoubleArray> {
        let (start, end) = summary.word_range()?;
        self.map_array(start, end)
    }

    /// Read comments from the comment area (records 2..fward)
    ///
    /// Each comment record carries 1000 bytes of text; the text ends at an
    /// EOT byte and NUL bytes separate lines.
    pub fn comments(&self) -> Result<String> {
        let fward = self.fward as usize;
        if fward <= 2 {
            return Ok(String::new());
        }

        let mut data = Vec::with_capacity((fward - 2) * COMMENT_RECORD_TEXT);
        for record_number in 2..fward {
            let record = self.read_record(record_number)?;
            data.extend_from_slice(&record[..COMMENT_RECORD_TEXT]);
        }

        let end = data.iter().position(|&b| b == EOT).ok_or_else(|| {
            JplephemError::InvalidFormat("DAF file comment area is missing its EOT byte".into())
        })?;
        let text = &data[..end];
        if !text.is_ascii() {
            return Err(JplephemError::InvalidFormat(
                "DAF file comment area is not ASCII text".into(),
            ));
        }
        Ok(text
            .iter()
            .map(|&b| if b == 0 { '\n' } else { b as char })
            .collect())
    }

    /// Walk the summary records starting at FWARD
    pub fn summary_records(&self) -> SummaryRecords<'_> {
        SummaryRecords {
            daf: self,
            next: self.fward as usize,
            visited: HashSet::new(),
        }
    }

    /// Iterate over every summary in file order
    pub fn summaries(&self) -> Summaries<'_> {
        Summaries {
            records: self.summary_records(),
            current: None,
            index: 0,
            failed: false,
        }
    }

    fn parse_summary(&self, record: &SummaryRecord, names: &[u8], index: usize) -> Summary {
        let endian = self.endian;
        let step = self.summary_step;
        let start = 24 + index * step;
        let data = &record.data[start..start + self.summary_length];

        let nd = self.nd as usize;
        let doubles = (0..nd)
            .map(|j| endian.read_f64(&data[j * 8..j * 8 + 8]))
            .collect();
        let integers = (0..self.ni as usize)
            .map(|j| {
                let pos = nd * 8 + j * 4;
                endian.read_i32(&data[pos..pos + 4])
            })
            .collect();

        let name = trim_padding(&names[index * step..(index + 1) * step]).to_vec();
        Summary {
            name,
            doubles,
            integers,
        }
    }

    fn parse_summary_record(&self, record_number: usize) -> Result<SummaryRecord> {
        let data = self.read_record(record_number)?;
        let next = self.endian.read_f64(&data[0..8]);
        let previous = self.endian.read_f64(&data[8..16]);
        let n_summaries = self.endian.read_f64(&data[16..24]);

        let n = n_summaries as usize;
        if n_summaries < 0.0 || n > self.summaries_per_record {
            return Err(JplephemError::InvalidFormat(format!(
                "Too many summaries in record {record_number}: {n_summaries} > {}",
                self.summaries_per_record
            )));
        }
        if next < 0.0 || previous < 0.0 {
            return Err(JplephemError::InvalidFormat(format!(
                "Invalid summary record links in record {record_number}"
            )));
        }

        Ok(SummaryRecord {
            number: record_number,
            next: next as usize,
            previous: previous as usize,
            n_summaries: n,
            data,
        })
    }

    /// Append a new array and its summary.
    ///
    /// `doubles` must hold ND values and `integers` at least NI-2; the last
    /// two integer slots are filled with the word range the array lands at.
    /// A fresh summary/name record pair is allocated past the free pointer
    /// when the tail summary record is full. Returns that word range.
    ///
    /// Not safe for concurrent use: the caller must be the only writer.
    pub fn add_array(
        &mut self,
        name: &[u8],
        doubles: &[f64],
        integers: &[i32],
        array: &[f64],
    ) -> Result<(usize, usize)> {
        let nd = self.nd as usize;
        let ni = self.ni as usize;
        if doubles.len() != nd || integers.len() < ni - 2 {
            return Err(JplephemError::InvalidFormat(format!(
                "summary needs {nd} doubles and {} integers, got {} and {}",
                ni - 2,
                doubles.len(),
                integers.len()
            )));
        }

        let endian = self.endian;
        let record_number = self.bward as usize;
        let tail = self.parse_summary_record(record_number)?;
        let mut control = tail.data[..RECORD_SIZE].to_vec();

        let (summary_record, slot) = if tail.n_summaries < self.summaries_per_record {
            endian.write_f64(&mut control[16..24], (tail.n_summaries + 1) as f64);
            self.write_record(record_number, &control)?;
            (record_number, tail.n_summaries)
        } else {
            let summary_record = ((self.free as usize - 1) * DOUBLE_SIZE + 1023) / RECORD_SIZE + 1;
            let name_record = summary_record + 1;
            let free_record = summary_record + 2;

            endian.write_f64(&mut control[0..8], summary_record as f64);
            self.write_record(record_number, &control)?;

            let mut summaries = vec![0u8; RECORD_SIZE];
            endian.write_f64(&mut summaries[0..8], 0.0);
            endian.write_f64(&mut summaries[8..16], record_number as f64);
            endian.write_f64(&mut summaries[16..24], 1.0);
            self.write_record(summary_record, &summaries)?;
            self.write_record(name_record, &[0u8; RECORD_SIZE])?;

            self.bward = summary_record as u32;
            self.free = ((free_record - 1) * RECORD_SIZE / DOUBLE_SIZE + 1) as u32;
            (summary_record, 0)
        };

        let start_word = self.free as usize;
        let mut payload = vec![0u8; array.len() * DOUBLE_SIZE];
        for (chunk, &value) in payload.chunks_exact_mut(DOUBLE_SIZE).zip(array) {
            endian.write_f64(chunk, value);
        }
        self.write_bytes(((start_word - 1) * DOUBLE_SIZE) as u64, &payload)?;
        let end_word = start_word + array.len() - 1;

        self.free = (end_word + 1) as u32;
        self.write_file_record()?;

        let mut packed = vec![0u8; self.summary_length];
        for (j, &value) in doubles.iter().enumerate() {
            endian.write_f64(&mut packed[j * 8..j * 8 + 8], value);
        }
        let addresses = [start_word as i32, end_word as i32];
        for (j, &value) in integers[..ni - 2].iter().chain(&addresses).enumerate() {
            let pos = nd * 8 + j * 4;
            endian.write_i32(&mut packed[pos..pos + 4], value);
        }

        let base = ((summary_record - 1) * RECORD_SIZE) as u64;
        let offset = (slot * self.summary_step) as u64;
        self.write_bytes(base + 24 + offset, &packed)?;

        let mut padded_name = name[..name.len().min(self.summary_length)].to_vec();
        padded_name.resize(self.summary_step, b' ');
        self.write_bytes(base + RECORD_SIZE as u64 + offset, &padded_name)?;

        debug!(
            "appended {:?} at words {start_word}..{end_word}",
            String::from_utf8_lossy(name)
        );
        Ok((start_word, end_word))
    }
}

/// Iterator over the linked list of summary records
pub struct SummaryRecords<'a> {
    daf: &'a DAF,
    next: usize,
    visited: HashSet<usize>,
}

impl Iterator for SummaryRecords<'_> {
    type Item = Result<SummaryRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next == 0 {
            return None;
        }
        let record_number = self.next;
        if !self.visited.insert(record_number) {
            self.next = 0;
            return Some(Err(JplephemError::InvalidFormat(format!(
                "summary record {record_number} is linked twice"
            ))));
        }
        match self.daf.parse_summary_record(record_number) {
            Ok(record) => {
                self.next = record.next;
                Some(Ok(record))
            }
            Err(e) => {
                self.next = 0;
                Some(Err(e))
            }
        }
    }
}

/// Iterator over every summary, yielding each with its name
pub struct Summaries<'a> {
    records: SummaryRecords<'a>,
    current: Option<(SummaryRecord, Bytes)>,
    index: usize,
    failed: bool,
}

impl Iterator for Summaries<'_> {
    type Item = Result<Summary>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.failed {
                return None;
            }
            if let Some((record, names)) = &self.current {
                if self.index < record.n_summaries {
                    let summary = self.records.daf.parse_summary(record, names, self.index);
                    self.index += 1;
                    return Some(Ok(summary));
                }
            }

            let record = match self.records.next()? {
                Ok(record) => record,
                Err(e) => {
                    self.failed = true;
                    return Some(Err(e));
                }
            };
            match self.records.daf.read_record(record.number + 1) {
                Ok(names) => {
                    self.current = Some((record, names));
                    self.index = 0;
                }
                Err(e) => {
                    self.failed = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

fn trim_nul(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
    let end = bytes.iter().rposition(|&b| b != 0).map_or(start, |i| i + 1);
    &bytes[start..end]
}

fn trim_padding(bytes: &[u8]) -> &[u8] {
    let pad = |b: &u8| b.is_ascii_whitespace() || *b == 0;
    let start = bytes.iter().position(|b| !pad(b)).unwrap_or(bytes.len());
    let end = bytes.iter().rposition(|b| !pad(b)).map_or(start, |i| i + 1);
    &bytes[start..end]
}
