//! Byte storage backends for DAF containers
//!
//! A DAF is read through random-access byte ranges. Two backends provide
//! them: a read-only memory map (or any in-memory buffer), and a buffered
//! file handle that seeks and reads on demand and also supports writes.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use bytes::Bytes;
use memmap2::MmapOptions;

use crate::errors::{io_err, JplephemError, Result};

/// Which storage backend serves a container
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Backend {
    /// Memory map when possible, buffered reads otherwise
    #[default]
    Auto,
    /// Memory map only; failure to map is an error
    Mapped,
    /// Seek-and-read through a file handle
    Buffered,
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Backend::Auto => "auto",
            Backend::Mapped => "mapped",
            Backend::Buffered => "buffered",
        };
        f.write_str(label)
    }
}

/// Random access to the bytes of a container
pub trait Storage: Send + Sync {
    /// The backend kind, never `Backend::Auto`
    fn backend(&self) -> Backend;

    /// Total length of the underlying byte store
    fn len(&self) -> Result<u64>;

    /// Read exactly `len` bytes starting at byte `offset`
    fn read_at(&self, offset: u64, len: usize) -> Result<Bytes>;

    /// Overwrite bytes starting at `offset`, extending the store if needed
    fn write_at(&self, offset: u64, data: &[u8]) -> Result<()>;
}

fn storage_err(path: Option<&Path>, err: io::Error) -> JplephemError {
    match path {
        Some(path) => io_err(path, err),
        None => JplephemError::Io(err),
    }
}

/// Read-only storage over a contiguous byte buffer, usually a memory map
pub struct MappedStorage {
    bytes: Bytes,
    path: Option<PathBuf>,
}

impl MappedStorage {
    /// Map `file` into memory
    pub fn map_file(file: &File, path: &Path) -> Result<Self> {
        // The map is read-only; the file must not be truncated while mapped.
        let mmap = unsafe { MmapOptions::new().map(file) }
            .map_err(|e| JplephemError::MemoryMapError(format!("{}: {e}", path.display())))?;
        Ok(MappedStorage {
            bytes: Bytes::from_owner(mmap),
            path: Some(path.to_path_buf()),
        })
    }

    /// Serve an in-memory buffer, e.g. one produced by `include_bytes!`
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        MappedStorage {
            bytes: bytes.into(),
            path: None,
        }
    }
}

impl Storage for MappedStorage {
    fn backend(&self) -> Backend {
        Backend::Mapped
    }

    fn len(&self) -> Result<u64> {
        Ok(self.bytes.len() as u64)
    }

    fn read_at(&self, offset: u64, len: usize) -> Result<Bytes> {
        let start = usize::try_from(offset).unwrap_or(usize::MAX);
        match start.checked_add(len) {
            Some(end) if end <= self.bytes.len() => Ok(self.bytes.slice(start..end)),
            _ => Err(storage_err(
                self.path.as_deref(),
                io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!(
                        "cannot read {len} bytes at offset {offset} from {} bytes",
                        self.bytes.len()
                    ),
                ),
            )),
        }
    }

    fn write_at(&self, _offset: u64, _data: &[u8]) -> Result<()> {
        Err(storage_err(
            self.path.as_deref(),
            io::Error::new(
                io::ErrorKind::PermissionDenied,
                "memory-mapped containers are read-only",
            ),
        ))
    }
}

/// Storage that seeks and reads through a handle on every access
pub struct BufferedStorage<F> {
    inner: Mutex<F>,
    path: Option<PathBuf>,
}

impl<F> BufferedStorage<F>
where
    F: Read + Write + Seek + Send,
{
    pub fn new(inner: F) -> Self {
        BufferedStorage {
            inner: Mutex::new(inner),
            path: None,
        }
    }

    pub fn with_path(inner: F, path: impl Into<PathBuf>) -> Self {
        BufferedStorage {
            inner: Mutex::new(inner),
            path: Some(path.into()),
        }
    }

    fn err(&self, err: io::Error) -> JplephemError {
        storage_err(self.path.as_deref(), err)
    }
}

impl<F> Storage for BufferedStorage<F>
where
    F: Read + Write + Seek + Send,
{
    fn backend(&self) -> Backend {
        Backend::Buffered
    }

    fn len(&self) -> Result<u64> {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.seek(SeekFrom::End(0)).map_err(|e| self.err(e))
    }

    fn read_at(&self, offset: u64, len: usize) -> Result<Bytes> {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let mut buffer = vec![0u8; len];
        inner
            .seek(SeekFrom::Start(offset))
            .map_err(|e| self.err(e))?;
        inner.read_exact(&mut buffer).map_err(|e| self.err(e))?;
        Ok(Bytes::from(buffer))
    }

    fn write_at(&self, offset: u64, data: &[u8]) -> Result<()> {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner
            .seek(SeekFrom::Start(offset))
            .map_err(|e| self.err(e))?;
        inner.write_all(data).map_err(|e| self.err(e))?;
        inner.flush().map_err(|e| self.err(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_mapped_bounds() {
        let storage = MappedStorage::from_bytes((0u8..16).collect::<Vec<_>>());
        assert_eq!(storage.len().unwrap(), 16);
        assert_eq!(&storage.read_at(4, 4).unwrap()[..], &[4, 5, 6, 7]);
        assert!(storage.read_at(12, 8).is_err());
        assert!(storage.write_at(0, &[1]).is_err());
    }

    #[test]
    fn test_buffered_write_then_read() {
        let storage = BufferedStorage::new(Cursor::new(vec![0u8; 8]));
        storage.write_at(6, &[9, 9, 9, 9]).unwrap();
        assert_eq!(storage.len().unwrap(), 10);
        assert_eq!(&storage.read_at(4, 6).unwrap()[..], &[0, 0, 9, 9, 9, 9]);
        assert!(storage.read_at(8, 4).is_err());
    }

    #[test]
    fn test_mapped_file_matches_contents() {
        let mut file = tempfile::tempfile().unwrap();
        file.write_all(b"0123456789").unwrap();
        let storage = MappedStorage::map_file(&file, Path::new("scratch")).unwrap();
        assert_eq!(storage.backend(), Backend::Mapped);
        assert_eq!(&storage.read_at(3, 3).unwrap()[..], b"345");
    }
}
