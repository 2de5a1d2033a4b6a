//! Byte sources supplying encoded samples
//!
//! The storage layer is an external collaborator: the engine only needs
//! a positioned reader over a stream of encoded bytes. Three
//! implementations are provided — plain file I/O, a memory-mapped
//! variant for zero-copy access, and an owned in-memory source.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use memmap2::Mmap;

use crate::error::{Error, Result};

/// A positioned reader over encoded bytes
pub trait ByteSource: Send {
    /// Total size of the source in bytes
    fn size(&self) -> Result<u64>;

    /// Move the read position
    fn seek_read(&mut self, pos: SeekFrom) -> Result<u64>;

    /// Current read position
    fn tell_read(&mut self) -> Result<u64>;

    /// Read up to `buf.len()` bytes, returning the number read
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Release the underlying resource; subsequent reads fail
    fn close(&mut self);

    /// Read the whole source from the beginning
    fn read_all(&mut self) -> Result<Vec<u8>> {
        let size = usize::try_from(self.size()?)
            .map_err(|_| Error::InvalidHeader("source too large to buffer".into()))?;
        self.seek_read(SeekFrom::Start(0))?;
        let mut buf = vec![0u8; size];
        let mut filled = 0;
        while filled < size {
            let n = self.read(&mut buf[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        buf.truncate(filled);
        Ok(buf)
    }
}

fn closed() -> Error {
    Error::Io(std::io::Error::new(
        std::io::ErrorKind::Other,
        "byte source is closed",
    ))
}

/// Byte source backed by buffered file I/O
#[derive(Debug)]
pub struct FileByteSource {
    file: Option<File>,
    path: PathBuf,
}

impl FileByteSource {
    /// Open a file for reading
    ///
    /// Failure to open is a fatal construction error naming the path
    /// and the underlying OS error.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|source| Error::Open {
            path: path.clone(),
            source,
        })?;
        Ok(Self {
            file: Some(file),
            path,
        })
    }

    /// Path this source reads from
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ByteSource for FileByteSource {
    fn size(&self) -> Result<u64> {
        let file = self.file.as_ref().ok_or_else(closed)?;
        Ok(file.metadata()?.len())
    }

    fn seek_read(&mut self, pos: SeekFrom) -> Result<u64> {
        let file = self.file.as_mut().ok_or_else(closed)?;
        Ok(file.seek(pos)?)
    }

    fn tell_read(&mut self) -> Result<u64> {
        let file = self.file.as_mut().ok_or_else(closed)?;
        Ok(file.stream_position()?)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let file = self.file.as_mut().ok_or_else(closed)?;
        Ok(file.read(buf)?)
    }

    fn close(&mut self) {
        self.file = None;
    }
}

impl Drop for FileByteSource {
    fn drop(&mut self) {
        self.close();
    }
}

/// Byte source backed by a memory-mapped file
pub struct MmapByteSource {
    map: Option<Mmap>,
    path: PathBuf,
    pos: usize,
}

impl MmapByteSource {
    /// Memory-map a file for reading
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|source| Error::Open {
            path: path.clone(),
            source,
        })?;
        #[allow(unsafe_code)]
        let map = unsafe { Mmap::map(&file) }.map_err(|source| Error::Open {
            path: path.clone(),
            source,
        })?;
        Ok(Self {
            map: Some(map),
            path,
            pos: 0,
        })
    }

    /// Path this source reads from
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The whole mapping as a slice
    pub fn as_slice(&self) -> Result<&[u8]> {
        Ok(self.map.as_ref().ok_or_else(closed)?)
    }
}

impl ByteSource for MmapByteSource {
    fn size(&self) -> Result<u64> {
        Ok(self.map.as_ref().ok_or_else(closed)?.len() as u64)
    }

    fn seek_read(&mut self, pos: SeekFrom) -> Result<u64> {
        let len = self.size()?;
        let new_pos = match pos {
            SeekFrom::Start(offset) => offset as i64,
            SeekFrom::End(offset) => len as i64 + offset,
            SeekFrom::Current(offset) => self.pos as i64 + offset,
        };
        if new_pos < 0 {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "seek before start of source",
            )));
        }
        self.pos = new_pos as usize;
        Ok(self.pos as u64)
    }

    fn tell_read(&mut self) -> Result<u64> {
        Ok(self.pos as u64)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let map = self.map.as_ref().ok_or_else(closed)?;
        if self.pos >= map.len() {
            return Ok(0);
        }
        let n = buf.len().min(map.len() - self.pos);
        buf[..n].copy_from_slice(&map[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }

    fn close(&mut self) {
        self.map = None;
    }
}

/// Byte source over owned bytes
pub struct MemoryByteSource {
    bytes: Vec<u8>,
    pos: usize,
}

impl MemoryByteSource {
    /// Wrap owned bytes as a source
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes, pos: 0 }
    }
}

impl ByteSource for MemoryByteSource {
    fn size(&self) -> Result<u64> {
        Ok(self.bytes.len() as u64)
    }

    fn seek_read(&mut self, pos: SeekFrom) -> Result<u64> {
        let len = self.bytes.len() as i64;
        let new_pos = match pos {
            SeekFrom::Start(offset) => offset as i64,
            SeekFrom::End(offset) => len + offset,
            SeekFrom::Current(offset) => self.pos as i64 + offset,
        };
        if new_pos < 0 {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "seek before start of source",
            )));
        }
        self.pos = new_pos as usize;
        Ok(self.pos as u64)
    }

    fn tell_read(&mut self) -> Result<u64> {
        Ok(self.pos as u64)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.pos >= self.bytes.len() {
            return Ok(0);
        }
        let n = buf.len().min(self.bytes.len() - self.pos);
        buf[..n].copy_from_slice(&self.bytes[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }

    fn close(&mut self) {
        self.bytes.clear();
        self.pos = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_file_source_read_all() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"encoded bytes").unwrap();
        let mut source = FileByteSource::open(tmp.path()).unwrap();
        assert_eq!(source.size().unwrap(), 13);
        assert_eq!(source.read_all().unwrap(), b"encoded bytes");
    }

    #[test]
    fn test_open_error_names_path() {
        let err = FileByteSource::open("/no/such/file.jpg").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("/no/such/file.jpg"), "got: {}", msg);
    }

    #[test]
    fn test_seek_and_tell() {
        let mut source = MemoryByteSource::new(b"0123456789".to_vec());
        source.seek_read(SeekFrom::Start(4)).unwrap();
        assert_eq!(source.tell_read().unwrap(), 4);
        let mut buf = [0u8; 3];
        assert_eq!(source.read(&mut buf).unwrap(), 3);
        assert_eq!(&buf, b"456");
        source.seek_read(SeekFrom::End(-2)).unwrap();
        assert_eq!(source.tell_read().unwrap(), 8);
    }

    #[test]
    fn test_mmap_source_matches_file() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"mapped payload").unwrap();
        let mut mapped = MmapByteSource::open(tmp.path()).unwrap();
        assert_eq!(mapped.read_all().unwrap(), b"mapped payload");
        mapped.close();
        assert!(mapped.size().is_err());
    }

    #[test]
    fn test_read_past_end_returns_zero() {
        let mut source = MemoryByteSource::new(b"ab".to_vec());
        source.seek_read(SeekFrom::Start(10)).unwrap();
        let mut buf = [0u8; 4];
        assert_eq!(source.read(&mut buf).unwrap(), 0);
    }
}
