//! Uniform byte-range views over files, in-memory buffers, and inflated zip
//! entries.
//!
//! A [`Slice`] never copies eagerly. `sub_slice` narrows the window and
//! shares the parent's backing storage via `Arc`; only the top-level slice
//! that created the backing storage releases it, and `close` is idempotent
//! (§4.1, §I6: every opened file or mapped region is released exactly once).

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use memmap2::Mmap;

use crate::error::{ArchiveError, Result};

/// Largest inflated payload `load_all`/streaming will accept before treating
/// the entry as malformed (boundary behavior: ">2 GiB inflated" is an error,
/// not a panic).
pub const MAX_INFLATED_SIZE: u64 = 2 * 1024 * 1024 * 1024;

enum FileBacking {
    Mapped(Mmap),
    Positional(File),
}

enum Source {
    Array(Arc<[u8]>),
    File(Arc<FileBacking>),
    /// Compressed bytes for a deflated zip entry, inflated lazily and cached
    /// on first use so repeated reads don't re-run the inflater.
    Inflated {
        compressed: Arc<[u8]>,
        inflated: std::sync::Mutex<Option<Arc<[u8]>>>,
    },
    /// Bytes already decompressed by the caller (e.g. the zip reader did it
    /// inline). Forbids `sub_slice` just like `Inflated`, since the source
    /// may not be addressable as a contiguous region of the parent archive.
    PreInflated(Arc<[u8]>),
}

/// A byte-range window. Top-level slices are produced by
/// [`Slice::from_bytes`], [`Slice::from_file`], or
/// [`crate::NestedArchiveHandler`]; `sub_slice` produces non-owning children.
#[derive(Clone)]
pub struct Slice {
    source: Arc<Source>,
    /// Offset of this window's start within `source`, in bytes.
    base: u64,
    len: u64,
    top_level: bool,
    closed: Arc<AtomicBool>,
}

impl Slice {
    pub fn from_bytes(bytes: impl Into<Arc<[u8]>>) -> Self {
        let bytes = bytes.into();
        let len = bytes.len() as u64;
        Self {
            source: Arc::new(Source::Array(bytes)),
            base: 0,
            len,
            top_level: true,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn from_file(file: File, enable_memory_mapping: bool) -> Result<Self> {
        let len = file
            .metadata()
            .map_err(|source| ArchiveError::Io {
                path: "<fd>".into(),
                source,
            })?
            .len();

        let backing = if enable_memory_mapping && len > 0 {
            // SAFETY: the caller controls the lifetime of the underlying
            // file and we never hand out the mapping across a truncation;
            // any mapping failure degrades to positional reads.
            match unsafe { Mmap::map(&file) } {
                Ok(mmap) => FileBacking::Mapped(mmap),
                Err(_) => FileBacking::Positional(file),
            }
        } else {
            FileBacking::Positional(file)
        };

        Ok(Self {
            source: Arc::new(Source::File(Arc::new(backing))),
            base: 0,
            len,
            top_level: true,
            closed: Arc::new(AtomicBool::new(false)),
        })
    }

    pub(crate) fn from_inflated(compressed: impl Into<Arc<[u8]>>, inflated_len_hint: u64) -> Self {
        Self {
            source: Arc::new(Source::Inflated {
                compressed: compressed.into(),
                inflated: std::sync::Mutex::new(None),
            }),
            base: 0,
            len: inflated_len_hint,
            top_level: true,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Wrap bytes a caller already decompressed. Still forbids `sub_slice`
    /// (the bytes did not exist as a contiguous region of any parent
    /// archive), but every other read path is immediate.
    pub(crate) fn from_preinflated(bytes: impl Into<Arc<[u8]>>) -> Self {
        let bytes = bytes.into();
        let len = bytes.len() as u64;
        Self {
            source: Arc::new(Source::PreInflated(bytes)),
            base: 0,
            len,
            top_level: true,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn is_inflated(&self) -> bool {
        matches!(&*self.source, Source::Inflated { .. } | Source::PreInflated(_))
    }

    pub fn sub_slice(&self, offset: u64, length: u64) -> Result<Slice> {
        if self.is_inflated() {
            return Err(ArchiveError::CannotSliceDeflated);
        }
        if offset.checked_add(length).map_or(true, |end| end > self.len) {
            return Err(ArchiveError::OutOfRange {
                offset,
                len: length,
                parent_len: self.len,
            });
        }
        Ok(Slice {
            source: Arc::clone(&self.source),
            base: self.base + offset,
            len: length,
            top_level: false,
            closed: Arc::clone(&self.closed),
        })
    }

    /// Fully materialize this slice's bytes, inflating a deflated entry
    /// exactly once.
    pub fn load_all(&self) -> Result<Vec<u8>> {
        match &*self.source {
            Source::Array(bytes) => {
                let start = self.base as usize;
                let end = start + self.len as usize;
                Ok(bytes[start..end].to_vec())
            }
            Source::File(backing) => {
                let mut buf = vec![0u8; self.len as usize];
                self.random_read_from(backing, 0, &mut buf)?;
                Ok(buf)
            }
            Source::Inflated { .. } => Ok(self.inflate_cached()?.to_vec()),
            Source::PreInflated(bytes) => Ok(bytes.to_vec()),
        }
    }

    /// Borrow the slice's bytes without copying, when the backing storage
    /// already holds contiguous memory (array slices and memory-mapped file
    /// slices). Returns `None` for positional-file and not-yet-inflated
    /// slices; callers must fall back to `load_all`.
    pub fn as_bytes(&self) -> Option<std::borrow::Cow<'_, [u8]>> {
        match &*self.source {
            Source::Array(bytes) => {
                let start = self.base as usize;
                let end = start + self.len as usize;
                Some(std::borrow::Cow::Borrowed(&bytes[start..end]))
            }
            Source::File(backing) => match backing.as_ref() {
                FileBacking::Mapped(mmap) => {
                    let start = self.base as usize;
                    let end = start + self.len as usize;
                    Some(std::borrow::Cow::Borrowed(&mmap[start..end]))
                }
                FileBacking::Positional(_) => None,
            },
            Source::Inflated { inflated, .. } => {
                let guard = inflated.lock().expect("inflate cache mutex poisoned");
                guard.clone().map(|bytes| std::borrow::Cow::Owned(bytes.to_vec()))
            }
            Source::PreInflated(bytes) => Some(std::borrow::Cow::Borrowed(bytes.as_ref())),
        }
    }

    fn inflate_cached(&self) -> Result<Arc<[u8]>> {
        let Source::Inflated { compressed, inflated } = &*self.source else {
            unreachable!("inflate_cached called on a non-inflated slice");
        };
        let mut guard = inflated.lock().expect("inflate cache mutex poisoned");
        if let Some(bytes) = guard.as_ref() {
            return Ok(Arc::clone(bytes));
        }
        let mut decoder = flate2::read::DeflateDecoder::new(compressed.as_ref());
        let mut buf = Vec::new();
        let limit = MAX_INFLATED_SIZE;
        let mut chunk = [0u8; 64 * 1024];
        loop {
            let n = decoder
                .read(&mut chunk)
                .map_err(|source| ArchiveError::Io {
                    path: "<inflated entry>".into(),
                    source,
                })?;
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            if buf.len() as u64 > limit {
                return Err(ArchiveError::Oversize { limit });
            }
        }
        let bytes: Arc<[u8]> = buf.into();
        *guard = Some(Arc::clone(&bytes));
        Ok(bytes)
    }

    fn random_read_from(&self, backing: &FileBacking, at: u64, buf: &mut [u8]) -> Result<usize> {
        let absolute = self.base + at;
        match backing {
            FileBacking::Mapped(mmap) => {
                let start = absolute as usize;
                let available = mmap.len().saturating_sub(start);
                let n = available.min(buf.len());
                buf[..n].copy_from_slice(&mmap[start..start + n]);
                Ok(n)
            }
            FileBacking::Positional(file) => {
                // `File` read calls require `&mut`, but many readers share
                // this slice concurrently; clone the fd view via `try_clone`
                // so each read gets its own cursor.
                let mut file = file
                    .try_clone()
                    .map_err(|source| ArchiveError::Io {
                        path: "<fd>".into(),
                        source,
                    })?;
                file.seek(SeekFrom::Start(absolute))
                    .map_err(|source| ArchiveError::Io {
                        path: "<fd>".into(),
                        source,
                    })?;
                let n = file.read(buf).map_err(|source| ArchiveError::Io {
                    path: "<fd>".into(),
                    source,
                })?;
                Ok(n)
            }
        }
    }

    /// Read up to `buf.len()` bytes starting at `at` (relative to this
    /// slice's start) into `buf`. Returns the number of bytes read.
    pub fn random_read(&self, at: u64, buf: &mut [u8]) -> Result<u32> {
        if at >= self.len {
            return Ok(0);
        }
        let max = (self.len - at).min(buf.len() as u64) as usize;
        let buf = &mut buf[..max];
        match &*self.source {
            Source::Array(bytes) => {
                let start = (self.base + at) as usize;
                buf.copy_from_slice(&bytes[start..start + buf.len()]);
                Ok(buf.len() as u32)
            }
            Source::File(backing) => Ok(self.random_read_from(backing, at, buf)? as u32),
            Source::Inflated { .. } => {
                let bytes = self.inflate_cached()?;
                let start = at as usize;
                let n = (bytes.len() - start).min(buf.len());
                buf[..n].copy_from_slice(&bytes[start..start + n]);
                Ok(n as u32)
            }
            Source::PreInflated(bytes) => {
                let start = at as usize;
                let n = (bytes.len() - start).min(buf.len());
                buf[..n].copy_from_slice(&bytes[start..start + n]);
                Ok(n as u32)
            }
        }
    }

    pub fn sequential_reader(&self) -> SeqReader<'_> {
        SeqReader { slice: self, pos: 0 }
    }

    /// Idempotent; only releases resources when called on a top-level
    /// slice. Sub-slices never release the parent.
    pub fn close(&self) {
        if self.top_level {
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// A forward-only cursor over a [`Slice`], positioned at 0.
pub struct SeqReader<'a> {
    slice: &'a Slice,
    pos: u64,
}

impl<'a> SeqReader<'a> {
    pub fn position(&self) -> u64 {
        self.pos
    }

    pub fn remaining(&self) -> u64 {
        self.slice.len.saturating_sub(self.pos)
    }
}

impl<'a> Read for SeqReader<'a> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self
            .slice
            .random_read(self.pos, buf)
            .map_err(std::io::Error::other)?;
        self.pos += n as u64;
        Ok(n as usize)
    }
}

/// Big-endian primitives used for classfile reads (§4.1: readers MUST NOT
/// silently flip endianness based on context).
pub fn read_u16_be(buf: &[u8]) -> u16 {
    u16::from_be_bytes([buf[0], buf[1]])
}

pub fn read_u32_be(buf: &[u8]) -> u32 {
    u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]])
}

pub fn read_u64_be(buf: &[u8]) -> u64 {
    u64::from_be_bytes([
        buf[0], buf[1], buf[2], buf[3], buf[4], buf[5], buf[6], buf[7],
    ])
}

/// Little-endian primitives used for ZIP local/central-directory header
/// reads.
pub fn read_u16_le(buf: &[u8]) -> u16 {
    u16::from_le_bytes([buf[0], buf[1]])
}

pub fn read_u32_le(buf: &[u8]) -> u32 {
    u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]])
}

pub fn read_u64_le(buf: &[u8]) -> u64 {
    u64::from_le_bytes([
        buf[0], buf[1], buf[2], buf[3], buf[4], buf[5], buf[6], buf[7],
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sub_slice_shares_storage_and_never_closes_parent() {
        let slice = Slice::from_bytes(vec![1, 2, 3, 4, 5]);
        let sub = slice.sub_slice(1, 3).expect("in range");
        assert_eq!(sub.len(), 3);
        assert_eq!(sub.as_bytes().unwrap().as_ref(), &[2, 3, 4]);

        sub.close();
        assert!(!slice.is_closed(), "sub_slice.close() must not affect parent state");
        slice.close();
        assert!(slice.is_closed());
    }

    #[test]
    fn sub_slice_rejects_out_of_range() {
        let slice = Slice::from_bytes(vec![1, 2, 3]);
        assert!(matches!(
            slice.sub_slice(2, 5),
            Err(ArchiveError::OutOfRange { .. })
        ));
    }

    #[test]
    fn inflated_slice_forbids_sub_slice() {
        use std::io::Write;
        let mut encoder =
            flate2::write::DeflateEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(b"hello world").unwrap();
        let compressed = encoder.finish().unwrap();

        let slice = Slice::from_inflated(compressed, 11);
        assert!(matches!(
            slice.sub_slice(0, 1),
            Err(ArchiveError::CannotSliceDeflated)
        ));
        assert_eq!(slice.load_all().unwrap(), b"hello world");
    }

    #[test]
    fn random_read_respects_slice_window() {
        let slice = Slice::from_bytes(vec![10, 20, 30, 40, 50]);
        let sub = slice.sub_slice(1, 3).unwrap();
        let mut buf = [0u8; 8];
        let n = sub.random_read(0, &mut buf).unwrap();
        assert_eq!(n, 3);
        assert_eq!(&buf[..3], &[20, 30, 40]);
    }
}
