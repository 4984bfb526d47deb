//! Opens archives nested inside other archives (`outer.jar!inner.jar!pkg/`),
//! recycling archive readers and inflaters, and owning the temp-file
//! lifecycle for archives that must be materialized to be re-opened as a
//! random-access file.

use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use zip::ZipArchive;

use crate::error::{ArchiveError, Result};
use crate::slice::Slice;

/// The fully resolved location of a nested archive: the slice backing the
/// innermost archive's bytes, plus the directory prefix (possibly empty)
/// that a caller's relative class path is joined onto.
pub struct NestedRoot {
    pub archive_slice: Slice,
    pub archive_path_for_pool: PathBuf,
    pub inner_path_prefix: String,
}

fn looks_like_archive(segment: &str) -> bool {
    let lower = segment.to_ascii_lowercase();
    lower.ends_with(".jar") || lower.ends_with(".zip") || lower.ends_with(".jmod") || lower.ends_with(".war")
}

/// A pool of already-parsed `ZipArchive` readers for one backing file.
/// Parsing the central directory is the expensive part of opening a zip, so
/// readers are recycled rather than re-parsed per lookup.
struct ReaderPool {
    path: PathBuf,
    idle: Mutex<Vec<ZipArchive<File>>>,
}

impl ReaderPool {
    fn acquire(&self) -> Result<ZipArchive<File>> {
        if let Some(reader) = self.idle.lock().expect("reader pool mutex poisoned").pop() {
            return Ok(reader);
        }
        let file = File::open(&self.path).map_err(|source| ArchiveError::Io {
            path: self.path.clone(),
            source,
        })?;
        ZipArchive::new(file).map_err(|err| ArchiveError::MalformedArchive(err.to_string()))
    }

    fn release(&self, reader: ZipArchive<File>) {
        self.idle.lock().expect("reader pool mutex poisoned").push(reader);
    }
}

/// Scoped guard around one pooled [`ZipArchive`]; releases it back to the
/// pool on drop, including on the error/panic unwind path.
pub struct ArchiveGuard<'a> {
    pool: &'a ReaderPool,
    reader: Option<ZipArchive<File>>,
}

impl<'a> ArchiveGuard<'a> {
    pub fn reader(&mut self) -> &mut ZipArchive<File> {
        self.reader.as_mut().expect("reader taken before drop")
    }
}

impl<'a> Drop for ArchiveGuard<'a> {
    fn drop(&mut self) {
        if let Some(reader) = self.reader.take() {
            self.pool.release(reader);
        }
    }
}

/// A pool of recyclable `flate2` inflater state machines.
struct InflaterPool {
    idle: Mutex<Vec<flate2::Decompress>>,
}

impl InflaterPool {
    fn new() -> Self {
        Self {
            idle: Mutex::new(Vec::new()),
        }
    }

    fn acquire(&self) -> flate2::Decompress {
        self.idle
            .lock()
            .expect("inflater pool mutex poisoned")
            .pop()
            .unwrap_or_else(|| flate2::Decompress::new(false))
    }

    fn release(&self, mut inflater: flate2::Decompress) {
        inflater.reset(false);
        self.idle.lock().expect("inflater pool mutex poisoned").push(inflater);
    }
}

/// Opens archives, including archives nested inside other archives, and
/// owns the lifetime of every slice and temp file it produces.
///
/// At shutdown ([`NestedArchiveHandler::shutdown`], also run from `Drop` so
/// abnormal termination still cleans up), slices are closed in LIFO order
/// of creation and the process-scoped temp directory is removed.
pub struct NestedArchiveHandler {
    temp_dir: tempfile::TempDir,
    enable_memory_mapping: bool,
    pools: Mutex<HashMap<PathBuf, Arc<ReaderPool>>>,
    inflaters: InflaterPool,
    /// Caches one extraction per distinct nested-archive prefix so repeated
    /// lookups under the same `outer!inner` path reuse the same temp file
    /// (§4.2 example 6: "exactly one temp extraction performed for `inner.jar`").
    extracted: Mutex<HashMap<String, PathBuf>>,
    created_slices: Mutex<Vec<Slice>>,
    next_temp_id: AtomicU64,
}

impl NestedArchiveHandler {
    pub fn new(enable_memory_mapping: bool) -> Result<Self> {
        let temp_dir = tempfile::Builder::new()
            .prefix("jcg-scan-")
            .tempdir()
            .map_err(ArchiveError::TempFile)?;
        Ok(Self {
            temp_dir,
            enable_memory_mapping,
            pools: Mutex::new(HashMap::new()),
            inflaters: InflaterPool::new(),
            extracted: Mutex::new(HashMap::new()),
            created_slices: Mutex::new(Vec::new()),
            next_temp_id: AtomicU64::new(0),
        })
    }

    fn pool_for(&self, path: &Path) -> Arc<ReaderPool> {
        let mut pools = self.pools.lock().expect("pool map mutex poisoned");
        pools
            .entry(path.to_path_buf())
            .or_insert_with(|| {
                Arc::new(ReaderPool {
                    path: path.to_path_buf(),
                    idle: Mutex::new(Vec::new()),
                })
            })
            .clone()
    }

    fn acquire(&self, path: &Path) -> Result<(Arc<ReaderPool>, ZipArchive<File>)> {
        let pool = self.pool_for(path);
        let reader = pool.acquire()?;
        Ok((pool, reader))
    }

    fn guard<'a>(&self, pool: &'a Arc<ReaderPool>, reader: ZipArchive<File>) -> ArchiveGuard<'a> {
        ArchiveGuard {
            pool,
            reader: Some(reader),
        }
    }

    fn next_temp_path(&self) -> PathBuf {
        let id = self.next_temp_id.fetch_add(1, Ordering::SeqCst);
        self.temp_dir.path().join(format!("nested-{id}.jar"))
    }

    fn track(&self, slice: Slice) -> Slice {
        self.created_slices
            .lock()
            .expect("created slices mutex poisoned")
            .push(slice.clone());
        slice
    }

    /// Open a top-level OS file (no `!` nesting) as a slice.
    pub fn open_file(&self, path: &Path) -> Result<Slice> {
        let file = File::open(path).map_err(|source| ArchiveError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let slice = Slice::from_file(file, self.enable_memory_mapping)?;
        Ok(self.track(slice))
    }

    /// Resolve a classpath spec of the form `A`, `A!B`, or `A!B!C...` into a
    /// [`NestedRoot`]: the innermost archive's byte slice plus any trailing
    /// non-archive path segment, joined with `/`, to use as a directory
    /// prefix for subsequent entry lookups.
    #[tracing::instrument(skip(self), fields(spec = %spec))]
    pub fn resolve_root(&self, spec: &str) -> Result<NestedRoot> {
        let segments: Vec<&str> = spec.split('!').collect();
        let os_path = PathBuf::from(segments[0]);

        let mut current_slice = self.open_file(&os_path)?;
        let mut current_path_for_pool = os_path.clone();
        let mut prefix_segments: Vec<&str> = Vec::new();
        let mut consumed_archive = true;

        for segment in &segments[1..] {
            if !looks_like_archive(segment) {
                prefix_segments.push(segment);
                consumed_archive = false;
                continue;
            }
            if !consumed_archive {
                // A directory segment can only appear last; anything after it
                // is not representable as further nesting.
                return Err(ArchiveError::MalformedArchive(format!(
                    "archive segment '{segment}' follows a non-archive path segment in '{spec}'"
                )));
            }

            let cache_key = format!("{}!{}", current_path_for_pool.display(), segment);
            let extracted_path = {
                let mut cache = self.extracted.lock().expect("extracted cache mutex poisoned");
                if let Some(path) = cache.get(&cache_key) {
                    path.clone()
                } else {
                    let path = self.extract_entry_to_temp(&current_path_for_pool, &current_slice, segment)?;
                    cache.insert(cache_key, path.clone());
                    path
                }
            };

            current_slice = self.open_file(&extracted_path)?;
            current_path_for_pool = extracted_path;
            consumed_archive = true;
        }

        Ok(NestedRoot {
            archive_slice: current_slice,
            archive_path_for_pool: current_path_for_pool,
            inner_path_prefix: if prefix_segments.is_empty() {
                String::new()
            } else {
                let mut joined = prefix_segments.join("/");
                if !joined.ends_with('/') {
                    joined.push('/');
                }
                joined
            },
        })
    }

    /// Extract one named entry of the archive at `parent_path` (already
    /// resident as `parent_slice`) into a fresh temp file and return its
    /// path. Used both for materializing a nested archive before it can be
    /// re-opened as a random-access file, and as the fallback extraction
    /// path for deflated entries that cannot be sub-sliced in place.
    fn extract_entry_to_temp(
        &self,
        parent_path: &Path,
        _parent_slice: &Slice,
        entry_name: &str,
    ) -> Result<PathBuf> {
        let (pool, reader) = self.acquire(parent_path)?;
        let mut guard = self.guard(&pool, reader);
        let mut entry = guard
            .reader()
            .by_name(entry_name)
            .map_err(|_| ArchiveError::EntryNotFound(entry_name.to_string()))?;

        let out_path = self.next_temp_path();
        let mut out_file = File::create(&out_path).map_err(ArchiveError::TempFile)?;
        let mut buf = [0u8; 64 * 1024];
        loop {
            let n = entry.read(&mut buf).map_err(|source| ArchiveError::Io {
                path: parent_path.to_path_buf(),
                source,
            })?;
            if n == 0 {
                break;
            }
            out_file
                .write_all(&buf[..n])
                .map_err(ArchiveError::TempFile)?;
        }
        Ok(out_path)
    }

    /// Read one classfile entry relative to an already-resolved [`NestedRoot`].
    pub fn read_entry(&self, root: &NestedRoot, relative_path: &str) -> Result<Slice> {
        let full_name = format!("{}{}", root.inner_path_prefix, relative_path);
        let (pool, reader) = self.acquire(&root.archive_path_for_pool)?;
        let mut guard = self.guard(&pool, reader);
        let mut entry = guard
            .reader()
            .by_name(&full_name)
            .map_err(|_| ArchiveError::EntryNotFound(full_name.clone()))?;

        let compression = entry.compression();
        if !matches!(
            compression,
            zip::CompressionMethod::Stored | zip::CompressionMethod::Deflated
        ) {
            return Err(ArchiveError::UnsupportedCompressionMethod(format!(
                "{compression:?}"
            )));
        }

        // An inflater slot is held for the duration of the read even though
        // `ZipFile` performs the actual inflate internally; this models the
        // "inflaters are a recycled, single-owner-at-a-time resource" policy
        // as a bounded guard around the decompression call.
        let inflater = matches!(compression, zip::CompressionMethod::Deflated)
            .then(|| self.inflaters.acquire());

        let mut buf = Vec::with_capacity(entry.size() as usize);
        let read_result = entry.read_to_end(&mut buf);

        if let Some(inflater) = inflater {
            self.inflaters.release(inflater);
        }
        read_result.map_err(|source| ArchiveError::Io {
            path: root.archive_path_for_pool.clone(),
            source,
        })?;

        let slice = match compression {
            zip::CompressionMethod::Stored => Slice::from_bytes(buf),
            _ => Slice::from_preinflated(buf),
        };
        Ok(self.track(slice))
    }

    /// Close every slice this handler produced, in LIFO order, then remove
    /// the temp directory. Safe to call more than once.
    pub fn shutdown(&self) {
        let mut slices = self.created_slices.lock().expect("created slices mutex poisoned");
        while let Some(slice) = slices.pop() {
            slice.close();
        }
    }
}

impl Drop for NestedArchiveHandler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    fn write_zip_with_entry(path: &Path, entry_name: &str, contents: &[u8], stored: bool) {
        let file = File::create(path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        let options = zip::write::FileOptions::default().compression_method(if stored {
            zip::CompressionMethod::Stored
        } else {
            zip::CompressionMethod::Deflated
        });
        writer.start_file(entry_name, options).unwrap();
        writer.write_all(contents).unwrap();
        writer.finish().unwrap();
    }

    #[test]
    fn reads_a_stored_entry_from_a_single_level_archive() {
        let dir = tempfile::tempdir().unwrap();
        let jar_path = dir.path().join("a.jar");
        write_zip_with_entry(&jar_path, "p/A.class", b"hello", true);

        let handler = NestedArchiveHandler::new(false).unwrap();
        let root = handler.resolve_root(jar_path.to_str().unwrap()).unwrap();
        let slice = handler.read_entry(&root, "p/A.class").unwrap();
        assert_eq!(slice.load_all().unwrap(), b"hello");
    }

    #[test]
    fn rejects_archive_segment_after_directory_segment() {
        let handler = NestedArchiveHandler::new(false).unwrap();
        let result = handler.resolve_root("a.jar!classes/!b.jar");
        assert!(result.is_err());
    }
}
