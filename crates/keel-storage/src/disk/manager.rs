//! Disk manager implementation.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use keel_common::constants::PAGE_SIZE;
use keel_common::types::{FileId, PageNo};
use parking_lot::Mutex;
use tracing::debug;

use super::error::{DiskError, DiskResult};

/// An open file tracked by the disk manager.
///
/// The file handle has its own mutex so page I/O on one file never blocks
/// page I/O on another. The page allocator is a simple post-increment
/// counter; page numbers are never reused (deleted pages are not reclaimed).
struct FileSlot {
    /// Canonical path the file was opened under.
    path: PathBuf,
    /// The underlying file, serialized per file for seek+read/write pairs.
    file: Mutex<File>,
    /// Next page number to hand out, seeded from the file size at open.
    next_page: AtomicU32,
}

/// Book-keeping maps, mutated only on file lifecycle operations.
#[derive(Default)]
struct DiskInner {
    /// Open files by handle.
    open_files: HashMap<FileId, Arc<FileSlot>>,
    /// Reverse index: canonical path -> handle. Bijective with `open_files`.
    path_index: HashMap<PathBuf, FileId>,
    /// Next file handle to assign.
    next_file_id: u32,
}

/// The disk manager owns all file handles and performs page-granular I/O.
///
/// Files are flat arrays of `PAGE_SIZE` pages. The manager maintains a
/// bijection between open paths and [`FileId`] handles, so opening an
/// already-open path returns the existing handle.
///
/// Methods are safe to call from many threads: the handle maps are guarded
/// by one mutex held only for lookups and lifecycle changes, and each file
/// carries its own I/O mutex, so two distinct files can be read and written
/// in parallel.
pub struct DiskManager {
    inner: Mutex<DiskInner>,
}

impl DiskManager {
    /// Creates a disk manager with no open files.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(DiskInner::default()),
        }
    }

    /// Creates a new empty file at `path`.
    ///
    /// Fails with [`DiskError::FileExists`] if the path is already present.
    pub fn create_file(&self, path: impl AsRef<Path>) -> DiskResult<()> {
        let path = path.as_ref();
        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|e| DiskError::from_io_with_path(e, path))?;
        debug!(path = %path.display(), "created file");
        Ok(())
    }

    /// Removes the file at `path`.
    ///
    /// Fails with [`DiskError::FileStillOpen`] while any handle to the path
    /// is open, and with [`DiskError::FileNotFound`] if the path is absent.
    pub fn destroy_file(&self, path: impl AsRef<Path>) -> DiskResult<()> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(DiskError::file_not_found(path));
        }
        let canonical = fs::canonicalize(path)?;

        let inner = self.inner.lock();
        if inner.path_index.contains_key(&canonical) {
            return Err(DiskError::FileStillOpen { path: canonical });
        }
        fs::remove_file(&canonical).map_err(|e| DiskError::from_io_with_path(e, &canonical))?;
        debug!(path = %canonical.display(), "destroyed file");
        Ok(())
    }

    /// Opens the file at `path` for page I/O and returns its handle.
    ///
    /// Idempotent per path: opening an already-open path returns the same
    /// [`FileId`]. The page allocator is seeded from the current file size.
    pub fn open_file(&self, path: impl AsRef<Path>) -> DiskResult<FileId> {
        let path = path.as_ref();
        let canonical =
            fs::canonicalize(path).map_err(|e| DiskError::from_io_with_path(e, path))?;

        let mut inner = self.inner.lock();
        if let Some(&file_id) = inner.path_index.get(&canonical) {
            return Ok(file_id);
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&canonical)
            .map_err(|e| DiskError::from_io_with_path(e, &canonical))?;
        let len = file.metadata()?.len();
        let page_count = len.div_ceil(PAGE_SIZE as u64) as u32;

        let file_id = FileId::new(inner.next_file_id);
        inner.next_file_id += 1;
        inner.open_files.insert(
            file_id,
            Arc::new(FileSlot {
                path: canonical.clone(),
                file: Mutex::new(file),
                next_page: AtomicU32::new(page_count),
            }),
        );
        inner.path_index.insert(canonical.clone(), file_id);

        debug!(path = %canonical.display(), %file_id, pages = page_count, "opened file");
        Ok(file_id)
    }

    /// Closes the handle `file_id`.
    ///
    /// Fails with [`DiskError::FileNotOpen`] for an unknown handle.
    pub fn close_file(&self, file_id: FileId) -> DiskResult<()> {
        let mut inner = self.inner.lock();
        let slot = inner
            .open_files
            .remove(&file_id)
            .ok_or(DiskError::FileNotOpen { file_id })?;
        inner.path_index.remove(&slot.path);
        debug!(path = %slot.path.display(), %file_id, "closed file");
        Ok(())
    }

    /// Returns true if `path` names an existing regular file.
    pub fn is_file(&self, path: impl AsRef<Path>) -> bool {
        path.as_ref().is_file()
    }

    /// Reads exactly `buf.len()` bytes of page `page_no` into `buf`.
    ///
    /// The read starts at byte offset `page_no * PAGE_SIZE`. A read that
    /// runs past end-of-file fails with [`DiskError::ShortIo`].
    pub fn read_page(&self, file_id: FileId, page_no: PageNo, buf: &mut [u8]) -> DiskResult<()> {
        let slot = self.slot(file_id)?;
        let mut file = slot.file.lock();
        file.seek(SeekFrom::Start(page_offset(page_no)))?;

        let mut total = 0;
        while total < buf.len() {
            let n = file.read(&mut buf[total..])?;
            if n == 0 {
                return Err(DiskError::short_read(buf.len(), total));
            }
            total += n;
        }
        Ok(())
    }

    /// Writes exactly `buf.len()` bytes of `buf` as page `page_no`.
    ///
    /// The write starts at byte offset `page_no * PAGE_SIZE`, extending the
    /// file if necessary; afterwards the file length is always a multiple of
    /// `PAGE_SIZE`.
    pub fn write_page(&self, file_id: FileId, page_no: PageNo, buf: &[u8]) -> DiskResult<()> {
        let slot = self.slot(file_id)?;
        let mut file = slot.file.lock();
        file.seek(SeekFrom::Start(page_offset(page_no)))?;

        let mut total = 0;
        while total < buf.len() {
            let n = file.write(&buf[total..])?;
            if n == 0 {
                return Err(DiskError::short_write(buf.len(), total));
            }
            total += n;
        }

        // Keep the file length page-aligned after partial-page writes.
        let len = file.metadata()?.len();
        if len % PAGE_SIZE as u64 != 0 {
            file.set_len(len.next_multiple_of(PAGE_SIZE as u64))?;
        }
        Ok(())
    }

    /// Returns the next unused page number for the file and advances the
    /// per-file counter.
    ///
    /// Allocation is logical and monotonic: there is no on-disk bitmap, and
    /// deleted pages are never handed out again.
    pub fn allocate_page(&self, file_id: FileId) -> DiskResult<PageNo> {
        let slot = self.slot(file_id)?;
        let page_no = slot.next_page.fetch_add(1, Ordering::AcqRel);
        Ok(PageNo::new(page_no))
    }

    /// Flushes the file's data and metadata to stable storage.
    ///
    /// Write-backs performed by the buffer pool are write-through to the OS
    /// only; a recovery layer calls this to force durability.
    pub fn sync_file(&self, file_id: FileId) -> DiskResult<()> {
        let slot = self.slot(file_id)?;
        slot.file.lock().sync_all()?;
        Ok(())
    }

    /// Returns the size in bytes of the file at `path`.
    pub fn file_size(&self, path: impl AsRef<Path>) -> DiskResult<u64> {
        let path = path.as_ref();
        let meta = fs::metadata(path).map_err(|e| DiskError::from_io_with_path(e, path))?;
        Ok(meta.len())
    }

    /// Returns the path the handle `file_id` was opened under.
    pub fn file_path(&self, file_id: FileId) -> DiskResult<PathBuf> {
        Ok(self.slot(file_id)?.path.clone())
    }

    /// Returns the number of currently open files.
    pub fn open_file_count(&self) -> usize {
        self.inner.lock().open_files.len()
    }

    /// Looks up an open file, cloning the slot out of the handle map so
    /// page I/O proceeds without the manager mutex.
    fn slot(&self, file_id: FileId) -> DiskResult<Arc<FileSlot>> {
        self.inner
            .lock()
            .open_files
            .get(&file_id)
            .cloned()
            .ok_or(DiskError::FileNotOpen { file_id })
    }
}

impl Default for DiskManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DiskManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiskManager")
            .field("open_files", &self.open_file_count())
            .finish()
    }
}

/// Byte offset of a page within its file.
#[inline]
fn page_offset(page_no: PageNo) -> u64 {
    u64::from(page_no.as_u32()) * PAGE_SIZE as u64
}
