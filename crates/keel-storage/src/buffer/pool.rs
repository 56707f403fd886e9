//! Buffer pool implementation.
//!
//! The buffer pool owns the frame array, the page table, and the free list,
//! and mediates all page acquisitions: fetching resident pages, reading
//! missing ones from disk into a victim frame, and writing dirty victims
//! back before their frame is repurposed.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use keel_common::types::{FileId, PageId};
use parking_lot::Mutex;
use tracing::debug;

use super::config::BufferPoolConfig;
use super::error::{BufferError, BufferResult};
use super::frame::{BufferFrame, FrameId};
use super::replacer::Replacer;
use super::BufferPoolStats;
use crate::disk::DiskManager;

/// State guarded by the pool latch.
///
/// Every public operation's state-mutating region runs under this mutex;
/// together with the rule that the replacer's mutex is only ever taken
/// while the latch is held, all metadata mutations are linearizable.
struct PoolInner {
    /// Page table: maps resident `PageId`s to their frame.
    page_table: HashMap<PageId, FrameId>,
    /// Frames holding no valid page.
    free_list: VecDeque<FrameId>,
}

/// The buffer pool manages page caching between disk files and memory.
///
/// Frames are allocated once at construction and reused forever. At every
/// quiescent point each frame is in exactly one of three states: on the
/// free list, tracked by the replacer (resident, unpinned), or pinned.
///
/// Disk I/O on the miss, eviction, and flush paths happens while the pool
/// latch is held. This serializes all I/O through the pool but rules out
/// two threads materializing the same page into different frames.
pub struct BufferPool {
    /// Array of buffer frames, indexed by [`FrameId`].
    frames: Vec<Arc<BufferFrame>>,
    /// Pool latch and the state it guards.
    inner: Mutex<PoolInner>,
    /// Replacement policy over unpinned frames. Lock order: pool latch
    /// first, replacer mutex second.
    replacer: Box<dyn Replacer>,
    /// Disk manager for page I/O.
    disk: Arc<DiskManager>,
    /// Fetches served from a resident frame.
    hit_count: AtomicU64,
    /// Fetches that required a disk read.
    miss_count: AtomicU64,
    /// Pages evicted to make room.
    eviction_count: AtomicU64,
    /// Page write-backs.
    flush_count: AtomicU64,
}

impl BufferPool {
    /// Creates a new buffer pool.
    ///
    /// The pool performs no I/O at construction and flushes nothing at
    /// destruction; shutdown paths call [`BufferPool::flush_all_pages`]
    /// explicitly per open file.
    pub fn new(
        config: BufferPoolConfig,
        disk: Arc<DiskManager>,
        replacer: Box<dyn Replacer>,
    ) -> BufferResult<Self> {
        config
            .validate()
            .map_err(|message| BufferError::Config { message })?;

        let pool_size = config.pool_size;
        let frames = (0..pool_size)
            .map(|i| Arc::new(BufferFrame::new(FrameId::new(i))))
            .collect();

        Ok(Self {
            frames,
            inner: Mutex::new(PoolInner {
                page_table: HashMap::with_capacity(pool_size),
                free_list: (0..pool_size).map(FrameId::new).collect(),
            }),
            replacer,
            disk,
            hit_count: AtomicU64::new(0),
            miss_count: AtomicU64::new(0),
            eviction_count: AtomicU64::new(0),
            flush_count: AtomicU64::new(0),
        })
    }

    /// Fetches the page identified by `page_id`, pinning its frame.
    ///
    /// On a hit the resident frame's pin count is incremented. On a miss a
    /// free or victim frame is claimed (writing back its dirty contents if
    /// any) and the page is read from disk. Returns `Ok(None)` when every
    /// frame is pinned; every unpinned fetch must eventually be matched by
    /// an [`BufferPool::unpin_page`].
    pub fn fetch_page(&self, page_id: PageId) -> BufferResult<Option<Arc<BufferFrame>>> {
        if !page_id.is_valid() {
            return Err(BufferError::InvalidPageId { page_id });
        }

        let mut inner = self.inner.lock();

        if let Some(&frame_id) = inner.page_table.get(&page_id) {
            let frame = &self.frames[frame_id.index()];
            frame.pin();
            self.replacer.pin(frame_id);
            self.hit_count.fetch_add(1, Ordering::Relaxed);
            return Ok(Some(Arc::clone(frame)));
        }

        self.miss_count.fetch_add(1, Ordering::Relaxed);
        let Some(frame_id) = self.reclaim_frame(&mut inner)? else {
            return Ok(None);
        };

        let frame = &self.frames[frame_id.index()];
        {
            let mut data = frame.write_data();
            if let Err(err) = self
                .disk
                .read_page(page_id.file_id(), page_id.page_no(), &mut data)
            {
                // The reclaimed frame is already reset; hand it back.
                drop(data);
                inner.free_list.push_back(frame_id);
                return Err(err.into());
            }
        }

        frame.set_page_id(page_id);
        frame.set_dirty(false);
        frame.pin();
        inner.page_table.insert(page_id, frame_id);

        Ok(Some(Arc::clone(frame)))
    }

    /// Allocates a fresh page in `file_id` and pins a zeroed frame for it.
    ///
    /// Returns `Ok(None)` when every frame is pinned; in that case no page
    /// number is consumed. The new page is not written to disk until it is
    /// evicted or explicitly flushed.
    pub fn new_page(&self, file_id: FileId) -> BufferResult<Option<(PageId, Arc<BufferFrame>)>> {
        let mut inner = self.inner.lock();

        let Some(frame_id) = self.reclaim_frame(&mut inner)? else {
            return Ok(None);
        };

        let page_no = match self.disk.allocate_page(file_id) {
            Ok(page_no) => page_no,
            Err(err) => {
                inner.free_list.push_back(frame_id);
                return Err(err.into());
            }
        };
        let page_id = PageId::new(file_id, page_no);

        // The reclaimed frame is already zeroed and clean.
        let frame = &self.frames[frame_id.index()];
        frame.set_page_id(page_id);
        frame.pin();
        inner.page_table.insert(page_id, frame_id);

        Ok(Some((page_id, Arc::clone(frame))))
    }

    /// Releases one pin on the page, recording whether the caller dirtied
    /// it.
    ///
    /// Returns `false` if the page is not resident. When the pin count
    /// reaches zero the frame becomes evictable. Unpinning a page whose pin
    /// count is already zero is a caller bug: fatal in debug builds,
    /// signalled and ignored in release builds.
    pub fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> bool {
        let inner = self.inner.lock();
        let Some(&frame_id) = inner.page_table.get(&page_id) else {
            return false;
        };

        let frame = &self.frames[frame_id.index()];
        if is_dirty {
            frame.set_dirty(true);
        }

        if frame.pin_count() == 0 {
            debug_assert!(false, "unpin of page {page_id} with zero pin count");
            tracing::error!(%page_id, "unpin underflow");
            return false;
        }

        if frame.unpin() == 0 {
            self.replacer.unpin(frame_id);
        }
        true
    }

    /// Writes the page's current contents to disk and clears its dirty
    /// flag, regardless of pin count.
    ///
    /// Returns `Ok(false)` if the page is not resident.
    pub fn flush_page(&self, page_id: PageId) -> BufferResult<bool> {
        let inner = self.inner.lock();
        let Some(&frame_id) = inner.page_table.get(&page_id) else {
            return Ok(false);
        };

        let frame = &self.frames[frame_id.index()];
        self.write_back(frame)?;
        frame.set_dirty(false);
        Ok(true)
    }

    /// Flushes every resident page belonging to `file_id`.
    pub fn flush_all_pages(&self, file_id: FileId) -> BufferResult<()> {
        let inner = self.inner.lock();
        for (&page_id, &frame_id) in &inner.page_table {
            if page_id.file_id() != file_id {
                continue;
            }
            let frame = &self.frames[frame_id.index()];
            self.write_back(frame)?;
            frame.set_dirty(false);
        }
        Ok(())
    }

    /// Drops the page from the pool without writing it back.
    ///
    /// Returns `true` if the page is not resident (nothing to do) or was
    /// removed, `false` if the page is pinned; callers must unpin first.
    /// The page number is not reclaimed on disk.
    pub fn delete_page(&self, page_id: PageId) -> bool {
        let mut inner = self.inner.lock();
        let Some(&frame_id) = inner.page_table.get(&page_id) else {
            return true;
        };

        let frame = &self.frames[frame_id.index()];
        if frame.is_pinned() {
            return false;
        }

        inner.page_table.remove(&page_id);
        self.replacer.pin(frame_id);
        frame.reset();
        inner.free_list.push_back(frame_id);
        debug!(%page_id, frame_id = frame_id.index(), "deleted page");
        true
    }

    /// Returns true if the page is resident.
    pub fn contains(&self, page_id: PageId) -> bool {
        self.inner.lock().page_table.contains_key(&page_id)
    }

    /// Returns the number of frames in the pool.
    pub fn pool_size(&self) -> usize {
        self.frames.len()
    }

    /// Returns the number of frames holding no page.
    pub fn free_frame_count(&self) -> usize {
        self.inner.lock().free_list.len()
    }

    /// Returns statistics about the buffer pool.
    pub fn stats(&self) -> BufferPoolStats {
        let mut pinned = 0;
        let mut dirty = 0;
        for frame in &self.frames {
            if frame.is_pinned() {
                pinned += 1;
            }
            if frame.is_dirty() {
                dirty += 1;
            }
        }

        BufferPoolStats {
            hits: self.hit_count.load(Ordering::Relaxed),
            misses: self.miss_count.load(Ordering::Relaxed),
            evictions: self.eviction_count.load(Ordering::Relaxed),
            flushes: self.flush_count.load(Ordering::Relaxed),
            pinned_frames: pinned,
            dirty_frames: dirty,
            free_frames: self.free_frame_count(),
        }
    }

    // -------------------------------------------------------------------------
    // Private helpers
    // -------------------------------------------------------------------------

    /// Claims a frame for new contents, preferring the free list (no
    /// write-back cost) and falling back to the replacer's victim.
    ///
    /// The returned frame is reset: zeroed, clean, unpinned, and absent
    /// from the page table. Returns `Ok(None)` when all frames are pinned.
    ///
    /// If writing back a dirty victim fails, the victim stays resident and
    /// dirty, is handed back to the replacer, and the error propagates with
    /// no page-table mutation.
    fn reclaim_frame(&self, inner: &mut PoolInner) -> BufferResult<Option<FrameId>> {
        if let Some(frame_id) = inner.free_list.pop_front() {
            return Ok(Some(frame_id));
        }

        let Some(frame_id) = self.replacer.victim() else {
            return Ok(None);
        };
        let frame = &self.frames[frame_id.index()];
        let old_page_id = frame.page_id();

        if frame.is_dirty() {
            if let Err(err) = self.write_back(frame) {
                self.replacer.unpin(frame_id);
                return Err(err);
            }
            frame.set_dirty(false);
        }

        inner.page_table.remove(&old_page_id);
        frame.reset();
        self.eviction_count.fetch_add(1, Ordering::Relaxed);
        debug!(page_id = %old_page_id, frame_id = frame_id.index(), "evicted page");

        Ok(Some(frame_id))
    }

    /// Writes a frame's contents to its page's slot on disk.
    fn write_back(&self, frame: &BufferFrame) -> BufferResult<()> {
        let page_id = frame.page_id();
        let data = frame.read_data();
        self.disk
            .write_page(page_id.file_id(), page_id.page_no(), &data)?;
        self.flush_count.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

impl std::fmt::Debug for BufferPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferPool")
            .field("pool_size", &self.pool_size())
            .field("resident", &self.inner.lock().page_table.len())
            .field("stats", &self.stats())
            .finish()
    }
}
