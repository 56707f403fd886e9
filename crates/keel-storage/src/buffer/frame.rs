//! Buffer frame - a slot in the buffer pool that holds one page.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

use keel_common::constants::PAGE_SIZE;
use keel_common::types::PageId;
use parking_lot::RwLock;

/// Frame identifier - index into the buffer pool's frame array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId(usize);

impl FrameId {
    /// Creates a new frame ID.
    #[inline]
    #[must_use]
    pub const fn new(id: usize) -> Self {
        Self(id)
    }

    /// Returns the raw index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl From<usize> for FrameId {
    fn from(id: usize) -> Self {
        Self::new(id)
    }
}

impl From<FrameId> for usize {
    fn from(id: FrameId) -> Self {
        id.0
    }
}

/// A buffer frame holds a single page in memory.
///
/// Each frame has a `PAGE_SIZE` data buffer plus metadata: the resident
/// page's ID (sentinel when empty), a dirty flag, and a pin count. The
/// metadata lives in atomics and the data behind its own `RwLock`, so a pin
/// holder can read or write page bytes without touching the pool latch.
///
/// Frames are constructed once at pool construction and reused for the
/// lifetime of the pool; they are never freed or reallocated.
pub struct BufferFrame {
    /// Frame ID (index in the frame array).
    frame_id: FrameId,
    /// Page data buffer, always exactly `PAGE_SIZE` bytes.
    data: RwLock<Box<[u8]>>,
    /// Packed [`PageId`] resident in this frame (sentinel if empty).
    page_id: AtomicU64,
    /// Pin count (number of active references).
    pin_count: AtomicU32,
    /// Whether the page is dirty (modified since last write-back).
    dirty: AtomicBool,
}

impl BufferFrame {
    /// Creates a new empty buffer frame.
    #[must_use]
    pub fn new(frame_id: FrameId) -> Self {
        Self {
            frame_id,
            data: RwLock::new(vec![0u8; PAGE_SIZE].into_boxed_slice()),
            page_id: AtomicU64::new(PageId::INVALID.as_u64()),
            pin_count: AtomicU32::new(0),
            dirty: AtomicBool::new(false),
        }
    }

    /// Returns the frame ID.
    #[inline]
    #[must_use]
    pub fn frame_id(&self) -> FrameId {
        self.frame_id
    }

    /// Returns the ID of the page resident in this frame.
    #[inline]
    #[must_use]
    pub fn page_id(&self) -> PageId {
        PageId::from_u64(self.page_id.load(Ordering::Acquire))
    }

    /// Sets the resident page ID.
    #[inline]
    pub fn set_page_id(&self, page_id: PageId) {
        self.page_id.store(page_id.as_u64(), Ordering::Release);
    }

    /// Returns true if no page is resident in this frame.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.page_id().is_valid()
    }

    /// Returns the current pin count.
    #[inline]
    #[must_use]
    pub fn pin_count(&self) -> u32 {
        self.pin_count.load(Ordering::Acquire)
    }

    /// Increments the pin count and returns the new value.
    #[inline]
    pub fn pin(&self) -> u32 {
        self.pin_count.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Decrements the pin count and returns the new value.
    ///
    /// # Panics
    ///
    /// Panics in debug builds if the pin count is already 0.
    #[inline]
    pub fn unpin(&self) -> u32 {
        let old = self.pin_count.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(old > 0, "unpinned frame with pin_count = 0");
        old - 1
    }

    /// Returns true if the frame is pinned.
    #[inline]
    #[must_use]
    pub fn is_pinned(&self) -> bool {
        self.pin_count() > 0
    }

    /// Returns true if the frame is dirty.
    #[inline]
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    /// Sets or clears the dirty flag.
    #[inline]
    pub fn set_dirty(&self, dirty: bool) {
        self.dirty.store(dirty, Ordering::Release);
    }

    /// Returns a read lock on the page data.
    #[inline]
    pub fn read_data(&self) -> parking_lot::RwLockReadGuard<'_, Box<[u8]>> {
        self.data.read()
    }

    /// Returns a write lock on the page data.
    ///
    /// Note that writing bytes does not set the dirty flag; callers report
    /// modifications through `unpin_page(.., is_dirty = true)`.
    #[inline]
    pub fn write_data(&self) -> parking_lot::RwLockWriteGuard<'_, Box<[u8]>> {
        self.data.write()
    }

    /// Copies `data` into the front of the frame buffer.
    pub fn copy_from(&self, data: &[u8]) {
        let mut guard = self.data.write();
        guard[..data.len()].copy_from_slice(data);
    }

    /// Copies the front of the frame buffer into `buf`.
    pub fn copy_to(&self, buf: &mut [u8]) {
        let guard = self.data.read();
        buf.copy_from_slice(&guard[..buf.len()]);
    }

    /// Resets the frame to its empty state: zeroed data, sentinel page ID,
    /// clean, unpinned.
    pub fn reset(&self) {
        self.data.write().fill(0);
        self.page_id
            .store(PageId::INVALID.as_u64(), Ordering::Release);
        self.pin_count.store(0, Ordering::Release);
        self.dirty.store(false, Ordering::Release);
    }
}

impl std::fmt::Debug for BufferFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferFrame")
            .field("frame_id", &self.frame_id)
            .field("page_id", &self.page_id())
            .field("pin_count", &self.pin_count())
            .field("dirty", &self.is_dirty())
            .finish()
    }
}
