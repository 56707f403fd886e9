//! Page replacement policy.
//!
//! The replacer tracks the set of evictable frames (resident, pin count
//! zero) and yields a victim on demand. It knows only frame IDs; page
//! identity is the buffer pool's concern.

use std::collections::HashMap;
use std::ptr::NonNull;

use parking_lot::Mutex;

use super::frame::FrameId;

/// Capability set the buffer pool requires of a replacement policy.
///
/// The pool calls `pin` when a frame's pin count leaves zero, `unpin` when
/// it returns to zero, and `victim` when it needs a frame to evict.
/// Implementations other than LRU (Clock, LFU) are substitutable.
pub trait Replacer: Send + Sync {
    /// Removes and returns the frame to evict, or `None` if no frame is
    /// evictable.
    fn victim(&self) -> Option<FrameId>;

    /// Removes the frame from the evictable set. Idempotent for untracked
    /// frames.
    fn pin(&self, frame_id: FrameId);

    /// Adds the frame to the evictable set as most recently used.
    /// Idempotent for already-tracked frames.
    fn unpin(&self, frame_id: FrameId);

    /// Returns the number of evictable frames.
    fn len(&self) -> usize;

    /// Returns true if no frame is evictable.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A node in the LRU linked list.
struct Node {
    frame_id: FrameId,
    prev: Option<NonNull<Node>>,
    next: Option<NonNull<Node>>,
}

impl Node {
    fn new(frame_id: FrameId) -> Self {
        Self {
            frame_id,
            prev: None,
            next: None,
        }
    }
}

/// Doubly-linked list of frame IDs with a map for O(1) removal.
///
/// Head is the most-recently-unpinned frame, tail the least. A frame's
/// position reflects when it most recently became unpinned, not when its
/// page was last read; pinned frames are simply absent.
struct LruList {
    /// Map from frame ID to node pointer.
    map: HashMap<FrameId, NonNull<Node>>,
    /// Head of the list (most recently unpinned).
    head: Option<NonNull<Node>>,
    /// Tail of the list (least recently unpinned).
    tail: Option<NonNull<Node>>,
}

// Safety: LruList owns every node it points to and is only reachable
// through the LruReplacer mutex.
unsafe impl Send for LruList {}

impl LruList {
    fn new() -> Self {
        Self {
            map: HashMap::new(),
            head: None,
            tail: None,
        }
    }

    fn len(&self) -> usize {
        self.map.len()
    }

    /// Inserts a frame at the front. No-op if already tracked.
    fn push_front(&mut self, frame_id: FrameId) {
        if self.map.contains_key(&frame_id) {
            return;
        }

        let node = Box::new(Node::new(frame_id));
        let node_ptr = NonNull::from(Box::leak(node));

        unsafe {
            (*node_ptr.as_ptr()).next = self.head;
            if let Some(head) = self.head {
                (*head.as_ptr()).prev = Some(node_ptr);
            }
        }
        self.head = Some(node_ptr);
        if self.tail.is_none() {
            self.tail = Some(node_ptr);
        }

        self.map.insert(frame_id, node_ptr);
    }

    /// Removes a frame from wherever it sits. No-op if untracked.
    fn remove(&mut self, frame_id: FrameId) {
        if let Some(node_ptr) = self.map.remove(&frame_id) {
            self.unlink(node_ptr);
            // Safety: we just removed the pointer from the map, so we own it.
            drop(unsafe { Box::from_raw(node_ptr.as_ptr()) });
        }
    }

    /// Unlinks and returns the tail (least recently unpinned).
    fn pop_back(&mut self) -> Option<FrameId> {
        let tail = self.tail?;
        // Safety: tail is valid while tracked.
        let frame_id = unsafe { (*tail.as_ptr()).frame_id };
        self.map.remove(&frame_id);
        self.unlink(tail);
        drop(unsafe { Box::from_raw(tail.as_ptr()) });
        Some(frame_id)
    }

    /// Unlinks a node from the list without freeing it.
    fn unlink(&mut self, node_ptr: NonNull<Node>) {
        unsafe {
            let prev = (*node_ptr.as_ptr()).prev;
            let next = (*node_ptr.as_ptr()).next;

            if let Some(prev) = prev {
                (*prev.as_ptr()).next = next;
            } else {
                self.head = next;
            }

            if let Some(next) = next {
                (*next.as_ptr()).prev = prev;
            } else {
                self.tail = prev;
            }
        }
    }
}

impl Drop for LruList {
    fn drop(&mut self) {
        let mut current = self.head;
        while let Some(node_ptr) = current {
            unsafe {
                current = (*node_ptr.as_ptr()).next;
                drop(Box::from_raw(node_ptr.as_ptr()));
            }
        }
    }
}

/// LRU replacement policy over unpinned frames.
///
/// Victims come from the back of the list, i.e. the frame that has been
/// unpinned the longest. All operations are O(1) and hold the internal
/// mutex only for pointer surgery; there is no I/O inside the lock.
pub struct LruReplacer {
    inner: Mutex<LruList>,
}

impl LruReplacer {
    /// Creates an empty LRU replacer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(LruList::new()),
        }
    }
}

impl Default for LruReplacer {
    fn default() -> Self {
        Self::new()
    }
}

impl Replacer for LruReplacer {
    fn victim(&self) -> Option<FrameId> {
        self.inner.lock().pop_back()
    }

    fn pin(&self, frame_id: FrameId) {
        self.inner.lock().remove(frame_id);
    }

    fn unpin(&self, frame_id: FrameId) {
        self.inner.lock().push_front(frame_id);
    }

    fn len(&self) -> usize {
        self.inner.lock().len()
    }
}

impl std::fmt::Debug for LruReplacer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LruReplacer")
            .field("evictable", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn f(id: usize) -> FrameId {
        FrameId::new(id)
    }

    #[test]
    fn test_empty_replacer() {
        let replacer = LruReplacer::new();
        assert!(replacer.is_empty());
        assert_eq!(replacer.victim(), None);
    }

    #[test]
    fn test_victim_is_least_recently_unpinned() {
        let replacer = LruReplacer::new();
        replacer.unpin(f(0));
        replacer.unpin(f(1));
        replacer.unpin(f(2));
        assert_eq!(replacer.len(), 3);

        assert_eq!(replacer.victim(), Some(f(0)));
        assert_eq!(replacer.victim(), Some(f(1)));
        assert_eq!(replacer.victim(), Some(f(2)));
        assert_eq!(replacer.victim(), None);
    }

    #[test]
    fn test_pin_removes_from_any_position() {
        let replacer = LruReplacer::new();
        replacer.unpin(f(0));
        replacer.unpin(f(1));
        replacer.unpin(f(2));

        // Remove the middle entry.
        replacer.pin(f(1));
        assert_eq!(replacer.len(), 2);

        assert_eq!(replacer.victim(), Some(f(0)));
        assert_eq!(replacer.victim(), Some(f(2)));
    }

    #[test]
    fn test_pin_untracked_is_idempotent() {
        let replacer = LruReplacer::new();
        replacer.pin(f(9));
        assert!(replacer.is_empty());
    }

    #[test]
    fn test_unpin_tracked_is_idempotent() {
        let replacer = LruReplacer::new();
        replacer.unpin(f(0));
        replacer.unpin(f(1));

        // Re-unpinning does not move frame 0 back to the front.
        replacer.unpin(f(0));
        assert_eq!(replacer.len(), 2);
        assert_eq!(replacer.victim(), Some(f(0)));
    }

    #[test]
    fn test_re_unpin_after_pin_moves_to_front() {
        let replacer = LruReplacer::new();
        replacer.unpin(f(0));
        replacer.unpin(f(1));

        // Frame 0 is pinned and unpinned again; it is now the most recent.
        replacer.pin(f(0));
        replacer.unpin(f(0));

        assert_eq!(replacer.victim(), Some(f(1)));
        assert_eq!(replacer.victim(), Some(f(0)));
    }

    #[test]
    fn test_concurrent_pin_unpin() {
        use std::sync::Arc;

        let replacer = Arc::new(LruReplacer::new());
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let replacer = Arc::clone(&replacer);
                std::thread::spawn(move || {
                    for i in 0..256 {
                        let id = f(t * 256 + i);
                        replacer.unpin(id);
                        replacer.pin(id);
                        replacer.unpin(id);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(replacer.len(), 4 * 256);
    }
}
