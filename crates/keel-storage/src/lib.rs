//! # keel-storage
//!
//! Storage core for KeelDB: the subsystem mediating all access between
//! durable on-disk page storage and in-memory working copies.
//!
//! The crate has two layers:
//!
//! - [`disk`] - file and page-level I/O on numbered pages
//! - [`buffer`] - the buffer pool: frame allocation, pin/unpin accounting,
//!   LRU victim selection, and write-back of dirty pages
//!
//! Higher layers (record managers, index managers, query execution) see a
//! page abstraction: a fixed-size mutable buffer identified by
//! `(file_id, page_no)` that is guaranteed resident and stable while pinned.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// File management and page-level I/O
pub mod disk;

/// Buffer pool, frames, and replacement policy
pub mod buffer;
