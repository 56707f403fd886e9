//! Disk manager for KeelDB.
//!
//! This module provides file-level and page-level primitives on top of the
//! local filesystem:
//!
//! - **File lifecycle**: create, open, close, destroy
//! - **Page I/O**: positional reads and writes of fixed-size pages
//! - **Page allocation**: a monotonic per-file page number allocator
//!
//! Each database file is a flat concatenation of `PAGE_SIZE` pages with no
//! header and no allocation bitmap; page `n` occupies the byte range
//! `[n * PAGE_SIZE, (n + 1) * PAGE_SIZE)`.
//!
//! # Usage
//!
//! ```rust,no_run
//! use keel_storage::disk::DiskManager;
//! use keel_common::PAGE_SIZE;
//!
//! fn example() -> keel_storage::disk::DiskResult<()> {
//!     let disk = DiskManager::new();
//!     disk.create_file("data.kdb")?;
//!     let file_id = disk.open_file("data.kdb")?;
//!
//!     let page_no = disk.allocate_page(file_id)?;
//!     disk.write_page(file_id, page_no, &[0u8; PAGE_SIZE])?;
//!
//!     disk.close_file(file_id)?;
//!     Ok(())
//! }
//! ```

mod error;
mod manager;

pub use error::{DiskError, DiskResult};
pub use manager::DiskManager;
