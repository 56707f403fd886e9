//! # keel-common
//!
//! Common types and constants for KeelDB.
//!
//! This crate provides the foundational types shared by all KeelDB
//! components:
//!
//! - **Types**: Core identifiers (`FileId`, `PageNo`, `PageId`)
//! - **Constants**: Page geometry and buffer pool sizing
//!
//! ## Example
//!
//! ```rust
//! use keel_common::types::{FileId, PageId, PageNo};
//!
//! let page_id = PageId::new(FileId::new(1), PageNo::new(7));
//! assert!(page_id.is_valid());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod constants;
pub mod types;

// Re-export commonly used items at the crate root
pub use constants::*;
pub use types::{FileId, PageId, PageNo};
