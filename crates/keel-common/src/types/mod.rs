//! Core type definitions for KeelDB.

mod ids;

pub use ids::{FileId, PageId, PageNo};
