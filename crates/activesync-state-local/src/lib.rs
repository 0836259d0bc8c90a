//! Local State Store implementations for ActiveSync backends, plus the
//! helpers behind the `activesync-state` operator tool.

pub mod config;
pub mod inspect;
pub mod store;

pub use store::{FileStateStore, MemoryStateStore};
