//! Reference persistence handlers for `satchel`.
//!
//! - [`FileHandler`]: one file per session under a directory; GC by mtime.
//! - [`MemoryHandler`]: in-process map with optional TTL; GC by write time.

mod file;
mod memory;

pub use file::FileHandler;
pub use memory::MemoryHandler;
