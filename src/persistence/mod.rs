//! Persistence: the on-disk index image and its file I/O.

pub mod format;
pub mod image;

pub use format::Header;
