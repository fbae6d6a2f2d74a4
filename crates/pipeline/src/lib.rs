//! Deck loading and batch orchestration.
//!
//! Detects the container format of each input, runs the extraction engine
//! over it, and merges per-file results into one [`ProcessOutput`]. Results
//! can be cached per `(deck bytes, configuration)` pair.

pub mod cache;
pub mod loader;
pub mod runner;

pub use cache::{CacheKey, JsonDirCache, MemoryCache, ResultCache};
pub use loader::DeckFile;
pub use runner::{process, BatchRunner, FileReport, FileStatus, ProcessOutput};
