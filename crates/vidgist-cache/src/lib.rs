//! Vidgist Cache - Processed-video cache backed by plain JSON files.
//!
//! One record file per fingerprint plus an index mapping fingerprints to
//! files. Both are replaced by atomic rename, so readers never see a torn
//! file and concurrent writers simply race to be last.

mod error;
mod store;

pub use error::{CacheError, CacheResult};
pub use store::{ContentCache, IndexEntry};
