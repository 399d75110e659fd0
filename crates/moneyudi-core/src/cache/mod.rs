//! Local JSON file cache.
//!
//! `CacheManager` stores two kinds of records under the user cache
//! directory, each wrapped in `CachedData` with the time it was written:
//!
//! - the vocabulary card (`vocab_v1.json`), shared by every running client
//! - the last ledger snapshot per user (`snapshot_{user}.json`)

pub mod manager;

pub use manager::{CacheManager, CachedData, FRESHNESS_WINDOW_MINUTES};
