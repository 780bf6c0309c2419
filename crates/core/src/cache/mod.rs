//! SQLite-backed cache generations for the worker.
//!
//! A generation is a named, versioned set of request/response pairs. The
//! running worker only ever reads and writes the generation named after its
//! compiled-in [`CACHE_VERSION`]; activation deletes every other generation.
//!
//! - Request keys are SHA-256 of method and normalized URL
//! - Automatic schema migrations
//! - WAL mode for concurrent access

pub mod connection;
pub mod entries;
pub mod generations;
pub mod key;
pub mod migrations;

pub use crate::Error;

pub use connection::Database;
pub use entries::CachedEntry;
pub use generations::CacheHandle;

/// Version of the cache generation this build owns.
///
/// Bumping it is the only way to invalidate previously cached assets.
pub const CACHE_VERSION: &str = "1";

/// Prefix shared by every generation name.
pub const GENERATION_PREFIX: &str = "cacheAssets-v";

/// Name of the generation for a version, e.g. `cacheAssets-v1`.
pub fn generation_name(version: &str) -> String {
    format!("{GENERATION_PREFIX}{version}")
}
