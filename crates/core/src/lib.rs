//! Core types and shared functionality for encore.
//!
//! This crate provides:
//! - Versioned cache generations with a SQLite backend
//! - The song document store
//! - Request/response model shared by the worker and the network layer
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod http;
pub mod songs;

pub use cache::{CACHE_VERSION, CacheHandle, CachedEntry, Database, generation_name};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use http::{Method, Network, Request, Response};
pub use songs::{Song, SongPatch};
