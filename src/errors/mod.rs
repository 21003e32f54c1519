//! Centralized error handling for epg-merge
//!
//! # Error Categories
//!
//! - **Fetch Errors**: network failures, timeouts and non-2xx responses
//! - **Decompress Errors**: corrupt or truncated gzip payloads
//! - **Parse Errors**: malformed XML or JSON source content
//! - **Serialize Errors**: rendering or writing the merged guide
//! - **Config Errors**: loading the source list and remap table
//!
//! Per-source failures are wrapped in [`SourceError`] and never end a run.
//!
//! # Usage
//!
//! ```rust
//! use epg_merge::errors::{SourceError, SourceResult};
//!
//! fn example_stage() -> SourceResult<Vec<u8>> {
//!     Err(SourceError::UnknownFormat)
//! }
//! ```

pub mod types;

pub use types::*;

/// Convenience type alias for Results using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Convenience type alias for per-source Results
pub type SourceResult<T> = Result<T, SourceError>;

/// Convenience type alias for configuration Results
pub type ConfigResult<T> = Result<T, ConfigError>;
