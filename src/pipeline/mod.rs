//! Merge pipeline: per-source processing, deduplication and progress events

pub mod merge_engine;
pub mod observer;

pub use merge_engine::MergeEngine;
pub use observer::{MergeObserver, NoopObserver, TracingObserver};
