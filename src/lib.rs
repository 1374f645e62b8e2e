//! # fdedup — content-addressed deduplication across forensic source devices
//!
//! Walks one or more source devices, records a content digest (and
//! optionally the trailing file-slack) for every regular file into a
//! persistent store, then archives one representative per content-hash
//! group per device into a per-device output container.
//!
//! A run is a strict two-phase pipeline: every device's collect task
//! finishes before any device's archive task begins. Phases can be skipped
//! independently, but never both requested-and-skipped for the same run
//! via `--onlycollect`/`--onlyarchive` together.

pub mod archiver;
pub mod collector;
pub mod config;
pub mod digest;
pub mod error;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod slack;
pub mod store;

pub use error::{ArchiveError, ConfigError, PipelineError, StoreError};
pub use model::{Device, Entry, Options};
