//! Archiver: the per-device output sink (§4.4).

pub mod zip_archiver;

use std::path::Path;

use crate::error::ArchiveError;

/// Any conforming backend. State machine: `closed -> (provide) -> open ->
/// (close) -> closed`; `store_file` in state `closed` is a usage error.
pub trait Archiver: Send {
    /// Create a new output container named `name` under `location`.
    /// Transitions `closed -> open`. Fails if already open.
    fn provide(&mut self, location: &Path, name: &str) -> Result<(), ArchiveError>;

    /// Copy the file at `source_path` into the open container under entry
    /// name `alias`. Only callable in state `open`.
    fn store_file(&mut self, source_path: &Path, alias: &str) -> Result<(), ArchiveError>;

    /// Finalize the container. Transitions `open -> closed`.
    fn close(&mut self) -> Result<(), ArchiveError>;
}

/// The coordinator owns one factory and asks it for a fresh archiver per
/// device (§4.4, §9) — never shares or clones a live archiver instance
/// across devices.
pub trait ArchiverFactory: Send + Sync {
    fn new_archiver(&self) -> Box<dyn Archiver>;
}
