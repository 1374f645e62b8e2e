//! Error kinds for every component family, and the top-level error the CLI
//! maps to a process exit code.
//!
//! Soft, per-file errors are not a variant here: per §7 of the design they
//! are recovered locally (logged through a [`crate::logging::LogContext`]
//! and skipped) and never constructed as a propagating `Result::Err`.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("device {id}: unreachable or nonexistent mount path '{path}'")]
    UnreachableDevicePath { id: u32, path: String },
    #[error("device {id}: cluster_size must be >= 0, got {cluster_size}")]
    NegativeClusterSize { id: u32, cluster_size: i64 },
    #[error("create_archive is set but archive_location is not set or does not exist")]
    MissingArchiveLocation,
    #[error("don't specify --onlycollect and --onlyarchive together, those are exclusive operations")]
    ConflictingPhaseFlags,
    #[error("malformed --device specifier '{0}', expected (id,description,path[,cluster_size])")]
    MalformedDeviceSpec(String),
    #[error("failed to read configuration file {path}: {source}")]
    Read { path: PathBuf, #[source] source: io::Error },
    #[error("failed to parse configuration file {path}: {source}")]
    Parse { path: PathBuf, #[source] source: toml::de::Error },
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store is not open")]
    NotOpen,
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("archiver already open")]
    AlreadyOpen,
    #[error("archiver is not open; store_file called before provide()")]
    NotOpen,
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

/// The run's single point of fatal failure, returned by the pipeline
/// coordinator to the CLI entry point.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("archive error: {0}")]
    Archive(#[from] ArchiveError),
    #[error("usage error: {0}")]
    Usage(String),
}
