//! Plain value types for the configuration surface and the store's canonical
//! row, per the data model.
//!
//! These are deliberately flat structs rather than an indexed/dict-style
//! container: every field is a named, statically-typed member, passed by
//! reference once constructed and never mutated for the life of a run.

use std::path::PathBuf;

/// A configured source device: a stable id, a human description, the
/// filesystem root to walk, and the allocation unit used for slack capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    pub id: u32,
    pub description: String,
    pub mount_path: PathBuf,
    /// 0 means "do not attempt slack capture on this device".
    pub cluster_size: u64,
}

/// The full recognized options surface for a run.
#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    pub enable_sha1: bool,
    pub enable_sha256: bool,
    pub enable_md5: bool,
    pub number_threads: usize,
    pub hash_chunk_size: usize,
    pub store_slack_space: bool,
    pub create_archive: bool,
    pub collect: bool,
    pub archive_location: Option<PathBuf>,
    pub unique_elements_chunk_size: i64,
    pub write_data_threshold: u64,
    pub string_codec: String,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            enable_sha1: true,
            enable_sha256: false,
            enable_md5: false,
            number_threads: 1,
            hash_chunk_size: 65536,
            store_slack_space: false,
            create_archive: true,
            collect: true,
            archive_location: None,
            unique_elements_chunk_size: -1,
            write_data_threshold: 1000,
            string_codec: "utf-8".to_string(),
        }
    }
}

impl Options {
    pub fn digests_enabled(&self) -> (bool, bool, bool) {
        (self.enable_sha1, self.enable_sha256, self.enable_md5)
    }

    pub fn any_digest_enabled(&self) -> bool {
        self.enable_sha1 || self.enable_sha256 || self.enable_md5
    }
}

/// The canonical row written by the collector and read by the archiver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub sha1: Option<String>,
    pub sha256: Option<String>,
    pub md5: Option<String>,
    pub device_id: u32,
    pub file_path: String,
    pub file_slack: Vec<u8>,
}
