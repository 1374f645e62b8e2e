//! Collector: walks one device's root, drives the digest engine and slack
//! reader per file, and appends entries to the store (§4.5).

use std::path::Path;

use walkdir::WalkDir;

use crate::digest::{self, DigestSelection};
use crate::error::StoreError;
use crate::logging::LogContext;
use crate::model::{Device, Entry};
use crate::slack::{self, SlackReader};
use crate::store::EntryStore;

/// Walk `device.mount_path` recursively, appending one [`Entry`] per regular
/// file to `store`. Symlinks are followed only when they resolve to a
/// regular file; directories (including symlinked directories) are not
/// recursed into twice. Per-file open/hash/slack errors are logged and
/// skipped without aborting the walk; only store connectivity loss is
/// fatal and propagates.
///
/// Slack is only captured when both `store_slack_space` is set and
/// `device.cluster_size > 0`; otherwise every entry's slack is empty (§3
/// Options, property P4).
pub fn collect(
    log: &LogContext,
    device: &Device,
    store: &dyn EntryStore,
    selection: DigestSelection,
    slack_reader: &dyn SlackReader,
    chunk_size: usize,
    store_slack_space: bool,
) -> Result<(), StoreError> {
    log.info(format!("collector \"{}\"", device.mount_path.display()));

    let slack_enabled = store_slack_space && device.cluster_size > 0;
    let device_handle = if slack_enabled {
        slack_reader.resolve_device(&device.mount_path, log)
    } else {
        crate::slack::SlackDeviceHandle::None
    };

    for walk_entry in WalkDir::new(&device.mount_path).follow_links(false) {
        let walk_entry = match walk_entry {
            Ok(e) => e,
            Err(e) => {
                log.error(format!("walk error: {e}"));
                continue;
            }
        };

        let path = walk_entry.path();
        if !is_regular_file(path) {
            continue;
        }

        log.debug(format!("processing: {}", path.display()));

        let triple = match digest::hash_file(path, selection, chunk_size) {
            Ok(t) => t,
            Err(e) => {
                log.error(format!("failed to hash {}: {}", path.display(), e));
                continue;
            }
        };

        let file_slack = if slack_enabled {
            slack::capture_slack(slack_reader, &device_handle, path, device.cluster_size as i64, log)
        } else {
            Vec::new()
        };

        let entry = Entry {
            sha1: triple.sha1,
            sha256: triple.sha256,
            md5: triple.md5,
            device_id: device.id,
            file_path: path.to_string_lossy().into_owned(),
            file_slack,
        };
        store.store_entry(&entry)?;
    }

    log.info("collector completed");
    Ok(())
}

/// A directory entry is a regular file if it is one directly, or if it is a
/// symlink that resolves to one (§4.5: "symbolic links are followed only if
/// they resolve to regular files").
fn is_regular_file(path: &Path) -> bool {
    match std::fs::symlink_metadata(path) {
        Ok(meta) if meta.is_file() => true,
        Ok(meta) if meta.file_type().is_symlink() => {
            std::fs::metadata(path).map(|m| m.is_file()).unwrap_or(false)
        }
        _ => false,
    }
}
