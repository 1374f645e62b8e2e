//! Linux slack reader: resolves the backing block device via `df`, locates
//! the file's last allocated block via `debugfs`, and raw-reads one cluster.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::process::Command;

use super::{SlackDeviceHandle, SlackReader};
use crate::logging::LogContext;

pub struct LinuxSlackReader;

impl SlackReader for LinuxSlackReader {
    fn resolve_device(&self, source_root: &Path, log: &LogContext) -> SlackDeviceHandle {
        match device_loop_for(source_root) {
            Ok(Some(loop_dev)) => SlackDeviceHandle::Linux(loop_dev),
            Ok(None) => {
                log.error(format!("no backing device found for {}", source_root.display()));
                SlackDeviceHandle::None
            }
            Err(e) => {
                log.error(format!("df failed for {}: {}", source_root.display(), e));
                SlackDeviceHandle::None
            }
        }
    }

    fn read_slack_raw(&self, handle: &SlackDeviceHandle, file_path: &Path, cluster_size: u64, log: &LogContext) -> Vec<u8> {
        let device_loop = match handle {
            SlackDeviceHandle::Linux(dev) => dev,
            SlackDeviceHandle::None => return Vec::new(),
        };
        match last_block(file_path, device_loop) {
            // A file reported with zero blocks has no allocated cluster to
            // read slack from (§4.2 edge case).
            Ok(Some(0)) | Ok(None) => Vec::new(),
            Ok(Some(block)) => read_cluster(device_loop, block, cluster_size, log),
            Err(e) => {
                log.error(format!("debugfs failed for {}: {}", file_path.display(), e));
                Vec::new()
            }
        }
    }
}

/// Resolve the block device backing `path` from the first column of the
/// first `df -h` line starting with `/`.
fn device_loop_for(path: &Path) -> std::io::Result<Option<String>> {
    let output = Command::new("df").arg("-h").arg(path).output()?;
    let text = String::from_utf8_lossy(&output.stdout);
    for line in text.lines() {
        if line.starts_with('/') {
            if let Some(dev) = line.split_whitespace().next() {
                return Ok(Some(dev.to_string()));
            }
        }
    }
    Ok(None)
}

/// Locate the file's final allocated block number by parsing the trailing
/// token of `debugfs -R "blocks <path>" <device_loop>`.
fn last_block(file_path: &Path, device_loop: &str) -> std::io::Result<Option<u64>> {
    let cmd = format!("blocks {}", file_path.display());
    let output = Command::new("debugfs").arg("-R").arg(cmd).arg(device_loop).output()?;
    let text = String::from_utf8_lossy(&output.stdout);
    let last_token = text.split_whitespace().last();
    Ok(last_token.and_then(|t| t.parse::<u64>().ok()))
}

fn read_cluster(device_loop: &str, block: u64, cluster_size: u64, log: &LogContext) -> Vec<u8> {
    let start = block * cluster_size;
    match File::open(device_loop).and_then(|mut f| {
        f.seek(SeekFrom::Start(start))?;
        let mut buf = vec![0u8; cluster_size as usize];
        f.read_exact(&mut buf)?;
        Ok(buf)
    }) {
        Ok(buf) => buf,
        Err(e) => {
            log.error(format!("reading slack from {} at offset {}: {}", device_loop, start, e));
            Vec::new()
        }
    }
}
