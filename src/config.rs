//! Configuration surface: a TOML file mapping to [`Options`] and the device
//! list, plus the `--generateconfig` template writer and `--device` CLI
//! specifier parser (§6).

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::model::{Device, Options};

/// On-disk shape of a `fdedup.toml`. Field names match [`Options`] and
/// [`Device`] directly; this struct exists only to carry `serde` derives
/// without hanging them off the core value types.
#[derive(Debug, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub options: TomlOptions,
    #[serde(default)]
    pub device: Vec<TomlDevice>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TomlOptions {
    #[serde(default = "default_true")]
    pub enable_sha1: bool,
    #[serde(default)]
    pub enable_sha256: bool,
    #[serde(default)]
    pub enable_md5: bool,
    #[serde(default = "default_threads")]
    pub number_threads: usize,
    #[serde(default = "default_chunk_size")]
    pub hash_chunk_size: usize,
    #[serde(default)]
    pub store_slack_space: bool,
    #[serde(default = "default_true")]
    pub create_archive: bool,
    #[serde(default = "default_true")]
    pub collect: bool,
    #[serde(default)]
    pub archive_location: Option<PathBuf>,
    #[serde(default = "default_unique_chunk")]
    pub unique_elements_chunk_size: i64,
    #[serde(default = "default_write_threshold")]
    pub write_data_threshold: u64,
    #[serde(default = "default_codec")]
    pub string_codec: String,
}

fn default_true() -> bool {
    true
}
fn default_threads() -> usize {
    1
}
fn default_chunk_size() -> usize {
    65536
}
fn default_unique_chunk() -> i64 {
    -1
}
fn default_write_threshold() -> u64 {
    1000
}
fn default_codec() -> String {
    "utf-8".to_string()
}

impl Default for TomlOptions {
    fn default() -> Self {
        let d = Options::default();
        TomlOptions {
            enable_sha1: d.enable_sha1,
            enable_sha256: d.enable_sha256,
            enable_md5: d.enable_md5,
            number_threads: d.number_threads,
            hash_chunk_size: d.hash_chunk_size,
            store_slack_space: d.store_slack_space,
            create_archive: d.create_archive,
            collect: d.collect,
            archive_location: d.archive_location,
            unique_elements_chunk_size: d.unique_elements_chunk_size,
            write_data_threshold: d.write_data_threshold,
            string_codec: d.string_codec,
        }
    }
}

impl From<TomlOptions> for Options {
    fn from(t: TomlOptions) -> Self {
        Options {
            enable_sha1: t.enable_sha1,
            enable_sha256: t.enable_sha256,
            enable_md5: t.enable_md5,
            number_threads: t.number_threads,
            hash_chunk_size: t.hash_chunk_size,
            store_slack_space: t.store_slack_space,
            create_archive: t.create_archive,
            collect: t.collect,
            archive_location: t.archive_location,
            unique_elements_chunk_size: t.unique_elements_chunk_size,
            write_data_threshold: t.write_data_threshold,
            string_codec: t.string_codec,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TomlDevice {
    pub id: u32,
    pub description: String,
    pub mount_path: PathBuf,
    #[serde(default)]
    pub cluster_size: u64,
}

impl From<TomlDevice> for Device {
    fn from(t: TomlDevice) -> Self {
        Device {
            id: t.id,
            description: t.description,
            mount_path: t.mount_path,
            cluster_size: t.cluster_size,
        }
    }
}

/// Load a configuration file, producing validated [`Options`] and devices.
pub fn load(path: &Path) -> Result<(Options, Vec<Device>), ConfigError> {
    let text = fs::read_to_string(path).map_err(|e| ConfigError::Read { path: path.to_path_buf(), source: e })?;
    let file: FileConfig = toml::from_str(&text).map_err(|e| ConfigError::Parse { path: path.to_path_buf(), source: e })?;
    let options: Options = file.options.into();
    let devices: Vec<Device> = file.device.into_iter().map(Device::from).collect();
    Ok((options, devices))
}

/// Write a commented default configuration to `target`. If `target` is a
/// directory, the file is created as `target/fdedup.toml`.
pub fn generate_default(target: &Path) -> Result<PathBuf, ConfigError> {
    let path = if target.is_dir() {
        target.join("fdedup.toml")
    } else {
        target.to_path_buf()
    };
    fs::write(&path, DEFAULT_CONFIG_TEMPLATE).map_err(ConfigError::Io)?;
    Ok(path)
}

const DEFAULT_CONFIG_TEMPLATE: &str = r#"# fdedup configuration.
#
# Regenerate this file with --generateconfig. Anything left unset here falls
# back to the defaults documented below; CLI flags override whatever is set
# in this file for the run they're passed to.

[options]
enable_sha1 = true
enable_sha256 = false
enable_md5 = false
# Number of worker threads per phase. 1 runs the collect/archive phases on
# the calling thread; >1 builds a fixed-size rayon thread pool per phase.
number_threads = 1
# Bytes read per streaming hash update.
hash_chunk_size = 65536
# Capture each file's trailing filesystem-cluster slack space alongside its
# digests. Requires a supported platform (Linux) to have any effect.
store_slack_space = false
create_archive = true
collect = true
# Directory the per-device archives are written into. Required if
# create_archive is true.
archive_location = "./archives"
# Fetch-batch-size hint for the uniques query; -1 fetches everything at once.
unique_elements_chunk_size = -1
# Commit the store's pending write batch after this many entries.
write_data_threshold = 1000
string_codec = "utf-8"

# Repeat this table for every source device.
# [[device]]
# id = 1
# description = "example device"
# mount_path = "/mnt/evidence1"
# cluster_size = 4096
"#;

/// Parse a `--device` CLI specifier of the form
/// `id,description,path[,cluster_size]` (§6).
pub fn parse_device_spec(spec: &str) -> Result<Device, ConfigError> {
    let cleaned = spec.trim().trim_start_matches('(').trim_end_matches(')');
    let parts: Vec<&str> = cleaned.split(',').map(str::trim).collect();
    if parts.len() < 3 || parts.len() > 4 {
        return Err(ConfigError::MalformedDeviceSpec(spec.to_string()));
    }
    let id: u32 = parts[0].parse().map_err(|_| ConfigError::MalformedDeviceSpec(spec.to_string()))?;
    let description = parts[1].trim_matches('"').trim_matches('\'').to_string();
    let mount_path = PathBuf::from(parts[2].trim_matches('"').trim_matches('\''));
    let cluster_size = if parts.len() == 4 {
        let signed: i64 = parts[3].parse().map_err(|_| ConfigError::MalformedDeviceSpec(spec.to_string()))?;
        if signed < 0 {
            return Err(ConfigError::NegativeClusterSize { id, cluster_size: signed });
        }
        signed as u64
    } else {
        0
    };
    Ok(Device { id, description, mount_path, cluster_size })
}
