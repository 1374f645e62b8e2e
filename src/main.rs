use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use fdedup::archiver::zip_archiver::ZipArchiverFactory;
use fdedup::config;
use fdedup::logging::{self, LogContext, Verbosity};
use fdedup::model::{Device, Options};
use fdedup::pipeline;
use fdedup::store::sqlite::SqliteEntryStore;
use fdedup::store::EntryStore;

#[derive(Parser)]
#[command(name = "fdedup", version = "1.0.0", about = "Content-addressed deduplication across forensic source devices")]
struct Cli {
    /// Generate a new fdedup.toml and exit. If PATH is a directory, the file
    /// is created inside it.
    #[arg(long, value_name = "PATH")]
    generateconfig: Option<Option<PathBuf>>,

    /// Load configuration from PATH instead of ./fdedup.toml.
    #[arg(long, value_name = "PATH")]
    useconfig: Option<PathBuf>,

    /// Override or add a device: (id,description,path[,cluster_size]).
    #[arg(long, value_name = "SPEC")]
    device: Vec<String>,

    /// Only walk devices and record entries; skip archiving.
    #[arg(long)]
    onlycollect: bool,

    /// Only archive entries already recorded in the store.
    #[arg(long)]
    onlyarchive: bool,

    /// Capture each file's trailing filesystem-cluster slack space.
    #[arg(long)]
    copyslack: bool,

    /// Enable the MD5 digest.
    #[arg(long)]
    md5: bool,

    /// Enable the SHA-1 digest.
    #[arg(long)]
    sha1: bool,

    /// Enable the SHA-256 digest.
    #[arg(long)]
    sha256: bool,

    /// Worker threads per phase; 1 runs single-threaded.
    #[arg(long, value_name = "N")]
    threads: Option<usize>,

    /// Increase log verbosity (repeatable).
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(Verbosity::from_occurrences(cli.verbose), None);
    let log = LogContext::new("fdedup");

    if let Some(target) = &cli.generateconfig {
        let target = target.clone().unwrap_or_else(|| PathBuf::from("."));
        return match config::generate_default(&target) {
            Ok(path) => {
                println!("Configuration created at Location {}", path.display());
                ExitCode::SUCCESS
            }
            Err(e) => {
                log.error(format!("failed to generate configuration: {e}"));
                ExitCode::FAILURE
            }
        };
    }

    if cli.onlycollect && cli.onlyarchive {
        log.error(format!("{}", fdedup::ConfigError::ConflictingPhaseFlags));
        return ExitCode::FAILURE;
    }

    match run(&cli, &log) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log.error(format!("{e}"));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli, log: &LogContext) -> Result<(), fdedup::PipelineError> {
    let config_path = cli.useconfig.clone().unwrap_or_else(|| PathBuf::from("fdedup.toml"));
    let (mut options, mut devices) = if config_path.exists() {
        log.info(format!("loading configuration: {}", config_path.display()));
        config::load(&config_path)?
    } else {
        log.debug("no configuration file found, starting from defaults");
        (Options::default(), Vec::new())
    };

    for spec in &cli.device {
        let device = config::parse_device_spec(spec)?;
        upsert_device(&mut devices, device);
    }

    if cli.sha1 {
        options.enable_sha1 = true;
    }
    if cli.sha256 {
        options.enable_sha256 = true;
    }
    if cli.md5 {
        options.enable_md5 = true;
    }
    if cli.copyslack {
        options.store_slack_space = true;
    }
    if let Some(threads) = cli.threads {
        options.number_threads = threads;
    }
    if cli.onlycollect {
        options.create_archive = false;
        options.collect = true;
        log.info("collect and process only, no archive");
    }
    if cli.onlyarchive {
        options.create_archive = true;
        options.collect = false;
        log.info("archive only; the store must already agree with the given devices");
    }

    let selection = fdedup::digest::DigestSelection::from_options(&options);
    let db_path = options.archive_location.as_deref().unwrap_or_else(|| std::path::Path::new(".")).join("fdedup.db");
    let store = SqliteEntryStore::new(db_path, selection, options.write_data_threshold);
    let archiver_factory = ZipArchiverFactory;

    pipeline::run(log, &options, &devices, &store as &dyn EntryStore, &archiver_factory)
}

/// Devices passed via `--device` replace any existing entry with the same
/// id, or are appended if new.
fn upsert_device(devices: &mut Vec<Device>, device: Device) {
    if let Some(existing) = devices.iter_mut().find(|d| d.id == device.id) {
        *existing = device;
    } else {
        devices.push(device);
    }
}
