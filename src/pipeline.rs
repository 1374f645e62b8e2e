//! Pipeline coordinator: validates configuration, then runs the collect
//! phase across every device, then the archive phase across every device,
//! under either a single-threaded or worker-pool scheduling model (§4.6).

use std::path::Path;

use chrono::Local;
use rayon::prelude::*;

use crate::archiver::ArchiverFactory;
use crate::collector;
use crate::digest::DigestSelection;
use crate::error::{ConfigError, PipelineError};
use crate::logging::LogContext;
use crate::model::{Device, Options};
use crate::slack;
use crate::store::EntryStore;

/// Pre-flight validation, executed before `store.open()` (§4.6). Any
/// failure here terminates the run before any side effect on the store or
/// output.
pub fn validate(options: &Options, devices: &[Device]) -> Result<(), ConfigError> {
    if options.create_archive {
        match &options.archive_location {
            Some(location) if location.is_dir() => {}
            _ => return Err(ConfigError::MissingArchiveLocation),
        }
    }
    for device in devices {
        if !device.mount_path.exists() {
            return Err(ConfigError::UnreachableDevicePath {
                id: device.id,
                path: device.mount_path.display().to_string(),
            });
        }
    }
    Ok(())
}

/// Run the full pipeline: validate, open the store, run the selected
/// phases under the phase barrier, then close on success or abort on the
/// first fatal failure.
pub fn run(
    log: &LogContext,
    options: &Options,
    devices: &[Device],
    store: &dyn EntryStore,
    archiver_factory: &dyn ArchiverFactory,
) -> Result<(), PipelineError> {
    validate(options, devices)?;
    store.open()?;

    let outcome = run_phases(log, options, devices, store, archiver_factory);

    match outcome {
        Ok(()) => {
            store.close()?;
            Ok(())
        }
        Err(e) => {
            store.abort()?;
            Err(e)
        }
    }
}

fn run_phases(
    log: &LogContext,
    options: &Options,
    devices: &[Device],
    store: &dyn EntryStore,
    archiver_factory: &dyn ArchiverFactory,
) -> Result<(), PipelineError> {
    let selection = DigestSelection::from_options(options);
    let slack_reader = slack::platform_slack_reader();

    if !options.collect && !options.create_archive {
        log.info("no phases selected; opening and closing the store only");
        return Ok(());
    }

    if options.collect {
        run_collect_phase(log, options, devices, store, selection, slack_reader.as_ref())?;
    }

    // Phase barrier: the archive phase never begins until every device's
    // collect task has returned, not merely its own.
    if options.create_archive {
        run_archive_phase(log, options, devices, store, archiver_factory)?;
    }

    Ok(())
}

fn run_collect_phase(
    log: &LogContext,
    options: &Options,
    devices: &[Device],
    store: &dyn EntryStore,
    selection: DigestSelection,
    slack_reader: &dyn slack::SlackReader,
) -> Result<(), PipelineError> {
    let task = |device: &Device| -> Result<(), PipelineError> {
        let device_log = log.with_scope(format!("device[{}]", device.id));
        collector::collect(
            &device_log,
            device,
            store,
            selection,
            slack_reader,
            options.hash_chunk_size,
            options.store_slack_space,
        )
        .map_err(PipelineError::from)
    };

    if options.number_threads <= 1 {
        for device in devices {
            task(device)?;
        }
        Ok(())
    } else {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(options.number_threads)
            .build()
            .map_err(|e| PipelineError::Usage(e.to_string()))?;
        pool.install(|| devices.par_iter().try_for_each(task))
    }
}

/// Archive-fatal (§7) is per-device: a failing device's archive task is
/// logged and abandoned, but every other device still gets its chance to
/// archive. The phase only surfaces an error — the first one encountered —
/// once every device has been attempted.
fn run_archive_phase(
    log: &LogContext,
    options: &Options,
    devices: &[Device],
    store: &dyn EntryStore,
    archiver_factory: &dyn ArchiverFactory,
) -> Result<(), PipelineError> {
    let task = |device: &Device| -> Result<(), PipelineError> {
        let device_log = log.with_scope(format!("device[{}]", device.id));
        let result = archive_device(&device_log, options, device, store, archiver_factory);
        if let Err(e) = &result {
            device_log.error(format!("archive-fatal: {e}"));
        }
        result
    };

    let results: Vec<Result<(), PipelineError>> = if options.number_threads <= 1 {
        devices.iter().map(task).collect()
    } else {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(options.number_threads)
            .build()
            .map_err(|e| PipelineError::Usage(e.to_string()))?;
        pool.install(|| devices.par_iter().map(task).collect())
    };

    results.into_iter().find(Result::is_err).unwrap_or(Ok(()))
}

fn archive_device(
    log: &LogContext,
    options: &Options,
    device: &Device,
    store: &dyn EntryStore,
    archiver_factory: &dyn ArchiverFactory,
) -> Result<(), PipelineError> {
    let location = options
        .archive_location
        .as_ref()
        .ok_or(ConfigError::MissingArchiveLocation)?;
    let name = format!("archive-{}-{}", device.id, Local::now().format("%Y-%m-%d-%H-%M-%S"));
    log.info(format!("archive \"{name}\""));

    let mut archiver = archiver_factory.new_archiver();
    archiver.provide(location, &name)?;

    let uniques = store.get_uniques_for_device(device.id, options.unique_elements_chunk_size)?;
    let prefix_len = device.mount_path.to_string_lossy().len();
    for path in uniques {
        log.debug(format!("archiving: {path}"));
        let alias = strip_mount_prefix(&path, prefix_len);
        archiver.store_file(Path::new(&path), &alias)?;
    }
    archiver.close()?;
    log.info("archive completed");
    Ok(())
}

/// Strip the device's mount-path prefix (plus the following separator) from
/// an absolute path, preserving the relative hierarchy under the device
/// root (§4.4 alias rule, property P7).
fn strip_mount_prefix(path: &str, prefix_len: usize) -> String {
    if path.len() > prefix_len {
        path[prefix_len + 1..].to_string()
    } else {
        path.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archiver::Archiver;
    use crate::error::StoreError;
    use crate::model::Entry;
    use std::sync::{Arc, Mutex};

    /// A store stub whose uniques view is a single fixed path per device,
    /// for tests that only exercise archive-phase scheduling.
    struct StubStore;

    impl EntryStore for StubStore {
        fn open(&self) -> Result<(), StoreError> {
            Ok(())
        }
        fn close(&self) -> Result<(), StoreError> {
            Ok(())
        }
        fn abort(&self) -> Result<(), StoreError> {
            Ok(())
        }
        fn store_entry(&self, _entry: &Entry) -> Result<(), StoreError> {
            Ok(())
        }
        fn get_uniques_for_device(&self, device_id: u32, _chunk_size: i64) -> Result<Vec<String>, StoreError> {
            Ok(vec![format!("/mnt/device{device_id}/file.txt")])
        }
    }

    /// Records every `provide()` call by archive name and fails for device 1.
    struct RecordingArchiver {
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Archiver for RecordingArchiver {
        fn provide(&mut self, _location: &Path, name: &str) -> Result<(), crate::error::ArchiveError> {
            self.log.lock().unwrap().push(name.to_string());
            if name.starts_with("archive-1-") {
                Err(crate::error::ArchiveError::AlreadyOpen)
            } else {
                Ok(())
            }
        }
        fn store_file(&mut self, _source_path: &Path, _alias: &str) -> Result<(), crate::error::ArchiveError> {
            Ok(())
        }
        fn close(&mut self) -> Result<(), crate::error::ArchiveError> {
            Ok(())
        }
    }

    struct RecordingArchiverFactory {
        log: Arc<Mutex<Vec<String>>>,
    }

    impl ArchiverFactory for RecordingArchiverFactory {
        fn new_archiver(&self) -> Box<dyn Archiver> {
            Box::new(RecordingArchiver { log: self.log.clone() })
        }
    }

    fn two_devices_one_failing(archive_dir: &Path) -> (Options, Vec<Device>) {
        let options = Options { archive_location: Some(archive_dir.to_path_buf()), ..Options::default() };
        let devices = vec![
            Device { id: 1, description: "fails".to_string(), mount_path: archive_dir.to_path_buf(), cluster_size: 0 },
            Device { id: 2, description: "ok".to_string(), mount_path: archive_dir.to_path_buf(), cluster_size: 0 },
        ];
        (options, devices)
    }

    #[test]
    fn archive_phase_continues_past_a_failing_device_single_threaded() {
        let archive_dir = tempfile::tempdir().unwrap();
        let (mut options, devices) = two_devices_one_failing(archive_dir.path());
        options.number_threads = 1;
        let store = StubStore;
        let log_calls = Arc::new(Mutex::new(Vec::new()));
        let factory = RecordingArchiverFactory { log: log_calls.clone() };
        let log = LogContext::default();

        let result = run_archive_phase(&log, &options, &devices, &store, &factory);
        assert!(result.is_err());

        let attempted = log_calls.lock().unwrap();
        assert_eq!(attempted.len(), 2, "both devices must be attempted, not just the first");
        assert!(attempted.iter().any(|n| n.starts_with("archive-2-")));
    }

    #[test]
    fn archive_phase_continues_past_a_failing_device_worker_pool() {
        let archive_dir = tempfile::tempdir().unwrap();
        let (mut options, devices) = two_devices_one_failing(archive_dir.path());
        options.number_threads = 2;
        let store = StubStore;
        let log_calls = Arc::new(Mutex::new(Vec::new()));
        let factory = RecordingArchiverFactory { log: log_calls.clone() };
        let log = LogContext::default();

        let result = run_archive_phase(&log, &options, &devices, &store, &factory);
        assert!(result.is_err());

        let attempted = log_calls.lock().unwrap();
        assert_eq!(attempted.len(), 2, "both devices must be attempted under the worker-pool model too");
    }

    #[test]
    fn alias_never_contains_device_root() {
        let alias = strip_mount_prefix("/mnt/device1/sub/file.txt", "/mnt/device1".len());
        assert_eq!(alias, "sub/file.txt");
        assert!(!alias.contains("/mnt/device1"));
    }

    #[test]
    fn validate_rejects_missing_archive_location_when_archiving() {
        let options = Options { create_archive: true, archive_location: None, ..Options::default() };
        let err = validate(&options, &[]);
        assert!(matches!(err, Err(ConfigError::MissingArchiveLocation)));
    }

    #[test]
    fn validate_rejects_unreachable_device_path() {
        let options = Options { create_archive: false, ..Options::default() };
        let devices = vec![Device {
            id: 1,
            description: "missing".to_string(),
            mount_path: std::path::PathBuf::from("/nonexistent/path/does/not/exist"),
            cluster_size: 0,
        }];
        let err = validate(&options, &devices);
        assert!(matches!(err, Err(ConfigError::UnreachableDevicePath { id: 1, .. })));
    }
}
