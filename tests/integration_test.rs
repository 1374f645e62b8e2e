use std::fs;
use std::io::Write;

use fdedup::archiver::zip_archiver::ZipArchiverFactory;
use fdedup::digest::DigestSelection;
use fdedup::logging::LogContext;
use fdedup::model::{Device, Options};
use fdedup::pipeline;
use fdedup::store::sqlite::SqliteEntryStore;
use fdedup::store::EntryStore;

fn write_file(path: &std::path::Path, contents: &[u8]) {
    fs::File::create(path).unwrap().write_all(contents).unwrap();
}

#[test]
fn end_to_end_pipeline_dedupes_and_archives_one_device() {
    let source = tempfile::tempdir().unwrap();
    let archive_dir = tempfile::tempdir().unwrap();
    let store_dir = tempfile::tempdir().unwrap();

    write_file(&source.path().join("a.txt"), b"same content");
    write_file(&source.path().join("b.txt"), b"same content");
    write_file(&source.path().join("c.txt"), b"different content");

    let options = Options {
        enable_sha1: true,
        enable_sha256: false,
        enable_md5: false,
        number_threads: 1,
        hash_chunk_size: 65536,
        store_slack_space: false,
        create_archive: true,
        collect: true,
        archive_location: Some(archive_dir.path().to_path_buf()),
        unique_elements_chunk_size: -1,
        write_data_threshold: 1000,
        string_codec: "utf-8".to_string(),
    };

    let devices = vec![Device {
        id: 1,
        description: "evidence".to_string(),
        mount_path: source.path().to_path_buf(),
        cluster_size: 0,
    }];

    let selection = DigestSelection::from_options(&options);
    let store = SqliteEntryStore::new(store_dir.path().join("store.db"), selection, 1000);
    let factory = ZipArchiverFactory;
    let log = LogContext::default();

    pipeline::run(&log, &options, &devices, &store as &dyn EntryStore, &factory).unwrap();

    let zips: Vec<_> = fs::read_dir(archive_dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().map(|ext| ext == "zip").unwrap_or(false))
        .collect();
    assert_eq!(zips.len(), 1);

    let file = fs::File::open(zips[0].path()).unwrap();
    let mut zip = zip::ZipArchive::new(file).unwrap();
    // Two content groups ("same content" x2, "different content" x1): one
    // representative per group makes it into the archive.
    assert_eq!(zip.len(), 2);
}

#[test]
fn two_disjoint_devices_do_not_cross_dedup() {
    let device_a = tempfile::tempdir().unwrap();
    let device_b = tempfile::tempdir().unwrap();
    let archive_dir = tempfile::tempdir().unwrap();
    let store_dir = tempfile::tempdir().unwrap();

    write_file(&device_a.path().join("x.txt"), b"shared bytes");
    write_file(&device_b.path().join("y.txt"), b"shared bytes");

    let options = Options {
        archive_location: Some(archive_dir.path().to_path_buf()),
        ..Options::default()
    };
    let devices = vec![
        Device { id: 1, description: "a".to_string(), mount_path: device_a.path().to_path_buf(), cluster_size: 0 },
        Device { id: 2, description: "b".to_string(), mount_path: device_b.path().to_path_buf(), cluster_size: 0 },
    ];

    let selection = DigestSelection::from_options(&options);
    let store = SqliteEntryStore::new(store_dir.path().join("store.db"), selection, 1000);
    let factory = ZipArchiverFactory;
    let log = LogContext::default();

    pipeline::run(&log, &options, &devices, &store as &dyn EntryStore, &factory).unwrap();

    // Each device produces its own representative for the same content: two
    // archives, one entry apiece, even though the bytes are identical.
    let zips: Vec<_> = fs::read_dir(archive_dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().map(|ext| ext == "zip").unwrap_or(false))
        .collect();
    assert_eq!(zips.len(), 2);
    for zip_entry in &zips {
        let file = fs::File::open(zip_entry.path()).unwrap();
        let zip = zip::ZipArchive::new(file).unwrap();
        assert_eq!(zip.len(), 1);
    }
}

#[test]
fn collect_only_then_archive_only_sees_the_same_store() {
    let source = tempfile::tempdir().unwrap();
    let archive_dir = tempfile::tempdir().unwrap();
    let store_dir = tempfile::tempdir().unwrap();
    let db_path = store_dir.path().join("store.db");

    write_file(&source.path().join("only.txt"), b"payload");

    let devices = vec![Device {
        id: 7,
        description: "evidence".to_string(),
        mount_path: source.path().to_path_buf(),
        cluster_size: 0,
    }];
    let selection = DigestSelection { sha1: true, sha256: false, md5: false };
    let log = LogContext::default();
    let factory = ZipArchiverFactory;

    let collect_options = Options {
        collect: true,
        create_archive: false,
        archive_location: Some(archive_dir.path().to_path_buf()),
        ..Options::default()
    };
    let store = SqliteEntryStore::new(&db_path, selection, 1000);
    pipeline::run(&log, &collect_options, &devices, &store as &dyn EntryStore, &factory).unwrap();

    let archive_options = Options {
        collect: false,
        create_archive: true,
        archive_location: Some(archive_dir.path().to_path_buf()),
        ..Options::default()
    };
    let store = SqliteEntryStore::new(&db_path, selection, 1000);
    pipeline::run(&log, &archive_options, &devices, &store as &dyn EntryStore, &factory).unwrap();

    let zips: Vec<_> = fs::read_dir(archive_dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().map(|ext| ext == "zip").unwrap_or(false))
        .collect();
    assert_eq!(zips.len(), 1);
}
