//! End-to-end tests for archive jobs and loose-image batches.

use std::collections::{BTreeMap, HashSet};
use std::fs::{self, File};
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::{ImageFormat, Rgb, RgbImage};
use resizer_core::{
    Config, ImageBatchRequest, JobRequest, LocalDelivery, Pipeline, StatsStore, TransformParams,
};
use zip::write::FileOptions;
use zip::{ZipArchive, ZipWriter};

struct Env {
    _dir: tempfile::TempDir,
    root: PathBuf,
    pipeline: Pipeline,
}

fn env() -> Env {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().to_path_buf();
    let mut config = Config::default();
    config.paths.work_dir = root.join("work");
    config.paths.output_dir = root.join("outgoing");
    config.paths.stats_file = root.join("stats/stats.json");
    let pipeline = Pipeline::from_config(&config);
    Env {
        _dir: dir,
        root,
        pipeline,
    }
}

fn encoded(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let image = RgbImage::from_pixel(width, height, Rgb([200, 30, 30]));
    let mut bytes = Cursor::new(Vec::new());
    image.write_to(&mut bytes, format).unwrap();
    bytes.into_inner()
}

fn write_zip(path: &Path, entries: &[(&str, Vec<u8>)]) {
    let mut zip = ZipWriter::new(File::create(path).unwrap());
    for (name, contents) in entries {
        zip.start_file(*name, FileOptions::default()).unwrap();
        zip.write_all(contents).unwrap();
    }
    zip.finish().unwrap();
}

fn read_zip(path: &Path) -> BTreeMap<String, Vec<u8>> {
    let mut zip = ZipArchive::new(File::open(path).unwrap()).unwrap();
    let mut entries = BTreeMap::new();
    for i in 0..zip.len() {
        let mut entry = zip.by_index(i).unwrap();
        let mut contents = Vec::new();
        entry.read_to_end(&mut contents).unwrap();
        entries.insert(entry.name().to_string(), contents);
    }
    entries
}

fn work_entries(env: &Env) -> usize {
    match fs::read_dir(env.root.join("work")) {
        Ok(entries) => entries.count(),
        Err(_) => 0,
    }
}

fn params() -> TransformParams {
    TransformParams::new(900, 1200, 0.15)
}

#[test]
fn test_mixed_ratios_end_to_end() {
    let env = env();
    let archive = env.root.join("photos.zip");
    write_zip(
        &archive,
        &[
            ("square.jpg", encoded(100, 100, ImageFormat::Jpeg)),
            ("wide.jpg", encoded(140, 100, ImageFormat::Jpeg)),
            ("album/near.jpg", encoded(98, 100, ImageFormat::Jpeg)),
        ],
    );

    let outcome = env
        .pipeline
        .run(JobRequest::new(&archive, params()).with_requester("42"))
        .unwrap();

    assert_eq!(outcome.success_count, 2);
    assert_eq!(outcome.error_count, 1);
    assert_eq!(outcome.aspect_rejections, 1);
    assert_eq!(outcome.failures, 0);
    assert!(!archive.exists());

    let output = outcome.output_archive.clone().unwrap();
    assert!(output.starts_with(env.root.join("outgoing")));
    let name = output.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("processed_"));
    assert!(name.ends_with("_photos.zip"));

    let entries = read_zip(&output);
    assert_eq!(entries.len(), 2);
    assert!(entries.keys().any(|k| k.starts_with("album/resized_")));
    for bytes in entries.values() {
        let image = image::load_from_memory(bytes).unwrap();
        assert_eq!((image.width(), image.height()), (900, 1200));
    }

    let stats = StatsStore::new(env.root.join("stats/stats.json"))
        .snapshot()
        .unwrap();
    assert_eq!(stats.archives, 1);
    assert_eq!(stats.images, 3);
    assert_eq!(stats.resizes, 2);
    assert_eq!(stats.users, vec!["42".to_string()]);
    assert_eq!(stats.top_archives.len(), 1);
    assert_eq!(stats.top_archives[0].filename, name);
    assert_eq!(stats.top_archives[0].size, outcome.archive_size);

    assert_eq!(work_entries(&env), 0);
}

#[test]
fn test_counts_only_eligible_entries() {
    let env = env();
    let archive = env.root.join("mixed.zip");
    write_zip(
        &archive,
        &[
            ("a.png", encoded(50, 50, ImageFormat::Png)),
            ("B.PNG", encoded(50, 50, ImageFormat::Png)),
            (".hidden.jpg", encoded(50, 50, ImageFormat::Jpeg)),
            ("__MACOSX/._a.png", b"resource fork".to_vec()),
            ("notes.txt", b"hello".to_vec()),
            ("broken.jpg", b"not really a jpeg".to_vec()),
        ],
    );

    let outcome = env.pipeline.run(JobRequest::new(&archive, params())).unwrap();
    assert_eq!(outcome.success_count, 2);
    assert_eq!(outcome.error_count, 1);
    assert_eq!(outcome.failures, 1);
    assert_eq!(outcome.success_count + outcome.error_count, 3);
}

#[test]
fn test_packaged_content_matches_written_outputs() {
    let env = env();
    let archive = env.root.join("one.zip");
    write_zip(&archive, &[("one.png", encoded(60, 60, ImageFormat::Png))]);
    let extracted = env.root.join("check");

    let outcome = env.pipeline.run(JobRequest::new(&archive, params())).unwrap();
    let output = outcome.output_archive.unwrap();
    resizer_core::archive::extract(&output, &extracted).unwrap();

    let entries = read_zip(&output);
    assert_eq!(entries.len(), 1);
    for (name, bytes) in entries {
        assert_eq!(fs::read(extracted.join(name)).unwrap(), bytes);
    }
}

#[test]
fn test_empty_archive() {
    let env = env();
    let archive = env.root.join("empty.zip");
    write_zip(&archive, &[]);

    let status = env.pipeline.process(&archive, 900, 1200, 0.15);
    assert_eq!(status.success, 0);
    assert_eq!(status.errors, 0);
    assert_eq!(status.processed_archive, None);
    assert!(status.archive_size > 0);
    assert_eq!(work_entries(&env), 0);

    let stats = env.pipeline.stats().unwrap().snapshot().unwrap();
    assert_eq!(stats.archives, 1);
    assert!(stats.top_archives.is_empty());
}

#[test]
fn test_unsupported_format() {
    let env = env();
    let archive = env.root.join("photos.rar");
    fs::write(&archive, encoded(10, 10, ImageFormat::Png)).unwrap();

    let status = env.pipeline.process(&archive, 900, 1200, 0.15);
    assert_eq!(status.success, 0);
    assert_eq!(status.errors, 0);
    assert_eq!(status.processed_archive, None);
    assert_eq!(status.archive_size, 0);
    assert_eq!(work_entries(&env), 0);
}

#[test]
fn test_corrupt_zip_is_extraction_failure() {
    let env = env();
    let archive = env.root.join("broken.zip");
    let mut bytes = b"PK\x03\x04".to_vec();
    bytes.extend_from_slice(&[0u8; 64]);
    fs::write(&archive, bytes).unwrap();

    let err = env
        .pipeline
        .run(JobRequest::new(&archive, params()))
        .unwrap_err();
    assert!(!err.is_unsupported_format());
    assert_eq!(work_entries(&env), 0);
}

#[test]
fn test_traversal_entry_fails_without_escaping() {
    let env = env();
    let archive = env.root.join("evil.zip");
    write_zip(
        &archive,
        &[
            ("ok.png", encoded(10, 10, ImageFormat::Png)),
            ("../../escaped.png", encoded(10, 10, ImageFormat::Png)),
        ],
    );

    assert!(env.pipeline.run(JobRequest::new(&archive, params())).is_err());
    assert!(!env.root.join("escaped.png").exists());
    assert_eq!(work_entries(&env), 0);
}

#[test]
fn test_concurrent_jobs_share_stats() {
    let env = env();
    let pipeline = Arc::new(env.pipeline.clone());
    let archives: Vec<PathBuf> = (0..4)
        .map(|i| {
            let path = env.root.join(format!("batch{i}.zip"));
            let images: Vec<(String, Vec<u8>)> = (0..=i)
                .map(|n| (format!("img{n}.png"), encoded(40, 40, ImageFormat::Png)))
                .collect();
            let entries: Vec<(&str, Vec<u8>)> =
                images.iter().map(|(n, b)| (n.as_str(), b.clone())).collect();
            write_zip(&path, &entries);
            path
        })
        .collect();

    let handles: Vec<_> = archives
        .into_iter()
        .map(|archive| {
            let pipeline = Arc::clone(&pipeline);
            std::thread::spawn(move || pipeline.run(JobRequest::new(archive, params())).unwrap())
        })
        .collect();
    let outcomes: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let names: HashSet<PathBuf> = outcomes
        .iter()
        .map(|o| o.output_archive.clone().unwrap())
        .collect();
    assert_eq!(names.len(), 4);

    let stats = pipeline.stats().unwrap().snapshot().unwrap();
    assert_eq!(stats.archives, 4);
    assert_eq!(stats.resizes, 1 + 2 + 3 + 4);
    assert_eq!(stats.top_archives.len(), 3);
    assert!(stats
        .top_archives
        .windows(2)
        .all(|pair| pair[0].size >= pair[1].size));
    assert_eq!(work_entries(&env), 0);
}

#[tokio::test]
async fn test_loose_images_are_delivered_and_removed() {
    let env = env();
    let uploads = env.root.join("uploads");
    fs::create_dir_all(&uploads).unwrap();
    let square = uploads.join("photo");
    fs::write(&square, encoded(80, 80, ImageFormat::Png)).unwrap();
    let wide = uploads.join("wide.png");
    fs::write(&wide, encoded(200, 80, ImageFormat::Png)).unwrap();
    let missing = uploads.join("gone.jpg");

    let delivery = LocalDelivery::new(env.root.join("delivered"));
    let summary = env
        .pipeline
        .process_images(
            ImageBatchRequest {
                requester: "7".to_string(),
                images: vec![square.clone(), wide.clone(), missing],
                params: params(),
            },
            &delivery,
        )
        .await;

    assert_eq!(summary.delivered, 1);
    assert_eq!(summary.rejected, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(delivery.notices().len(), 2);

    let delivered: Vec<_> = fs::read_dir(env.root.join("delivered/7"))
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert_eq!(delivered.len(), 1);
    let image = image::open(&delivered[0]).unwrap();
    assert_eq!((image.width(), image.height()), (900, 1200));

    assert_eq!(fs::read_dir(&uploads).unwrap().count(), 0);

    let stats = env.pipeline.stats().unwrap().snapshot().unwrap();
    assert_eq!(stats.archives, 0);
    assert_eq!(stats.images, 2);
    assert_eq!(stats.resizes, 1);
    assert_eq!(stats.users, vec!["7".to_string()]);
}

#[cfg(feature = "rar")]
#[test]
fn test_rar_archive_end_to_end() {
    let env = env();
    let archive = env.root.join("nested.rar");
    fs::copy(
        Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/nested.rar"),
        &archive,
    )
    .unwrap();

    let outcome = env
        .pipeline
        .run(JobRequest::new(&archive, params()).with_requester("9"))
        .unwrap();

    assert_eq!(outcome.success_count, 2);
    assert_eq!(outcome.error_count, 1);
    assert_eq!(outcome.aspect_rejections, 1);
    assert!(!archive.exists());

    let output = outcome.output_archive.unwrap();
    assert!(output
        .file_name()
        .unwrap()
        .to_string_lossy()
        .ends_with("_nested.zip"));
    let entries = read_zip(&output);
    assert_eq!(entries.len(), 2);
    assert!(entries.keys().any(|k| k.starts_with("resized_")));
    assert!(entries.keys().any(|k| k.starts_with("album/resized_")));
    assert!(!entries.keys().any(|k| k.starts_with("album/deeper/")));
    assert_eq!(work_entries(&env), 0);
}

#[test]
fn test_unwritable_stats_keep_job_outcome() {
    let env = env();
    let mut config = env.pipeline.config().clone();
    config.paths.stats_file = env.root.join("stats-as-dir");
    fs::create_dir_all(config.stats_file()).unwrap();
    let pipeline = Pipeline::from_config(&config);

    let archive = env.root.join("one.zip");
    write_zip(&archive, &[("one.png", encoded(60, 60, ImageFormat::Png))]);

    let outcome = pipeline.run(JobRequest::new(&archive, params())).unwrap();
    assert_eq!(outcome.success_count, 1);
    assert_eq!(read_zip(&outcome.output_archive.unwrap()).len(), 1);
    assert!(config.stats_file().is_dir());
    assert_eq!(work_entries(&env), 0);
}
