use super::*;
use crate::archiver::{ArchiverCall, ScriptedArchiver};
use crate::config::RetentionConfig;
use crate::error::{Error, PipelineError};
use crate::types::Stage;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const MB: u64 = 1_000_000;

fn write_file(path: &Path, contents: &[u8]) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, contents).unwrap();
}

/// Write `files` into `dir` and an SFV manifest covering all of them
fn write_release(dir: &Path, manifest: &str, files: &[(&str, &[u8])]) {
    let mut sfv = String::from("; generated for tests\n");
    for (name, contents) in files {
        write_file(&dir.join(name), contents);
        sfv.push_str(&format!("{} {:08x}\n", name, crc32fast::hash(contents)));
    }
    write_file(&dir.join(manifest), sfv.as_bytes());
}

fn pipeline_with(
    archiver: Arc<ScriptedArchiver>,
    config: Config,
) -> (Pipeline, broadcast::Receiver<Event>) {
    let (tx, rx) = broadcast::channel(1024);
    let pipeline = Pipeline::new(tx, Arc::new(config), archiver);
    (pipeline, rx)
}

fn candidate(path: PathBuf) -> Candidate {
    Candidate::from_path(&path).unwrap()
}

fn drain(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn retention(min_size_bytes: u64) -> RetentionConfig {
    RetentionConfig {
        min_size_bytes,
        ..RetentionConfig::default()
    }
}

// -----------------------------------------------------------------------------
// Full pipeline
// -----------------------------------------------------------------------------

#[tokio::test]
async fn full_pipeline_keeps_payload_and_prunes_the_rest() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write_release(
        root,
        "movie.sfv",
        &[
            ("movie.part01.rar", b"first volume"),
            ("movie.part02.rar", b"second volume"),
        ],
    );

    let archiver = Arc::new(
        ScriptedArchiver::new()
            .with_payload("movie.mkv", 500 * MB)
            .with_payload("info.nfo", 2048),
    );
    let (pipeline, _rx) = pipeline_with(archiver.clone(), Config::default());

    let archive = root.join("movie.part01.rar");
    let report = pipeline.process(&candidate(archive.clone())).await.unwrap();

    assert!(root.join("movie.mkv").exists());
    assert!(!root.join("info.nfo").exists());
    assert!(!root.join("movie.part01.rar").exists());
    assert!(!root.join("movie.part02.rar").exists());
    assert!(!root.join("movie.sfv").exists());
    assert_eq!(report.verification.records_checked, 2);
    assert!(report.test.passed);
    assert!(!report.extracted_with_warnings());
    assert_eq!(report.cleanup.deleted.len(), 4);
    assert_eq!(report.cleanup.kept, 1);
    assert!(report.cleanup.failed.is_empty());

    assert_eq!(
        archiver.calls(),
        vec![
            ArchiverCall::Test(archive.clone()),
            ArchiverCall::Extract(archive, root.to_path_buf(), true),
        ]
    );
}

#[tokio::test]
async fn archive_without_manifest_passes_verification() {
    let dir = TempDir::new().unwrap();
    write_file(&dir.path().join("single.zip"), b"zip bytes");

    let archiver = Arc::new(ScriptedArchiver::new().with_payload("episode.mp4", 10));
    let (pipeline, _rx) = pipeline_with(archiver.clone(), Config::default());

    pipeline
        .process(&candidate(dir.path().join("single.zip")))
        .await
        .unwrap();

    assert!(dir.path().join("episode.mp4").exists());
    assert!(!dir.path().join("single.zip").exists());
    assert_eq!(archiver.calls().len(), 2);
}

#[tokio::test]
async fn warned_extraction_is_reported_and_still_cleaned() {
    let dir = TempDir::new().unwrap();
    write_file(&dir.path().join("old.rar"), b"rar");

    let archiver = Arc::new(
        ScriptedArchiver::new()
            .warn_extract_for("old.rar")
            .with_payload("old.mkv", 10),
    );
    let (pipeline, _rx) = pipeline_with(archiver, Config::default());

    let report = pipeline
        .process(&candidate(dir.path().join("old.rar")))
        .await
        .unwrap();

    assert!(report.extracted_with_warnings());
    assert_eq!(report.extraction.exit_code, Some(1));
    assert!(dir.path().join("old.mkv").exists());
    assert!(!dir.path().join("old.rar").exists());
}

// -----------------------------------------------------------------------------
// Stage failures short-circuit
// -----------------------------------------------------------------------------

#[tokio::test]
async fn checksum_mismatch_stops_before_the_archiver() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write_release(root, "movie.sfv", &[("movie.rar", b"original bytes")]);
    // corrupt after the manifest was written
    write_file(&root.join("movie.rar"), b"damaged bytes");

    let archiver = Arc::new(ScriptedArchiver::new().with_payload("movie.mkv", 10));
    let (pipeline, _rx) = pipeline_with(archiver.clone(), Config::default());

    let err = pipeline
        .process(&candidate(root.join("movie.rar")))
        .await
        .unwrap_err();

    match err {
        Error::Pipeline(PipelineError::ChecksumMismatch { mismatches, .. }) => {
            assert_eq!(mismatches, vec!["movie.rar".to_string()]);
        }
        other => panic!("expected checksum mismatch, got {other:?}"),
    }
    assert!(archiver.calls().is_empty());
    assert!(root.join("movie.rar").exists());
    assert!(root.join("movie.sfv").exists());
}

#[tokio::test]
async fn missing_volume_listed_in_manifest_fails_verification() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write_release(
        root,
        "movie.sfv",
        &[("movie.part1.rar", b"one"), ("movie.part2.rar", b"two")],
    );
    std::fs::remove_file(root.join("movie.part2.rar")).unwrap();

    let archiver = Arc::new(ScriptedArchiver::new());
    let (pipeline, _rx) = pipeline_with(archiver.clone(), Config::default());

    let err = pipeline
        .process(&candidate(root.join("movie.part1.rar")))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::Pipeline(PipelineError::ChecksumMismatch { .. })
    ));
    assert!(archiver.calls().is_empty());
}

#[tokio::test]
async fn failed_integrity_test_skips_extraction() {
    let dir = TempDir::new().unwrap();
    write_file(&dir.path().join("broken.rar"), b"rar");
    write_file(&dir.path().join("readme.txt"), b"hello");

    let archiver = Arc::new(ScriptedArchiver::new().fail_test_for("broken.rar"));
    let (pipeline, _rx) = pipeline_with(archiver.clone(), Config::default());

    let archive = dir.path().join("broken.rar");
    let err = pipeline.process(&candidate(archive.clone())).await.unwrap_err();

    match err {
        Error::Pipeline(e @ PipelineError::IntegrityFailed { .. }) => {
            assert_eq!(e.stage(), Stage::Test);
            assert_eq!(e.archive(), archive.as_path());
        }
        other => panic!("expected integrity failure, got {other:?}"),
    }
    assert_eq!(archiver.calls(), vec![ArchiverCall::Test(archive)]);
    assert!(dir.path().join("readme.txt").exists());
}

#[tokio::test]
async fn archiver_launch_failure_fails_the_test_stage() {
    let dir = TempDir::new().unwrap();
    write_file(&dir.path().join("movie.rar"), b"rar");

    let archiver = Arc::new(ScriptedArchiver::new().unavailable());
    let (pipeline, _rx) = pipeline_with(archiver.clone(), Config::default());

    let err = pipeline
        .process(&candidate(dir.path().join("movie.rar")))
        .await
        .unwrap_err();

    match err {
        Error::Pipeline(PipelineError::IntegrityFailed { reason, .. }) => {
            assert!(reason.contains("unavailable"), "reason: {reason}");
        }
        other => panic!("expected integrity failure, got {other:?}"),
    }
    assert!(dir.path().join("movie.rar").exists());
}

#[tokio::test]
async fn fatal_extraction_leaves_directory_untouched() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write_release(
        root,
        "movie.sfv",
        &[("movie.part01.rar", b"one"), ("movie.part02.rar", b"two")],
    );
    write_file(&root.join("movie.nfo"), b"release notes");

    let archiver = Arc::new(ScriptedArchiver::new().fail_extract_for("movie.part01.rar"));
    let (pipeline, mut rx) = pipeline_with(archiver.clone(), Config::default());

    let err = pipeline
        .process(&candidate(root.join("movie.part01.rar")))
        .await
        .unwrap_err();

    match err {
        Error::Pipeline(e @ PipelineError::ExtractionFailed { .. }) => {
            assert_eq!(e.stage(), Stage::Extract);
            assert!(e.to_string().contains("exit code 2"), "error: {e}");
        }
        other => panic!("expected extraction failure, got {other:?}"),
    }

    for name in ["movie.part01.rar", "movie.part02.rar", "movie.sfv", "movie.nfo"] {
        assert!(root.join(name).exists(), "{name} must survive");
    }
    assert!(
        !drain(&mut rx)
            .iter()
            .any(|e| matches!(e, Event::Cleaning { .. }))
    );
}

// -----------------------------------------------------------------------------
// Events
// -----------------------------------------------------------------------------

#[tokio::test]
async fn stages_emit_events_in_order() {
    let dir = TempDir::new().unwrap();
    write_release(dir.path(), "show.sfv", &[("show.rar", b"data")]);

    let archiver = Arc::new(ScriptedArchiver::new());
    let (pipeline, mut rx) = pipeline_with(archiver, Config::default());

    pipeline
        .process(&candidate(dir.path().join("show.rar")))
        .await
        .unwrap();

    let kinds: Vec<&'static str> = drain(&mut rx)
        .iter()
        .map(|event| match event {
            Event::Verifying { .. } => "verifying",
            Event::VerifyComplete { .. } => "verify_complete",
            Event::Testing { .. } => "testing",
            Event::Extracting { .. } => "extracting",
            Event::Cleaning { .. } => "cleaning",
            Event::CleanupComplete { .. } => "cleanup_complete",
            _ => "other",
        })
        .collect();

    assert_eq!(
        kinds,
        vec![
            "verifying",
            "verify_complete",
            "testing",
            "extracting",
            "cleaning",
            "cleanup_complete",
        ]
    );
}

#[tokio::test]
async fn verify_complete_reports_record_count() {
    let dir = TempDir::new().unwrap();
    write_release(
        dir.path(),
        "show.sfv",
        &[("show.part1.rar", b"a"), ("show.part2.rar", b"b")],
    );

    let (pipeline, mut rx) = pipeline_with(Arc::new(ScriptedArchiver::new()), Config::default());
    pipeline
        .process(&candidate(dir.path().join("show.part1.rar")))
        .await
        .unwrap();

    let records = drain(&mut rx).into_iter().find_map(|event| match event {
        Event::VerifyComplete { passed, records, .. } => Some((passed, records)),
        _ => None,
    });
    assert_eq!(records, Some((true, 2)));
}

// -----------------------------------------------------------------------------
// Retention decisions
// -----------------------------------------------------------------------------

#[test]
fn decide_keeps_whitelisted_regardless_of_size() {
    let policy = retention(100);
    let root = Path::new("/dl/movie");
    assert_eq!(
        decide(&root.join("sample.MKV"), 1, root, &policy),
        RetentionDecision::Keep(KeepReason::Whitelisted)
    );
    assert_eq!(
        decide(&root.join("VIDEO_TS/VTS_01_1.VOB"), 0, root, &policy),
        RetentionDecision::Keep(KeepReason::Whitelisted)
    );
}

#[test]
fn decide_keeps_large_files_with_unknown_extension() {
    let policy = retention(100);
    let root = Path::new("/dl/movie");
    assert_eq!(
        decide(&root.join("movie.m2ts"), 101, root, &policy),
        RetentionDecision::Keep(KeepReason::Large)
    );
    // the threshold itself is not "larger than"
    assert!(decide(&root.join("movie.m2ts"), 100, root, &policy).is_delete());
}

#[test]
fn decide_never_deletes_the_root() {
    let policy = retention(100);
    let root = Path::new("/dl/movie");
    assert_eq!(
        decide(root, 0, root, &policy),
        RetentionDecision::Keep(KeepReason::Root)
    );
}

#[test]
fn decide_deletes_small_unlisted_files() {
    let policy = retention(100);
    let root = Path::new("/dl/movie");
    for name in ["movie.rar", "movie.r00", "movie.sfv", "movie.nfo", "README"] {
        assert!(
            decide(&root.join(name), 10, root, &policy).is_delete(),
            "{name} should be deleted"
        );
    }
}

#[test]
fn decide_in_dry_run_keeps_everything() {
    let policy = RetentionConfig {
        dry_run: true,
        ..retention(100)
    };
    let root = Path::new("/dl/movie");
    assert_eq!(
        decide(&root.join("movie.nfo"), 10, root, &policy),
        RetentionDecision::Keep(KeepReason::DryRun)
    );
}

#[test]
fn extra_remove_extensions_do_not_change_decisions() {
    let policy = RetentionConfig {
        extra_remove_extensions: vec!["mkv".into()],
        ..retention(100)
    };
    let root = Path::new("/dl/movie");
    assert_eq!(
        decide(&root.join("movie.mkv"), 10, root, &policy),
        RetentionDecision::Keep(KeepReason::Whitelisted)
    );
}

// -----------------------------------------------------------------------------
// Directory cleanup
// -----------------------------------------------------------------------------

#[test]
fn clean_directory_recurses_but_keeps_directories() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write_file(&root.join("Sample/sample.mkv"), b"tiny sample");
    write_file(&root.join("Sample/sample.txt"), b"notes");
    write_file(&root.join("Subs/english.srt"), b"subtitles");
    write_file(&root.join("movie.r00"), b"volume");

    let report = clean_directory(root, &retention(100));

    assert!(root.join("Sample/sample.mkv").exists());
    assert!(!root.join("Sample/sample.txt").exists());
    assert!(!root.join("Subs/english.srt").exists());
    assert!(!root.join("movie.r00").exists());
    assert!(root.join("Sample").is_dir());
    assert!(root.join("Subs").is_dir());
    assert_eq!(report.deleted.len(), 3);
    assert_eq!(report.kept, 1);
}

#[test]
fn clean_directory_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write_file(&root.join("movie.mkv"), b"payload");
    write_file(&root.join("movie.nfo"), b"notes");

    let first = clean_directory(root, &retention(100));
    let second = clean_directory(root, &retention(100));

    assert_eq!(first.deleted, vec![root.join("movie.nfo")]);
    assert!(second.deleted.is_empty());
    assert_eq!(second.kept, 1);
}

#[test]
fn clean_directory_dry_run_deletes_nothing() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write_file(&root.join("movie.rar"), b"volume");
    write_file(&root.join("movie.nfo"), b"notes");

    let policy = RetentionConfig {
        dry_run: true,
        ..retention(100)
    };
    let report = clean_directory(root, &policy);

    assert!(report.deleted.is_empty());
    assert_eq!(report.spared.len(), 2);
    assert!(root.join("movie.rar").exists());
    assert!(root.join("movie.nfo").exists());
}

#[test]
fn clean_directory_keeps_large_unknown_files() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    let big = std::fs::File::create(root.join("feature.m2ts")).unwrap();
    big.set_len(300 * MB).unwrap();
    write_file(&root.join("feature.txt"), b"small");

    let report = clean_directory(root, &RetentionConfig::default());

    assert!(root.join("feature.m2ts").exists());
    assert!(!root.join("feature.txt").exists());
    assert_eq!(report.kept, 1);
}

#[tokio::test]
async fn dry_run_pipeline_extracts_but_deletes_nothing() {
    let dir = TempDir::new().unwrap();
    write_file(&dir.path().join("movie.rar"), b"rar");

    let mut config = Config::default();
    config.retention.dry_run = true;
    let archiver = Arc::new(ScriptedArchiver::new().with_payload("movie.nfo", 10));
    let (pipeline, _rx) = pipeline_with(archiver, config);

    let report = pipeline
        .process(&candidate(dir.path().join("movie.rar")))
        .await
        .unwrap();

    assert!(report.cleanup.deleted.is_empty());
    assert_eq!(report.cleanup.spared.len(), 2);
    assert!(dir.path().join("movie.rar").exists());
    assert!(dir.path().join("movie.nfo").exists());
}
