//! Integration tests for bpmtag
//!
//! These tests run real tagging and import jobs over generated audio and a
//! generated Mixxx database. Most tests keep tags in memory; the "Tags in
//! real files" tests and `test_import_into_real_files` write them with lofty.

use bpmtag::analysis::{SpectralFluxFactory, TempoEstimator};
use bpmtag::audio::{ScratchSpace, SymphoniaTranscoder};
use bpmtag::config::TagSettings;
use bpmtag::discovery::{self, ScanOptions};
use bpmtag::export::{read_report, write_report, RunReport};
use bpmtag::import::{ImportJob, LocationResolver, MixxxLibrary};
use bpmtag::pipeline::{
    plan_dry_run, spawn_import_job, spawn_tag_job, BatchJob, CancellationToken, ProgressEvent,
};
use bpmtag::tags::{LoftyTagStore, TagStore};
use bpmtag::{BpmTagError, FailureKind, Result, TagSet};
use rusqlite::{params, Connection};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Generate a click track WAV file for BPM testing
///
/// Creates impulses (short bursts) at regular intervals matching the specified BPM.
fn generate_click_track(path: &Path, bpm: f32, duration_secs: f32, sample_rate: u32) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec).expect("Failed to create WAV file");

    let num_samples = (duration_secs * sample_rate as f32) as usize;
    let samples_per_beat = (60.0 / bpm * sample_rate as f32) as usize;

    // Impulse duration: ~5ms (short click)
    let impulse_samples = (0.005 * sample_rate as f32) as usize;

    for i in 0..num_samples {
        let position_in_beat = i % samples_per_beat;

        let sample = if position_in_beat < impulse_samples {
            // Exponential decay for a more natural click sound
            let decay = (-5.0 * position_in_beat as f32 / impulse_samples as f32).exp();
            0.8 * decay
        } else {
            0.0
        };

        writer
            .write_sample((sample * 32767.0) as i16)
            .expect("Failed to write sample");
    }

    writer.finalize().expect("Failed to finalize WAV");
}

/// Tag store keeping tags in memory, keyed by path
///
/// Optionally cancels a token once a number of writes have happened.
#[derive(Default)]
struct MemoryTagStore {
    files: Mutex<HashMap<PathBuf, TagSet>>,
    writes: Mutex<Vec<PathBuf>>,
    cancel_after: Option<(usize, CancellationToken)>,
}

impl MemoryTagStore {
    fn cancelling_after(writes: usize, token: CancellationToken) -> Self {
        Self {
            cancel_after: Some((writes, token)),
            ..Self::default()
        }
    }

    fn seed(&self, path: &Path, key: &str, value: &str) {
        self.files
            .lock()
            .unwrap()
            .entry(path.to_path_buf())
            .or_default()
            .push_value(key, value);
    }

    fn tags(&self, path: &Path) -> TagSet {
        self.files
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .unwrap_or_default()
    }

    fn write_count(&self) -> usize {
        self.writes.lock().unwrap().len()
    }
}

impl TagStore for MemoryTagStore {
    fn read(&self, path: &Path) -> Result<TagSet> {
        Ok(self.tags(path))
    }

    fn apply(&self, path: &Path, changes: &TagSet) -> Result<()> {
        let mut files = self.files.lock().unwrap();
        let tags = files.entry(path.to_path_buf()).or_default();
        for (key, values) in changes.iter() {
            tags.set(key, &values.join(", ").into());
        }

        let mut writes = self.writes.lock().unwrap();
        writes.push(path.to_path_buf());
        if let Some((limit, token)) = &self.cancel_after {
            if writes.len() >= *limit {
                token.cancel();
            }
        }
        Ok(())
    }
}

fn wav_options() -> ScanOptions {
    ScanOptions {
        extensions: vec!["wav".to_string()],
        skip_patterns: vec!["Thumbs".to_string(), "desktop".to_string()],
    }
}

/// Tagging job with the built-in decoder and tracker, writing to `store`
fn create_test_job(store: Arc<dyn TagStore>, cancel: CancellationToken) -> BatchJob {
    let estimator = TempoEstimator::new(
        Arc::new(SymphoniaTranscoder),
        Arc::new(SpectralFluxFactory::default()),
    );
    BatchJob::new(
        estimator,
        store,
        ScratchSpace::new(None).expect("Failed to create scratch space"),
        wav_options(),
        cancel,
    )
}

/// Check if detected BPM matches target, allowing for octave errors (half/double time)
fn is_bpm_match(detected: f64, target: f64, tolerance: f64) -> bool {
    (detected - target).abs() <= tolerance
        || (detected * 2.0 - target).abs() <= tolerance
        || (detected / 2.0 - target).abs() <= tolerance
}

// =============================================================================
// Tagging
// =============================================================================

#[test]
fn test_click_track_tagged_near_120() {
    let input_dir = TempDir::new().expect("Failed to create input temp dir");
    let track = input_dir.path().join("click_120bpm.wav");
    generate_click_track(&track, 120.0, 10.0, 44100);

    let store = Arc::new(MemoryTagStore::default());
    store.seed(&track, "TITLE", "Click");

    let job = create_test_job(store.clone(), CancellationToken::new());
    let summary = job
        .process_directory(input_dir.path())
        .expect("Run should succeed");

    assert_eq!(summary.total, 1);
    assert_eq!(summary.succeeded, 1, "failures: {:?}", summary.failed);
    let bpm = summary.tagged[0].bpm;
    assert!(
        (110.0..=130.0).contains(&bpm.value()),
        "120 BPM click track: detected {} BPM",
        bpm
    );

    let tags = store.tags(&summary.tagged[0].path);
    assert_eq!(tags.first("bpm"), Some(bpm.to_tag_value().as_str()));
    assert_eq!(tags.first("title"), Some("Click"), "existing tags must survive");
}

#[test]
fn test_various_tempos() {
    for &target_bpm in &[90.0_f32, 128.0] {
        let input_dir = TempDir::new().expect("Failed to create input temp dir");
        let track = input_dir
            .path()
            .join(format!("click_{}bpm.wav", target_bpm as i32));
        generate_click_track(&track, target_bpm, 15.0, 44100);

        let store = Arc::new(MemoryTagStore::default());
        let summary = create_test_job(store, CancellationToken::new())
            .process_directory(input_dir.path())
            .expect("Run should succeed");

        let detected = summary.tagged[0].bpm.value();
        assert!(
            is_bpm_match(detected, target_bpm as f64, 7.0),
            "{} BPM click track: detected {} BPM",
            target_bpm,
            detected
        );
    }
}

#[test]
fn test_retagging_is_stable() {
    let input_dir = TempDir::new().expect("Failed to create input temp dir");
    let track = input_dir.path().join("consistent.wav");
    generate_click_track(&track, 128.0, 8.0, 44100);

    let store = Arc::new(MemoryTagStore::default());
    let job = create_test_job(store.clone(), CancellationToken::new());
    let first = job.process_directory(input_dir.path()).unwrap();
    let second = job.process_directory(input_dir.path()).unwrap();

    assert_eq!(first.tagged[0].bpm, second.tagged[0].bpm);
    // Same value on the second run, so nothing is rewritten
    assert_eq!(store.write_count(), 1);
}

#[test]
fn test_broken_file_does_not_stop_batch() {
    let input_dir = TempDir::new().expect("Failed to create input temp dir");
    generate_click_track(&input_dir.path().join("a.wav"), 120.0, 6.0, 44100);
    fs::write(input_dir.path().join("b.wav"), b"this is not audio").unwrap();
    generate_click_track(&input_dir.path().join("c.wav"), 100.0, 6.0, 44100);

    let store = Arc::new(MemoryTagStore::default());
    let summary = create_test_job(store.clone(), CancellationToken::new())
        .process_directory(input_dir.path())
        .expect("Run should succeed");

    assert_eq!(summary.total, 3);
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failed.len(), 1);
    assert!(summary.failed[0].path.ends_with("b.wav"));
    assert_eq!(summary.failed[0].kind, FailureKind::Decode);
    assert_eq!(store.write_count(), 2);
    assert!(!summary.is_clean());
}

#[test]
fn test_silence_reports_no_beats() {
    let input_dir = TempDir::new().expect("Failed to create input temp dir");
    let track = input_dir.path().join("silence.wav");
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: 44100,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&track, spec).unwrap();
    for _ in 0..44100 * 2 * 3 {
        writer.write_sample(0i16).unwrap();
    }
    writer.finalize().unwrap();

    let store = Arc::new(MemoryTagStore::default());
    let summary = create_test_job(store.clone(), CancellationToken::new())
        .process_directory(input_dir.path())
        .unwrap();

    assert_eq!(summary.failed[0].kind, FailureKind::NoBeats);
    assert_eq!(store.write_count(), 0);
}

#[test]
fn test_cancel_after_first_of_three() {
    let input_dir = TempDir::new().expect("Failed to create input temp dir");
    for name in ["a.wav", "b.wav", "c.wav"] {
        generate_click_track(&input_dir.path().join(name), 120.0, 5.0, 44100);
    }

    let cancel = CancellationToken::new();
    let store = Arc::new(MemoryTagStore::cancelling_after(1, cancel.clone()));
    let summary = create_test_job(store.clone(), cancel)
        .process_directory(input_dir.path())
        .expect("Run should succeed");

    assert!(summary.cancelled);
    assert_eq!(summary.processed, 1);
    assert_eq!(summary.remaining(), 2);
    // The first file's tag is kept
    assert_eq!(store.write_count(), 1);
    assert!(store.tags(&summary.tagged[0].path).contains_key("BPM"));
}

#[test]
fn test_denylisted_file_not_enumerated() {
    let input_dir = TempDir::new().expect("Failed to create input temp dir");
    fs::write(input_dir.path().join("track.wav"), b"x").unwrap();
    fs::write(input_dir.path().join("Thumbs.wav"), b"x").unwrap();
    fs::write(input_dir.path().join("cover.jpg"), b"x").unwrap();

    let files = discovery::scan(input_dir.path(), &wav_options()).unwrap();
    assert_eq!(files.len(), 1);
    assert!(files[0].ends_with("track.wav"));
}

#[test]
fn test_empty_directory() {
    let input_dir = TempDir::new().expect("Failed to create input temp dir");
    let store = Arc::new(MemoryTagStore::default());
    let summary = create_test_job(store, CancellationToken::new())
        .process_directory(input_dir.path())
        .unwrap();
    assert_eq!(summary.total, 0);
    assert!(summary.is_clean());
}

#[test]
fn test_nonexistent_input_is_invalid() {
    let store = Arc::new(MemoryTagStore::default());
    let result = create_test_job(store, CancellationToken::new())
        .process_directory(Path::new("/nonexistent/path/to/music"));
    assert!(matches!(result, Err(BpmTagError::InvalidInput(_))));
}

#[test]
fn test_missing_ffmpeg_is_fatal_before_start() {
    let input_dir = TempDir::new().expect("Failed to create input temp dir");
    let settings = TagSettings {
        input: input_dir.path().to_path_buf(),
        ffmpeg: Some(PathBuf::from("/nonexistent/bin/ffmpeg")),
        show_progress: false,
        ..TagSettings::default()
    };
    let result = BatchJob::from_settings(&settings, CancellationToken::new());
    assert!(matches!(result, Err(BpmTagError::MissingDependency { .. })));
}

#[test]
fn test_dry_run_touches_nothing() {
    let input_dir = TempDir::new().expect("Failed to create input temp dir");
    fs::create_dir(input_dir.path().join("house")).unwrap();
    fs::write(input_dir.path().join("house").join("one.mp3"), b"x").unwrap();
    fs::write(input_dir.path().join("two.mp3"), b"x").unwrap();

    let settings = TagSettings {
        input: input_dir.path().to_path_buf(),
        dry_run: true,
        ..TagSettings::default()
    };
    let plan = plan_dry_run(&settings).unwrap();
    assert_eq!(plan.total, 2);
    assert_eq!(fs::read(input_dir.path().join("two.mp3")).unwrap(), b"x");
}

#[test]
fn test_background_job_progress_events() {
    let input_dir = TempDir::new().expect("Failed to create input temp dir");
    for name in ["a.wav", "b.wav"] {
        generate_click_track(&input_dir.path().join(name), 120.0, 4.0, 44100);
    }

    let store = Arc::new(MemoryTagStore::default());
    let job = create_test_job(store, CancellationToken::new());
    let handle = spawn_tag_job(job, input_dir.path().to_path_buf()).unwrap();

    let events: Vec<ProgressEvent> = handle.events().iter().collect();
    let summary = handle.join().unwrap();

    assert_eq!(events.first(), Some(&ProgressEvent::Started { total: 2 }));
    assert_eq!(
        events.last(),
        Some(&ProgressEvent::Finished { cancelled: false })
    );
    let indices: Vec<usize> = events
        .iter()
        .filter_map(|e| match e {
            ProgressEvent::FileDone { index, .. } => Some(*index),
            _ => None,
        })
        .collect();
    assert_eq!(indices, vec![1, 2]);
    assert_eq!(summary.processed, 2);
}

#[test]
fn test_batch_report_written() {
    let input_dir = TempDir::new().expect("Failed to create input temp dir");
    let output_dir = TempDir::new().expect("Failed to create output temp dir");
    generate_click_track(&input_dir.path().join("a.wav"), 120.0, 5.0, 44100);
    fs::write(input_dir.path().join("b.wav"), b"junk").unwrap();

    let store = Arc::new(MemoryTagStore::default());
    let summary = create_test_job(store, CancellationToken::new())
        .process_directory(input_dir.path())
        .unwrap();

    let report_path = output_dir.path().join("report.json");
    write_report(&RunReport::from_batch(&summary), &report_path).unwrap();

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&report_path).unwrap()).unwrap();
    assert_eq!(json["metadata"]["tool"], "tag");
    assert_eq!(json["summary"]["total"], 2);
    assert_eq!(json["tagged"].as_array().unwrap().len(), 1);
    assert_eq!(json["failed"][0]["kind"], "decode");
    assert_eq!(read_report(&report_path).unwrap().summary.failed, 1);
}

// =============================================================================
// Tags in real files
// =============================================================================

#[test]
fn test_click_track_bpm_written_to_file() {
    let input_dir = TempDir::new().expect("Failed to create input temp dir");
    let track = input_dir.path().join("click_120bpm.wav");
    generate_click_track(&track, 120.0, 10.0, 44100);

    let summary = create_test_job(Arc::new(LoftyTagStore::new()), CancellationToken::new())
        .process_directory(input_dir.path())
        .expect("Run should succeed");
    assert_eq!(summary.succeeded, 1, "failures: {:?}", summary.failed);

    let tags = LoftyTagStore::new()
        .read(&summary.tagged[0].path)
        .expect("Tags should be readable");
    let written: f64 = tags
        .first("bpm")
        .expect("BPM tag missing")
        .parse()
        .expect("BPM tag should be numeric");
    assert!(
        (written - summary.tagged[0].bpm.value()).abs() < 1.0,
        "tag holds {} but {} was estimated",
        written,
        summary.tagged[0].bpm
    );
}

// =============================================================================
// Mixxx import
// =============================================================================

/// Build a minimal Mixxx library with one row per `(file, bpm, key)`
fn create_mixxx_db(path: &Path, tracks: &[(&Path, f64, &str)]) {
    let conn = Connection::open(path).unwrap();
    conn.execute_batch(
        "CREATE TABLE track_locations (id INTEGER PRIMARY KEY, location TEXT UNIQUE, filename TEXT, directory TEXT);
         CREATE TABLE library (id INTEGER PRIMARY KEY, artist TEXT, album TEXT, genre TEXT, title TEXT,
                               year TEXT, location INTEGER REFERENCES track_locations(id), key TEXT, bpm REAL);",
    )
    .unwrap();

    for (i, (file, bpm, key)) in tracks.iter().enumerate() {
        let id = i as i64 + 1;
        let location = file.to_string_lossy().to_string();
        let filename = file.file_name().unwrap().to_string_lossy().to_string();
        let directory = file.parent().unwrap().to_string_lossy().to_string();
        conn.execute(
            "INSERT INTO track_locations (id, location, filename, directory) VALUES (?1, ?2, ?3, ?4)",
            params![id, location, filename, directory],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO library (id, artist, album, genre, title, year, location, key, bpm)
             VALUES (?1, 'Artist', 'Album', 'Techno', ?2, '2021', ?1, ?3, ?4)",
            params![id, format!("Track {}", id), key, bpm],
        )
        .unwrap();
    }
}

#[test]
fn test_import_copies_library_fields() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let music: Vec<PathBuf> = (1..=25)
        .map(|i| {
            let path = dir.path().join(format!("{:02}.mp3", i));
            fs::write(&path, b"x").unwrap();
            path
        })
        .collect();
    let missing = dir.path().join("moved-away.mp3");

    let mut rows: Vec<(&Path, f64, &str)> =
        music.iter().map(|p| (p.as_path(), 126.004, "8A")).collect();
    rows.push((missing.as_path(), 90.0, "1B"));

    let db = dir.path().join("mixxxdb.sqlite");
    create_mixxx_db(&db, &rows);

    let store = Arc::new(MemoryTagStore::default());
    store.seed(&music[0], "COMMENT", "keep me");
    let job = ImportJob::new(
        MixxxLibrary::open(&db).unwrap(),
        store.clone(),
        LocationResolver::new(false),
        20,
        CancellationToken::new(),
    );
    let handle = spawn_import_job(job).unwrap();
    let pages: Vec<(usize, usize)> = handle
        .events()
        .iter()
        .filter_map(|e| match e {
            ProgressEvent::PageDone { processed, total } => Some((processed, total)),
            _ => None,
        })
        .collect();
    let summary = handle.join().unwrap();

    assert_eq!(pages, vec![(20, 26), (26, 26)]);
    assert_eq!(summary.tagged.len(), 25);
    assert_eq!(summary.skipped, 1);
    assert!(summary.is_clean());

    let tags = store.tags(&music[0]);
    assert_eq!(tags.first("bpm"), Some("126.0"));
    assert_eq!(tags.first("key"), Some("8A"));
    assert_eq!(tags.first("artist"), Some("Artist"));
    assert_eq!(tags.first("albumartist"), Some("Artist"));
    assert_eq!(tags.first("album"), Some("Album"));
    assert_eq!(tags.first("genre"), Some("Techno"));
    assert_eq!(tags.first("year"), Some("2021"));
    assert_eq!(tags.first("title"), Some("Track 1"));
    assert_eq!(tags.first("comment"), Some("keep me"));
}

#[test]
fn test_import_report() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let track = dir.path().join("a.mp3");
    fs::write(&track, b"x").unwrap();
    let db = dir.path().join("mixxxdb.sqlite");
    create_mixxx_db(&db, &[(track.as_path(), 174.5, "10A")]);

    let job = ImportJob::new(
        MixxxLibrary::open(&db).unwrap(),
        Arc::new(MemoryTagStore::default()),
        LocationResolver::new(false),
        20,
        CancellationToken::new(),
    );
    let summary = job.run().unwrap();

    let report = RunReport::from_import(&summary);
    assert_eq!(report.metadata.tool, "import");
    assert_eq!(report.tagged[0].bpm, Some(174.5));
    assert_eq!(report.tagged[0].key.as_deref(), Some("10A"));
}

#[test]
fn test_import_rejects_non_library_database() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let db = dir.path().join("mixxxdb.sqlite");
    fs::write(&db, b"definitely not sqlite").unwrap();
    assert!(matches!(
        MixxxLibrary::open(&db),
        Err(BpmTagError::DatabaseError { .. })
    ));
}

#[test]
fn test_import_into_real_files() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let track = dir.path().join("a.wav");
    generate_click_track(&track, 120.0, 1.0, 44100);
    let db = dir.path().join("mixxxdb.sqlite");
    create_mixxx_db(&db, &[(track.as_path(), 126.004, "8A")]);

    let job = ImportJob::new(
        MixxxLibrary::open(&db).unwrap(),
        Arc::new(LoftyTagStore::new()),
        LocationResolver::new(false),
        20,
        CancellationToken::new(),
    );
    let summary = job.run().unwrap();
    assert!(summary.is_clean(), "failures: {:?}", summary.failed);
    assert_eq!(summary.tagged.len(), 1);

    let tags = LoftyTagStore::new().read(&track).unwrap();
    let bpm: f64 = tags.first("bpm").expect("BPM tag missing").parse().unwrap();
    assert!((bpm - 126.0).abs() < 1.0);
    assert_eq!(tags.first("key"), Some("8A"));
    assert_eq!(tags.first("artist"), Some("Artist"));
    assert_eq!(tags.first("albumartist"), Some("Artist"));
    assert_eq!(tags.first("title"), Some("Track 1"));
}
