/*!
 * Tests for fingerprint naming and the run lock
 */

use anyhow::Result;
use std::fs;
use std::path::Path;

use srtlingo::errors::TranslationError;
use srtlingo::ledger::{Fingerprint, OutputNameMatcher, RunLock, output_file_name};
use crate::common;

#[test]
fn test_outputFileName_shouldCombineStemTagsAndFingerprint() {
    let fp = Fingerprint::of_bytes(b"1\n00:00:01,000 --> 00:00:02,000\nHello\n");
    let name = output_file_name(Path::new("/subs/movie.srt"), "en", "es", &fp);

    assert_eq!(name, format!("movie_enes_{}.srt", fp.short()));
    assert_eq!(fp.short().len(), 8);
    assert_eq!(fp.to_hex().len(), 64);
}

#[test]
fn test_fingerprint_withOneByteChanged_shouldChangeOutputName() {
    let original = Fingerprint::of_bytes(b"Hello there");
    let edited = Fingerprint::of_bytes(b"Hello therE");

    assert_ne!(original, edited);
    assert_ne!(
        output_file_name(Path::new("a.srt"), "en", "es", &original),
        output_file_name(Path::new("a.srt"), "en", "es", &edited)
    );
}

#[test]
fn test_outputNameMatcher_shouldMatchOutputsOfEveryPair() {
    let fp = Fingerprint::of_bytes(b"x");
    let matcher = OutputNameMatcher::new("en", "es").unwrap();

    assert!(matcher.is_output(Path::new(&output_file_name(Path::new("ep1.srt"), "en", "es", &fp))));
    assert!(matcher.is_output(Path::new(&output_file_name(Path::new("ep1.srt"), "en", "fr", &fp))));
    assert!(matcher.is_output(Path::new(&output_file_name(Path::new("ep1.srt"), "auto", "ja", &fp))));
    assert!(!matcher.is_output(Path::new("ep1.srt")));
    assert!(!matcher.is_output(Path::new("ep1_enes_final.srt")));
}

#[test]
fn test_runLock_whenReleasedExplicitly_shouldRemoveFile() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let lock = RunLock::new(temp_dir.path().join("nested").join("run.lock"));

    let guard = lock.acquire()?;
    assert!(guard.path().exists());
    let record = fs::read_to_string(guard.path())?;
    assert!(record.starts_with(&format!("pid={} ", std::process::id())));

    guard.release()?;
    assert!(!lock.path().exists());
    Ok(())
}

#[test]
fn test_runLock_withGarbageOlderThanGrace_shouldReclaim() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("run.lock");
    fs::write(&path, "not a lock record")?;
    let old = std::time::SystemTime::now() - std::time::Duration::from_secs(3600);
    fs::File::options().write(true).open(&path)?.set_modified(old)?;

    let guard = RunLock::new(&path).acquire()?;
    assert!(fs::read_to_string(&path)?.contains(&guard.token().to_string()));
    Ok(())
}

#[test]
fn test_runLock_whenHeld_shouldNameLockPath() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let lock = RunLock::new(temp_dir.path().join("run.lock"));
    let _guard = lock.acquire()?;

    match lock.acquire() {
        Err(TranslationError::AlreadyRunning { lock_path, .. }) => assert_eq!(lock_path, lock.path()),
        other => panic!("expected AlreadyRunning, got {:?}", other),
    }
    Ok(())
}
