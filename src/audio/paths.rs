//! Path helpers for capture files.
//!
//! Recordings are stored in: ~/.local/share/murmur/recordings/
//! Files are named by a sortable timestamp, so lexical order equals
//! chronological order.

use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};

const DATA_DIR_NAME: &str = "murmur";
const RECORDINGS_DIR_NAME: &str = "recordings";

/// Timestamp format used for capture file names. Sorting the names
/// lexically sorts the recordings chronologically.
const FILE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Default recordings directory.
pub fn recordings_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DATA_DIR_NAME)
        .join(RECORDINGS_DIR_NAME)
}

/// Create the recordings directory if it doesn't exist.
pub fn create_recordings_dir(dir: &Path) -> std::io::Result<()> {
    fs::create_dir_all(dir)
}

/// Capture file path for a session starting at `started_at`.
pub fn capture_file_path(dir: &Path, started_at: DateTime<Utc>) -> PathBuf {
    let filename = format!("{}.wav", started_at.format(FILE_TIMESTAMP_FORMAT));
    dir.join(filename)
}

/// The lexically-last `*.wav` in `dir`, which under the timestamp naming
/// scheme is the most recent recording. Returns None when the directory is
/// missing or holds no capture files.
pub fn latest_capture_file(dir: &Path) -> Option<PathBuf> {
    let entries = fs::read_dir(dir).ok()?;
    entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().map(|ext| ext == "wav").unwrap_or(false))
        .max_by(|a, b| a.file_name().cmp(&b.file_name()))
}

/// Remove the recordings directory and everything in it. Missing directory
/// is not an error.
pub fn clear_recordings_dir(dir: &Path) -> std::io::Result<()> {
    match fs::remove_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Duration of a WAV file in milliseconds, if it can be read. Used for
/// logging only; a capture cut short mid-header simply yields None.
pub fn wav_duration_ms(path: &Path) -> Option<u64> {
    let reader = hound::WavReader::open(path).ok()?;
    let spec = reader.spec();
    if spec.sample_rate == 0 || spec.channels == 0 {
        return None;
    }
    let frames = reader.duration() as u64;
    Some(frames * 1000 / spec.sample_rate as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn capture_file_names_are_sortable_timestamps() {
        let dir = PathBuf::from("/tmp/recordings");
        let earlier = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        let later = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 6).unwrap();

        let a = capture_file_path(&dir, earlier);
        let b = capture_file_path(&dir, later);

        assert_eq!(a.file_name().unwrap(), "2026-01-02_03-04-05.wav");
        assert!(a.file_name() < b.file_name());
    }

    #[test]
    fn latest_capture_file_picks_lexically_last() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("2026-01-01_00-00-00.wav"), b"old").unwrap();
        std::fs::write(dir.path().join("2026-01-02_00-00-00.wav"), b"new").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"ignored").unwrap();

        let latest = latest_capture_file(dir.path()).unwrap();
        assert_eq!(latest.file_name().unwrap(), "2026-01-02_00-00-00.wav");
    }

    #[test]
    fn latest_capture_file_empty_dir_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(latest_capture_file(dir.path()).is_none());
    }

    #[test]
    fn latest_capture_file_missing_dir_is_none() {
        assert!(latest_capture_file(Path::new("/definitely/not/a/dir")).is_none());
    }

    #[test]
    fn clear_recordings_dir_removes_everything() {
        let parent = tempfile::tempdir().unwrap();
        let dir = parent.path().join("recordings");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("2026-01-01_00-00-00.wav"), b"x").unwrap();

        clear_recordings_dir(&dir).unwrap();
        assert!(!dir.exists());

        // Clearing again is a no-op.
        clear_recordings_dir(&dir).unwrap();
    }

    #[test]
    fn wav_duration_reads_generated_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.wav");

        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 44_100,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for _ in 0..44_100 {
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();

        assert_eq!(wav_duration_ms(&path), Some(1000));
    }

    #[test]
    fn wav_duration_of_garbage_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.wav");
        std::fs::write(&path, b"not a wav").unwrap();

        assert_eq!(wav_duration_ms(&path), None);
    }
}
