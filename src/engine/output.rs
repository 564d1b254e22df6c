use crate::error::{CaptureError, Result};
use chrono::{Local, NaiveDateTime};
use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const MAX_NAME_ATTEMPTS: u32 = 100;

/// Names of the files one recording writes.
///
/// Reserving a plan creates a hidden marker file with `create_new`, so two
/// recordings started in the same second into the same directory never pick
/// the same names. In segmented mode ffmpeg writes the list of finished
/// files into that marker.
#[derive(Debug, Clone)]
pub struct OutputPlan {
    dir: PathBuf,
    stem: String,
    extension: String,
    segmented: bool,
    marker: PathBuf,
}

impl OutputPlan {
    pub fn reserve(dir: &Path, extension: &str, segmented: bool) -> Result<Self> {
        Self::reserve_at(dir, extension, segmented, Local::now().naive_local())
    }

    pub fn reserve_at(
        dir: &Path,
        extension: &str,
        segmented: bool,
        timestamp: NaiveDateTime,
    ) -> Result<Self> {
        fs::create_dir_all(dir)?;
        let dir = if dir.is_absolute() {
            dir.to_path_buf()
        } else {
            std::env::current_dir()?.join(dir)
        };

        let base = format!(
            "ScreenRecording {}",
            timestamp.format("%Y-%m-%d at %H.%M.%S")
        );

        for attempt in 1..=MAX_NAME_ATTEMPTS {
            let stem = if attempt == 1 {
                base.clone()
            } else {
                format!("{} ({})", base, attempt)
            };

            let plan = Self {
                marker: dir.join(format!(".{}.segments", stem)),
                dir: dir.clone(),
                stem,
                extension: extension.to_string(),
                segmented,
            };

            if plan.single_file().exists() || plan.segment_file(1).exists() {
                continue;
            }

            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&plan.marker)
            {
                Ok(_) => {
                    log::debug!("Reserved output name '{}' in {}", plan.stem, plan.dir.display());
                    return Ok(plan);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => {
                    return Err(CaptureError::IoError(std::io::Error::new(
                        e.kind(),
                        format!("Cannot write to output directory {}: {}", plan.dir.display(), e),
                    )))
                }
            }
        }

        Err(CaptureError::IoError(std::io::Error::new(
            ErrorKind::AlreadyExists,
            format!("No free output name for '{}' in {}", base, dir.display()),
        )))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn stem(&self) -> &str {
        &self.stem
    }

    pub fn is_segmented(&self) -> bool {
        self.segmented
    }

    /// List file the segment muxer keeps up to date.
    pub fn segment_list(&self) -> &Path {
        &self.marker
    }

    pub fn single_file(&self) -> PathBuf {
        self.dir.join(format!("{}.{}", self.stem, self.extension))
    }

    pub fn segment_file(&self, number: u32) -> PathBuf {
        self.dir
            .join(format!("{}-{:03}.{}", self.stem, number, self.extension))
    }

    /// Output pattern for the segment muxer, numbering from 1.
    pub fn segment_pattern(&self) -> String {
        // A literal '%' in the path would be read as a pattern directive
        let prefix = self
            .dir
            .join(format!("{}-", self.stem))
            .to_string_lossy()
            .replace('%', "%%");
        format!("{}%03d.{}", prefix, self.extension)
    }

    /// Files present on disk for this plan, in the order they were written.
    pub fn produced_files(&self) -> Result<Vec<PathBuf>> {
        if !self.segmented {
            let file = self.single_file();
            return Ok(if file.is_file() { vec![file] } else { Vec::new() });
        }

        let listing = match fs::read_to_string(&self.marker) {
            Ok(listing) => listing,
            Err(e) if e.kind() == ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e.into()),
        };

        let mut files: Vec<PathBuf> = Vec::new();
        for line in listing.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let path = self.dir.join(line);
            if path.is_file() && !files.contains(&path) {
                files.push(path);
            }
        }

        // The list only gains an entry once a segment is closed; pick up a
        // last segment that was written but never listed
        let mut number = 1;
        loop {
            let path = self.segment_file(number);
            if !path.is_file() {
                break;
            }
            if !files.contains(&path) {
                files.push(path);
            }
            number += 1;
        }

        Ok(files)
    }

    /// Drop the reservation marker.
    pub fn release(&self) {
        if let Err(e) = fs::remove_file(&self.marker) {
            if e.kind() != ErrorKind::NotFound {
                log::warn!("Failed to remove {}: {}", self.marker.display(), e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn timestamp() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(14, 5, 7)
            .unwrap()
    }

    #[test]
    fn test_file_naming() {
        let dir = TempDir::new().unwrap();
        let plan = OutputPlan::reserve_at(dir.path(), "avi", true, timestamp()).unwrap();
        assert_eq!(plan.stem(), "ScreenRecording 2024-03-09 at 14.05.07");
        assert_eq!(
            plan.single_file().file_name().unwrap(),
            "ScreenRecording 2024-03-09 at 14.05.07.avi"
        );
        assert_eq!(
            plan.segment_file(2).file_name().unwrap(),
            "ScreenRecording 2024-03-09 at 14.05.07-002.avi"
        );
        assert!(plan.segment_pattern().ends_with("14.05.07-%03d.avi"));
        assert!(plan.segment_list().exists());
        assert!(plan.dir().is_absolute());
    }

    #[test]
    fn test_same_second_gets_distinct_names() {
        let dir = TempDir::new().unwrap();
        let first = OutputPlan::reserve_at(dir.path(), "avi", true, timestamp()).unwrap();
        let second = OutputPlan::reserve_at(dir.path(), "avi", true, timestamp()).unwrap();
        assert_ne!(first.stem(), second.stem());
        assert_eq!(second.stem(), "ScreenRecording 2024-03-09 at 14.05.07 (2)");
    }

    #[test]
    fn test_existing_recording_is_not_reused() {
        let dir = TempDir::new().unwrap();
        let first = OutputPlan::reserve_at(dir.path(), "avi", false, timestamp()).unwrap();
        fs::write(first.single_file(), b"RIFF").unwrap();
        first.release();

        let second = OutputPlan::reserve_at(dir.path(), "avi", false, timestamp()).unwrap();
        assert_ne!(second.single_file(), first.single_file());
    }

    #[test]
    fn test_produced_files_follow_segment_list() {
        let dir = TempDir::new().unwrap();
        let plan = OutputPlan::reserve_at(dir.path(), "avi", true, timestamp()).unwrap();
        for n in 1..=3 {
            fs::write(plan.segment_file(n), b"RIFF").unwrap();
        }
        // Third segment still open, not yet listed
        let listing = format!(
            "{}\n{}\n",
            plan.segment_file(1).file_name().unwrap().to_string_lossy(),
            plan.segment_file(2).file_name().unwrap().to_string_lossy()
        );
        fs::write(plan.segment_list(), listing).unwrap();

        let files = plan.produced_files().unwrap();
        assert_eq!(
            files,
            vec![plan.segment_file(1), plan.segment_file(2), plan.segment_file(3)]
        );
    }

    #[test]
    fn test_release_removes_marker() {
        let dir = TempDir::new().unwrap();
        let plan = OutputPlan::reserve_at(dir.path(), "avi", false, timestamp()).unwrap();
        assert!(plan.produced_files().unwrap().is_empty());
        plan.release();
        assert!(!plan.segment_list().exists());
        // Releasing twice is harmless
        plan.release();
    }

    #[test]
    fn test_output_dir_is_a_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("not-a-dir");
        fs::write(&file, b"x").unwrap();
        let result = OutputPlan::reserve_at(&file, "avi", false, timestamp());
        assert!(matches!(result, Err(CaptureError::IoError(_))));
    }
}
