// Integration tests for capture sessions
// Tests that record a real picture need an ffmpeg on PATH (or SCREENREC_FFMPEG) and
// skip themselves otherwise. Engine failure handling runs against small stand-in
// scripts instead.

use screenrec::display_info::DisplayTarget;
use screenrec::engine::EngineOptions;
use screenrec::error::CaptureError;
use screenrec::format::{Rational, MIME_AVI};
use screenrec::{CaptureSession, FfmpegEngine, SessionState};
use std::fs;
use std::path::Path;
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

fn options_for(dir: &Path) -> EngineOptions {
    EngineOptions {
        output_dir: Some(dir.to_path_buf()),
        ..EngineOptions::default()
    }
}

/// Session recording a synthetic picture, or `None` when no usable ffmpeg exists.
fn test_pattern_session(options: EngineOptions) -> Option<CaptureSession<FfmpegEngine>> {
    let target = DisplayTarget::test_pattern(320, 240).unwrap();
    match CaptureSession::with_options(target, options) {
        Ok(session) => Some(session),
        Err(CaptureError::ConfigurationError(msg)) => {
            eprintln!("Skipping: ffmpeg unavailable ({})", msg);
            None
        }
        Err(e) => panic!("Unexpected error creating session: {}", e),
    }
}

fn assert_avi(path: &Path) {
    let bytes = fs::read(path).unwrap();
    assert!(bytes.len() > 12, "{} is too small", path.display());
    assert_eq!(&bytes[0..4], b"RIFF");
    assert_eq!(&bytes[8..12], b"AVI ");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_uses_screen_recording_format() {
        let dir = TempDir::new().unwrap();
        let Some(session) = test_pattern_session(options_for(dir.path())) else {
            return;
        };

        let config = session.configuration();
        assert_eq!(config.file_format().mime_type, MIME_AVI);
        assert_eq!(config.video_format().depth, 24);
        assert_eq!(config.video_format().frame_rate, Rational::from_integer(15));
        assert_eq!(config.video_format().quality, 1.0);
        assert_eq!(config.video_format().key_frame_interval, 900);
        assert_eq!(session.state(), SessionState::Created);
    }

    #[test]
    fn test_start_stop_produces_files() {
        let dir = TempDir::new().unwrap();
        let Some(mut session) = test_pattern_session(options_for(dir.path())) else {
            return;
        };

        session.start().unwrap();
        thread::sleep(Duration::from_millis(1500));
        let movies = session.stop().unwrap();

        assert!(!movies.is_empty());
        for movie in &movies {
            assert!(movie.path().is_absolute());
            assert!(movie.path().is_file());
            assert_eq!(movie.path().extension().unwrap(), "avi");
            assert_avi(movie.path());
        }

        // Only recordings are left behind
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| name.starts_with('.'))
            .collect();
        assert!(leftovers.is_empty(), "unexpected files: {:?}", leftovers);
    }

    #[test]
    fn test_single_file_without_splitting() {
        let dir = TempDir::new().unwrap();
        let options = EngineOptions {
            max_file_duration: None,
            ..options_for(dir.path())
        };
        let Some(mut session) = test_pattern_session(options) else {
            return;
        };

        session.start().unwrap();
        thread::sleep(Duration::from_millis(1000));
        let movies = session.stop().unwrap();

        assert_eq!(movies.len(), 1);
        let name = movies[0].path().file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("ScreenRecording "));
        assert!(name.ends_with(".avi"));
        assert_avi(movies[0].path());
    }

    #[test]
    fn test_long_recording_rolls_over() {
        let dir = TempDir::new().unwrap();
        let options = EngineOptions {
            max_file_duration: Some(Duration::from_secs(1)),
            ..options_for(dir.path())
        };
        let Some(mut session) = test_pattern_session(options) else {
            return;
        };

        session.start().unwrap();
        thread::sleep(Duration::from_millis(3500));
        let movies = session.stop().unwrap();

        assert!(movies.len() >= 2, "expected several files, got {:?}", movies);
        let names: Vec<String> = movies
            .iter()
            .map(|m| m.path().file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert!(names[0].ends_with("-001.avi"));
        assert!(names[1].ends_with("-002.avi"));
    }

    #[test]
    fn test_stop_twice_on_real_engine() {
        let dir = TempDir::new().unwrap();
        let Some(mut session) = test_pattern_session(options_for(dir.path())) else {
            return;
        };

        assert!(matches!(
            session.stop(),
            Err(CaptureError::InvalidState { .. })
        ));
        session.start().unwrap();
        thread::sleep(Duration::from_millis(700));
        session.stop().unwrap();
        assert!(matches!(
            session.stop(),
            Err(CaptureError::InvalidState { .. })
        ));
    }

    #[test]
    fn test_missing_ffmpeg_is_configuration_error() {
        let options = EngineOptions {
            ffmpeg_path: Some("/nonexistent/bin/ffmpeg".into()),
            ..EngineOptions::default()
        };
        let target = DisplayTarget::test_pattern(320, 240).unwrap();
        let result = CaptureSession::with_options(target, options);
        assert!(matches!(result, Err(CaptureError::ConfigurationError(_))));
    }
}

#[cfg(all(test, unix))]
mod stand_in_engine_tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use std::path::PathBuf;
    use std::sync::{Mutex, Once};

    const RECORD_UNTIL_QUIT: &str = "printf 'RIFF0000AVI ' > \"$out\"
read -r _ || true
exit 0";

    /// Write an executable that answers the version and encoder queries like
    /// ffmpeg and runs `recording` for a capture, with `$out` set to the
    /// output path.
    fn stand_in_ffmpeg(dir: &Path, name: &str, recording: &str) -> PathBuf {
        let script = format!(
            "#!/bin/sh
if [ \"$1\" = \"-version\" ]; then
    echo \"ffmpeg version 6.1-stand-in\"
    exit 0
fi
if [ \"$2\" = \"-encoders\" ]; then
    printf 'Encoders:\\n ------\\n V....D zmbv                 Zip Motion Blocks Video\\n'
    exit 0
fi
for out; do :; done
{}
",
            recording
        );
        let path = dir.join(name);
        fs::write(&path, script).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn stand_in_options(ffmpeg: PathBuf, output_dir: &Path) -> EngineOptions {
        EngineOptions {
            ffmpeg_path: Some(ffmpeg),
            output_dir: Some(output_dir.to_path_buf()),
            max_file_duration: None,
            ..EngineOptions::default()
        }
    }

    fn session_with(options: EngineOptions) -> CaptureSession<FfmpegEngine> {
        let target = DisplayTarget::test_pattern(320, 240).unwrap();
        CaptureSession::with_options(target, options).unwrap()
    }

    fn dir_entries(dir: &Path) -> Vec<String> {
        fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect()
    }

    struct CapturedLog {
        lines: Mutex<Vec<String>>,
    }

    impl log::Log for CapturedLog {
        fn enabled(&self, metadata: &log::Metadata) -> bool {
            metadata.level() <= log::Level::Info
        }

        fn log(&self, record: &log::Record) {
            if self.enabled(record.metadata()) {
                self.lines.lock().unwrap().push(record.args().to_string());
            }
        }

        fn flush(&self) {}
    }

    static CAPTURED_LOG: CapturedLog = CapturedLog {
        lines: Mutex::new(Vec::new()),
    };
    static INIT_LOG: Once = Once::new();

    fn captured_log() -> &'static CapturedLog {
        INIT_LOG.call_once(|| {
            log::set_logger(&CAPTURED_LOG).unwrap();
            log::set_max_level(log::LevelFilter::Info);
        });
        &CAPTURED_LOG
    }

    #[test]
    fn test_stop_returns_and_logs_recording() {
        let log = captured_log();
        let dir = TempDir::new().unwrap();
        let ffmpeg = stand_in_ffmpeg(dir.path(), "ffmpeg-ok", RECORD_UNTIL_QUIT);
        let out = dir.path().join("out");
        let mut session = session_with(stand_in_options(ffmpeg, &out));

        session.start().unwrap();
        assert_eq!(session.state(), SessionState::Recording);
        let movies = session.stop().unwrap();

        assert_eq!(session.state(), SessionState::Stopped);
        assert_eq!(movies.len(), 1);
        let path = movies[0].path();
        assert!(path.is_absolute());
        assert!(path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("ScreenRecording "));
        assert_eq!(&fs::read(path).unwrap()[0..4], b"RIFF");
        // The name reservation is released
        assert_eq!(dir_entries(&out).len(), 1);

        let expected = format!("New movie created: {}", path.display());
        assert!(log.lines.lock().unwrap().contains(&expected));
    }

    #[test]
    fn test_startup_failure_is_io_error() {
        let dir = TempDir::new().unwrap();
        let ffmpeg = stand_in_ffmpeg(
            dir.path(),
            "ffmpeg-no-display",
            "printf 'RIFF' > \"$out\"
echo \"Cannot open display :0\" >&2
exit 1",
        );
        let out = dir.path().join("out");
        let mut session = session_with(stand_in_options(ffmpeg, &out));

        match session.start() {
            Err(CaptureError::IoError(e)) => {
                let message = e.to_string();
                assert!(message.contains("exited during startup"), "{}", message);
                assert!(message.contains("Cannot open display"), "{}", message);
            }
            other => panic!("expected an I/O error, got {:?}", other),
        }
        assert_eq!(session.state(), SessionState::Failed);
        // Partial output and the name reservation are removed
        assert!(dir_entries(&out).is_empty());
        assert!(matches!(
            session.stop(),
            Err(CaptureError::InvalidState { .. })
        ));
    }

    #[test]
    fn test_finalize_failure_is_io_error() {
        let dir = TempDir::new().unwrap();
        let ffmpeg = stand_in_ffmpeg(
            dir.path(),
            "ffmpeg-bad-trailer",
            "printf 'RIFF0000AVI ' > \"$out\"
read -r _ || true
echo \"trailer write failed\" >&2
exit 3",
        );
        let mut session = session_with(stand_in_options(ffmpeg, &dir.path().join("out")));

        session.start().unwrap();
        match session.stop() {
            Err(CaptureError::IoError(e)) => {
                let message = e.to_string();
                assert!(message.contains("failed to finalize"), "{}", message);
                assert!(message.contains("trailer write failed"), "{}", message);
            }
            other => panic!("expected an I/O error, got {:?}", other),
        }
        assert_eq!(session.state(), SessionState::Failed);
    }

    #[test]
    fn test_hung_engine_is_killed_on_stop() {
        let dir = TempDir::new().unwrap();
        let ffmpeg = stand_in_ffmpeg(
            dir.path(),
            "ffmpeg-hangs",
            "printf 'RIFF0000AVI ' > \"$out\"
read -r _ || true
exec sleep 30",
        );
        let options = EngineOptions {
            shutdown_timeout: Duration::from_millis(300),
            ..stand_in_options(ffmpeg, &dir.path().join("out"))
        };
        let mut session = session_with(options);

        session.start().unwrap();
        let started = std::time::Instant::now();
        let result = session.stop();

        assert!(started.elapsed() < Duration::from_secs(10));
        match result {
            Err(CaptureError::IoError(e)) => {
                assert!(e.to_string().contains("did not finish"), "{}", e)
            }
            other => panic!("expected an I/O error, got {:?}", other),
        }
        assert_eq!(session.state(), SessionState::Failed);
    }

    #[test]
    fn test_output_dir_that_is_a_file_fails_start() {
        let dir = TempDir::new().unwrap();
        let ffmpeg = stand_in_ffmpeg(dir.path(), "ffmpeg-ok", RECORD_UNTIL_QUIT);
        let file = dir.path().join("recordings");
        fs::write(&file, b"not a directory").unwrap();

        let mut session = session_with(stand_in_options(ffmpeg, &file));
        assert!(matches!(session.start(), Err(CaptureError::IoError(_))));
        assert_eq!(session.state(), SessionState::Failed);
    }
}
