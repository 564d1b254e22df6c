use crate::display_info::DisplayTarget;
use crate::engine::{CaptureEngine, EngineOptions, FfmpegEngine};
use crate::error::{CaptureError, Result};
use crate::format::CaptureConfiguration;
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Created,
    Recording,
    Stopped,
    Failed,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Created => "not started",
            SessionState::Recording => "recording",
            SessionState::Stopped => "stopped",
            SessionState::Failed => "failed",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recording handed over to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    path: PathBuf,
}

impl OutputFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn into_path_buf(self) -> PathBuf {
        self.path
    }
}

impl fmt::Display for OutputFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

/// One recording, from `start` to `stop`.
///
/// A session records at most once. `stop` without a running recording and a
/// second `start` are rejected with [`CaptureError::InvalidState`]; after an
/// engine failure every further call is rejected the same way.
pub struct CaptureSession<E: CaptureEngine = FfmpegEngine> {
    config: CaptureConfiguration,
    engine: E,
    state: SessionState,
}

impl CaptureSession<FfmpegEngine> {
    /// Session for `display` using the standard screen recording formats.
    ///
    /// Fails with [`CaptureError::ConfigurationError`] when no usable ffmpeg
    /// or encoder is found. Output directory problems surface from `start`.
    pub fn new(display: DisplayTarget) -> Result<Self> {
        Self::with_options(display, EngineOptions::default())
    }

    pub fn with_options(display: DisplayTarget, options: EngineOptions) -> Result<Self> {
        let config = CaptureConfiguration::screen_recording();
        let engine = FfmpegEngine::create(display, &config, options)?;
        Ok(Self::with_engine(config, engine))
    }
}

impl<E: CaptureEngine> CaptureSession<E> {
    pub fn with_engine(config: CaptureConfiguration, engine: E) -> Self {
        Self {
            config,
            engine,
            state: SessionState::Created,
        }
    }

    pub fn configuration(&self) -> &CaptureConfiguration {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn start(&mut self) -> Result<()> {
        if self.state != SessionState::Created {
            return Err(self.invalid_state("start"));
        }

        match self.engine.start() {
            Ok(()) => {
                self.state = SessionState::Recording;
                Ok(())
            }
            Err(e) => {
                log::error!("Failed to start recording: {}", e);
                self.state = SessionState::Failed;
                Err(e)
            }
        }
    }

    /// End the recording and return the produced files in engine order.
    pub fn stop(&mut self) -> Result<Vec<OutputFile>> {
        if self.state != SessionState::Recording {
            return Err(self.invalid_state("stop"));
        }

        if let Err(e) = self.engine.stop() {
            log::error!("Failed to finalize recording: {}", e);
            self.state = SessionState::Failed;
            return Err(e);
        }
        self.state = SessionState::Stopped;

        let files: Vec<OutputFile> = self
            .engine
            .created_files()
            .into_iter()
            .map(OutputFile::new)
            .collect();

        for movie in &files {
            log::info!("New movie created: {}", movie);
        }

        Ok(files)
    }

    fn invalid_state(&self, operation: &'static str) -> CaptureError {
        CaptureError::InvalidState {
            operation,
            state: self.state.as_str(),
        }
    }
}

impl<E: CaptureEngine> Drop for CaptureSession<E> {
    fn drop(&mut self) {
        if self.state == SessionState::Recording {
            log::warn!("Capture session dropped while recording, stopping it");
            if let Err(e) = self.engine.stop() {
                log::error!("Failed to stop recording on drop: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct CountingEngine {
        starts: Arc<AtomicUsize>,
        stops: Arc<AtomicUsize>,
        fail_start: bool,
    }

    impl CaptureEngine for CountingEngine {
        fn start(&mut self) -> Result<()> {
            if self.fail_start {
                return Err(CaptureError::io("output not writable"));
            }
            self.starts.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn stop(&mut self) -> Result<()> {
            self.stops.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn created_files(&self) -> Vec<PathBuf> {
            vec![PathBuf::from("/recordings/a.avi")]
        }
    }

    fn session(engine: CountingEngine) -> CaptureSession<CountingEngine> {
        CaptureSession::with_engine(CaptureConfiguration::screen_recording(), engine)
    }

    #[test]
    fn test_stop_before_start_is_rejected() {
        let mut session = session(CountingEngine::default());
        let err = session.stop().unwrap_err();
        assert!(matches!(
            err,
            CaptureError::InvalidState {
                operation: "stop",
                state: "not started"
            }
        ));
        assert_eq!(session.state(), SessionState::Created);
    }

    #[test]
    fn test_start_twice_is_rejected() {
        let engine = CountingEngine::default();
        let starts = engine.starts.clone();
        let mut session = session(engine);
        session.start().unwrap();
        assert!(session.start().is_err());
        assert_eq!(starts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_session_is_not_reusable() {
        let mut session = session(CountingEngine::default());
        session.start().unwrap();
        let files = session.stop().unwrap();
        assert_eq!(files, vec![OutputFile::new(PathBuf::from("/recordings/a.avi"))]);
        assert_eq!(session.state(), SessionState::Stopped);
        assert!(session.start().is_err());
        assert!(session.stop().is_err());
    }

    #[test]
    fn test_failed_start() {
        let mut session = session(CountingEngine {
            fail_start: true,
            ..Default::default()
        });
        assert!(matches!(session.start(), Err(CaptureError::IoError(_))));
        assert_eq!(session.state(), SessionState::Failed);
        assert!(session.stop().is_err());
    }

    #[test]
    fn test_drop_while_recording_stops_engine() {
        let engine = CountingEngine::default();
        let stops = engine.stops.clone();
        {
            let mut session = session(engine);
            session.start().unwrap();
        }
        assert_eq!(stops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_output_file_display() {
        let file = OutputFile::new(PathBuf::from("/tmp/x.avi"));
        assert_eq!(file.to_string(), "/tmp/x.avi");
        assert_eq!(file.path(), Path::new("/tmp/x.avi"));
        assert_eq!(file.into_path_buf(), PathBuf::from("/tmp/x.avi"));
    }
}
