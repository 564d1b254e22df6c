//! Screen capture sessions.
//!
//! A [`CaptureSession`] holds a fixed [`CaptureConfiguration`] (AVI, screen
//! capture codec, 24 bit, 15 fps) and drives one recording of a
//! [`DisplayTarget`] through a [`CaptureEngine`]. The bundled engine runs
//! ffmpeg as a child process.
//!
//! ```no_run
//! use screenrec::{CaptureSession, DisplayTarget};
//!
//! # fn main() -> screenrec::Result<()> {
//! let mut session = CaptureSession::new(DisplayTarget::default_screen()?)?;
//! session.start()?;
//! std::thread::sleep(std::time::Duration::from_secs(5));
//! for movie in session.stop()? {
//!     println!("{}", movie);
//! }
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod display_info;
pub mod engine;
pub mod error;
pub mod ffmpeg_utils;
pub mod format;
pub mod session;
pub mod validation;

pub use display_info::DisplayTarget;
pub use engine::{CaptureEngine, EngineOptions, FfmpegEngine};
pub use error::{CaptureError, Result};
pub use format::CaptureConfiguration;
pub use session::{CaptureSession, OutputFile, SessionState};
