use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "screenrec", version, about = "Record the screen into AVI files")]
pub struct Cli {
    /// Enable debug logging (includes ffmpeg output)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Record until the duration elapses or Ctrl+C is pressed
    Record(RecordArgs),

    /// Configure defaults (saved to a config file)
    Config(ConfigArgs),

    /// Show the ffmpeg installation, encoder and displays that would be used
    Probe(ProbeArgs),
}

#[derive(Args, Debug)]
pub struct RecordArgs {
    /// Directory for the recordings (defaults to the user's video directory)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Duration in seconds (if omitted, recording continues until interrupted)
    #[arg(long)]
    pub duration: Option<u64>,

    /// Display index (0-based). Defaults to the primary display
    #[arg(long)]
    pub display: Option<usize>,

    /// Record a generated test picture of this size (e.g. 640x480) instead of a display
    #[arg(long, value_name = "WxH", conflicts_with = "display")]
    pub test_pattern: Option<String>,

    /// Start a new file after this many seconds of video (0 = never)
    #[arg(long)]
    pub max_file_duration: Option<u64>,

    /// Record audio as well
    #[arg(long)]
    pub audio: bool,

    /// Audio input device (platform specific name)
    #[arg(long)]
    pub audio_device: Option<String>,

    /// Path to the ffmpeg binary
    #[arg(long)]
    pub ffmpeg_path: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Default ffmpeg binary
    #[arg(long)]
    pub ffmpeg_path: Option<PathBuf>,

    /// Default output directory
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Default seconds of video per file (0 = never split)
    #[arg(long)]
    pub max_file_duration: Option<u64>,

    /// Default display index
    #[arg(long)]
    pub display: Option<usize>,

    /// Default audio input device
    #[arg(long)]
    pub audio_device: Option<String>,

    /// Clear/reset all saved configuration
    #[arg(long)]
    pub clear: bool,
}

#[derive(Args, Debug)]
pub struct ProbeArgs {
    /// Path to the ffmpeg binary
    #[arg(long)]
    pub ffmpeg_path: Option<PathBuf>,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}
