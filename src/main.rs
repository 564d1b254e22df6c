use anyhow::{Context, Result};
use clap::Parser;
use screenrec::cli::{Cli, Commands, ConfigArgs, ProbeArgs, RecordArgs};
use screenrec::config;
use screenrec::display_info::{self, DisplayInfo, DisplayTarget};
use screenrec::engine::{select_encoder, FfmpegEngine};
use screenrec::format::{AudioFormat, CaptureConfiguration};
use screenrec::{ffmpeg_utils, CaptureSession};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    // Initialize logger
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    match cli.command {
        Commands::Record(args) => record(args),
        Commands::Config(args) => configure(args),
        Commands::Probe(args) => probe(args),
    }
}

fn record(args: RecordArgs) -> Result<()> {
    let mut cfg = config::load_config()?;

    // Command line flags override saved defaults
    if args.ffmpeg_path.is_some() {
        cfg.ffmpeg_path = args.ffmpeg_path;
    }
    if args.output_dir.is_some() {
        cfg.output_dir = args.output_dir;
    }
    if args.max_file_duration.is_some() {
        cfg.max_file_duration = args.max_file_duration;
    }
    if args.audio_device.is_some() {
        cfg.audio_device = args.audio_device;
    }

    let display = match &args.test_pattern {
        Some(size) => display_info::parse_test_pattern(size)?,
        None => DisplayTarget::screen(args.display.or(cfg.display).unwrap_or(0))?,
    };

    let mut capture_config = CaptureConfiguration::screen_recording();
    if args.audio {
        capture_config = capture_config.with_audio(AudioFormat::default());
    }

    let engine = FfmpegEngine::create(display, &capture_config, cfg.engine_options())?;
    let mut session = CaptureSession::with_engine(capture_config, engine);

    let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);
    ctrlc::set_handler(move || {
        log::info!("Received Ctrl+C, stopping recording...");
        let _ = stop_tx.try_send(());
    })
    .context("Failed to set Ctrl+C handler")?;

    session.start()?;

    match args.duration {
        Some(secs) => {
            log::info!("Recording for {} seconds (Ctrl+C to stop early)", secs);
            let _ = stop_rx.recv_timeout(Duration::from_secs(secs));
        }
        None => {
            log::info!("Recording until interrupted (Ctrl+C to stop)");
            let _ = stop_rx.recv();
        }
    }

    let movies = session.stop()?;
    for movie in &movies {
        println!("✅ Recording saved to: {}", movie);
    }
    Ok(())
}

fn configure(args: ConfigArgs) -> Result<()> {
    if args.clear {
        if config::clear_config()? {
            println!("Configuration cleared successfully.");
        } else {
            println!("No configuration file found. Nothing to clear.");
        }
        return Ok(());
    }

    let mut cfg = config::load_config()?;
    if args.ffmpeg_path.is_some() {
        cfg.ffmpeg_path = args.ffmpeg_path;
    }
    if args.output_dir.is_some() {
        cfg.output_dir = args.output_dir;
    }
    if args.max_file_duration.is_some() {
        cfg.max_file_duration = args.max_file_duration;
    }
    if args.display.is_some() {
        cfg.display = args.display;
    }
    if args.audio_device.is_some() {
        cfg.audio_device = args.audio_device;
    }

    config::save_config(&cfg)?;
    println!("Saved configuration to {}", config::config_file_path()?.display());
    println!("{}", toml::to_string_pretty(&cfg).context("Failed to render configuration")?);
    Ok(())
}

#[derive(Debug, Serialize)]
struct ProbeReport {
    ffmpeg_path: PathBuf,
    version: String,
    encoder: String,
    pixel_format: String,
    output_dir: PathBuf,
    displays: Vec<DisplayInfo>,
}

fn probe(args: ProbeArgs) -> Result<()> {
    let cfg = config::load_config()?;
    let ffmpeg_hint = args.ffmpeg_path.or(cfg.ffmpeg_path.clone());
    let ffmpeg_path = ffmpeg_utils::find_ffmpeg_binary(ffmpeg_hint.as_deref())?;
    let version = ffmpeg_utils::validate_ffmpeg(&ffmpeg_path)?;

    let capture_config = CaptureConfiguration::screen_recording();
    let encoder = select_encoder(
        capture_config.video_format(),
        &ffmpeg_utils::list_encoders(&ffmpeg_path)?,
    )?;

    let displays = match display_info::list_displays() {
        Ok(displays) => displays,
        Err(e) => {
            log::warn!("Display enumeration failed: {}", e);
            Vec::new()
        }
    };

    let report = ProbeReport {
        ffmpeg_path,
        version,
        pixel_format: encoder.pixel_format(capture_config.video_format().depth).to_string(),
        encoder: encoder.name,
        output_dir: cfg.engine_options().resolved_output_dir(),
        displays,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("FFmpeg:     {} ({})", report.ffmpeg_path.display(), report.version);
        println!("Encoder:    {} ({})", report.encoder, report.pixel_format);
        println!("Output dir: {}", report.output_dir.display());
        for display in &report.displays {
            if display.width > 0 {
                println!(
                    "Display {}:  {}x{}+{}+{}{}",
                    display.index,
                    display.width,
                    display.height,
                    display.x,
                    display.y,
                    if display.is_primary { " (primary)" } else { "" }
                );
            } else {
                println!("Display {}:  size unknown", display.index);
            }
        }
    }
    Ok(())
}
