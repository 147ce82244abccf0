//! stereo_capture - collect synchronized image pairs from two cameras
//!
//! This binary:
//! 1. Creates the camera0/ and camera1/ output directories
//! 2. Opens both cameras (left first, released again if the right fails)
//! 3. Polls both cameras once per cycle and shows a live status line
//! 4. Writes a JPEG pair on every capture command
//! 5. Prints a summary on quit

use anyhow::Result;
use clap::Parser;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;

use stereo_capture::controls::{spawn_stdin_reader, Controls};
use stereo_capture::ui::{self, Ui};
use stereo_capture::{
    CameraOpener, CaptureConfig, CaptureError, CaptureSession, ControlEvent, StepOutcome,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Left camera: device index, V4L2 path, or stub://name.
    #[arg(long)]
    left: Option<String>,
    /// Right camera: device index, V4L2 path, or stub://name.
    #[arg(long)]
    right: Option<String>,
    /// Requested frame width.
    #[arg(long)]
    width: Option<u32>,
    /// Requested frame height.
    #[arg(long)]
    height: Option<u32>,
    /// Directory that receives camera0/ and camera1/.
    #[arg(long)]
    output_dir: Option<PathBuf>,
    /// Write a side-by-side preview JPEG to this path.
    #[arg(long)]
    preview: Option<PathBuf>,
    /// Refresh the preview every N cycles.
    #[arg(long, default_value_t = 15)]
    preview_every: u64,
    /// UI mode for stderr status (auto|plain|pretty)
    #[arg(long, default_value = "auto", value_name = "MODE")]
    ui: String,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    match run(args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<ExitCode> {
    let mut cfg = CaptureConfig::load()?;
    if let Some(left) = args.left {
        cfg.left = left;
    }
    if let Some(right) = args.right {
        cfg.right = right;
    }
    if let Some(width) = args.width {
        cfg.width = width;
    }
    if let Some(height) = args.height {
        cfg.height = height;
    }
    if let Some(dir) = args.output_dir {
        cfg.output_dir = dir;
    }
    cfg.validate()?;

    let mut opener = CameraOpener;
    let mut session = match CaptureSession::open(&mut opener, &cfg.session_config()) {
        Ok(session) => session,
        Err(e @ CaptureError::SourceUnavailable { .. }) => {
            eprintln!("Error: {}", e);
            return Ok(ExitCode::FAILURE);
        }
        Err(e) => return Err(e.into()),
    };

    let (tx, controls) = Controls::channel();
    let ctrlc_tx = tx.clone();
    ctrlc::set_handler(move || {
        let _ = ctrlc_tx.send(ControlEvent::Quit);
    })?;
    spawn_stdin_reader(tx);

    let is_tty = std::io::stderr().is_terminal();
    let stdout_is_tty = std::io::stdout().is_terminal();
    let ui = Ui::from_args(Some(&args.ui), is_tty, !stdout_is_tty);
    eprintln!("{}\n", ui::banner(session.output()));
    let mut status = ui.status();
    status.update(0, 0);

    let preview_every = args.preview_every.max(1);
    let mut exit = ExitCode::SUCCESS;
    loop {
        match session.step(controls.poll()) {
            Ok(StepOutcome::Quit) => break,
            Ok(StepOutcome::Previewed(pair)) => {
                if let Some(path) = &args.preview {
                    if (pair.cycle - 1) % preview_every == 0 {
                        if let Err(e) = ui::write_preview(&pair, path) {
                            log::warn!("preview write failed: {:#}", e);
                        }
                    }
                }
            }
            Ok(StepOutcome::Captured { persisted, .. }) => {
                status.println(&format!(
                    "Captured pair {}: {}, {}",
                    session.pair_count(),
                    persisted.left.display(),
                    persisted.right.display()
                ));
            }
            Ok(StepOutcome::CaptureFailed { error, .. }) => {
                status.println(&format!("Capture failed: {}", error));
            }
            Err(e) => {
                status.println(&format!("Error: {}", e));
                exit = ExitCode::FAILURE;
                break;
            }
        }
        status.update(session.pair_count(), session.cycles());
    }
    status.finish();

    session.close();
    println!("\n{}", ui::summary(session.pair_count()));
    Ok(exit)
}
