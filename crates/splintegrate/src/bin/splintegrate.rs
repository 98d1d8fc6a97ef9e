use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::AtomicBool;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use splintegrate::discover::find_inputs;
use splintegrate::{Exposure, SplitOptions, SplitReport};
use tracing::{error, info, warn};
use tracing_subscriber::{filter::LevelFilter, EnvFilter};

const LOG_ENV_VAR: &str = "SPLINTEGRATE_LOG";

/// Split multi-integration FITS files into one file per integration.
#[derive(Debug, Parser)]
#[command(name = "splintegrate", version, about)]
struct Args {
    /// Input file or shell-style pattern, e.g. "data/*_rateints.fits".
    #[arg(value_name = "PATTERN")]
    pattern: String,

    /// Directory for the split files; created if missing.
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    out_dir: PathBuf,

    /// Replace split files that already exist.
    #[arg(long)]
    overwrite: bool,

    /// Flip frames into detector coordinates.
    #[arg(long)]
    flip: bool,

    /// Detector name to use instead of the DETECTOR header keyword.
    #[arg(long, value_name = "NAME")]
    detector: Option<String>,

    /// Write FLIP2DET = F when frames are not flipped.
    #[arg(long)]
    accurate_flip_flag: bool,
}

impl Args {
    fn split_options(&self) -> SplitOptions {
        SplitOptions {
            overwrite: self.overwrite,
            flip_to_detector: self.flip,
            detector: self.detector.clone(),
            accurate_flip_flag: self.accurate_flip_flag,
        }
    }
}

fn init_logging() {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .with_env_var(LOG_ENV_VAR)
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .init();
}

fn progress_bar(len: usize, path: &Path) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    let style = ProgressStyle::default_bar()
        .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos:>5}/{len:5} {msg}")
        .map(|s| s.progress_chars("##-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    if let Some(name) = path.file_name() {
        pb.set_message(name.to_string_lossy().into_owned());
    }
    pb
}

fn split_file(path: &Path, args: &Args, cancel: &AtomicBool) -> splintegrate::Result<SplitReport> {
    let exposure = Exposure::open(path, &args.out_dir, args.split_options())?;
    if exposure.is_empty() {
        return Ok(SplitReport::default());
    }

    let pb = progress_bar(exposure.frame_count(), path);
    let report = exposure.split_with(cancel, |_| pb.inc(1));
    pb.finish_and_clear();
    report
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging();

    let inputs = match find_inputs(&args.pattern) {
        Ok(inputs) => inputs,
        Err(err) => {
            error!("{err}");
            return ExitCode::FAILURE;
        }
    };
    if inputs.is_empty() {
        warn!(pattern = %args.pattern, "no input files matched");
        return ExitCode::FAILURE;
    }

    let cancel = AtomicBool::new(false);
    let mut failed = 0usize;
    for path in &inputs {
        match split_file(path, &args, &cancel) {
            Ok(report) => info!(
                path = %path.display(),
                written = report.written.len(),
                skipped = report.skipped.len(),
                "done"
            ),
            Err(err) => {
                failed += 1;
                error!(path = %path.display(), "{err}");
            }
        }
    }

    if failed > 0 {
        error!("{failed} of {} files failed", inputs.len());
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
