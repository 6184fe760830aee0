mod capture;
mod core;
mod renderer;
mod shared;
mod sync;
mod ui;
mod utils;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::core::launcher;
use crate::renderer::DisplayMode;
use crate::shared::constants;
use crate::utils::config::{Config, Overrides};

#[derive(Parser)]
#[command(author, version, about = "Terminal webcam viewer with pause and rewind", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the interactive viewer (default)
    View(CameraArgs),
    /// Probe camera indices and print what each one reports as JSON
    Devices {
        #[arg(short, long, default_value_t = constants::DEVICE_PROBE_LIMIT)]
        max: i32,
    },
    /// Capture a single frame to a PNG file without starting the viewer
    Snapshot(CameraArgs),
    /// Query the terminal size as crossterm sees it
    TerminalSize,
}

#[derive(Args, Default)]
struct CameraArgs {
    /// Camera index
    #[arg(short, long)]
    device: Option<i32>,
    #[arg(long)]
    width: Option<u32>,
    #[arg(long)]
    height: Option<u32>,
    /// Frame timer period in milliseconds
    #[arg(short, long)]
    interval_ms: Option<u64>,
    #[arg(short, long, value_enum)]
    mode: Option<DisplayMode>,
    /// Crop to fill the video area instead of letterboxing
    #[arg(short, long, overrides_with = "no_fill")]
    fill: bool,
    /// Letterbox even when the config file asks for fill
    #[arg(long, overrides_with = "fill")]
    no_fill: bool,
    /// Directory snapshots are written to
    #[arg(short, long)]
    snapshot_dir: Option<PathBuf>,
    /// Settings file
    #[arg(short, long, default_value = constants::CONFIG_FILE)]
    config: PathBuf,
}

impl CameraArgs {
    fn fill_override(&self) -> Option<bool> {
        match (self.fill, self.no_fill) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }

    fn resolve(&self) -> Result<Config> {
        let overrides = Overrides {
            device: self.device,
            width: self.width,
            height: self.height,
            interval_ms: self.interval_ms,
            mode: self.mode,
            fill: self.fill_override(),
            snapshot_dir: self.snapshot_dir.clone(),
        };
        Ok(Config::load(&self.config)?.apply(&overrides))
    }
}

fn main() -> Result<()> {
    crate::utils::logger::init();

    // A previous crash may have left the terminal in raw mode
    let _ = crossterm::terminal::disable_raw_mode();
    let _ = crossterm::execute!(std::io::stderr(), crossterm::terminal::LeaveAlternateScreen);

    let cli = Cli::parse();

    match cli.command {
        None => {
            let config = CameraArgs {
                config: PathBuf::from(constants::CONFIG_FILE),
                ..CameraArgs::default()
            }
            .resolve()?;
            launcher::run_viewer(config)?;
        }
        Some(Commands::View(args)) => {
            launcher::run_viewer(args.resolve()?)?;
        }
        Some(Commands::Devices { max }) => {
            println!("{}", launcher::list_devices(max)?);
        }
        Some(Commands::Snapshot(args)) => {
            let path = launcher::capture_snapshot(&args.resolve()?)?;
            println!("{}", path.display());
        }
        Some(Commands::TerminalSize) => {
            let (cols, rows) = crossterm::terminal::size()?;
            println!("{}x{}", cols, rows);
        }
    }

    Ok(())
}
