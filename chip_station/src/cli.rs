use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Chip authenticator station: a simulated conveyor, a camera feed or an
/// operator-driven belt, all counting chips at the scan line.
#[derive(Parser, Debug)]
#[command(name = "chip_station", version, about)]
pub struct Cli {
    /// TOML configuration file; defaults apply to every missing key.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Seed for the chip generator; overrides `spawning.seed`.
    #[arg(long, global = true)]
    pub seed: Option<u64>,

    /// Stop after this many ticks instead of waiting for `q`.
    #[arg(long, global = true)]
    pub ticks: Option<u64>,

    /// Directory for rendered PNG frames.
    #[arg(long, global = true)]
    pub snapshot_dir: Option<PathBuf>,

    /// Save a frame every N ticks (needs --snapshot-dir).
    #[arg(long, global = true, default_value_t = 0)]
    pub snapshot_every: u64,

    #[command(subcommand)]
    pub mode: Mode,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Simulated belt with automatic spawning.
    Conveyor,
    /// Detect chips in camera frames.
    Camera {
        /// Play back the images in this directory as the camera feed.
        #[arg(long, conflicts_with = "synthetic")]
        frames: Option<PathBuf>,
        /// Use a simulated camera looking at a simulated belt.
        #[arg(long)]
        synthetic: bool,
        /// Calibrate from gold.png, silver.png and bronze.png in this directory.
        #[arg(long)]
        calibrate_dir: Option<PathBuf>,
    },
    /// Simulated belt; chips appear only on command.
    Interactive,
}
