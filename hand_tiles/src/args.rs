//! Command line arguments, parsed with clap.

use std::path::PathBuf;

use clap::Parser;

/// Play notes or chase squares with your fingertips.
///
/// Without `--detector` a simulated hand follows the mouse.
#[derive(Debug, Parser, Clone, Default)]
#[command(version, about)]
pub struct Args {
    /// RON config file; flags below override its values
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// piano | dance
    #[arg(short = 'm', long = "mode")]
    pub mode: Option<String>,

    /// easy | medium | hard
    #[arg(short = 'd', long = "difficulty")]
    pub difficulty: Option<String>,

    /// Notes per finger: 3 | 5 | 7
    #[arg(short = 'n', long = "density")]
    pub density: Option<String>,

    /// triangle | piano | vibes | strings | lead
    #[arg(short = 's', long = "style")]
    pub style: Option<String>,

    /// Shorter minimum gap between a finger's notes
    #[arg(long = "fast")]
    pub fast: bool,

    /// Detector command that prints one JSON landmark frame per line
    #[arg(long = "detector")]
    pub detector: Option<String>,

    /// Track one or two hands
    #[arg(long = "hands")]
    pub hands: Option<usize>,

    /// Draw the camera view unflipped
    #[arg(long = "no-mirror")]
    pub no_mirror: bool,
}
