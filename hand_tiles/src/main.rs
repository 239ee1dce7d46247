//! hand_tiles — interactive entry point.

use clap::Parser;
use log::{error, info};

use hand_tiles::app::run;
use hand_tiles::args::Args;
use hand_tiles::config::AppConfig;

fn main() {
    env_logger::init();
    let args = Args::parse();

    let cfg = match AppConfig::from_args(&args) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    match &cfg.detector {
        Some(cmd) => info!("Landmarks from detector `{}`", cmd),
        None      => info!("Landmarks from mouse simulation"),
    }
    info!(
        "Mode {}, style {}, density {}, difficulty {}",
        cfg.mode.name(), cfg.style.name(), cfg.density, cfg.difficulty.name(),
    );

    if let Err(e) = run(cfg) {
        error!("{}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
