//! puyotui — Puyo-Puyo style chain puzzle for one or two players in the terminal.

mod app;
mod audio;
mod board;
mod chain;
mod floating;
mod input;
mod piece;
mod player;
mod theme;
mod ui;
mod versus;

use anyhow::{Context, Result, ensure};
use app::App;
use clap::{Parser, ValueEnum};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Options derived from CLI that affect the match.
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub players: usize,
    pub seed: u64,
    /// The seed came from `--seed`; restarts replay it.
    pub fixed_seed: bool,
    /// Simulation step, from `--tick-rate`.
    pub tick_interval: Duration,
    pub bell: bool,
    pub no_animation: bool,
}

impl GameConfig {
    pub fn from_args(args: &Args) -> Result<Self> {
        ensure!(
            args.tick_rate.is_finite() && args.tick_rate > 0.0,
            "--tick-rate must be a positive number of ticks per second, got {}",
            args.tick_rate
        );
        let tick_interval = Duration::try_from_secs_f64(args.tick_rate.recip())
            .ok()
            .filter(|interval| !interval.is_zero())
            .with_context(|| format!("--tick-rate {} is out of range", args.tick_rate))?;
        Ok(Self {
            players: args.players as usize,
            seed: args.seed.unwrap_or_else(rand::random),
            fixed_seed: args.seed.is_some(),
            tick_interval,
            bell: args.bell,
            no_animation: args.no_animation,
        })
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_file.as_deref())?;
    let config = GameConfig::from_args(&args)?;
    let theme = theme::Theme::load(args.theme.as_deref(), args.palette).unwrap_or_else(|e| {
        warn!("theme failed to load, using defaults: {e}");
        let mut theme = theme::Theme::default();
        theme.apply_palette(args.palette);
        theme
    });
    info!(seed = config.seed, players = config.players, "starting");
    let mut app = App::new(config, theme);
    app.run()?;
    Ok(())
}

/// Sends tracing output to `path`. Without a path nothing is logged; the terminal belongs
/// to the UI.
fn init_logging(path: Option<&Path>) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let file = std::fs::File::create(path)
        .with_context(|| format!("creating log file {}", path.display()))?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}

/// Puyo-Puyo style chain puzzle in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "puyotui",
    version,
    about = "Puyo-Puyo style chain puzzle in the terminal, solo or two players on one keyboard.",
    long_about = "puyotui is a terminal take on Puyo Puyo.\n\n\
        Pieces of two to four coloured puyos fall into a 6x14 field. Four or more of one \
        colour touching pop; whatever they held up falls and may pop again, building chains. \
        Fill the marked cell (×) and you lose.\n\n\
        CONTROLS (1P):\n  A/D  Move    S  Fast fall (hold)    Left/Right  Rotate\n\n\
        CONTROLS (2P):\n  J/L  Move    K  Fast fall (hold)    U/O         Rotate\n\n\
        P  Pause    R  Restart (after game over)    Q / Esc  Quit\n\n\
        Use --theme to load a btop-style theme (e.g. onedark.theme)."
)]
pub struct Args {
    /// Number of local players.
    #[arg(short, long, default_value = "2", value_parser = clap::value_parser!(u8).range(1..=2))]
    pub players: u8,

    /// Match seed. Random if not set; the seed in use is shown in the title bar.
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u64>,

    /// Path to theme file (btop-style theme[key]=\"value\"). Uses One Dark if not set.
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<std::path::PathBuf>,

    /// Colour palette: normal (theme), high-contrast, or colorblind.
    #[arg(long, default_value = "normal")]
    pub palette: Palette,

    /// Simulation ticks per second.
    #[arg(long, default_value = "60.0", value_name = "RATE")]
    pub tick_rate: f64,

    /// Write logs to this file (filter with RUST_LOG, default info).
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<std::path::PathBuf>,

    /// Ring the terminal bell on chain pops.
    #[arg(long)]
    pub bell: bool,

    /// Disable the fade on a lost field.
    #[arg(long)]
    pub no_animation: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Palette {
    #[default]
    Normal,

    #[value(alias = "highcontrast", alias = "contrast")]
    HighContrast,

    #[value(alias = "colourblind")]
    Colorblind,
}
