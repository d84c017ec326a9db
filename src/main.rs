use std::path::PathBuf;

use clap::{Parser, Subcommand, Args};
use rust_canvas_engine::{
    app::{headless, window},
    config::{ConfigError, GameConfig}
};

/// # Global Arguments
#[derive(Debug, Parser)]
#[command(version, about = "2D canvas game engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Subcommand)]
enum Mode {
    /// Open a window and run the demo scene
    Window(RunArgs),

    /// Run the demo scene without a window, recording draw calls
    Headless(HeadlessArgs),
}

#[derive(Debug, Args)]
struct RunArgs {
    /// JSON game config, missing fields keep their defaults
    #[arg(short = 'c', long = "config", value_name = "CONFIG_PATH")]
    config: Option<PathBuf>,

    /// Canvas width in pixels
    #[arg(long = "width", value_name = "PIXELS")]
    width: Option<u32>,

    /// Canvas height in pixels
    #[arg(long = "height", value_name = "PIXELS")]
    height: Option<u32>,

    /// Draw the smoothed fps counter
    #[arg(long = "show-fps")]
    show_fps: bool,
}

#[derive(Debug, Args)]
struct HeadlessArgs {
    #[command(flatten)]
    run: RunArgs,

    /// Number of frames to run, runs until ctrl-C when omitted
    #[arg(short = 'f', long = "frames", value_name = "FRAMES")]
    frames: Option<u64>,

    /// Target frame rate
    #[arg(long = "fps", value_name = "FPS", default_value_t = 60)]
    fps: u32,
}

impl RunArgs {
    fn game_config(&self) -> Result<GameConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => GameConfig::load(path)?,
            None => GameConfig::default(),
        };
        if let Some(width) = self.width {
            config.width = width;
        }
        if let Some(height) = self.height {
            config.height = height;
        }
        config.show_fps |= self.show_fps;
        Ok(config)
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp_millis()
        .format_file(false)
        .format_line_number(true)
        .init();

    let cli_args = Cli::parse();
    log::info!("Got args: '{:?}'.", cli_args);

    let result = match cli_args.mode {
        Mode::Window(run_args) => {
            run_args.game_config()
                .map_err(Into::into)
                .and_then(window::run)
        },
        Mode::Headless(headless_args) => {
            headless_args.run.game_config()
                .map_err(Into::into)
                .and_then(|config| headless::run(config, headless_args.fps, headless_args.frames))
                .map(|frames| println!("Ran {frames} frames"))
        },
    };

    if let Err(e) = result {
        log::error!("{e}");
        std::process::exit(1);
    }
}
