//! wall-remote entry point.
//!
//! ```text
//! wall-remote text HELLO WORLD --color green   Show two lines of text
//! wall-remote draw --file smiley.txt           Send a grid file
//! wall-remote fill blue                        Light every LED
//! wall-remote paint                            Edit pixels from stdin
//! wall-remote tetris                           Play tetris from stdin
//! wall-remote gen-config                       Print the default config
//! ```

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use wall_core::codec::{ANIMATION_NONE, encode_break, encode_draw, encode_text};
use wall_core::{Grid, Pixel, TextColor, WallConfig, WallError};
use wall_remote::app::{DISCONNECT_WAIT, run_paint, run_tetris, send_once};
use wall_remote::paint::{parse_codes, parse_grid, parse_pixel};
use wall_remote::remote::Remote;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "wall-remote", about = "Remote control for the LED wall")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, global = true, default_value = "wall-remote.toml")]
    config: PathBuf,

    /// Wall IPv4 address, overriding the config.
    #[arg(short, long, global = true)]
    address: Option<String>,

    /// Wall TCP port, overriding the config.
    #[arg(short, long, global = true)]
    port: Option<u16>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show two lines of text.
    Text {
        top: String,
        #[arg(default_value = "")]
        bottom: String,
        /// red, green, blue or multicolored.
        #[arg(long, default_value = "red", value_parser = parse_color)]
        color: TextColor,
        /// Swap foreground and background.
        #[arg(long)]
        inverted: bool,
    },
    /// Send a whole 10x16 grid.
    Draw {
        /// Grid text file (16 rows of `.rgb` cells).
        #[arg(long, required_unless_present = "codes", conflicts_with = "codes")]
        file: Option<PathBuf>,
        /// 160 comma-separated pixel codes (0-3).
        #[arg(long)]
        codes: Option<String>,
    },
    /// Light every LED in one colour.
    Fill {
        #[arg(value_parser = parse_pixel)]
        color: Pixel,
    },
    /// Interrupt whatever the wall is showing.
    Break,
    /// Edit pixels interactively from stdin.
    Paint {
        /// Grid file to start from.
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Play tetris from stdin.
    Tetris,
    /// Print the device id sent with `connect`.
    DeviceId,
    /// Print the default configuration to stdout.
    GenConfig,
    /// Write the effective configuration to the config path.
    SaveConfig {
        /// Fixed device id; 0 derives one from this machine.
        #[arg(long)]
        udid: Option<u32>,
    },
}

fn parse_color(name: &str) -> Result<TextColor, WallError> {
    TextColor::try_from(name.trim().to_ascii_lowercase().as_str())
}

fn read_grid(path: &Path) -> Result<Grid, Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    Ok(parse_grid(&text)?)
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // gen-config: dump defaults and exit.
    if let Command::GenConfig = cli.command {
        let text = toml::to_string_pretty(&WallConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    // Load config, then apply command-line overrides.
    let mut config = WallConfig::load(&cli.config);
    if let Some(address) = cli.address {
        config.network.address = address;
    }
    if let Some(port) = cli.port {
        config.network.port = port;
    }

    // Init tracing.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("wall-remote v{}", env!("CARGO_PKG_VERSION"));
    info!("wall: {}:{}", config.network.address, config.network.port);

    match cli.command {
        Command::Text {
            top,
            bottom,
            color,
            inverted,
        } => {
            let message = encode_text(&top, &bottom, color, inverted, ANIMATION_NONE)?;
            send_once(&config, message).await?;
        }
        Command::Draw { file, codes } => {
            let grid = match (file, codes) {
                (Some(path), _) => read_grid(&path)?,
                (None, Some(codes)) => parse_codes(&codes)?,
                (None, None) => return Err("draw needs --file or --codes".into()),
            };
            send_once(&config, encode_draw(&grid)?).await?;
        }
        Command::Fill { color } => {
            send_once(&config, encode_draw(&Grid::filled(color))?).await?;
        }
        Command::Break => {
            send_once(&config, encode_break()?).await?;
        }
        Command::Paint { file } => {
            let grid = match file {
                Some(path) => read_grid(&path)?,
                None => Grid::new(),
            };
            let mut remote = Remote::new(&config)?;
            remote.connect().await?;
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            let played = run_paint(&mut remote, stdin, grid).await;
            remote.disconnect(DISCONNECT_WAIT).await?;
            played?;
        }
        Command::Tetris => {
            let mut remote = Remote::new(&config)?;
            remote.connect().await?;
            println!("a/d move, q/e rotate, start, stop, exit");
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            let played = run_tetris(&mut remote, stdin).await;
            remote.disconnect(DISCONNECT_WAIT).await?;
            played?;
        }
        Command::DeviceId => {
            println!("{}", config.device_id());
        }
        Command::SaveConfig { udid } => {
            if let Some(udid) = udid {
                config.device.udid = udid;
            }
            config.validate()?;
            config.save(&cli.config)?;
            info!("saved {}", cli.config.display());
        }
        Command::GenConfig => {}
    }

    Ok(())
}
