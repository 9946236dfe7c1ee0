// Command-line configuration for the binary. The library itself only takes plain values.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use clap::{ArgAction, Parser};
use tracing::Level;

use crate::error::ConfigError;
use crate::pipeline::RunOptions;

/// One `NAME=PATH[,PATH...][@OFFSET]` argument.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PanelSpec {
    pub name: String,
    pub paths: Vec<PathBuf>,
    pub offset: Option<i32>,
}

impl FromStr for PanelSpec {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let syntax = || ConfigError::PanelSyntax(s.to_string());
        let (name, rest) = s.split_once('=').ok_or_else(syntax)?;
        if name.is_empty() {
            return Err(syntax());
        }

        let (paths, offset) = match rest.rsplit_once('@') {
            Some((paths, offset)) => {
                let offset = offset.parse::<i32>().map_err(|_| ConfigError::PanelOffset {
                    spec: s.to_string(),
                    offset: offset.to_string(),
                })?;
                (paths, Some(offset))
            }
            None => (rest, None),
        };

        let paths: Vec<PathBuf> = paths.split(',').map(PathBuf::from).collect();
        if paths.iter().any(|p| p.as_os_str().is_empty()) {
            return Err(syntax());
        }
        Ok(Self {
            name: name.to_string(),
            paths,
            offset,
        })
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "pixmap-panels",
    version,
    about = "Show P6 pixmaps on side-by-side panels of one display surface"
)]
pub struct Cli {
    /// Panels as NAME=PATH[,PATH...][@OFFSET]. Several paths form a playlist.
    pub panels: Vec<PanelSpec>,

    /// Surface width in pixels.
    #[arg(long, default_value_t = 128, value_parser = clap::value_parser!(u16).range(1..))]
    pub width: u16,

    /// Surface height in pixels.
    #[arg(long, default_value_t = 16, value_parser = clap::value_parser!(u16).range(1..))]
    pub height: u16,

    /// Width of one panel; panels without @OFFSET are placed at index * this.
    #[arg(long, default_value_t = 32, value_parser = clap::value_parser!(u16).range(1..))]
    pub panel_width: u16,

    /// Run for this many seconds, then exit. 0 runs until the display closes.
    #[arg(long, default_value_t = 30)]
    pub runtime_secs: u64,

    /// Render cadence in milliseconds.
    #[arg(long, default_value_t = 10)]
    pub tick_ms: u64,

    /// Delay between decodes of a panel's playlist, in milliseconds.
    #[arg(long, default_value_t = 1000)]
    pub reload_ms: u64,

    /// Cycle playlists forever (also picks up files edited on disk).
    #[arg(long, default_value_t = false)]
    pub repeat: bool,

    /// Availability file of `ROOM VALUE` pairs; panel names are the rooms.
    #[arg(long)]
    pub availability: Option<PathBuf>,

    /// How often to re-read the availability file, in seconds.
    #[arg(long, default_value_t = 30)]
    pub availability_poll_secs: u64,

    /// Write the final visible surface to this PNG.
    #[arg(long)]
    pub snapshot: Option<PathBuf>,

    /// Show the surface in a desktop window.
    #[cfg(feature = "window")]
    #[arg(long, default_value_t = false)]
    pub window: bool,

    /// Window magnification.
    #[cfg(feature = "window")]
    #[arg(long, default_value_t = 8)]
    pub scale: u8,

    /// Feed a panel with this name from the default camera.
    #[cfg(feature = "camera")]
    #[arg(long)]
    pub camera: Option<String>,

    /// More logging (-v debug, -vv trace).
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn log_level(&self) -> Level {
        match self.verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    }

    /// Where the `index`-th panel goes.
    pub fn offset_for(&self, index: usize, spec: &PanelSpec) -> i32 {
        spec.offset.unwrap_or_else(|| self.default_offset(index))
    }

    pub fn default_offset(&self, index: usize) -> i32 {
        let offset = index.saturating_mul(usize::from(self.panel_width));
        i32::try_from(offset).unwrap_or(i32::MAX)
    }

    pub fn panel_size(&self) -> (i32, i32) {
        (i32::from(self.panel_width), i32::from(self.height))
    }

    /// Surface size in pixels.
    pub fn surface_size(&self) -> (usize, usize) {
        (usize::from(self.width), usize::from(self.height))
    }

    pub fn reload_interval(&self) -> Duration {
        Duration::from_millis(self.reload_ms)
    }

    pub fn availability_interval(&self) -> Duration {
        Duration::from_secs(self.availability_poll_secs)
    }

    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            tick_interval: Duration::from_millis(self.tick_ms.max(1)),
            runtime: (self.runtime_secs > 0).then(|| Duration::from_secs(self.runtime_secs)),
        }
    }
}
