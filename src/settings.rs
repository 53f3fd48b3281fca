//! User settings: a JSON file with command line overrides on top.

use std::path::{Path, PathBuf};

use clap::Parser;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::SettingsError;
use crate::model::DownloadFormat;

/// Default output directory, relative to the working directory.
pub const DEFAULT_DOWNLOAD_DIR: &str = "downloads";

/// Lines kept in the status log before the oldest are dropped.
pub const DEFAULT_MAX_LOG_LINES: usize = 5000;

const APP_DIR: &str = "ytdlp-batch-gui";
const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Explicit yt-dlp executable; bundled or `PATH` lookup when unset.
    pub ytdlp_path: Option<PathBuf>,
    /// Arguments inserted before every generated yt-dlp argument list.
    pub ytdlp_args: Vec<String>,
    pub download_dir: PathBuf,
    pub default_format: DownloadFormat,
    pub max_log_lines: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ytdlp_path: None,
            ytdlp_args: Vec::new(),
            download_dir: PathBuf::from(DEFAULT_DOWNLOAD_DIR),
            default_format: DownloadFormat::default(),
            max_log_lines: DEFAULT_MAX_LOG_LINES,
        }
    }
}

/// Command line flags.
#[derive(Debug, Default, Parser)]
#[command(name = "ytdlp-batch-gui", version, about = "Pick and download videos with yt-dlp")]
pub struct Cli {
    /// Settings file (default: <config dir>/ytdlp-batch-gui/settings.json)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// yt-dlp executable to run
    #[arg(long = "yt-dlp", value_name = "PATH")]
    pub ytdlp: Option<PathBuf>,

    /// Directory downloads are written to
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Format preselected in the window
    #[arg(long, value_enum)]
    pub format: Option<DownloadFormat>,
}

impl Settings {
    /// Reads a settings file. Missing keys fall back to defaults.
    pub fn from_file(path: &Path) -> Result<Self, SettingsError> {
        let raw = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// The file named on the command line, else the per-user file if it
    /// exists, else defaults. CLI flags are applied last.
    pub fn load(cli: &Cli) -> Result<Self, SettingsError> {
        let mut settings = match &cli.config {
            Some(path) => Self::from_file(path)?,
            None => match default_path().filter(|p| p.is_file()) {
                Some(path) => Self::from_file(&path)?,
                None => {
                    debug!("no settings file, using defaults");
                    Self::default()
                }
            },
        };
        settings.apply(cli);
        info!(?settings, "settings loaded");
        Ok(settings)
    }

    fn apply(&mut self, cli: &Cli) {
        if let Some(path) = &cli.ytdlp {
            self.ytdlp_path = Some(path.clone());
        }
        if let Some(dir) = &cli.output_dir {
            self.download_dir = dir.clone();
        }
        if let Some(format) = cli.format {
            self.default_format = format;
        }
        // A zero cap would hide every line.
        self.max_log_lines = self.max_log_lines.max(1);
    }
}

/// `<config dir>/ytdlp-batch-gui/settings.json`, when the platform has a config dir.
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(SETTINGS_FILE))
}
