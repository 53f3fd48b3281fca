use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failure to list the items behind a URL.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Please enter a URL.")]
    EmptyUrl,

    #[error("failed to launch yt-dlp: {0}")]
    Spawn(#[source] io::Error),

    /// yt-dlp ran but exited non-zero
    #[error("{stderr}")]
    CommandFailed { code: Option<i32>, stderr: String },

    #[error("line {line_no} of the listing is not a valid entry: {source}")]
    InvalidEntry {
        line_no: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Failure while running a single item or preparing a run.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("failed to create download directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to launch yt-dlp: {0}")]
    Spawn(#[source] io::Error),

    #[error("failed to create the yt-dlp output pipe: {0}")]
    Pipe(#[source] io::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Failure to load the settings file.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings from {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid settings in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Failure to prepare the yt-dlp executable.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("failed to extract bundled yt-dlp to {}: {source}", path.display())]
    Extract {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
