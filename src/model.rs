use std::fmt;

use serde::{Deserialize, Serialize};

/// Title shown when yt-dlp reports an entry without one
pub const UNTITLED: &str = "Untitled";

/// One downloadable entry reported by yt-dlp
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    /// Opaque video identifier (e.g. `dQw4w9WgXcQ`)
    pub id: String,
    /// Human-readable title
    pub title: String,
}

/// Canonical watch URL handed to the download command
pub fn watch_url(id: &str) -> String {
    format!("https://www.youtube.com/watch?v={id}")
}

/// An item as shown in the list, with its checkbox state
#[derive(Debug, Clone)]
pub struct ListedItem {
    pub item: Item,
    /// Selected by default after every fetch
    pub selected: bool,
}

impl From<Item> for ListedItem {
    fn from(item: Item) -> Self {
        Self { item, selected: true }
    }
}

/// Container requested for a whole run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DownloadFormat {
    /// Best video+audio, merged into mp4 where possible
    #[default]
    Mp4,
    /// Audio only, extracted to mp3
    Mp3,
}

impl DownloadFormat {
    pub const ALL: [DownloadFormat; 2] = [DownloadFormat::Mp4, DownloadFormat::Mp3];

    pub fn label(self) -> &'static str {
        match self {
            DownloadFormat::Mp4 => "mp4",
            DownloadFormat::Mp3 => "mp3",
        }
    }
}

impl fmt::Display for DownloadFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// How a single item's download ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOutcome {
    /// The run was stopped while this item was active
    Stopped,
    /// yt-dlp exited with code 0
    Succeeded,
    /// yt-dlp exited non-zero; `None` when it was killed by a signal
    Failed { code: Option<i32> },
}

/// Enablement of the three triggers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Controls {
    pub fetch_enabled: bool,
    pub download_enabled: bool,
    pub stop_enabled: bool,
}

impl Controls {
    pub const IDLE: Controls = Controls {
        fetch_enabled: true,
        download_enabled: true,
        stop_enabled: false,
    };
}

impl Default for Controls {
    fn default() -> Self {
        Self::IDLE
    }
}

/// Position of the running download, for the progress bar
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunProgress {
    /// 1-based index of the active item
    pub index: usize,
    pub total: usize,
    /// Last percentage (0.0 to 1.0) reported for the active item
    pub percent: Option<f32>,
}

impl RunProgress {
    /// Fraction of the whole run, counting the active item's partial progress
    pub fn overall(&self) -> f32 {
        if self.total == 0 {
            return 0.0;
        }
        let done = self.index.saturating_sub(1) as f32 + self.percent.unwrap_or(0.0);
        (done / self.total as f32).clamp(0.0, 1.0)
    }
}
