//! Locating the yt-dlp executable and building its command lines.

use std::{
    ffi::OsString,
    fs::File,
    io::{self, Write},
    path::{Path, PathBuf},
    process::Stdio,
};

use os_pipe::PipeReader;
use rust_embed::RustEmbed;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::ToolError;
use crate::model::DownloadFormat;

/// Optional yt-dlp binaries shipped inside the executable.
#[derive(RustEmbed)]
#[folder = "assets/"]
pub struct Asset;

/// Format selector for video runs: merged mp4 first, then any mp4, then anything.
pub const VIDEO_FORMAT_SELECTOR: &str = "bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best";

/// Output template, relative to the download directory.
pub const OUTPUT_TEMPLATE: &str = "%(title)s.%(ext)s";

const BIN: &str = if cfg!(target_os = "windows") { "yt-dlp.exe" } else { "yt-dlp" };

/// The resolved way to invoke yt-dlp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tool {
    program: PathBuf,
    leading_args: Vec<OsString>,
}

impl Tool {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            leading_args: Vec::new(),
        }
    }

    /// Arguments placed before every generated argument list
    /// (e.g. `python3 -m yt_dlp`).
    pub fn with_leading_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.leading_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Picks the executable: an explicit path wins, then a bundled binary,
    /// then whatever `yt-dlp` resolves to on `PATH`.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, ToolError> {
        if let Some(path) = explicit {
            info!(path = %path.display(), "using configured yt-dlp");
            return Ok(Self::new(path));
        }

        if let Some(data) = Asset::get(BIN) {
            let tmp = std::env::temp_dir().join(BIN);
            if !tmp.exists() {
                extract(&tmp, &data.data).map_err(|source| ToolError::Extract {
                    path: tmp.clone(),
                    source,
                })?;
            }
            info!(path = %tmp.display(), "using bundled yt-dlp");
            return Ok(Self::new(tmp));
        }

        match which::which(BIN) {
            Ok(found) => info!(path = %found.display(), "using yt-dlp from PATH"),
            Err(_) => warn!("{BIN} was not found on PATH; fetches and downloads will fail"),
        }
        Ok(Self::new(BIN))
    }

    /// A command for the given yt-dlp arguments, with output captured.
    pub fn command<I, S>(&self, args: I) -> Command
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        let args: Vec<OsString> = args.into_iter().map(Into::into).collect();
        debug!(program = %self.program.display(), ?args, "building yt-dlp command");

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.leading_args)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    /// Like [`Tool::command`], but stdout and stderr share one pipe, so the
    /// returned reader sees both in the order the process wrote them.
    pub fn combined_command<I, S>(&self, args: I) -> io::Result<(Command, PipeReader)>
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        let (reader, writer) = os_pipe::pipe()?;
        let writer_err = writer.try_clone()?;
        let mut cmd = self.command(args);
        cmd.stdout(writer).stderr(writer_err);
        Ok((cmd, reader))
    }
}

fn extract(path: &Path, data: &[u8]) -> io::Result<()> {
    let mut f = File::create(path)?;
    f.write_all(data)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))?;
    }
    Ok(())
}

/// Arguments for listing a URL as one JSON object per line.
pub fn listing_args(url: &str) -> Vec<OsString> {
    vec![
        "--dump-json".into(),
        // ignore errors on individual playlist entries
        "-i".into(),
        "--flat-playlist".into(),
        url.into(),
    ]
}

/// Arguments for downloading one item in the given format.
pub fn download_args(format: DownloadFormat, output_dir: &Path, url: &str) -> Vec<OsString> {
    let output = output_dir.join(OUTPUT_TEMPLATE).into_os_string();
    let mut args: Vec<OsString> = match format {
        DownloadFormat::Mp3 => vec!["-x".into(), "--audio-format".into(), "mp3".into()],
        DownloadFormat::Mp4 => vec!["-f".into(), VIDEO_FORMAT_SELECTOR.into()],
    };
    args.push("--output".into());
    args.push(output);
    args.push(url.into());
    args
}
