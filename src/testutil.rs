//! A scripted stand-in for yt-dlp, run through `sh` so no file needs to be executable.

use std::path::PathBuf;

use tempfile::TempDir;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::{events::WorkerEvent, ytdlp::Tool};

pub struct FakeYtDlp {
    dir: TempDir,
    script: PathBuf,
    calls: PathBuf,
}

impl FakeYtDlp {
    /// `listing` runs for `--dump-json` invocations, `download` for every other
    /// one. Both see the last argument (the URL) as `$last`.
    pub fn new(listing: &str, download: &str) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let script = dir.path().join("yt-dlp.sh");
        let calls = dir.path().join("calls.log");
        let body = format!(
            r#"for last; do :; done
calls='{calls}'
if [ "$1" = "--dump-json" ]; then
  echo "list $*" >> "$calls"
  {listing}
  exit 0
fi
echo "start $*" >> "$calls"
trap 'echo "end" >> "$calls"' EXIT
{download}
"#,
            calls = calls.display(),
        );
        std::fs::write(&script, body).expect("write fake yt-dlp");
        Self { dir, script, calls }
    }

    pub fn tool(&self) -> Tool {
        Tool::new("sh").with_leading_args([self.script.clone()])
    }

    pub fn output_dir(&self) -> PathBuf {
        self.dir.path().join("downloads")
    }

    pub fn calls(&self) -> Vec<String> {
        std::fs::read_to_string(&self.calls)
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    pub fn listing_calls(&self) -> usize {
        self.calls().iter().filter(|l| l.starts_with("list ")).count()
    }

    /// Download invocations as full argument lines, in start order.
    pub fn download_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|l| l.strip_prefix("start ").map(str::to_string))
            .collect()
    }

    /// Tail of each download URL (`watch?v=<id>`), in start order.
    pub fn invoked_urls(&self) -> Vec<String> {
        self.download_calls()
            .iter()
            .filter_map(|l| l.rsplit('/').next().map(str::to_string))
            .collect()
    }

    /// Every download start is followed by its end before the next start.
    pub fn strictly_sequential(&self) -> bool {
        let marks: Vec<bool> = self
            .calls()
            .iter()
            .filter(|l| !l.starts_with("list "))
            .map(|l| l.starts_with("start "))
            .collect();
        marks.chunks(2).all(|pair| pair == [true, false])
    }
}

pub fn drain(rx: &mut UnboundedReceiver<WorkerEvent>) -> Vec<WorkerEvent> {
    let mut events = Vec::new();
    while let Ok(ev) = rx.try_recv() {
        events.push(ev);
    }
    events
}
