//! UI-thread state: the listing, the log, trigger enablement and the active run.
//!
//! Workers never touch this state directly. They send [`WorkerEvent`]s which
//! [`Controller::poll`] applies once per frame.

use std::{collections::VecDeque, path::PathBuf, sync::Arc};

use tokio::{runtime::Handle, sync::mpsc::UnboundedReceiver};
use tracing::debug;

use crate::{
    downloader::{DownloadPlan, RunHandle, StopRequest, new_run, run_downloads},
    error::FetchError,
    events::{EmitOnDrop, EventSink, Repaint, WorkerEvent, channel},
    fetcher::fetch_items,
    model::{Controls, DownloadFormat, ListedItem, RunProgress},
    settings::Settings,
    ytdlp::Tool,
};

pub struct Controller {
    runtime: Handle,
    tool: Arc<Tool>,
    sink: EventSink,
    events: UnboundedReceiver<WorkerEvent>,
    /// Contents of the URL field
    pub url: String,
    /// Format used by the next run
    pub format: DownloadFormat,
    /// Directory used by the next run
    pub output_dir: PathBuf,
    items: Vec<ListedItem>,
    log: VecDeque<String>,
    max_log_lines: usize,
    controls: Controls,
    run: Option<RunHandle>,
    progress: Option<RunProgress>,
}

impl Controller {
    pub fn new(runtime: Handle, tool: Tool, settings: &Settings, repaint: Repaint) -> Self {
        let (sink, events) = channel(repaint);
        Self {
            runtime,
            tool: Arc::new(tool),
            sink,
            events,
            url: String::new(),
            format: settings.default_format,
            output_dir: settings.download_dir.clone(),
            items: Vec::new(),
            log: VecDeque::new(),
            max_log_lines: settings.max_log_lines.max(1),
            controls: Controls::IDLE,
            run: None,
            progress: None,
        }
    }

    /// Lists the URL in the background, replacing the current listing.
    pub fn fetch(&mut self) {
        let url = self.url.trim().to_string();
        if url.is_empty() {
            self.push_log(FetchError::EmptyUrl.to_string());
            return;
        }
        if !self.controls.fetch_enabled {
            return;
        }
        if self.run.is_some() {
            self.push_log("Wait for the current download to finish before fetching.");
            return;
        }

        self.push_log(format!("Fetching videos from: {url}..."));
        self.controls.fetch_enabled = false;
        self.items.clear();

        let tool = Arc::clone(&self.tool);
        let sink = self.sink.clone();
        self.runtime.spawn(async move {
            let _done = EmitOnDrop::new(sink.clone(), WorkerEvent::FetchFinished);
            match fetch_items(&tool, &url).await {
                Ok(items) => sink.emit(WorkerEvent::Listing(items)),
                Err(FetchError::CommandFailed { code, stderr }) => {
                    debug!(?code, "listing command failed");
                    sink.log(format!("Error fetching videos: {stderr}"));
                }
                Err(err) => sink.log(format!("An unexpected error occurred: {err}")),
            }
        });
    }

    /// Starts a run over the selected items.
    pub fn download(&mut self) {
        if self.run.is_some() || !self.controls.download_enabled {
            return;
        }
        let ids = self.selected_ids();
        if ids.is_empty() {
            self.push_log("No videos selected for download.");
            return;
        }

        self.controls.download_enabled = false;
        self.controls.stop_enabled = true;
        self.progress = Some(RunProgress {
            index: 0,
            total: ids.len(),
            percent: None,
        });

        let (ctx, handle) = new_run();
        self.run = Some(handle);

        let plan = DownloadPlan {
            ids,
            format: self.format,
            output_dir: self.output_dir.clone(),
        };
        let tool = Arc::clone(&self.tool);
        let sink = self.sink.clone();
        self.runtime.spawn(async move {
            run_downloads(&tool, plan, ctx, sink).await;
        });
    }

    /// Requests a cooperative stop of the active run. Disables the trigger
    /// either way; with no yt-dlp process running it only logs.
    pub fn stop(&mut self) {
        if !self.controls.stop_enabled {
            debug!("stop ignored, trigger disabled");
            return;
        }
        self.controls.stop_enabled = false;

        match self.run.as_ref().map(RunHandle::request_stop) {
            Some(StopRequest::Terminating { item_id }) => {
                debug!(%item_id, "stop requested");
                self.push_log("Stopping download...");
            }
            Some(StopRequest::NoActiveProcess) | None => {
                self.push_log("No active download to stop.");
            }
        }
    }

    /// Applies queued worker events. Returns how many were applied.
    pub fn poll(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.events.try_recv() {
            self.apply(event);
            applied += 1;
        }
        applied
    }

    fn apply(&mut self, event: WorkerEvent) {
        match event {
            WorkerEvent::Log(line) => self.push_log(line),
            WorkerEvent::Listing(items) => {
                if items.is_empty() {
                    self.push_log("No videos found at the URL.");
                } else {
                    self.push_log(format!("Found {} videos.", items.len()));
                    self.items = items.into_iter().map(ListedItem::from).collect();
                }
            }
            WorkerEvent::FetchFinished => self.controls.fetch_enabled = true,
            WorkerEvent::ItemStarted { index, total } => {
                self.progress = Some(RunProgress {
                    index,
                    total,
                    percent: None,
                });
            }
            WorkerEvent::Progress(pct) => {
                if let Some(progress) = &mut self.progress {
                    progress.percent = Some(pct);
                }
            }
            WorkerEvent::RunFinished => {
                self.controls.download_enabled = true;
                self.controls.stop_enabled = false;
                self.run = None;
                self.progress = None;
            }
        }
    }

    fn push_log(&mut self, line: impl Into<String>) {
        let line = line.into();
        debug!(%line, "status");
        self.log.push_back(line);
        while self.log.len() > self.max_log_lines {
            self.log.pop_front();
        }
    }

    pub fn items(&self) -> &[ListedItem] {
        &self.items
    }

    pub fn items_mut(&mut self) -> &mut [ListedItem] {
        &mut self.items
    }

    pub fn select_all(&mut self, selected: bool) {
        self.items.iter_mut().for_each(|i| i.selected = selected);
    }

    pub fn selected_ids(&self) -> Vec<String> {
        self.items
            .iter()
            .filter(|i| i.selected)
            .map(|i| i.item.id.clone())
            .collect()
    }

    pub fn log_lines(&self) -> impl Iterator<Item = &str> {
        self.log.iter().map(String::as_str)
    }

    pub fn clear_log(&mut self) {
        self.log.clear();
    }

    pub fn controls(&self) -> Controls {
        self.controls
    }

    pub fn progress(&self) -> Option<RunProgress> {
        self.progress
    }

    pub fn is_running(&self) -> bool {
        self.run.is_some()
    }

    /// A stop was requested and the run has not wound down yet.
    pub fn is_stopping(&self) -> bool {
        self.run.as_ref().is_some_and(RunHandle::stop_requested)
    }

    /// A yt-dlp process is working on an item right now.
    pub fn has_active_process(&self) -> bool {
        self.run.as_ref().is_some_and(RunHandle::is_active)
    }
}
