use std::{
    io::{self, BufRead},
    path::PathBuf,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
};

use os_pipe::PipeReader;
use tokio::{
    process::Child,
    sync::{
        Notify,
        mpsc::{UnboundedReceiver, unbounded_channel},
    },
};
use tracing::{debug, info, warn};

use crate::{
    error::DownloadError,
    events::{EmitOnDrop, EventSink, WorkerEvent},
    model::{DownloadFormat, ItemOutcome, watch_url},
    progress::parse_progress_from_line,
    ytdlp::{Tool, download_args},
};

/// What one run downloads.
#[derive(Debug, Clone)]
pub struct DownloadPlan {
    /// Selected ids, in list order
    pub ids: Vec<String>,
    pub format: DownloadFormat,
    /// Created (recursively) before the first item starts
    pub output_dir: PathBuf,
}

/// The yt-dlp process currently working on an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveProcess {
    pub item_id: String,
    pub pid: Option<u32>,
}

#[derive(Default)]
struct RunShared {
    stop_requested: AtomicBool,
    active: Mutex<Option<ActiveProcess>>,
    wake: Notify,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Worker side of a run: owns the stop flag and the active-process slot.
pub struct RunContext {
    shared: Arc<RunShared>,
}

/// Controller side of a run.
#[derive(Clone)]
pub struct RunHandle {
    shared: Arc<RunShared>,
}

/// Result of [`RunHandle::request_stop`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopRequest {
    /// The worker will terminate the process working on `item_id`
    Terminating { item_id: String },
    /// Nothing is running right now; the queue halts before the next item
    NoActiveProcess,
}

/// A fresh run with a cleared stop flag.
pub fn new_run() -> (RunContext, RunHandle) {
    let shared = Arc::new(RunShared::default());
    (
        RunContext {
            shared: Arc::clone(&shared),
        },
        RunHandle { shared },
    )
}

impl RunHandle {
    /// Flags the run as stopped only while a process is active; otherwise
    /// nothing changes and the queue carries on.
    pub fn request_stop(&self) -> StopRequest {
        let active = lock(&self.shared.active);
        match active.as_ref() {
            Some(active) => {
                debug!(item_id = %active.item_id, pid = ?active.pid, "stop requested");
                self.shared.stop_requested.store(true, Ordering::SeqCst);
                self.shared.wake.notify_one();
                StopRequest::Terminating {
                    item_id: active.item_id.clone(),
                }
            }
            None => StopRequest::NoActiveProcess,
        }
    }

    pub fn is_active(&self) -> bool {
        lock(&self.shared.active).is_some()
    }

    pub fn stop_requested(&self) -> bool {
        self.shared.stop_requested.load(Ordering::SeqCst)
    }
}

impl RunContext {
    fn stop_requested(&self) -> bool {
        self.shared.stop_requested.load(Ordering::SeqCst)
    }

    fn set_active(&self, active: Option<ActiveProcess>) {
        *lock(&self.shared.active) = active;
    }

    /// Resolves once a stop has been requested.
    async fn stopped(&self) {
        loop {
            if self.stop_requested() {
                return;
            }
            self.shared.wake.notified().await;
        }
    }
}

/// Counts of what a run did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub succeeded: usize,
    pub failed: usize,
    /// The queue was cut short by a stop request
    pub stopped: bool,
}

/// Downloads every id in `plan`, one yt-dlp process at a time.
///
/// Every line the tool prints is forwarded to `sink` as it arrives.
/// [`WorkerEvent::RunFinished`] is emitted on every exit path.
pub async fn run_downloads(
    tool: &Tool,
    plan: DownloadPlan,
    ctx: RunContext,
    sink: EventSink,
) -> RunSummary {
    let _finished = EmitOnDrop::new(sink.clone(), WorkerEvent::RunFinished);
    let mut summary = RunSummary::default();
    let total = plan.ids.len();

    sink.log(format!(
        "Starting download of {total} videos in '{}' format...",
        plan.format
    ));

    if let Err(source) = tokio::fs::create_dir_all(&plan.output_dir).await {
        let err = DownloadError::CreateDir {
            path: plan.output_dir.clone(),
            source,
        };
        warn!(error = %err, "cannot prepare output directory");
        sink.log(format!("An error occurred during download: {err}"));
        sink.log("Download process finished.");
        return summary;
    }

    for (idx, id) in plan.ids.iter().enumerate() {
        if ctx.stop_requested() {
            sink.log("Download process stopped by user.");
            summary.stopped = true;
            break;
        }

        sink.log(format!("Downloading video {}/{total} (ID: {id})...", idx + 1));
        sink.emit(WorkerEvent::ItemStarted {
            index: idx + 1,
            total,
        });

        match download_item(tool, &plan, id, &ctx, &sink).await {
            Ok(ItemOutcome::Stopped) => {
                sink.log(format!("Stopped download for video ID: {id}"));
            }
            Ok(ItemOutcome::Succeeded) => {
                summary.succeeded += 1;
                sink.log(format!("Successfully downloaded video ID: {id}"));
            }
            Ok(ItemOutcome::Failed { code }) => {
                summary.failed += 1;
                let code = code.map_or_else(|| "none (killed by signal)".to_string(), |c| c.to_string());
                sink.log(format!(
                    "Error downloading video ID: {id}. yt-dlp exited with code {code}"
                ));
            }
            Err(err) => {
                summary.failed += 1;
                warn!(%id, error = %err, "download failed unexpectedly");
                sink.log(format!("An error occurred during download: {err}"));
            }
        }

        ctx.set_active(None);
    }

    // A stop that landed while the last item was finishing still ends the run as stopped.
    summary.stopped |= ctx.stop_requested();
    info!(?summary, "download run finished");
    sink.log("Download process finished.");
    summary
}

async fn download_item(
    tool: &Tool,
    plan: &DownloadPlan,
    id: &str,
    ctx: &RunContext,
    sink: &EventSink,
) -> Result<ItemOutcome, DownloadError> {
    let url = watch_url(id);
    let (mut cmd, reader) = tool
        .combined_command(download_args(plan.format, &plan.output_dir, &url))
        .map_err(DownloadError::Pipe)?;
    let spawned = cmd.spawn();
    // The command holds our copies of the write end; EOF needs them gone.
    drop(cmd);
    let mut child = spawned.map_err(DownloadError::Spawn)?;

    debug!(%id, pid = ?child.id(), "yt-dlp started");
    ctx.set_active(Some(ActiveProcess {
        item_id: id.to_string(),
        pid: child.id(),
    }));

    let mut output = read_segments(reader)?;

    loop {
        tokio::select! {
            biased;
            _ = ctx.stopped() => {
                info!(%id, "terminating yt-dlp");
                terminate(&mut child)?;
                break;
            }
            segment = output.recv() => match segment {
                Some(Ok(bytes)) => relay(sink, &bytes),
                Some(Err(err)) => return Err(err.into()),
                None => break,
            },
        }
    }

    // The reader thread exits on EOF once the process is gone.
    drop(output);

    let status = child.wait().await?;
    debug!(%id, ?status, "yt-dlp exited");

    Ok(if ctx.stop_requested() {
        ItemOutcome::Stopped
    } else if status.success() {
        ItemOutcome::Succeeded
    } else {
        ItemOutcome::Failed {
            code: status.code(),
        }
    })
}

/// Reads the combined stdout/stderr pipe on its own thread, one `\n`-terminated
/// segment at a time, so lines keep the order the process wrote them in.
fn read_segments(reader: PipeReader) -> io::Result<UnboundedReceiver<io::Result<Vec<u8>>>> {
    let (tx, rx) = unbounded_channel();
    std::thread::Builder::new()
        .name("yt-dlp-output".into())
        .spawn(move || {
            let mut reader = io::BufReader::new(reader);
            loop {
                let mut segment = Vec::new();
                match reader.read_until(b'\n', &mut segment) {
                    Ok(0) => break,
                    Ok(_) => {
                        if tx.send(Ok(segment)).is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        let _ = tx.send(Err(err));
                        break;
                    }
                }
            }
        })?;
    Ok(rx)
}

/// Forwards one raw output segment. yt-dlp redraws its progress line with `\r`,
/// so each redraw becomes its own log line.
fn relay(sink: &EventSink, bytes: &[u8]) {
    let text = String::from_utf8_lossy(bytes);
    for line in text.split('\r').map(str::trim_end).filter(|l| !l.is_empty()) {
        if let Some(pct) = parse_progress_from_line(line) {
            sink.emit(WorkerEvent::Progress(pct));
        }
        sink.log(line);
    }
}

/// Sends the cooperative termination request: SIGTERM on Unix.
fn terminate(child: &mut Child) -> io::Result<()> {
    #[cfg(unix)]
    {
        use nix::sys::signal::{self, Signal};
        use nix::unistd::Pid;

        // Already reaped.
        let Some(pid) = child.id() else {
            return Ok(());
        };
        match signal::kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
            Ok(()) | Err(nix::errno::Errno::ESRCH) => Ok(()),
            Err(e) => Err(io::Error::other(e)),
        }
    }

    #[cfg(not(unix))]
    {
        // Windows has no SIGTERM equivalent.
        child.start_kill()
    }
}
