use std::sync::Arc;

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

use crate::model::Item;

/// Messages from background workers, applied on the UI thread.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerEvent {
    /// A line for the status log
    Log(String),
    /// A fetch produced this listing (possibly empty)
    Listing(Vec<Item>),
    /// The fetch worker ended, however it ended
    FetchFinished,
    /// Item `index` of `total` (1-based) is starting
    ItemStarted { index: usize, total: usize },
    /// Completion fraction parsed from the active item's output
    Progress(f32),
    /// The download worker ended, however it ended
    RunFinished,
}

/// Asks the UI to redraw after an event was queued.
pub type Repaint = Arc<dyn Fn() + Send + Sync>;

/// Sending half handed to workers.
#[derive(Clone)]
pub struct EventSink {
    tx: UnboundedSender<WorkerEvent>,
    repaint: Repaint,
}

impl EventSink {
    pub fn emit(&self, event: WorkerEvent) {
        // The receiver only disappears when the window is closing.
        if self.tx.send(event).is_ok() {
            (self.repaint)();
        }
    }

    pub fn log(&self, message: impl Into<String>) {
        self.emit(WorkerEvent::Log(message.into()));
    }
}

pub fn channel(repaint: Repaint) -> (EventSink, UnboundedReceiver<WorkerEvent>) {
    let (tx, rx) = unbounded_channel();
    (EventSink { tx, repaint }, rx)
}

/// Emits `event` when dropped, so a worker signals its end on every exit
/// path, including a panic.
pub struct EmitOnDrop {
    sink: EventSink,
    event: Option<WorkerEvent>,
}

impl EmitOnDrop {
    pub fn new(sink: EventSink, event: WorkerEvent) -> Self {
        Self {
            sink,
            event: Some(event),
        }
    }
}

impl Drop for EmitOnDrop {
    fn drop(&mut self) {
        if let Some(event) = self.event.take() {
            self.sink.emit(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn emit_requests_repaint() {
        let repaints = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&repaints);
        let (sink, mut rx) = channel(Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        sink.log("hello");
        assert_eq!(rx.try_recv().ok(), Some(WorkerEvent::Log("hello".into())));
        assert_eq!(repaints.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn guard_fires_once_on_unwind() {
        let (sink, mut rx) = channel(Arc::new(|| {}));
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = EmitOnDrop::new(sink, WorkerEvent::FetchFinished);
            panic!("worker blew up");
        }));
        assert!(result.is_err());
        assert_eq!(rx.try_recv().ok(), Some(WorkerEvent::FetchFinished));
        assert!(rx.try_recv().is_err());
    }
}
