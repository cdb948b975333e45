use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use tracing::{debug, error, trace};
use tsnd_frame::{decode_frame, FrameError, ResponseCategory};
use tsnd_transport::{StopSignal, Transport};

use crate::queue::ResponseQueue;
use crate::response::Response;
use crate::worker::{Flow, LoopWorker};

/// Categories the facade blocks on. They get a queue from the start so a
/// reply is never dropped for lack of a sink.
pub const AWAITED_CATEGORIES: &[ResponseCategory] = &[
    ResponseCategory::Simple,
    ResponseCategory::Time,
    ResponseCategory::RecordingTimeSettings,
    ResponseCategory::AccRange,
    ResponseCategory::OptionButtonBehavior,
    ResponseCategory::OverwriteProtection,
    ResponseCategory::SavedEntryNum,
    ResponseCategory::SavedEntryInfo,
    ResponseCategory::SavedEntryEnd,
    ResponseCategory::Mode,
    ResponseCategory::StartRecording,
    ResponseCategory::StopRecording,
];

/// Maps each response category to the queue its responses go to.
///
/// Categories without a sink are discarded. Safe to mutate while the router
/// is running; the last registration for a category wins.
#[derive(Debug)]
pub struct SinkRegistry {
    sinks: RwLock<HashMap<ResponseCategory, ResponseQueue>>,
}

impl Default for SinkRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SinkRegistry {
    /// Registry with a queue for every awaited category and telemetry discarded.
    pub fn new() -> Self {
        let sinks = AWAITED_CATEGORIES
            .iter()
            .map(|category| (*category, ResponseQueue::new()))
            .collect();
        Self {
            sinks: RwLock::new(sinks),
        }
    }

    /// Registry with no sinks at all.
    pub fn empty() -> Self {
        Self {
            sinks: RwLock::new(HashMap::new()),
        }
    }

    /// Replace the sink for `category`; `None` resets it to discard.
    ///
    /// Returns the previously registered queue.
    pub fn set_sink(
        &self,
        category: ResponseCategory,
        sink: Option<ResponseQueue>,
    ) -> Option<ResponseQueue> {
        let mut sinks = self.sinks.write().unwrap_or_else(PoisonError::into_inner);
        debug!(%category, registered = sink.is_some(), "sink updated");
        match sink {
            Some(queue) => sinks.insert(category, queue),
            None => sinks.remove(&category),
        }
    }

    pub fn sink(&self, category: ResponseCategory) -> Option<ResponseQueue> {
        self.sinks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&category)
            .cloned()
    }

    /// Deliver `response` to its category's sink. Returns `false` if discarded.
    pub fn dispatch(&self, response: Response) -> bool {
        let category = response.category();
        match self.sink(category) {
            Some(queue) => {
                queue.push(response);
                true
            }
            None => {
                trace!(%category, "no sink; response discarded");
                false
            }
        }
    }

    /// Drain every registered sink, keeping the registrations.
    ///
    /// Returns the number of responses dropped.
    pub fn clear_all_pending(&self) -> usize {
        let sinks = self.sinks.read().unwrap_or_else(PoisonError::into_inner);
        sinks.values().map(|queue| queue.drain().len()).sum()
    }
}

/// Observable state of the background reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouterStatus {
    Running,
    /// Exited because it was asked to.
    Stopped,
    /// Exited on a protocol violation or channel failure.
    Failed(String),
}

/// The background task that decodes frames and dispatches them.
#[derive(Debug)]
pub struct Router {
    worker: LoopWorker,
    status: Arc<Mutex<RouterStatus>>,
}

impl Router {
    /// Start routing frames from `transport` into `registry`.
    ///
    /// While the transport is closing or not open the router idles for
    /// `idle_backoff` per pass. A decode or channel failure ends the router
    /// with [`RouterStatus::Failed`] unless the transport is closing, in which
    /// case it is an expected side effect of teardown.
    pub fn spawn(
        transport: Arc<Transport>,
        registry: Arc<SinkRegistry>,
        stop: StopSignal,
        idle_backoff: Duration,
    ) -> std::io::Result<Self> {
        let status = Arc::new(Mutex::new(RouterStatus::Running));
        let shared = Arc::clone(&status);
        let signal = stop.clone();
        let mut frames = 0u64;

        let worker = LoopWorker::spawn("tsnd-router", stop, move || {
            if transport.is_closing() || !transport.is_open() {
                std::thread::sleep(idle_backoff);
                return Flow::Continue;
            }

            match decode_frame(&mut transport.as_ref()) {
                Ok(frame) => {
                    frames += 1;
                    trace!(category = %frame.category, len = frame.payload.len(), "frame");
                    registry.dispatch(Response::from_frame(frame));
                    Flow::Continue
                }
                Err(FrameError::Stopped) => Flow::Continue,
                Err(err) if transport.is_closing() || signal.is_triggered() => {
                    debug!(error = %err, "decode error during shutdown suppressed");
                    Flow::Continue
                }
                Err(err) => {
                    error!(error = %err, frames, "response router failed");
                    set_status(&shared, RouterStatus::Failed(err.to_string()));
                    Flow::Break
                }
            }
        })?;

        Ok(Self { worker, status })
    }

    pub fn status(&self) -> RouterStatus {
        let status = self.status.lock().unwrap_or_else(PoisonError::into_inner).clone();
        if status == RouterStatus::Running && self.worker.is_finished() {
            return RouterStatus::Stopped;
        }
        status
    }

    /// Stop the router and wait for it to exit.
    pub fn shutdown(&mut self) {
        self.worker.stop();
        if !self.worker.join() {
            set_status(&self.status, RouterStatus::Failed("router panicked".into()));
        }
        let mut status = self.status.lock().unwrap_or_else(PoisonError::into_inner);
        if *status == RouterStatus::Running {
            *status = RouterStatus::Stopped;
        }
    }
}

fn set_status(status: &Mutex<RouterStatus>, value: RouterStatus) {
    *status.lock().unwrap_or_else(PoisonError::into_inner) = value;
}
