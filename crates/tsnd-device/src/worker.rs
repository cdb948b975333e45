use std::thread::{self, JoinHandle};

use tracing::{debug, error};
use tsnd_transport::StopSignal;

/// What a [`LoopWorker`] body wants after one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Break,
}

/// A named background thread that runs a body until told to stop.
///
/// The body is polled repeatedly; the stop signal is checked between passes,
/// so each pass must itself return within a bounded time. Dropping the
/// worker triggers the signal and joins the thread.
pub struct LoopWorker {
    name: String,
    stop: StopSignal,
    handle: Option<JoinHandle<()>>,
}

impl LoopWorker {
    pub fn spawn<F>(name: impl Into<String>, stop: StopSignal, mut body: F) -> std::io::Result<Self>
    where
        F: FnMut() -> Flow + Send + 'static,
    {
        let name = name.into();
        let signal = stop.clone();
        let handle = thread::Builder::new().name(name.clone()).spawn(move || {
            while !signal.is_triggered() {
                if body() == Flow::Break {
                    break;
                }
            }
        })?;
        debug!(worker = %name, "worker started");
        Ok(Self {
            name,
            stop,
            handle: Some(handle),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Ask the body loop to exit after its current pass.
    pub fn stop(&self) {
        self.stop.trigger();
    }

    /// True once the thread has exited, for whatever reason.
    pub fn is_finished(&self) -> bool {
        self.handle
            .as_ref()
            .map(JoinHandle::is_finished)
            .unwrap_or(true)
    }

    /// Wait for the thread to exit. Returns `false` if it panicked.
    pub fn join(&mut self) -> bool {
        let Some(handle) = self.handle.take() else {
            return true;
        };
        match handle.join() {
            Ok(()) => {
                debug!(worker = %self.name, "worker joined");
                true
            }
            Err(_) => {
                error!(worker = %self.name, "worker panicked");
                false
            }
        }
    }
}

impl Drop for LoopWorker {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.stop();
            self.join();
        }
    }
}

impl std::fmt::Debug for LoopWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoopWorker")
            .field("name", &self.name)
            .field("finished", &self.is_finished())
            .finish()
    }
}
