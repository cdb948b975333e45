use std::io::ErrorKind;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use tracing::{debug, info, trace};

use crate::error::{Result, TransportError};
use crate::stop::StopSignal;
use crate::traits::{Connector, Link, LinkSettings};

const READ_CHUNK_SIZE: usize = 128;
const EMPTY_READ_PAUSE: Duration = Duration::from_millis(1);
const WRITER_BACKOFF: Duration = Duration::from_micros(200);

struct OpenLink {
    link: Box<dyn Link>,
    endpoint: String,
}

/// Exclusive owner of the physical channel.
///
/// Open, close, every read chunk and every write go through one lock, so a
/// write can never race a concurrent close. Reads hold the lock per chunk,
/// not per frame, and step aside while a writer is queued.
pub struct Transport {
    state: Mutex<Option<OpenLink>>,
    closing: AtomicBool,
    waiting_writers: AtomicUsize,
    stop: StopSignal,
}

impl Transport {
    /// Create a closed transport observing `stop`.
    pub fn new(stop: StopSignal) -> Self {
        Self {
            state: Mutex::new(None),
            closing: AtomicBool::new(false),
            waiting_writers: AtomicUsize::new(0),
            stop,
        }
    }

    /// The stop signal shared with every reader of this transport.
    pub fn stop_signal(&self) -> &StopSignal {
        &self.stop
    }

    /// Acquire the channel and wait `settle` for the device to stabilize.
    ///
    /// Fails with [`TransportError::AlreadyOpen`] if a channel is already owned.
    pub fn open(
        &self,
        connector: &dyn Connector,
        settings: &LinkSettings,
        settle: Duration,
    ) -> Result<()> {
        let mut state = self.lock()?;
        if let Some(open) = state.as_ref() {
            return Err(TransportError::AlreadyOpen(open.endpoint.clone()));
        }

        let link = connector.connect(settings)?;
        self.closing.store(false, Ordering::SeqCst);
        *state = Some(OpenLink {
            link,
            endpoint: settings.endpoint.clone(),
        });
        std::thread::sleep(settle);
        info!(endpoint = %settings.endpoint, "transport open");
        Ok(())
    }

    /// Raise the closing flag without touching the channel.
    ///
    /// Reads in flight observe the flag on their next chunk and return short
    /// instead of failing.
    pub fn mark_closing(&self) {
        self.closing.store(true, Ordering::SeqCst);
    }

    /// Tear down the channel, then wait `settle` before returning.
    ///
    /// The closing flag is raised before the channel is dropped and stays
    /// raised until the next `open`. Returns `false` if nothing was open.
    pub fn close(&self, settle: Duration) -> Result<bool> {
        self.mark_closing();
        let taken = self.lock()?.take();
        match taken {
            Some(open) => {
                let endpoint = open.endpoint;
                drop(open.link);
                std::thread::sleep(settle);
                info!(%endpoint, "transport closed");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn is_open(&self) -> bool {
        self.state
            .lock()
            .map(|state| state.is_some())
            .unwrap_or(false)
    }

    pub fn is_closing(&self) -> bool {
        self.closing.load(Ordering::SeqCst)
    }

    /// Endpoint of the currently open channel.
    pub fn endpoint(&self) -> Option<String> {
        self.state
            .lock()
            .ok()
            .and_then(|state| state.as_ref().map(|open| open.endpoint.clone()))
    }

    /// Block until `n` bytes are read or the stop condition is observed.
    ///
    /// Returns whatever was accumulated, which is shorter than `n` only when
    /// stopped. Per-read timeouts are idle ticks.
    pub fn read_exact(&self, n: usize) -> Result<Bytes> {
        let mut buf = BytesMut::with_capacity(n);
        let mut chunk = [0u8; READ_CHUNK_SIZE];

        while buf.len() < n && !self.should_stop() {
            let want = (n - buf.len()).min(READ_CHUNK_SIZE);
            while self.waiting_writers.load(Ordering::Acquire) > 0 {
                std::thread::sleep(WRITER_BACKOFF);
            }
            let read = {
                let mut state = self.lock()?;
                let Some(open) = state.as_mut() else {
                    if self.should_stop() {
                        break;
                    }
                    return Err(TransportError::NotOpen);
                };
                open.link.read(&mut chunk[..want])
            };

            match read {
                Ok(0) => std::thread::sleep(EMPTY_READ_PAUSE),
                Ok(read) => buf.extend_from_slice(&chunk[..read]),
                Err(err) if is_idle(err.kind()) => continue,
                Err(err) if self.should_stop() => {
                    debug!(error = %err, "read error during shutdown suppressed");
                    break;
                }
                Err(err) => return Err(TransportError::Io(err)),
            }
        }

        trace!(requested = n, got = buf.len(), "read_exact");
        Ok(buf.freeze())
    }

    /// Write a complete buffer and flush it.
    pub fn write_all(&self, data: &[u8]) -> Result<()> {
        self.waiting_writers.fetch_add(1, Ordering::AcqRel);
        let state = self.lock();
        self.waiting_writers.fetch_sub(1, Ordering::AcqRel);
        let mut state = state?;
        let open = state.as_mut().ok_or(TransportError::NotOpen)?;

        let mut offset = 0usize;
        while offset < data.len() {
            match open.link.write(&data[offset..]) {
                Ok(0) => return Err(TransportError::Io(ErrorKind::WriteZero.into())),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }

        loop {
            match open.link.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }

    fn should_stop(&self) -> bool {
        self.stop.is_triggered() || self.is_closing()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Option<OpenLink>>> {
        self.state.lock().map_err(|_| TransportError::Poisoned)
    }
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("endpoint", &self.endpoint())
            .field("closing", &self.is_closing())
            .field("stopped", &self.stop.is_triggered())
            .finish()
    }
}

fn is_idle(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted
    )
}
