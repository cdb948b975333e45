use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::response::Response;

/// Unbounded multi-producer queue of decoded responses.
///
/// Clones share the same queue. `push` never blocks, so the router is never
/// held up by a slow consumer.
#[derive(Clone, Default)]
pub struct ResponseQueue {
    inner: Arc<Shared>,
}

#[derive(Default)]
struct Shared {
    items: Mutex<VecDeque<Response>>,
    ready: Condvar,
}

impl ResponseQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, response: Response) {
        self.items().push_back(response);
        self.inner.ready.notify_one();
    }

    /// Wait up to `timeout` for the next response.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<Response> {
        let deadline = Instant::now().checked_add(timeout);
        let mut items = self.items();
        loop {
            if let Some(response) = items.pop_front() {
                return Some(response);
            }
            // A timeout past the end of `Instant` waits without a deadline.
            let remaining = match deadline {
                Some(deadline) => deadline.checked_duration_since(Instant::now())?,
                None => timeout,
            };
            if remaining.is_zero() {
                return None;
            }
            items = self
                .inner
                .ready
                .wait_timeout(items, remaining)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    pub fn try_recv(&self) -> Option<Response> {
        self.items().pop_front()
    }

    /// Remove and return everything queued.
    pub fn drain(&self) -> Vec<Response> {
        self.items().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.items().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items().is_empty()
    }

    /// True if both handles refer to the same queue.
    pub fn same_queue(&self, other: &ResponseQueue) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn items(&self) -> MutexGuard<'_, VecDeque<Response>> {
        self.inner.items.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for ResponseQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseQueue").field("len", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    #[test]
    fn fifo_order() {
        let queue = ResponseQueue::new();
        queue.push(Response::Ack(0));
        queue.push(Response::Ack(1));
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.try_recv(), Some(Response::Ack(0)));
        assert_eq!(queue.try_recv(), Some(Response::Ack(1)));
        assert!(queue.is_empty());
    }

    #[test]
    fn recv_timeout_expires_when_empty() {
        let queue = ResponseQueue::new();
        let started = Instant::now();
        assert_eq!(queue.recv_timeout(Duration::from_millis(20)), None);
        assert!(started.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn recv_timeout_wakes_on_push_from_another_thread() {
        let queue = ResponseQueue::new();
        let producer = queue.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            producer.push(Response::RecordingStarted);
        });
        assert_eq!(
            queue.recv_timeout(Duration::from_secs(2)),
            Some(Response::RecordingStarted)
        );
        handle.join().unwrap();
    }

    #[test]
    fn unbounded_timeout_waits_for_push() {
        let queue = ResponseQueue::new();
        let producer = queue.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            producer.push(Response::RecordingStopped);
        });
        assert_eq!(
            queue.recv_timeout(Duration::MAX),
            Some(Response::RecordingStopped)
        );
        handle.join().unwrap();

        queue.push(Response::Ack(0));
        assert_eq!(queue.recv_timeout(Duration::MAX), Some(Response::Ack(0)));
    }

    #[test]
    fn drain_empties_every_clone() {
        let queue = ResponseQueue::new();
        let other = queue.clone();
        queue.push(Response::SavedEntryEnd);
        queue.push(Response::SavedEntryCount(3));
        assert_eq!(other.drain().len(), 2);
        assert!(queue.is_empty());
        assert!(queue.same_queue(&other));
        assert!(!queue.same_queue(&ResponseQueue::new()));
    }
}
