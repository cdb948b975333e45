use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared cooperative stop flag.
///
/// Observed by the transport read loop, the response router and every
/// blocking response wait. Nothing is interrupted forcibly; each loop checks
/// the flag between bounded waits.
#[derive(Clone, Debug, Default)]
pub struct StopSignal {
    flag: Arc<AtomicBool>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request every observer to wind down.
    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Re-arm the signal for a new connection.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_state() {
        let a = StopSignal::new();
        let b = a.clone();
        assert!(!b.is_triggered());

        a.trigger();
        assert!(b.is_triggered());

        b.reset();
        assert!(!a.is_triggered());
    }
}
