use std::time::Duration;

use crate::queue::ResponseQueue;
use crate::telemetry::TelemetrySample;

/// Accepts decoded inertial samples for persistence or display.
pub trait TelemetrySink {
    fn write_sample(&mut self, sample: &TelemetrySample) -> std::io::Result<()>;

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<F> TelemetrySink for F
where
    F: FnMut(&TelemetrySample) -> std::io::Result<()>,
{
    fn write_sample(&mut self, sample: &TelemetrySample) -> std::io::Result<()> {
        self(sample)
    }
}

/// Yes/no prompt consulted before destructive operations.
pub trait Confirm {
    fn confirm(&mut self, prompt: &str) -> bool;
}

impl Confirm for bool {
    fn confirm(&mut self, _prompt: &str) -> bool {
        *self
    }
}

/// Move inertial samples from `queue` into `sink` until `timeout` passes
/// without a new response. Non-inertial responses are skipped.
///
/// Returns the number of samples written.
pub fn pump_telemetry(
    queue: &ResponseQueue,
    sink: &mut dyn TelemetrySink,
    timeout: Duration,
) -> std::io::Result<usize> {
    let mut written = 0usize;
    while let Some(response) = queue.recv_timeout(timeout) {
        if let Some(sample) = response.telemetry() {
            sink.write_sample(sample)?;
            written += 1;
        }
    }
    sink.flush()?;
    Ok(written)
}
