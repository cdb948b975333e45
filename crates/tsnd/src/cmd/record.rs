use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use tsnd_device::{Device, ResponseQueue, RouterStatus, TelemetrySink};
use tsnd_frame::ResponseCategory;

use crate::cmd::{finish, ConnectArgs, RecordArgs};
use crate::exit::{device_error, io_error, CliError, CliResult, DATA_INVALID, FAILURE, INTERNAL, SUCCESS};
use crate::output::{OutputFormat, StdoutSink};

const POLL: Duration = Duration::from_millis(100);

pub fn run(args: RecordArgs, connect: &ConnectArgs, format: OutputFormat) -> CliResult<i32> {
    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let device = connect.open()?;
    let samples = subscribe_inertial(&device);

    let schedule = device
        .start_recording(args.force)
        .map_err(|err| device_error("start failed", err))?
        .ok_or_else(|| {
            CliError::new(
                FAILURE,
                "device is already recording (use --force to restart)",
            )
        })?;
    info!(
        runs_forever = schedule.runs_forever(),
        "recording; press Ctrl-C to stop"
    );

    let mut sink = StdoutSink::new(format);
    let mut printed = 0usize;
    while running.load(Ordering::SeqCst) {
        if let RouterStatus::Failed(reason) = device.router_status() {
            return Err(CliError::new(
                DATA_INVALID,
                format!("response reader failed: {reason}"),
            ));
        }
        let Some(response) = samples.recv_timeout(POLL) else {
            continue;
        };
        let Some(sample) = response.telemetry() else {
            continue;
        };
        sink.write_sample(sample)
            .map_err(|err| io_error("write failed", err))?;
        printed = printed.saturating_add(1);
        if args.count.is_some_and(|count| printed >= count) {
            break;
        }
    }
    sink.flush().map_err(|err| io_error("write failed", err))?;
    info!(samples = printed, "capture finished");

    if !args.keep_recording {
        let stopped = device
            .stop_recording()
            .map_err(|err| device_error("stop failed", err))?;
        if !stopped {
            warn!("device did not acknowledge stop");
        }
    }
    finish(device, SUCCESS)
}

/// Route both inertial categories into one queue, so samples keep flowing
/// whether or not quaternion output is enabled.
pub(crate) fn subscribe_inertial(device: &Device) -> ResponseQueue {
    let samples = ResponseQueue::new();
    device.set_sink(ResponseCategory::AccGyroData, Some(samples.clone()));
    device.set_sink(ResponseCategory::QuaternionAccGyroData, Some(samples.clone()));
    samples
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
