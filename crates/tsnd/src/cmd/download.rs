use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::info;
use tsnd_device::{ResponseQueue, TelemetrySink};

use crate::cmd::record::subscribe_inertial;
use crate::cmd::{finish, ConnectArgs, DownloadArgs};
use crate::exit::{device_error, io_error, CliError, CliResult, FAILURE, INTERNAL, SUCCESS};
use crate::output::{OutputFormat, StdoutSink};

const POLL: Duration = Duration::from_millis(50);

pub fn run(args: DownloadArgs, connect: &ConnectArgs, format: OutputFormat) -> CliResult<i32> {
    let device = connect.open()?;
    let samples = subscribe_inertial(&device);
    let done = AtomicBool::new(false);

    // Print while the session streams; the facade call blocks until the end marker.
    let (found, printed) = std::thread::scope(|scope| {
        let printer = scope.spawn(|| print_until_done(&samples, &done, format));
        let found = device.read_saved_entry(args.index);
        done.store(true, Ordering::SeqCst);
        (found, printer.join())
    });

    let found = found.map_err(|err| device_error("download failed", err))?;
    let printed = printed
        .map_err(|_| CliError::new(INTERNAL, "output thread panicked"))?
        .map_err(|err| io_error("write failed", err))?;
    if !found {
        return Err(CliError::new(
            FAILURE,
            format!("no saved entry {} (or the device is recording)", args.index),
        ));
    }

    info!(index = args.index, samples = printed, "download complete");
    finish(device, SUCCESS)
}

/// Drain `samples` into stdout until `done` is set and the queue runs dry.
fn print_until_done(
    samples: &ResponseQueue,
    done: &AtomicBool,
    format: OutputFormat,
) -> std::io::Result<usize> {
    let mut sink = StdoutSink::new(format);
    let mut printed = 0usize;
    loop {
        match samples.recv_timeout(POLL) {
            Some(response) => {
                if let Some(sample) = response.telemetry() {
                    sink.write_sample(sample)?;
                    printed += 1;
                }
            }
            None if done.load(Ordering::SeqCst) => break,
            None => {}
        }
    }
    sink.flush()?;
    Ok(printed)
}
