use serde::Serialize;

use crate::cmd::{finish, ConnectArgs};
use crate::exit::{device_error, CliResult, FAILURE, SUCCESS};
use crate::output::{print_record, OutputFormat};

#[derive(Serialize)]
struct StopOutput {
    stopped: bool,
}

pub fn run(connect: &ConnectArgs, format: OutputFormat) -> CliResult<i32> {
    let device = connect.open()?;
    let stopped = device
        .stop_recording()
        .map_err(|err| device_error("stop failed", err))?;

    print_record(
        &StopOutput { stopped },
        &[("stopped", stopped.to_string())],
        format,
    );
    finish(device, if stopped { SUCCESS } else { FAILURE })
}
