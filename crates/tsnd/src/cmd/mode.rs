use serde::Serialize;
use tsnd_device::DeviceMode;

use crate::cmd::{finish, ConnectArgs};
use crate::exit::{device_error, CliResult, SUCCESS};
use crate::output::{print_record, OutputFormat};

#[derive(Serialize)]
struct ModeOutput {
    mode: DeviceMode,
    command_mode: bool,
}

pub fn run(connect: &ConnectArgs, format: OutputFormat) -> CliResult<i32> {
    let device = connect.open()?;
    let mode = device
        .get_mode()
        .map_err(|err| device_error("get_mode failed", err))?;

    let out = ModeOutput {
        mode,
        command_mode: mode.is_command(),
    };
    print_record(
        &out,
        &[
            ("mode", mode.to_string()),
            ("accepts commands", out.command_mode.to_string()),
        ],
        format,
    );
    finish(device, SUCCESS)
}
