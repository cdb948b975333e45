use serde::Serialize;

use crate::cmd::{finish, ConnectArgs, SyncTimeArgs};
use crate::exit::{device_error, CliError, CliResult, FAILURE, SUCCESS};
use crate::output::{print_record, OutputFormat};

#[derive(Serialize)]
struct SyncOutput {
    set: bool,
    samples: u16,
    /// Host minus device, after setting.
    offset_ms: f64,
}

pub fn run(args: SyncTimeArgs, connect: &ConnectArgs, format: OutputFormat) -> CliResult<i32> {
    let device = connect.open()?;
    let set = device
        .set_time_now()
        .map_err(|err| device_error("set_time failed", err))?;
    if !set {
        return Err(CliError::new(
            FAILURE,
            "device did not accept the new time (is it recording?)",
        ));
    }

    let offset = device
        .measure_clock_offset(args.samples)
        .map_err(|err| device_error("clock read failed", err))?
        .ok_or_else(|| CliError::new(FAILURE, "device started recording during sync"))?;
    let offset_ms = offset
        .num_microseconds()
        .map(|us| us as f64 / 1000.0)
        .unwrap_or(f64::NAN);

    let out = SyncOutput {
        set,
        samples: args.samples.max(1),
        offset_ms,
    };
    print_record(
        &out,
        &[
            ("clock set", set.to_string()),
            ("samples", out.samples.to_string()),
            ("offset", format!("{offset_ms:.3} ms")),
        ],
        format,
    );
    finish(device, SUCCESS)
}
