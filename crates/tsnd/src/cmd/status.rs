use serde::Serialize;
use tsnd_device::{DeviceMode, OptionButtonMode, RecordingSchedule};

use crate::cmd::{finish, ConnectArgs};
use crate::exit::{device_error, CliResult, SUCCESS};
use crate::output::{print_record, OutputFormat};

#[derive(Serialize)]
struct StatusOutput {
    endpoint: String,
    mode: DeviceMode,
    option_button: OptionButtonMode,
    /// The remaining fields are only readable in a command mode.
    time: Option<String>,
    recording_settings: Option<RecordingSchedule>,
    saved_entries: Option<u8>,
    overwrite_protection: Option<bool>,
}

pub fn run(connect: &ConnectArgs, format: OutputFormat) -> CliResult<i32> {
    let device = connect.open()?;
    let context = "status query failed";

    let mode = device.get_mode().map_err(|err| device_error(context, err))?;
    let option_button = device
        .get_option_button_behavior()
        .map_err(|err| device_error(context, err))?;

    let mut out = StatusOutput {
        endpoint: device.endpoint().unwrap_or_default(),
        mode,
        option_button,
        time: None,
        recording_settings: None,
        saved_entries: None,
        overwrite_protection: None,
    };
    if mode.is_command() {
        out.time = device
            .get_time()
            .map_err(|err| device_error(context, err))?
            .map(|t| t.to_string());
        out.recording_settings = device
            .get_recording_time_settings()
            .map_err(|err| device_error(context, err))?;
        out.saved_entries = device
            .get_saved_entry_num()
            .map_err(|err| device_error(context, err))?;
        out.overwrite_protection = device
            .get_overwrite_protection()
            .map_err(|err| device_error(context, err))?;
    }

    let fields = rows(&out);
    print_record(&out, &fields, format);
    finish(device, SUCCESS)
}

fn rows(out: &StatusOutput) -> Vec<(&'static str, String)> {
    let unavailable = || "-".to_string();
    vec![
        ("endpoint", out.endpoint.clone()),
        ("mode", out.mode.to_string()),
        ("option button", format!("{:?}", out.option_button)),
        ("time", out.time.clone().unwrap_or_else(unavailable)),
        (
            "recording",
            out.recording_settings
                .map(describe_schedule)
                .unwrap_or_else(unavailable),
        ),
        (
            "saved entries",
            out.saved_entries
                .map(|n| n.to_string())
                .unwrap_or_else(unavailable),
        ),
        (
            "overwrite protection",
            out.overwrite_protection
                .map(|p| p.to_string())
                .unwrap_or_else(unavailable),
        ),
    ]
}

fn describe_schedule(schedule: RecordingSchedule) -> String {
    let start = match schedule.start_time() {
        Some(at) => format!("starts {at}"),
        None => "starts on command".to_string(),
    };
    let stop = match schedule.stop_time() {
        Some(at) => format!("stops {at}"),
        None if schedule.runs_forever() => "runs until stopped".to_string(),
        None => format!("stop fields {:?}", schedule.stop.0),
    };
    format!("{start}, {stop}")
}
