use serde::Serialize;
use tsnd_device::{
    AccGyroSampling, AccRange, AtmosphereSampling, AutoPowerOff, Device, GyroRange,
    MagnetismSampling, OptionButtonMode, QuaternionSampling, RangeError,
};

use crate::cmd::{finish, ConfigureArgs, ConnectArgs};
use crate::exit::{device_error, range_error, CliError, CliResult, FAILURE, SUCCESS, USAGE};
use crate::output::{print_record, OutputFormat};

const DEFAULT_AVERAGING: u32 = 1;

/// One validated setting change.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Change {
    AccRange(AccRange),
    GyroRange(GyroRange),
    AccGyro(AccGyroSampling),
    Magnetism(MagnetismSampling),
    Atmosphere(AtmosphereSampling),
    Quaternion(QuaternionSampling),
    Battery { send: bool, save: bool },
    OverwriteProtection(bool),
    OptionButton(OptionButtonMode),
    AutoPowerOff(AutoPowerOff),
}

impl Change {
    fn name(&self) -> &'static str {
        match self {
            Change::AccRange(_) => "acc_range",
            Change::GyroRange(_) => "gyro_range",
            Change::AccGyro(_) => "acc_gyro",
            Change::Magnetism(_) => "magnetism",
            Change::Atmosphere(_) => "atmosphere",
            Change::Quaternion(_) => "quaternion",
            Change::Battery { .. } => "battery",
            Change::OverwriteProtection(_) => "overwrite_protection",
            Change::OptionButton(_) => "option_button",
            Change::AutoPowerOff(_) => "auto_power_off",
        }
    }

    fn apply(&self, device: &Device) -> tsnd_device::Result<bool> {
        match *self {
            Change::AccRange(range) => device.set_acc_range(range),
            Change::GyroRange(range) => device.set_gyro_range(range),
            Change::AccGyro(sampling) => device.set_acc_and_gyro_interval(sampling),
            Change::Magnetism(sampling) => device.set_magnetism_interval(sampling),
            Change::Atmosphere(sampling) => device.set_atmosphere_interval(sampling),
            Change::Quaternion(sampling) => device.set_quaternion_interval(sampling),
            Change::Battery { send, save } => device.set_battery_voltage_measurement(send, save),
            Change::OverwriteProtection(enable) => device.set_overwrite_protection(enable),
            Change::OptionButton(mode) => device.set_option_button_behavior(mode),
            Change::AutoPowerOff(delay) => device.set_auto_power_off(delay),
        }
    }
}

#[derive(Serialize)]
struct SettingOutput {
    setting: &'static str,
    accepted: bool,
}

pub fn run(args: ConfigureArgs, connect: &ConnectArgs, format: OutputFormat) -> CliResult<i32> {
    let changes = plan(&args).map_err(range_error)?;
    if changes.is_empty() {
        return Err(CliError::new(USAGE, "nothing to configure"));
    }

    let device = connect.open()?;
    let mut results = Vec::with_capacity(changes.len());
    for change in &changes {
        let accepted = change
            .apply(&device)
            .map_err(|err| device_error(change.name(), err))?;
        results.push(SettingOutput {
            setting: change.name(),
            accepted,
        });
    }

    let rows: Vec<(&str, String)> = results
        .iter()
        .map(|r| (r.setting, if r.accepted { "ok" } else { "rejected" }.to_string()))
        .collect();
    print_record(&results, &rows, format);

    let all_accepted = results.iter().all(|r| r.accepted);
    finish(device, if all_accepted { SUCCESS } else { FAILURE })
}

/// Validate every requested change before anything is sent.
fn plan(args: &ConfigureArgs) -> Result<Vec<Change>, RangeError> {
    let mut changes = Vec::new();
    if let Some(g) = args.acc_range {
        changes.push(Change::AccRange(AccRange::try_from(g)?));
    }
    if let Some(dps) = args.gyro_range {
        changes.push(Change::GyroRange(GyroRange::try_from(dps)?));
    }
    if let Some(values) = &args.acc_gyro {
        let (interval, send, save) = sampling_values(values);
        changes.push(Change::AccGyro(AccGyroSampling::new(interval, send, save)?));
    }
    if let Some(values) = &args.magnetism {
        let (interval, send, save) = sampling_values(values);
        changes.push(Change::Magnetism(MagnetismSampling::new(interval, send, save)?));
    }
    if let Some(values) = &args.atmosphere {
        let (interval, send, save) = sampling_values(values);
        changes.push(Change::Atmosphere(AtmosphereSampling::new(interval, send, save)?));
    }
    if let Some(values) = &args.quaternion {
        let (interval, send, save) = sampling_values(values);
        changes.push(Change::Quaternion(QuaternionSampling::new(interval, send, save)?));
    }
    if args.battery_send.is_some() || args.battery_save.is_some() {
        changes.push(Change::Battery {
            send: args.battery_send.unwrap_or(false),
            save: args.battery_save.unwrap_or(false),
        });
    }
    if let Some(enable) = args.overwrite_protection {
        changes.push(Change::OverwriteProtection(enable));
    }
    if let Some(mode) = args.option_button {
        changes.push(Change::OptionButton(mode.into()));
    }
    if let Some(minutes) = args.auto_power_off {
        changes.push(Change::AutoPowerOff(AutoPowerOff::minutes(minutes)?));
    }
    Ok(changes)
}

fn sampling_values(values: &[u32]) -> (u32, u32, u32) {
    let at = |i: usize, default: u32| values.get(i).copied().unwrap_or(default);
    (at(0, 0), at(1, DEFAULT_AVERAGING), at(2, DEFAULT_AVERAGING))
}
