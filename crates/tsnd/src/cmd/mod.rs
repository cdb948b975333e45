use clap::{ArgAction, Args, Subcommand, ValueEnum};
use tsnd_device::{Device, DeviceConfig, OptionButtonMode};
use tsnd_transport::DEFAULT_BAUD_RATE;

use crate::exit::{device_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod clear;
pub mod configure;
pub mod download;
pub mod entries;
pub mod mode;
pub mod record;
pub mod status;
pub mod stop;
pub mod sync_time;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the device mode.
    Mode,
    /// Print mode, clock, recording settings and storage state.
    Status,
    /// Set the device clock to host time and report the remaining offset.
    SyncTime(SyncTimeArgs),
    /// Change sensor settings.
    Configure(ConfigureArgs),
    /// Start recording and print samples until Ctrl-C.
    Record(RecordArgs),
    /// Stop recording.
    Stop,
    /// List sessions stored on the device.
    Entries,
    /// Stream one stored session.
    Download(DownloadArgs),
    /// Erase every stored session.
    Clear(ClearArgs),
    /// Show version information.
    Version(VersionArgs),
}

/// Connection flags shared by every device command.
#[derive(Args, Debug, Clone)]
pub struct ConnectArgs {
    /// Serial endpoint, e.g. /dev/rfcomm0 or COM3.
    #[arg(long, env = "TSND_PORT", global = true)]
    pub port: Option<String>,
    /// Line speed.
    #[arg(long, default_value_t = DEFAULT_BAUD_RATE, global = true)]
    pub baud: u32,
}

impl ConnectArgs {
    pub fn open(&self) -> CliResult<Device> {
        let port = self.port.as_deref().ok_or_else(|| {
            CliError::new(USAGE, "no serial port given (use --port or TSND_PORT)")
        })?;
        let config = DeviceConfig {
            baud_rate: self.baud,
            ..DeviceConfig::default()
        };
        Device::open(port, config).map_err(|err| device_error("open failed", err))
    }
}

pub fn run(command: Command, connect: &ConnectArgs, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Mode => mode::run(connect, format),
        Command::Status => status::run(connect, format),
        Command::SyncTime(args) => sync_time::run(args, connect, format),
        Command::Configure(args) => configure::run(args, connect, format),
        Command::Record(args) => record::run(args, connect, format),
        Command::Stop => stop::run(connect, format),
        Command::Entries => entries::run(connect, format),
        Command::Download(args) => download::run(args, connect, format),
        Command::Clear(args) => clear::run(args, connect, format),
        Command::Version(args) => version::run(args),
    }
}

/// Close explicitly so close errors are reported rather than logged on drop.
pub fn finish(device: Device, code: i32) -> CliResult<i32> {
    device
        .close()
        .map_err(|err| device_error("close failed", err))?;
    Ok(code)
}

#[derive(Args, Debug)]
pub struct SyncTimeArgs {
    /// Number of clock reads averaged for the offset.
    #[arg(long, default_value_t = 10)]
    pub samples: u16,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ButtonArg {
    Disable,
    Stop,
    StartStop,
    Event,
    EventWithBuzzer,
}

impl From<ButtonArg> for OptionButtonMode {
    fn from(arg: ButtonArg) -> Self {
        match arg {
            ButtonArg::Disable => OptionButtonMode::Disable,
            ButtonArg::Stop => OptionButtonMode::Stop,
            ButtonArg::StartStop => OptionButtonMode::StartStop,
            ButtonArg::Event => OptionButtonMode::Event,
            ButtonArg::EventWithBuzzer => OptionButtonMode::EventWithBuzzer,
        }
    }
}

/// Sampling flags take `INTERVAL[,AVG_SEND[,AVG_SAVE]]`; averaging defaults to 1.
#[derive(Args, Debug)]
pub struct ConfigureArgs {
    /// Accelerometer range in g (2, 4, 8, 16).
    #[arg(long, value_name = "G")]
    pub acc_range: Option<u16>,
    /// Gyroscope range in deg/s (250, 500, 1000, 2000).
    #[arg(long, value_name = "DPS")]
    pub gyro_range: Option<u16>,
    /// Acc/gyro sampling, interval in ms (0 = off).
    #[arg(long, value_name = "SAMPLING", value_delimiter = ',', num_args = 1..=3)]
    pub acc_gyro: Option<Vec<u32>>,
    /// Geomagnetism sampling, interval in ms (0 or 10..=255).
    #[arg(long, value_name = "SAMPLING", value_delimiter = ',', num_args = 1..=3)]
    pub magnetism: Option<Vec<u32>>,
    /// Pressure/temperature sampling, interval in 10 ms units (0 or 4..=255).
    #[arg(long, value_name = "SAMPLING", value_delimiter = ',', num_args = 1..=3)]
    pub atmosphere: Option<Vec<u32>>,
    /// Quaternion sampling, interval in 5 ms units (0..=51).
    #[arg(long, value_name = "SAMPLING", value_delimiter = ',', num_args = 1..=3)]
    pub quaternion: Option<Vec<u32>>,
    /// Send battery voltage readings.
    #[arg(long, value_name = "BOOL", action = ArgAction::Set)]
    pub battery_send: Option<bool>,
    /// Save battery voltage readings.
    #[arg(long, value_name = "BOOL", action = ArgAction::Set)]
    pub battery_save: Option<bool>,
    /// Protect stored sessions from being overwritten.
    #[arg(long, value_name = "BOOL", action = ArgAction::Set)]
    pub overwrite_protection: Option<bool>,
    /// Option button behavior.
    #[arg(long, value_name = "MODE")]
    pub option_button: Option<ButtonArg>,
    /// Auto power-off delay in minutes (0 = off, 1..=20).
    #[arg(long, value_name = "MINUTES")]
    pub auto_power_off: Option<u32>,
}

#[derive(Args, Debug)]
pub struct RecordArgs {
    /// Restart if the device is already recording.
    #[arg(long)]
    pub force: bool,
    /// Stop after N samples.
    #[arg(long)]
    pub count: Option<usize>,
    /// Leave the device recording on exit.
    #[arg(long)]
    pub keep_recording: bool,
}

#[derive(Args, Debug)]
pub struct DownloadArgs {
    /// 1-based session index (see `entries`).
    pub index: u32,
}

#[derive(Args, Debug)]
pub struct ClearArgs {
    /// Skip the confirmation prompt.
    #[arg(long, short = 'y')]
    pub yes: bool,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
