use bytes::{Bytes, BytesMut};

use crate::codec::encode_frame;

/// Argument byte sent with commands that take no parameters.
pub const PLACEHOLDER_ARG: u8 = 0x00;

/// Outgoing command opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CommandCode {
    SetTime = 0x11,
    GetTime = 0x12,
    StartRecording = 0x13,
    GetRecordingTimeSettings = 0x14,
    StopRecording = 0x15,
    SetAccAndGyroInterval = 0x16,
    SetMagnetismInterval = 0x18,
    SetAtmosphereInterval = 0x1A,
    SetBatteryVoltageMeasurement = 0x1C,
    SetAccRange = 0x23,
    SetGyroRange = 0x25,
    SetOptionButtonBehavior = 0x2C,
    GetOptionButtonBehavior = 0x2D,
    SetOverwriteProtection = 0x2E,
    GetOverwriteProtection = 0x2F,
    ClearSavedData = 0x35,
    GetSavedEntryNum = 0x36,
    GetSavedEntryInfo = 0x37,
    /// Starts streaming one stored session back over the link.
    ReadSavedEntry = 0x39,
    GetMode = 0x3C,
    SetAutoPowerOff = 0x50,
    SetQuaternionInterval = 0x55,
}

impl CommandCode {
    pub const fn byte(self) -> u8 {
        self as u8
    }

    pub const fn name(self) -> &'static str {
        match self {
            CommandCode::SetTime => "set_time",
            CommandCode::GetTime => "get_time",
            CommandCode::StartRecording => "start",
            CommandCode::GetRecordingTimeSettings => "get_recording_time_settings",
            CommandCode::StopRecording => "stop",
            CommandCode::SetAccAndGyroInterval => "set_acc_and_gyro_interval",
            CommandCode::SetMagnetismInterval => "set_magnetism_interval",
            CommandCode::SetAtmosphereInterval => "set_atmosphere_interval",
            CommandCode::SetBatteryVoltageMeasurement => "set_battery_voltage_measurement",
            CommandCode::SetAccRange => "set_acc_range",
            CommandCode::SetGyroRange => "set_gyro_range",
            CommandCode::SetOptionButtonBehavior => "set_option_button_behavior",
            CommandCode::GetOptionButtonBehavior => "get_option_button_behavior",
            CommandCode::SetOverwriteProtection => "set_overwrite_protection",
            CommandCode::GetOverwriteProtection => "get_overwrite_protection",
            CommandCode::ClearSavedData => "clear_saved_data",
            CommandCode::GetSavedEntryNum => "get_saved_entry_num",
            CommandCode::GetSavedEntryInfo => "get_saved_entry_info",
            CommandCode::ReadSavedEntry => "read_saved_entry",
            CommandCode::GetMode => "get_mode",
            CommandCode::SetAutoPowerOff => "set_auto_power_off",
            CommandCode::SetQuaternionInterval => "set_quaternion_interval",
        }
    }
}

impl std::fmt::Display for CommandCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (0x{:02X})", self.name(), self.byte())
    }
}

/// A command ready for the wire.
///
/// Arguments are always a byte sequence; a command built without arguments
/// carries the single placeholder byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    code: CommandCode,
    args: Vec<u8>,
}

impl Command {
    /// A command with no parameters.
    pub fn new(code: CommandCode) -> Self {
        Self {
            code,
            args: vec![PLACEHOLDER_ARG],
        }
    }

    /// A command with a single argument byte.
    pub fn with_arg(code: CommandCode, arg: u8) -> Self {
        Self {
            code,
            args: vec![arg],
        }
    }

    /// A command with an argument sequence. An empty sequence becomes the placeholder.
    pub fn with_args(code: CommandCode, args: impl Into<Vec<u8>>) -> Self {
        let args = args.into();
        if args.is_empty() {
            return Self::new(code);
        }
        Self { code, args }
    }

    pub fn code(&self) -> CommandCode {
        self.code
    }

    pub fn args(&self) -> &[u8] {
        &self.args
    }

    /// Encode into a complete frame.
    pub fn encode(&self) -> Bytes {
        let mut dst = BytesMut::new();
        encode_frame(self.code.byte(), &self.args, &mut dst);
        dst.freeze()
    }
}

impl From<CommandCode> for Command {
    fn from(code: CommandCode) -> Self {
        Command::new(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_args_sends_placeholder() {
        let cmd = Command::new(CommandCode::GetMode);
        assert_eq!(cmd.args(), &[PLACEHOLDER_ARG]);
        assert_eq!(cmd.encode().as_ref(), &[0x9A, 0x3C, 0x00, 0xA6]);
    }

    #[test]
    fn empty_sequence_normalizes_to_placeholder() {
        assert_eq!(
            Command::with_args(CommandCode::StopRecording, Vec::new()),
            Command::new(CommandCode::StopRecording)
        );
    }

    #[test]
    fn scalar_and_sequence_forms_agree() {
        assert_eq!(
            Command::with_arg(CommandCode::SetAccRange, 0x03),
            Command::with_args(CommandCode::SetAccRange, [0x03])
        );
    }

    #[test]
    fn encodes_multi_byte_arguments_in_order() {
        let cmd = Command::with_args(CommandCode::SetAccAndGyroInterval, [10, 1, 0]);
        let frame = cmd.encode();
        assert_eq!(&frame[..5], &[0x9A, 0x16, 10, 1, 0]);
        assert_eq!(frame[5], 0x9A ^ 0x16 ^ 10 ^ 1);
    }
}
