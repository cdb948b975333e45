use serde::Serialize;

/// Operating mode reported by the device.
///
/// Configuration commands are only accepted in the two command modes. The
/// device moves between command and recording modes on its own in response
/// to start/stop; the driver only observes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceMode {
    UsbCommand,
    UsbRecording,
    BluetoothCommand,
    BluetoothRecording,
    /// A mode byte outside the documented set.
    Unknown(u8),
}

impl DeviceMode {
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            0 => DeviceMode::UsbCommand,
            1 => DeviceMode::UsbRecording,
            2 => DeviceMode::BluetoothCommand,
            3 => DeviceMode::BluetoothRecording,
            other => DeviceMode::Unknown(other),
        }
    }

    pub fn byte(self) -> u8 {
        match self {
            DeviceMode::UsbCommand => 0,
            DeviceMode::UsbRecording => 1,
            DeviceMode::BluetoothCommand => 2,
            DeviceMode::BluetoothRecording => 3,
            DeviceMode::Unknown(other) => other,
        }
    }

    /// True if configuration commands are accepted.
    pub fn is_command(self) -> bool {
        matches!(self, DeviceMode::UsbCommand | DeviceMode::BluetoothCommand)
    }

    pub fn is_recording(self) -> bool {
        matches!(
            self,
            DeviceMode::UsbRecording | DeviceMode::BluetoothRecording
        )
    }
}

impl std::fmt::Display for DeviceMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceMode::UsbCommand => f.write_str("usb-command"),
            DeviceMode::UsbRecording => f.write_str("usb-recording"),
            DeviceMode::BluetoothCommand => f.write_str("bluetooth-command"),
            DeviceMode::BluetoothRecording => f.write_str("bluetooth-recording"),
            DeviceMode::Unknown(byte) => write!(f, "unknown(0x{byte:02X})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_command_modes_accept_commands() {
        let accepted: Vec<u8> = (0..=4u8)
            .filter(|b| DeviceMode::from_byte(*b).is_command())
            .collect();
        assert_eq!(accepted, vec![0, 2]);
    }

    #[test]
    fn byte_round_trips_including_unknown() {
        for byte in [0u8, 1, 2, 3, 9] {
            assert_eq!(DeviceMode::from_byte(byte).byte(), byte);
        }
        assert!(!DeviceMode::Unknown(9).is_recording());
    }
}
