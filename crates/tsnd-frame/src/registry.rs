//! Response code registry.
//!
//! Every response the device can emit has exactly one code byte and one fixed
//! payload length. The table below is the single source for both, plus the
//! category's diagnostic name. Codes without a documented meaning keep a
//! neutral `CodeXX` name; they still frame correctly.

macro_rules! response_categories {
    ($( $(#[$meta:meta])* $variant:ident = ($code:literal, $len:literal, $name:literal), )+) => {
        /// A class of incoming frame, identified by its response code.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum ResponseCategory {
            $( $(#[$meta])* $variant, )+
        }

        impl ResponseCategory {
            /// Every registered category, in table order.
            pub const ALL: &'static [ResponseCategory] = &[ $( ResponseCategory::$variant, )+ ];

            /// Look up the category for a response code byte.
            pub const fn from_code(code: u8) -> Option<Self> {
                match code {
                    $( $code => Some(ResponseCategory::$variant), )+
                    _ => None,
                }
            }

            /// The response code byte on the wire.
            pub const fn code(self) -> u8 {
                match self {
                    $( ResponseCategory::$variant => $code, )+
                }
            }

            /// Fixed payload length in bytes.
            pub const fn payload_len(self) -> usize {
                match self {
                    $( ResponseCategory::$variant => $len, )+
                }
            }

            pub const fn name(self) -> &'static str {
                match self {
                    $( ResponseCategory::$variant => $name, )+
                }
            }
        }
    };
}

response_categories! {
    /// Single-byte command acknowledgement (`0x00` = OK).
    Simple = (0x8F, 1, "simple"),
    DeviceInfo = (0x90, 30, "device_info"),
    Time = (0x92, 8, "time"),
    /// Scheduled flag, start and stop date/time.
    RecordingTimeSettings = (0x93, 13, "recording_time_settings"),
    AccGyroSettings = (0x97, 3, "acc_gyro_settings"),
    MagnetismSettings = (0x99, 3, "magnetism_settings"),
    AtmosphereSettings = (0x9B, 3, "atmosphere_settings"),
    BatteryVoltageSettings = (0x9D, 2, "battery_voltage_settings"),
    ExpansionTerminalSettings = (0x9F, 5, "expansion_terminal_settings"),
    CodeA1 = (0xA1, 3, "code_0xa1"),
    /// Echo of the acceleration range selector.
    AccRange = (0xA3, 1, "acc_range"),
    GyroRange = (0xA6, 1, "gyro_range"),
    CodeAA = (0xAA, 12, "code_0xaa"),
    CodeAB = (0xAB, 9, "code_0xab"),
    OptionButtonBehavior = (0xAD, 1, "option_button_behavior"),
    OverwriteProtection = (0xAF, 1, "overwrite_protection"),
    CodeB1 = (0xB1, 4, "code_0xb1"),
    CodeB3 = (0xB3, 1, "code_0xb3"),
    SavedEntryNum = (0xB6, 1, "saved_entry_num"),
    SavedEntryInfo = (0xB7, 24, "saved_entry_info"),
    CodeB8 = (0xB8, 60, "code_0xb8"),
    /// Terminates a saved-entry download.
    SavedEntryEnd = (0xB9, 1, "saved_entry_end"),
    CodeBA = (0xBA, 5, "code_0xba"),
    CodeBB = (0xBB, 3, "code_0xbb"),
    Mode = (0xBC, 1, "mode"),
    CodeBD = (0xBD, 12, "code_0xbd"),
    CodeBE = (0xBE, 12, "code_0xbe"),
    AutoPowerOff = (0xD1, 1, "auto_power_off"),
    CodeD3 = (0xD3, 1, "code_0xd3"),
    QuaternionSettings = (0xD6, 3, "quaternion_settings"),
    CodeD8 = (0xD8, 78, "code_0xd8"),
    CodeDA = (0xDA, 7, "code_0xda"),
    CodeDC = (0xDC, 28, "code_0xdc"),
    CodeDD = (0xDD, 1, "code_0xdd"),
    /// Streamed acceleration and angular rate.
    AccGyroData = (0x80, 22, "acc_gyro_data"),
    MagnetismData = (0x81, 13, "magnetism_data"),
    AtmosphereData = (0x82, 9, "atmosphere_data"),
    BatteryVoltageData = (0x83, 7, "battery_voltage_data"),
    Code84 = (0x84, 9, "code_0x84"),
    Code85 = (0x85, 6, "code_0x85"),
    Code86 = (0x86, 13, "code_0x86"),
    Code87 = (0x87, 5, "code_0x87"),
    /// Device-side notification that recording began.
    StartRecording = (0x88, 1, "start_recording"),
    /// Device-side notification that recording ended.
    StopRecording = (0x89, 1, "stop_recording"),
    /// Streamed quaternion plus acceleration and angular rate.
    QuaternionAccGyroData = (0x8A, 30, "quaternion_acc_gyro_data"),
    Code8B = (0x8B, 22, "code_0x8b"),
    Code8C = (0x8C, 12, "code_0x8c"),
}

impl ResponseCategory {
    /// Streamed sensor data, as opposed to replies to commands.
    pub const fn is_telemetry(self) -> bool {
        matches!(
            self,
            ResponseCategory::AccGyroData
                | ResponseCategory::MagnetismData
                | ResponseCategory::AtmosphereData
                | ResponseCategory::BatteryVoltageData
                | ResponseCategory::QuaternionAccGyroData
                | ResponseCategory::Code84
                | ResponseCategory::Code85
                | ResponseCategory::Code86
                | ResponseCategory::Code87
                | ResponseCategory::Code8B
                | ResponseCategory::Code8C
        )
    }

    /// Look up a category by its diagnostic name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|category| category.name() == name)
    }
}

impl std::fmt::Display for ResponseCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (0x{:02X})", self.name(), self.code())
    }
}
