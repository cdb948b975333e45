//! Validated configuration parameters.
//!
//! Each type can only be built from in-range values, so a facade call taking
//! one of them never puts an invalid byte on the wire.

use serde::Serialize;

use crate::error::{check_range, RangeError};

/// Highest saved-entry index the device stores.
pub const MAX_SAVED_ENTRIES: u8 = 80;

/// Accelerometer full-scale range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AccRange {
    G2,
    G4,
    G8,
    G16,
}

impl AccRange {
    /// 2-bit selector sent to the device.
    pub const fn selector(self) -> u8 {
        match self {
            AccRange::G2 => 0x00,
            AccRange::G4 => 0x01,
            AccRange::G8 => 0x02,
            AccRange::G16 => 0x03,
        }
    }

    pub const fn g(self) -> u16 {
        match self {
            AccRange::G2 => 2,
            AccRange::G4 => 4,
            AccRange::G8 => 8,
            AccRange::G16 => 16,
        }
    }

    pub fn from_selector(selector: u8) -> Option<Self> {
        match selector {
            0x00 => Some(AccRange::G2),
            0x01 => Some(AccRange::G4),
            0x02 => Some(AccRange::G8),
            0x03 => Some(AccRange::G16),
            _ => None,
        }
    }
}

impl TryFrom<u16> for AccRange {
    type Error = RangeError;

    fn try_from(g: u16) -> Result<Self, Self::Error> {
        match g {
            2 => Ok(AccRange::G2),
            4 => Ok(AccRange::G4),
            8 => Ok(AccRange::G8),
            16 => Ok(AccRange::G16),
            other => Err(RangeError::new("acc_range_g", other, "2, 4, 8, 16")),
        }
    }
}

/// Gyroscope full-scale range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum GyroRange {
    Dps250,
    Dps500,
    Dps1000,
    Dps2000,
}

impl GyroRange {
    pub const fn selector(self) -> u8 {
        match self {
            GyroRange::Dps250 => 0x00,
            GyroRange::Dps500 => 0x01,
            GyroRange::Dps1000 => 0x02,
            GyroRange::Dps2000 => 0x03,
        }
    }

    pub const fn dps(self) -> u16 {
        match self {
            GyroRange::Dps250 => 250,
            GyroRange::Dps500 => 500,
            GyroRange::Dps1000 => 1000,
            GyroRange::Dps2000 => 2000,
        }
    }
}

impl TryFrom<u16> for GyroRange {
    type Error = RangeError;

    fn try_from(dps: u16) -> Result<Self, Self::Error> {
        match dps {
            250 => Ok(GyroRange::Dps250),
            500 => Ok(GyroRange::Dps500),
            1000 => Ok(GyroRange::Dps1000),
            2000 => Ok(GyroRange::Dps2000),
            other => Err(RangeError::new("gyro_range_dps", other, "250, 500, 1000, 2000")),
        }
    }
}

const AVERAGING_ALLOWED: &str = "0..=255";

macro_rules! sampling_config {
    (
        $(#[$meta:meta])*
        $name:ident {
            parameter: $parameter:literal,
            min_on: $min_on:literal,
            max: $max:literal,
            allowed: $allowed:literal,
            wire_scale: $scale:literal $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
        pub struct $name {
            interval: u8,
            avg_send: u8,
            avg_save: u8,
        }

        impl $name {
            /// Validate an interval (0 = off) and the send/save averaging counts.
            ///
            /// An averaging count of 0 disables sending or saving respectively.
            pub fn new(interval: u32, avg_send: u32, avg_save: u32) -> Result<Self, RangeError> {
                let interval = if interval == 0 {
                    0
                } else {
                    check_range($parameter, interval, $min_on, $max, $allowed)?
                };
                Ok(Self {
                    interval,
                    avg_send: check_range("avg_num_for_send", avg_send, 0, 255, AVERAGING_ALLOWED)?,
                    avg_save: check_range("avg_num_for_save", avg_save, 0, 255, AVERAGING_ALLOWED)?,
                })
            }

            /// Sensor disabled.
            pub const fn off() -> Self {
                Self {
                    interval: 0,
                    avg_send: 0,
                    avg_save: 0,
                }
            }

            /// Interval in this sensor's native unit (0 = off).
            pub const fn interval(&self) -> u8 {
                self.interval
            }

            pub const fn avg_send(&self) -> u8 {
                self.avg_send
            }

            pub const fn avg_save(&self) -> u8 {
                self.avg_save
            }

            pub const fn is_enabled(&self) -> bool {
                self.interval != 0
            }

            /// Argument bytes for the set-interval command.
            pub const fn args(&self) -> [u8; 3] {
                [self.interval * $scale, self.avg_send, self.avg_save]
            }
        }
    };
}

sampling_config! {
    /// Acceleration/angular-rate sampling: interval in ms.
    AccGyroSampling {
        parameter: "interval_in_ms",
        min_on: 1,
        max: 255,
        allowed: "0..=255",
        wire_scale: 1,
    }
}

sampling_config! {
    /// Geomagnetism sampling: interval in ms.
    MagnetismSampling {
        parameter: "interval_in_ms",
        min_on: 10,
        max: 255,
        allowed: "0 or 10..=255",
        wire_scale: 1,
    }
}

sampling_config! {
    /// Pressure/temperature sampling: interval in 10 ms units.
    AtmosphereSampling {
        parameter: "interval_in_10ms_unit",
        min_on: 4,
        max: 255,
        allowed: "0 or 4..=255",
        wire_scale: 1,
    }
}

sampling_config! {
    /// Quaternion sampling: interval in 5 ms units, sent as milliseconds.
    ///
    /// Enabling it forces the ±2000 dps gyro range on the device and switches
    /// streamed data from acc/gyro frames to quaternion+acc/gyro frames.
    QuaternionSampling {
        parameter: "interval_in_5ms_unit",
        min_on: 1,
        max: 51,
        allowed: "0..=51",
        wire_scale: 5,
    }
}

/// Auto power-off delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AutoPowerOff(u8);

impl AutoPowerOff {
    pub const OFF: AutoPowerOff = AutoPowerOff(0);

    /// 0 disables auto power-off; otherwise 1..=20 minutes.
    pub fn minutes(minutes: u32) -> Result<Self, RangeError> {
        if minutes == 0 {
            return Ok(Self::OFF);
        }
        check_range("minutes", minutes, 1, 20, "0 or 1..=20").map(AutoPowerOff)
    }

    pub const fn value(self) -> u8 {
        self.0
    }
}

/// What the option button on the device does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionButtonMode {
    Disable = 0,
    Stop = 1,
    StartStop = 2,
    Event = 3,
    EventWithBuzzer = 4,
}

impl OptionButtonMode {
    pub const fn byte(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for OptionButtonMode {
    type Error = RangeError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            0 => Ok(OptionButtonMode::Disable),
            1 => Ok(OptionButtonMode::Stop),
            2 => Ok(OptionButtonMode::StartStop),
            3 => Ok(OptionButtonMode::Event),
            4 => Ok(OptionButtonMode::EventWithBuzzer),
            other => Err(RangeError::new("option_button_mode", other, "0..=4")),
        }
    }
}

/// Validate a 1-based saved-entry index.
pub(crate) fn check_entry_index(index: u32) -> Result<u8, RangeError> {
    check_range("entry_num", index, 1, u32::from(MAX_SAVED_ENTRIES), "1..=80")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acc_range_selectors_are_lossless() {
        for (g, selector) in [(2u16, 0u8), (4, 1), (8, 2), (16, 3)] {
            let range = AccRange::try_from(g).unwrap();
            assert_eq!(range.selector(), selector);
            assert_eq!(range.g(), g);
            assert_eq!(AccRange::from_selector(selector), Some(range));
        }
    }

    #[test]
    fn gyro_range_selectors_are_lossless() {
        for (dps, selector) in [(250u16, 0u8), (500, 1), (1000, 2), (2000, 3)] {
            let range = GyroRange::try_from(dps).unwrap();
            assert_eq!(range.selector(), selector);
            assert_eq!(range.dps(), dps);
        }
    }

    #[test]
    fn other_ranges_are_rejected() {
        for g in [0u16, 1, 3, 5, 12, 32, 250] {
            assert!(AccRange::try_from(g).is_err(), "{g} g");
        }
        for dps in [0u16, 125, 251, 1500, 4000] {
            let err = GyroRange::try_from(dps).unwrap_err();
            assert_eq!(err.parameter, "gyro_range_dps");
        }
    }

    #[test]
    fn acc_gyro_interval_bounds() {
        assert_eq!(AccGyroSampling::new(0, 1, 0).unwrap().args(), [0, 1, 0]);
        assert_eq!(AccGyroSampling::new(255, 255, 255).unwrap().args(), [255, 255, 255]);
        assert!(AccGyroSampling::new(256, 1, 0).is_err());
        assert!(AccGyroSampling::new(10, 256, 0).is_err());
        assert!(AccGyroSampling::new(10, 1, 300).is_err());
    }

    #[test]
    fn magnetism_interval_is_off_or_at_least_ten() {
        assert!(!MagnetismSampling::new(0, 1, 0).unwrap().is_enabled());
        assert!(MagnetismSampling::new(9, 1, 0).is_err());
        assert_eq!(MagnetismSampling::new(10, 1, 0).unwrap().interval(), 10);
    }

    #[test]
    fn atmosphere_interval_is_off_or_at_least_four() {
        assert!(AtmosphereSampling::new(0, 1, 0).is_ok());
        let err = AtmosphereSampling::new(3, 1, 0).unwrap_err();
        assert_eq!(err.allowed, "0 or 4..=255");
        assert_eq!(AtmosphereSampling::new(4, 1, 0).unwrap().args(), [4, 1, 0]);
    }

    #[test]
    fn quaternion_interval_is_sent_in_milliseconds() {
        assert_eq!(QuaternionSampling::new(51, 1, 0).unwrap().args(), [255, 1, 0]);
        assert_eq!(QuaternionSampling::new(2, 1, 0).unwrap().args(), [10, 1, 0]);
        assert!(QuaternionSampling::new(52, 1, 0).is_err());
        assert_eq!(QuaternionSampling::off().args(), [0, 0, 0]);
    }

    #[test]
    fn auto_power_off_bounds() {
        assert_eq!(AutoPowerOff::minutes(0).unwrap(), AutoPowerOff::OFF);
        assert_eq!(AutoPowerOff::minutes(20).unwrap().value(), 20);
        assert!(AutoPowerOff::minutes(21).is_err());
    }

    #[test]
    fn option_button_modes() {
        assert_eq!(OptionButtonMode::try_from(4).unwrap(), OptionButtonMode::EventWithBuzzer);
        assert_eq!(OptionButtonMode::StartStop.byte(), 2);
        assert!(OptionButtonMode::try_from(5).is_err());
    }

    #[test]
    fn entry_index_bounds() {
        assert_eq!(check_entry_index(1), Ok(1));
        assert_eq!(check_entry_index(80), Ok(80));
        assert!(check_entry_index(0).is_err());
        assert!(check_entry_index(81).is_err());
    }
}
