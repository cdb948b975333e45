use bytes::Bytes;
use tracing::warn;
use tsnd_frame::{Frame, ResponseCategory};

use crate::error::DecodeError;
use crate::mode::DeviceMode;
use crate::schedule::{DeviceTimestamp, RecordingSchedule};
use crate::telemetry::{
    decode_acc_gyro, decode_atmosphere, decode_magnetism, decode_quaternion_acc_gyro,
    AtmosphereSample, MagnetismSample, TelemetrySample,
};

/// A response payload decoded according to its category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Simple acknowledgement byte; `0x00` means OK.
    Ack(u8),
    /// Acceleration range selector echoed back.
    AccRange(u8),
    Mode(DeviceMode),
    Schedule(RecordingSchedule),
    Time(DeviceTimestamp),
    SavedEntryCount(u8),
    /// Start time of the queried saved entry.
    SavedEntryInfo(DeviceTimestamp),
    OverwriteProtection(u8),
    OptionButton(u8),
    RecordingStarted,
    RecordingStopped,
    SavedEntryEnd,
    AccGyro(TelemetrySample),
    QuaternionAccGyro(TelemetrySample),
    Magnetism(MagnetismSample),
    Atmosphere(AtmosphereSample),
    /// Any category without a typed decoding.
    Raw {
        category: ResponseCategory,
        payload: Bytes,
    },
}

impl Response {
    /// Decode a frame's payload into its typed variant.
    ///
    /// Payload lengths are already fixed by the registry, so decoding only
    /// falls back to [`Response::Raw`] if a decoder rejects the bytes.
    pub fn from_frame(frame: Frame) -> Response {
        let Frame { category, payload } = frame;
        match decode_typed(category, &payload) {
            Ok(Some(response)) => response,
            Ok(None) => Response::Raw { category, payload },
            Err(err) => {
                warn!(%category, error = %err, "payload kept raw");
                Response::Raw { category, payload }
            }
        }
    }

    pub fn category(&self) -> ResponseCategory {
        match self {
            Response::Ack(_) => ResponseCategory::Simple,
            Response::AccRange(_) => ResponseCategory::AccRange,
            Response::Mode(_) => ResponseCategory::Mode,
            Response::Schedule(_) => ResponseCategory::RecordingTimeSettings,
            Response::Time(_) => ResponseCategory::Time,
            Response::SavedEntryCount(_) => ResponseCategory::SavedEntryNum,
            Response::SavedEntryInfo(_) => ResponseCategory::SavedEntryInfo,
            Response::OverwriteProtection(_) => ResponseCategory::OverwriteProtection,
            Response::OptionButton(_) => ResponseCategory::OptionButtonBehavior,
            Response::RecordingStarted => ResponseCategory::StartRecording,
            Response::RecordingStopped => ResponseCategory::StopRecording,
            Response::SavedEntryEnd => ResponseCategory::SavedEntryEnd,
            Response::AccGyro(_) => ResponseCategory::AccGyroData,
            Response::QuaternionAccGyro(_) => ResponseCategory::QuaternionAccGyroData,
            Response::Magnetism(_) => ResponseCategory::MagnetismData,
            Response::Atmosphere(_) => ResponseCategory::AtmosphereData,
            Response::Raw { category, .. } => *category,
        }
    }

    /// The inertial sample carried by this response, if any.
    pub fn telemetry(&self) -> Option<&TelemetrySample> {
        match self {
            Response::AccGyro(sample) | Response::QuaternionAccGyro(sample) => Some(sample),
            _ => None,
        }
    }
}

fn decode_typed(category: ResponseCategory, payload: &[u8]) -> Result<Option<Response>, DecodeError> {
    let first = payload.first().copied().unwrap_or_default();
    let response = match category {
        ResponseCategory::Simple => Response::Ack(first),
        ResponseCategory::AccRange => Response::AccRange(first),
        ResponseCategory::Mode => Response::Mode(DeviceMode::from_byte(first)),
        ResponseCategory::RecordingTimeSettings => {
            Response::Schedule(RecordingSchedule::parse(payload)?)
        }
        ResponseCategory::Time => Response::Time(DeviceTimestamp::parse(payload)?),
        ResponseCategory::SavedEntryNum => Response::SavedEntryCount(first),
        ResponseCategory::SavedEntryInfo => {
            Response::SavedEntryInfo(DeviceTimestamp::parse(payload)?)
        }
        ResponseCategory::OverwriteProtection => Response::OverwriteProtection(first),
        ResponseCategory::OptionButtonBehavior => Response::OptionButton(first),
        ResponseCategory::StartRecording => Response::RecordingStarted,
        ResponseCategory::StopRecording => Response::RecordingStopped,
        ResponseCategory::SavedEntryEnd => Response::SavedEntryEnd,
        ResponseCategory::AccGyroData => Response::AccGyro(decode_acc_gyro(payload)?),
        ResponseCategory::QuaternionAccGyroData => {
            Response::QuaternionAccGyro(decode_quaternion_acc_gyro(payload)?)
        }
        ResponseCategory::MagnetismData => Response::Magnetism(decode_magnetism(payload)?),
        ResponseCategory::AtmosphereData => Response::Atmosphere(decode_atmosphere(payload)?),
        _ => return Ok(None),
    };
    Ok(Some(response))
}
