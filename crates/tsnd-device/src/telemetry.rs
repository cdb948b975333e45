//! Stateless decoders for streamed sensor payloads.
//!
//! All multi-byte fields are little-endian. 3-byte fields are signed and
//! sign-extended to `i32`.

use bytes::Buf;
use serde::Serialize;

use crate::error::DecodeError;

const ACC_GYRO_LEN: usize = 22;
const QUATERNION_ACC_GYRO_LEN: usize = 30;
const MAGNETISM_LEN: usize = 13;
const ATMOSPHERE_LEN: usize = 9;

/// One inertial sample.
///
/// Raw device units: acceleration in 0.1 mg, angular rate in 0.01 deg/s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TelemetrySample {
    /// Device millisecond counter.
    pub ms: u32,
    pub acc: [i32; 3],
    pub gyro: [i32; 3],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quaternion: Option<[i16; 4]>,
}

impl TelemetrySample {
    /// Acceleration in g.
    pub fn acc_g(&self) -> [f64; 3] {
        self.acc.map(|v| f64::from(v) * 1e-4)
    }

    /// Angular rate in deg/s.
    pub fn gyro_dps(&self) -> [f64; 3] {
        self.gyro.map(|v| f64::from(v) * 0.01)
    }
}

/// One geomagnetism sample, in 0.1 µT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MagnetismSample {
    pub ms: u32,
    pub field: [i32; 3],
}

impl MagnetismSample {
    pub fn field_ut(&self) -> [f64; 3] {
        self.field.map(|v| f64::from(v) * 0.1)
    }
}

/// One pressure/temperature sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AtmosphereSample {
    pub ms: u32,
    /// 0.01 hPa.
    pub pressure: u32,
    /// 0.01 °C.
    pub temperature: i16,
}

impl AtmosphereSample {
    pub fn pressure_hpa(&self) -> f64 {
        f64::from(self.pressure) * 0.01
    }

    pub fn temperature_c(&self) -> f64 {
        f64::from(self.temperature) * 0.01
    }
}

fn ensure_len(kind: &'static str, payload: &[u8], expected: usize) -> Result<(), DecodeError> {
    if payload.len() < expected {
        return Err(DecodeError {
            kind,
            expected,
            actual: payload.len(),
        });
    }
    Ok(())
}

fn get_i24_le(buf: &mut &[u8]) -> i32 {
    let raw = buf.get_uint_le(3) as u32;
    ((raw << 8) as i32) >> 8
}

fn get_vec3(buf: &mut &[u8]) -> [i32; 3] {
    [0; 3].map(|_: i32| get_i24_le(buf))
}

/// Decode a 22-byte acc/gyro payload.
///
/// ```text
/// ┌──────────┬─────────────────────┬─────────────────────┐
/// │ ms (4B)  │ acc x,y,z (3B each) │ gyro x,y,z (3B each)│
/// └──────────┴─────────────────────┴─────────────────────┘
/// ```
pub fn decode_acc_gyro(payload: &[u8]) -> Result<TelemetrySample, DecodeError> {
    ensure_len("acc_gyro", payload, ACC_GYRO_LEN)?;
    let mut buf = payload;
    let ms = buf.get_u32_le();
    let acc = get_vec3(&mut buf);
    let gyro = get_vec3(&mut buf);
    Ok(TelemetrySample {
        ms,
        acc,
        gyro,
        quaternion: None,
    })
}

/// Decode a 30-byte quaternion+acc/gyro payload.
///
/// Four signed 2-byte quaternion components sit between the counter and
/// the acceleration block.
pub fn decode_quaternion_acc_gyro(payload: &[u8]) -> Result<TelemetrySample, DecodeError> {
    ensure_len("quaternion_acc_gyro", payload, QUATERNION_ACC_GYRO_LEN)?;
    let mut buf = payload;
    let ms = buf.get_u32_le();
    let quaternion = [0; 4].map(|_: i16| buf.get_i16_le());
    let acc = get_vec3(&mut buf);
    let gyro = get_vec3(&mut buf);
    Ok(TelemetrySample {
        ms,
        acc,
        gyro,
        quaternion: Some(quaternion),
    })
}

/// Decode a 13-byte geomagnetism payload.
pub fn decode_magnetism(payload: &[u8]) -> Result<MagnetismSample, DecodeError> {
    ensure_len("magnetism", payload, MAGNETISM_LEN)?;
    let mut buf = payload;
    let ms = buf.get_u32_le();
    Ok(MagnetismSample {
        ms,
        field: get_vec3(&mut buf),
    })
}

/// Decode a 9-byte atmosphere payload: counter, unsigned 3-byte pressure,
/// signed 2-byte temperature.
pub fn decode_atmosphere(payload: &[u8]) -> Result<AtmosphereSample, DecodeError> {
    ensure_len("atmosphere", payload, ATMOSPHERE_LEN)?;
    let mut buf = payload;
    Ok(AtmosphereSample {
        ms: buf.get_u32_le(),
        pressure: buf.get_uint_le(3) as u32,
        temperature: buf.get_i16_le(),
    })
}
