//! Driver for TSND151 motion sensors.
//!
//! A [`Device`] owns one connection. While it is open a background router
//! decodes every incoming frame into a typed [`Response`] and delivers it to
//! the [`ResponseQueue`] registered for its category. The facade methods on
//! [`Device`] send commands and block on those queues for the reply.
//!
//! ```no_run
//! use tsnd_device::{AccRange, Device, DeviceConfig};
//!
//! let device = Device::open("/dev/rfcomm0", DeviceConfig::default())?;
//! device.set_acc_range(AccRange::G16)?;
//! if let Some(schedule) = device.start_recording(false)? {
//!     assert!(schedule.runs_forever());
//! }
//! device.stop_recording()?;
//! device.close()?;
//! # Ok::<(), tsnd_device::DeviceError>(())
//! ```

pub mod config;
pub mod device;
pub mod error;
pub mod mode;
pub mod params;
pub mod queue;
pub mod response;
pub mod router;
pub mod schedule;
pub mod telemetry;
pub mod traits;
pub mod worker;

pub use config::{DeviceConfig, DEFAULT_IDLE_BACKOFF, DEFAULT_RESPONSE_TIMEOUT, DEFAULT_SETTLE};
pub use device::{Device, OK_BYTE};
pub use error::{DecodeError, DeviceError, RangeError, Result};
pub use mode::DeviceMode;
pub use params::{
    AccGyroSampling, AccRange, AtmosphereSampling, AutoPowerOff, GyroRange, MagnetismSampling,
    OptionButtonMode, QuaternionSampling, MAX_SAVED_ENTRIES,
};
pub use queue::ResponseQueue;
pub use response::Response;
pub use router::{Router, RouterStatus, SinkRegistry, AWAITED_CATEGORIES};
pub use schedule::{
    DeviceTimestamp, RecordingSchedule, SavedEntryDescriptor, ScheduleTime, RUN_FOREVER_STOP,
};
pub use telemetry::{
    decode_acc_gyro, decode_atmosphere, decode_magnetism, decode_quaternion_acc_gyro,
    AtmosphereSample, MagnetismSample, TelemetrySample,
};
pub use traits::{pump_telemetry, Confirm, TelemetrySink};
pub use worker::{Flow, LoopWorker};
