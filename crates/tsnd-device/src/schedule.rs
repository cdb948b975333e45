use bytes::Buf;
use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use serde::Serialize;

use crate::error::{DecodeError, RangeError};

/// Stop fields the device reports when a recording has no scheduled end.
pub const RUN_FOREVER_STOP: [u8; 6] = [100, 1, 1, 0, 0, 0];

/// Start-recording arguments: start immediately, never stop.
pub(crate) const START_NOW_RUN_FOREVER: [u8; 14] = [
    0, 0, 1, 1, 0, 0, 0, //
    0, 0, 1, 1, 0, 0, 0,
];

/// Wall-clock time as the device encodes it (device local time, two-digit year).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeviceTimestamp {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub millis: u16,
}

impl DeviceTimestamp {
    /// Encoded size.
    pub const LEN: usize = 8;

    /// Parse `yy mo dd hh mi ss ms_lo ms_hi`. Extra trailing bytes are ignored.
    pub fn parse(mut payload: &[u8]) -> Result<Self, DecodeError> {
        if payload.len() < Self::LEN {
            return Err(DecodeError {
                kind: "time",
                expected: Self::LEN,
                actual: payload.len(),
            });
        }
        Ok(Self {
            year: 2000 + u16::from(payload.get_u8()),
            month: payload.get_u8(),
            day: payload.get_u8(),
            hour: payload.get_u8(),
            minute: payload.get_u8(),
            second: payload.get_u8(),
            millis: payload.get_u16_le(),
        })
    }

    /// Fails for years the two-digit device field cannot hold.
    pub fn from_datetime(dt: &NaiveDateTime) -> Result<Self, RangeError> {
        const YEARS: &str = "2000..=2099";
        let year = dt.year();
        if !(2000..=2099).contains(&year) {
            return Err(RangeError::new("year", year, YEARS));
        }
        let field = |parameter: &'static str, value: u32| {
            u8::try_from(value).map_err(|_| RangeError::new(parameter, value, "0..=255"))
        };
        let millis = (dt.nanosecond() / 1_000_000).min(999);
        Ok(Self {
            year: u16::try_from(year).map_err(|_| RangeError::new("year", year, YEARS))?,
            month: field("month", dt.month())?,
            day: field("day", dt.day())?,
            hour: field("hour", dt.hour())?,
            minute: field("minute", dt.minute())?,
            second: field("second", dt.second())?,
            millis: u16::try_from(millis)
                .map_err(|_| RangeError::new("millis", millis, "0..=999"))?,
        })
    }

    /// Argument bytes for set-time.
    pub fn to_wire(&self) -> [u8; 8] {
        let [ms_lo, ms_hi] = self.millis.to_le_bytes();
        [
            (self.year % 100) as u8,
            self.month,
            self.day,
            self.hour,
            self.minute,
            self.second,
            ms_lo,
            ms_hi,
        ]
    }

    /// `None` if the fields do not form a valid calendar time.
    pub fn to_datetime(&self) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(i32::from(self.year), u32::from(self.month), u32::from(self.day))?
            .and_hms_milli_opt(
                u32::from(self.hour),
                u32::from(self.minute),
                u32::from(self.second),
                u32::from(self.millis),
            )
    }
}

impl std::fmt::Display for DeviceTimestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}.{:03}",
            self.year, self.month, self.day, self.hour, self.minute, self.second, self.millis
        )
    }
}

/// Start and stop date/time as stored in recording settings, `yy mo dd hh mi ss`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScheduleTime(pub [u8; 6]);

impl ScheduleTime {
    pub fn to_datetime(&self) -> Option<NaiveDateTime> {
        let [yy, mo, dd, hh, mi, ss] = self.0;
        NaiveDate::from_ymd_opt(2000 + i32::from(yy), u32::from(mo), u32::from(dd))?
            .and_hms_opt(u32::from(hh), u32::from(mi), u32::from(ss))
    }
}

/// Recording time settings read back from the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RecordingSchedule {
    pub scheduled: bool,
    pub start: ScheduleTime,
    pub stop: ScheduleTime,
}

impl RecordingSchedule {
    pub const LEN: usize = 13;

    /// Parse `flag, start[6], stop[6]`.
    pub fn parse(payload: &[u8]) -> Result<Self, DecodeError> {
        if payload.len() < Self::LEN {
            return Err(DecodeError {
                kind: "recording_time_settings",
                expected: Self::LEN,
                actual: payload.len(),
            });
        }
        let mut start = [0u8; 6];
        let mut stop = [0u8; 6];
        start.copy_from_slice(&payload[1..7]);
        stop.copy_from_slice(&payload[7..13]);
        Ok(Self {
            scheduled: payload[0] == 1,
            start: ScheduleTime(start),
            stop: ScheduleTime(stop),
        })
    }

    /// True if the stop fields carry the run-forever sentinel.
    pub fn runs_forever(&self) -> bool {
        self.stop.0 == RUN_FOREVER_STOP
    }

    /// Scheduled start, when the schedule flag is set.
    pub fn start_time(&self) -> Option<NaiveDateTime> {
        if self.scheduled {
            self.start.to_datetime()
        } else {
            None
        }
    }

    /// Configured stop, `None` when running forever.
    pub fn stop_time(&self) -> Option<NaiveDateTime> {
        if self.runs_forever() {
            None
        } else {
            self.stop.to_datetime()
        }
    }
}

/// One recorded session held in device storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SavedEntryDescriptor {
    /// 1-based entry index.
    pub index: u8,
    pub start: DeviceTimestamp,
}
