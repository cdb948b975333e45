use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use chrono::{Local, NaiveDateTime, TimeDelta};
use tracing::{debug, info, warn};
use tsnd_frame::{Command, CommandCode, ResponseCategory};
use tsnd_transport::{Connector, SerialConnector, StopSignal, Transport, TransportError};

use crate::config::DeviceConfig;
use crate::error::{DeviceError, Result};
use crate::mode::DeviceMode;
use crate::params::{
    check_entry_index, AccGyroSampling, AccRange, AtmosphereSampling, AutoPowerOff, GyroRange,
    MagnetismSampling, OptionButtonMode, QuaternionSampling,
};
use crate::queue::ResponseQueue;
use crate::response::Response;
use crate::router::{Router, RouterStatus, SinkRegistry, AWAITED_CATEGORIES};
use crate::schedule::{DeviceTimestamp, RecordingSchedule, SavedEntryDescriptor, START_NOW_RUN_FOREVER};
use crate::traits::Confirm;

/// Acknowledgement byte meaning success.
pub const OK_BYTE: u8 = 0x00;

/// Overwrite-protection readback meaning "protected".
const OVERWRITE_PROTECTED: u8 = 0x01;

/// Granularity at which response waits re-check the stop signal and router.
const POLL_SLICE: Duration = Duration::from_millis(50);

const CLOCK_SAMPLE_PAUSE: Duration = Duration::from_millis(1);

/// One open connection to a TSND151.
///
/// Every configuration operation first polls the device mode. If the device
/// is recording the command is not sent, a warning is logged and the
/// operation returns `false` or `None`. Parameter types validate their
/// values on construction, so nothing out of range reaches the wire.
///
/// Response waits retry indefinitely on timeout and only give up when the
/// device is closed or the background router has failed.
pub struct Device {
    config: DeviceConfig,
    transport: Arc<Transport>,
    registry: Arc<SinkRegistry>,
    stop: StopSignal,
    router: Mutex<Router>,
    closed: AtomicBool,
    in_flight: HashMap<ResponseCategory, Mutex<()>>,
    quaternion_enabled: AtomicBool,
}

impl Device {
    /// Open a serial port.
    pub fn open(endpoint: &str, config: DeviceConfig) -> Result<Self> {
        Self::open_with(&SerialConnector, endpoint, config)
    }

    /// Open through an arbitrary connector.
    pub fn open_with(connector: &dyn Connector, endpoint: &str, config: DeviceConfig) -> Result<Self> {
        let stop = StopSignal::new();
        let transport = Arc::new(Transport::new(stop.clone()));
        transport.open(connector, &config.link_settings(endpoint), config.open_settle)?;

        let registry = Arc::new(SinkRegistry::new());
        let router = match Router::spawn(
            Arc::clone(&transport),
            Arc::clone(&registry),
            stop.clone(),
            config.idle_backoff,
        ) {
            Ok(router) => router,
            Err(err) => {
                if let Err(close_err) = transport.close(Duration::ZERO) {
                    warn!(error = %close_err, "close after failed router start");
                }
                return Err(TransportError::Io(err).into());
            }
        };

        info!(endpoint, "device open");
        Ok(Self {
            config,
            transport,
            registry,
            stop,
            router: Mutex::new(router),
            closed: AtomicBool::new(false),
            in_flight: AWAITED_CATEGORIES
                .iter()
                .map(|category| (*category, Mutex::new(())))
                .collect(),
            quaternion_enabled: AtomicBool::new(false),
        })
    }

    /// Shut down: signal the router, join it, then release the channel.
    ///
    /// Safe to call more than once. Any thread blocked in a response wait
    /// returns [`DeviceError::Stopped`].
    pub fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.transport.mark_closing();
        self.stop.trigger();
        self.router().shutdown();
        self.transport.close(self.config.close_settle)?;
        info!("device closed");
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        !self.closed.load(Ordering::SeqCst) && self.transport.is_open()
    }

    pub fn endpoint(&self) -> Option<String> {
        self.transport.endpoint()
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    pub fn router_status(&self) -> RouterStatus {
        self.router().status()
    }

    // ---- sink registration ----

    /// Replace the sink for `category`; `None` discards its responses.
    ///
    /// Unregistering a category the facade awaits makes the matching
    /// operations fail with [`DeviceError::NoSink`].
    pub fn set_sink(
        &self,
        category: ResponseCategory,
        sink: Option<ResponseQueue>,
    ) -> Option<ResponseQueue> {
        self.registry.set_sink(category, sink)
    }

    /// Register a fresh queue for `category` and return it.
    pub fn subscribe(&self, category: ResponseCategory) -> ResponseQueue {
        let queue = ResponseQueue::new();
        self.registry.set_sink(category, Some(queue.clone()));
        queue
    }

    /// Drop everything pending in every sink.
    pub fn clear_all_pending(&self) -> usize {
        self.registry.clear_all_pending()
    }

    pub fn registry(&self) -> &SinkRegistry {
        &self.registry
    }

    /// Category inertial samples currently stream on.
    pub fn telemetry_category(&self) -> ResponseCategory {
        if self.quaternion_enabled.load(Ordering::SeqCst) {
            ResponseCategory::QuaternionAccGyroData
        } else {
            ResponseCategory::AccGyroData
        }
    }

    // ---- mode ----

    /// Query the mode, waiting as long as it takes.
    pub fn get_mode(&self) -> Result<DeviceMode> {
        let response = self.exchange(Command::new(CommandCode::GetMode), ResponseCategory::Mode)?;
        expect_mode(response)
    }

    /// Query the mode with a single bounded wait; `None` on timeout.
    pub fn try_get_mode(&self) -> Result<Option<DeviceMode>> {
        self.exchange_with(Command::new(CommandCode::GetMode), ResponseCategory::Mode, false)?
            .map(expect_mode)
            .transpose()
    }

    // ---- clock ----

    pub fn set_time(&self, at: NaiveDateTime) -> Result<bool> {
        let args = DeviceTimestamp::from_datetime(&at)?.to_wire();
        self.guarded("set_time", false, || {
            self.command_ok(Command::with_args(CommandCode::SetTime, args))
        })
    }

    /// Set the device clock to host local time.
    pub fn set_time_now(&self) -> Result<bool> {
        self.set_time(Local::now().naive_local())
    }

    pub fn get_time(&self) -> Result<Option<DeviceTimestamp>> {
        self.guarded("get_time", None, || self.read_time().map(Some))
    }

    /// Mean host-minus-device clock offset over `samples` reads.
    ///
    /// Host time is device time plus the returned offset.
    pub fn measure_clock_offset(&self, samples: u16) -> Result<Option<TimeDelta>> {
        let samples = samples.max(1);
        self.guarded("measure_clock_offset", None, || {
            let mut total = TimeDelta::zero();
            for _ in 0..samples {
                let local = Local::now().naive_local();
                let reading = self.read_time()?;
                let device = reading
                    .to_datetime()
                    .ok_or_else(|| DeviceError::UnexpectedResponse {
                        category: ResponseCategory::Time,
                        detail: format!("invalid device time {reading}"),
                    })?;
                total = total + (local - device);
                std::thread::sleep(CLOCK_SAMPLE_PAUSE);
            }
            Ok(Some(total / i32::from(samples)))
        })
    }

    // ---- sensor configuration ----

    /// Returns `true` if the device echoes the requested selector.
    pub fn set_acc_range(&self, range: AccRange) -> Result<bool> {
        self.guarded("set_acc_range", false, || {
            let selector = range.selector();
            let command = Command::with_arg(CommandCode::SetAccRange, selector);
            match self.exchange(command, ResponseCategory::AccRange)? {
                Response::AccRange(echo) => Ok(echo == selector),
                other => Err(unexpected(other)),
            }
        })
    }

    pub fn set_gyro_range(&self, range: GyroRange) -> Result<bool> {
        self.guarded("set_gyro_range", false, || {
            self.command_ok(Command::with_arg(CommandCode::SetGyroRange, range.selector()))
        })
    }

    pub fn set_acc_and_gyro_interval(&self, sampling: AccGyroSampling) -> Result<bool> {
        self.guarded("set_acc_and_gyro_interval", false, || {
            self.command_ok(Command::with_args(CommandCode::SetAccAndGyroInterval, sampling.args()))
        })
    }

    pub fn set_magnetism_interval(&self, sampling: MagnetismSampling) -> Result<bool> {
        self.guarded("set_magnetism_interval", false, || {
            self.command_ok(Command::with_args(CommandCode::SetMagnetismInterval, sampling.args()))
        })
    }

    pub fn set_atmosphere_interval(&self, sampling: AtmosphereSampling) -> Result<bool> {
        self.guarded("set_atmosphere_interval", false, || {
            self.command_ok(Command::with_args(CommandCode::SetAtmosphereInterval, sampling.args()))
        })
    }

    /// Enabling quaternions forces ±2000 dps and moves inertial samples to
    /// [`ResponseCategory::QuaternionAccGyroData`].
    pub fn set_quaternion_interval(&self, sampling: QuaternionSampling) -> Result<bool> {
        self.guarded("set_quaternion_interval", false, || {
            let ok = self.command_ok(Command::with_args(
                CommandCode::SetQuaternionInterval,
                sampling.args(),
            ))?;
            if ok {
                self.quaternion_enabled
                    .store(sampling.is_enabled(), Ordering::SeqCst);
                if sampling.is_enabled() {
                    info!("quaternion output on; gyro range forced to 2000 dps");
                }
            }
            Ok(ok)
        })
    }

    pub fn set_battery_voltage_measurement(&self, send: bool, save: bool) -> Result<bool> {
        self.guarded("set_battery_voltage_measurement", false, || {
            self.command_ok(Command::with_args(
                CommandCode::SetBatteryVoltageMeasurement,
                [u8::from(send), u8::from(save)],
            ))
        })
    }

    pub fn set_option_button_behavior(&self, mode: OptionButtonMode) -> Result<bool> {
        self.guarded("set_option_button_behavior", false, || {
            self.command_ok(Command::with_arg(CommandCode::SetOptionButtonBehavior, mode.byte()))
        })
    }

    /// Readable in any mode.
    pub fn get_option_button_behavior(&self) -> Result<OptionButtonMode> {
        let command = Command::new(CommandCode::GetOptionButtonBehavior);
        match self.exchange(command, ResponseCategory::OptionButtonBehavior)? {
            Response::OptionButton(byte) => {
                OptionButtonMode::try_from(byte).map_err(|err| DeviceError::UnexpectedResponse {
                    category: ResponseCategory::OptionButtonBehavior,
                    detail: err.to_string(),
                })
            }
            other => Err(unexpected(other)),
        }
    }

    pub fn set_overwrite_protection(&self, enable: bool) -> Result<bool> {
        self.guarded("set_overwrite_protection", false, || {
            self.command_ok(Command::with_arg(
                CommandCode::SetOverwriteProtection,
                u8::from(enable),
            ))
        })
    }

    /// `Some(true)` if stored sessions are protected from being overwritten.
    pub fn get_overwrite_protection(&self) -> Result<Option<bool>> {
        self.guarded("get_overwrite_protection", None, || {
            let command = Command::new(CommandCode::GetOverwriteProtection);
            match self.exchange(command, ResponseCategory::OverwriteProtection)? {
                Response::OverwriteProtection(byte) => Ok(Some(byte == OVERWRITE_PROTECTED)),
                other => Err(unexpected(other)),
            }
        })
    }

    pub fn set_auto_power_off(&self, delay: AutoPowerOff) -> Result<bool> {
        self.guarded("set_auto_power_off", false, || {
            self.command_ok(Command::with_arg(CommandCode::SetAutoPowerOff, delay.value()))
        })
    }

    // ---- recording ----

    /// Start recording immediately with no scheduled stop.
    ///
    /// If the device is already recording this returns `None`, unless
    /// `force_restart` is set, in which case the current recording is
    /// stopped first. Returns the recording settings the device reports.
    pub fn start_recording(&self, force_restart: bool) -> Result<Option<RecordingSchedule>> {
        let mode = self.get_mode()?;
        if !mode.is_command() {
            warn!(%mode, "recording already");
            if !force_restart {
                return Ok(None);
            }
            if !self.stop_recording()? {
                warn!("failed to stop recording");
                return Ok(None);
            }
        }

        let (_notice, started) = self.claim(ResponseCategory::StartRecording)?;
        let command = Command::with_args(CommandCode::StartRecording, START_NOW_RUN_FOREVER);
        let schedule = match self.exchange(command, ResponseCategory::RecordingTimeSettings)? {
            Response::Schedule(schedule) => schedule,
            other => return Err(unexpected(other)),
        };
        if !schedule.runs_forever() {
            warn!(
                stop = ?schedule.stop_time(),
                "run forever requested, but a stop time is configured"
            );
        }

        match self.wait_notice(&started, ResponseCategory::StartRecording)? {
            Response::RecordingStarted => {}
            other => return Err(unexpected(other)),
        }
        info!(scheduled = schedule.scheduled, "recording started");
        Ok(Some(schedule))
    }

    /// Stop recording. Always attempted; `true` if the device is (now) idle.
    pub fn stop_recording(&self) -> Result<bool> {
        let mode = self.get_mode()?;
        if mode.is_command() {
            info!("stopped already");
            return Ok(true);
        }
        let (_notice, stopped) = self.claim(ResponseCategory::StopRecording)?;
        if !self.command_ok(Command::new(CommandCode::StopRecording))? {
            return Ok(false);
        }
        match self.wait_notice(&stopped, ResponseCategory::StopRecording)? {
            Response::RecordingStopped => {}
            other => return Err(unexpected(other)),
        }
        info!("recording stopped");
        Ok(true)
    }

    pub fn get_recording_time_settings(&self) -> Result<Option<RecordingSchedule>> {
        self.guarded("get_recording_time_settings", None, || {
            let command = Command::new(CommandCode::GetRecordingTimeSettings);
            match self.exchange(command, ResponseCategory::RecordingTimeSettings)? {
                Response::Schedule(schedule) => Ok(Some(schedule)),
                other => Err(unexpected(other)),
            }
        })
    }

    // ---- saved entries ----

    pub fn get_saved_entry_num(&self) -> Result<Option<u8>> {
        self.guarded("get_saved_entry_num", None, || self.read_entry_count().map(Some))
    }

    /// Start time of stored session `index` (1..=80).
    ///
    /// `None` if the index is past the stored count or the device is recording.
    pub fn get_saved_entry_info(&self, index: u32) -> Result<Option<SavedEntryDescriptor>> {
        let index = check_entry_index(index)?;
        self.guarded("get_saved_entry_info", None, || {
            if index > self.read_entry_count()? {
                debug!(index, "no such saved entry");
                return Ok(None);
            }
            self.read_entry_info(index).map(Some)
        })
    }

    /// Descriptors of every stored session.
    pub fn list_saved_entries(&self) -> Result<Option<Vec<SavedEntryDescriptor>>> {
        self.guarded("list_saved_entries", None, || {
            let count = self.read_entry_count()?;
            (1..=count)
                .map(|index| self.read_entry_info(index))
                .collect::<Result<Vec<_>>>()
                .map(Some)
        })
    }

    /// Stream stored session `index` back and block until its end marker.
    ///
    /// The samples arrive on whichever sink is registered for the telemetry
    /// categories; subscribe before calling. `false` if the index is past the
    /// stored count or the device is recording.
    pub fn read_saved_entry(&self, index: u32) -> Result<bool> {
        let index = check_entry_index(index)?;
        self.guarded("read_saved_entry", false, || {
            if index > self.read_entry_count()? {
                debug!(index, "no such saved entry");
                return Ok(false);
            }
            let command = Command::with_arg(CommandCode::ReadSavedEntry, index);
            match self.exchange(command, ResponseCategory::SavedEntryEnd)? {
                Response::SavedEntryEnd => Ok(true),
                other => Err(unexpected(other)),
            }
        })
    }

    /// Erase every stored session.
    pub fn clear_saved_entry(&self) -> Result<bool> {
        self.guarded("clear_saved_entry", false, || {
            self.command_ok(Command::new(CommandCode::ClearSavedData))
        })
    }

    /// [`Device::clear_saved_entry`] behind a confirmation prompt.
    pub fn clear_saved_entry_confirmed(&self, confirm: &mut dyn Confirm) -> Result<bool> {
        if !confirm.confirm("Erase all recorded sessions stored on the device?") {
            info!("clear cancelled");
            return Ok(false);
        }
        self.clear_saved_entry()
    }

    // ---- internals ----

    fn router(&self) -> MutexGuard<'_, Router> {
        self.router.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `op` only if the device is in a command mode.
    fn guarded<T>(
        &self,
        operation: &'static str,
        rejected: T,
        op: impl FnOnce() -> Result<T>,
    ) -> Result<T> {
        match self.require_command_mode() {
            Ok(_) => op(),
            Err(DeviceError::Mode(mode)) => {
                warn!(%mode, operation, "device is recording; command not sent");
                Ok(rejected)
            }
            Err(err) => Err(err),
        }
    }

    fn require_command_mode(&self) -> Result<DeviceMode> {
        let mode = self.get_mode()?;
        if mode.is_command() {
            Ok(mode)
        } else {
            Err(DeviceError::Mode(mode))
        }
    }

    fn read_time(&self) -> Result<DeviceTimestamp> {
        match self.exchange(Command::new(CommandCode::GetTime), ResponseCategory::Time)? {
            Response::Time(timestamp) => Ok(timestamp),
            other => Err(unexpected(other)),
        }
    }

    fn read_entry_count(&self) -> Result<u8> {
        let command = Command::new(CommandCode::GetSavedEntryNum);
        match self.exchange(command, ResponseCategory::SavedEntryNum)? {
            Response::SavedEntryCount(count) => Ok(count),
            other => Err(unexpected(other)),
        }
    }

    fn read_entry_info(&self, index: u8) -> Result<SavedEntryDescriptor> {
        let command = Command::with_arg(CommandCode::GetSavedEntryInfo, index);
        match self.exchange(command, ResponseCategory::SavedEntryInfo)? {
            Response::SavedEntryInfo(start) => Ok(SavedEntryDescriptor { index, start }),
            other => Err(unexpected(other)),
        }
    }

    /// Send a command answered by a simple ack; `true` if the ack is OK.
    fn command_ok(&self, command: Command) -> Result<bool> {
        match self.exchange(command, ResponseCategory::Simple)? {
            Response::Ack(code) => {
                if code != OK_BYTE {
                    debug!(code, "command not acknowledged");
                }
                Ok(code == OK_BYTE)
            }
            other => Err(unexpected(other)),
        }
    }

    fn exchange(&self, command: Command, category: ResponseCategory) -> Result<Response> {
        self.exchange_with(command, category, true)?
            .ok_or(DeviceError::Stopped)
    }

    /// Send `command` and wait for the reply on `category`.
    fn exchange_with(
        &self,
        command: Command,
        category: ResponseCategory,
        forever: bool,
    ) -> Result<Option<Response>> {
        let (_in_flight, queue) = self.claim(category)?;
        self.transport.write_all(&command.encode())?;
        debug!(command = %command.code(), args = ?command.args(), "sent");
        self.wait_on(&queue, category, forever)
    }

    /// Take the in-flight lock for `category` and drop whatever is queued on it.
    ///
    /// Held across a send and its wait, so replies cannot be delivered to
    /// another caller, and a response left over from an abandoned wait or an
    /// earlier notification is never taken as the answer to a new command.
    fn claim(
        &self,
        category: ResponseCategory,
    ) -> Result<(Option<MutexGuard<'_, ()>>, ResponseQueue)> {
        let in_flight = self.lock_category(category);
        let queue = self.sink(category)?;
        let stale = queue.drain().len();
        if stale > 0 {
            debug!(%category, stale, "dropped stale responses");
        }
        Ok((in_flight, queue))
    }

    /// Wait for the start/stop notification that follows a claimed command.
    fn wait_notice(&self, queue: &ResponseQueue, category: ResponseCategory) -> Result<Response> {
        self.wait_on(queue, category, true)?
            .ok_or(DeviceError::Stopped)
    }

    fn wait_on(
        &self,
        queue: &ResponseQueue,
        category: ResponseCategory,
        forever: bool,
    ) -> Result<Option<Response>> {
        loop {
            // No deadline if the timeout does not fit in an `Instant`.
            let deadline = Instant::now().checked_add(self.config.response_timeout);
            loop {
                self.check_alive()?;
                let slice = match deadline {
                    Some(deadline) => {
                        let remaining = deadline.saturating_duration_since(Instant::now());
                        if remaining.is_zero() {
                            break;
                        }
                        remaining.min(POLL_SLICE)
                    }
                    None => POLL_SLICE,
                };
                if let Some(response) = queue.recv_timeout(slice) {
                    return Ok(Some(response));
                }
            }
            if !forever {
                debug!(%category, "no response within timeout");
                return Ok(None);
            }
            debug!(%category, "response wait timed out; waiting again");
        }
    }

    fn check_alive(&self) -> Result<()> {
        if self.stop.is_triggered() {
            return Err(DeviceError::Stopped);
        }
        if let RouterStatus::Failed(reason) = self.router_status() {
            return Err(DeviceError::ReaderFailed(reason));
        }
        Ok(())
    }

    fn sink(&self, category: ResponseCategory) -> Result<ResponseQueue> {
        self.registry
            .sink(category)
            .ok_or(DeviceError::NoSink(category))
    }

    fn lock_category(&self, category: ResponseCategory) -> Option<MutexGuard<'_, ()>> {
        self.in_flight
            .get(&category)
            .map(|lock| lock.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            warn!(error = %err, "close on drop failed");
        }
    }
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("transport", &self.transport)
            .field("closed", &self.closed.load(Ordering::SeqCst))
            .finish()
    }
}

fn expect_mode(response: Response) -> Result<DeviceMode> {
    match response {
        Response::Mode(mode) => Ok(mode),
        other => Err(unexpected(other)),
    }
}

fn unexpected(response: Response) -> DeviceError {
    DeviceError::UnexpectedResponse {
        category: response.category(),
        detail: format!("{response:?}"),
    }
}
