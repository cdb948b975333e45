#![allow(dead_code)]

use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::io::{self, Read, Write};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
use tsnd_device::{Device, DeviceConfig, RUN_FOREVER_STOP};
use tsnd_transport::{Connector, Link, LinkSettings};

pub const START: u8 = 0x9A;

pub const MODE_USB_COMMAND: u8 = 0x00;
pub const MODE_USB_RECORDING: u8 = 0x01;

/// Timing tuned for an in-memory link.
pub fn fast_config() -> DeviceConfig {
    DeviceConfig {
        read_timeout: Duration::from_millis(5),
        response_timeout: Duration::from_millis(500),
        open_settle: Duration::ZERO,
        close_settle: Duration::ZERO,
        idle_backoff: Duration::from_millis(2),
        ..DeviceConfig::default()
    }
}

pub fn open(sim: &SimDevice) -> Device {
    open_with_config(sim, fast_config())
}

pub fn open_with_config(sim: &SimDevice, config: DeviceConfig) -> Device {
    Device::open_with(&sim.connector(), "sim0", config).expect("simulated device should open")
}

pub fn frame(code: u8, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 3);
    out.push(START);
    out.push(code);
    out.extend_from_slice(payload);
    out.push(out.iter().fold(0u8, |acc, b| acc ^ b));
    out
}

pub fn acc_gyro_payload(ms: u32, acc: [i32; 3], gyro: [i32; 3]) -> Vec<u8> {
    let mut out = ms.to_le_bytes().to_vec();
    for v in acc.into_iter().chain(gyro) {
        out.extend_from_slice(&v.to_le_bytes()[..3]);
    }
    out
}

/// Poll `check` until it holds or `timeout` passes.
pub fn wait_until(timeout: Duration, mut check: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if check() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    check()
}

/// Collects the message of every `WARN` event.
#[derive(Clone, Default)]
pub struct WarningLog {
    messages: Arc<Mutex<Vec<String>>>,
}

impl WarningLog {
    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .expect("warning log lock should not be poisoned")
            .clone()
    }
}

impl<S: Subscriber> Layer<S> for WarningLog {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() != Level::WARN {
            return;
        }
        let mut message = MessageField::default();
        event.record(&mut message);
        self.messages
            .lock()
            .expect("warning log lock should not be poisoned")
            .push(message.0);
    }
}

#[derive(Default)]
struct MessageField(String);

impl Visit for MessageField {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        }
    }
}

/// Run `f` with warnings on this thread captured.
pub fn capture_warnings<T>(f: impl FnOnce() -> T) -> (T, Vec<String>) {
    let log = WarningLog::default();
    let subscriber = tracing_subscriber::registry().with(log.clone());
    let out = tracing::subscriber::with_default(subscriber, f);
    (out, log.messages())
}

/// Mutable device state, shared between the test and the link.
pub struct SimState {
    pub mode: u8,
    pub ack: u8,
    /// Overrides the selector echoed for set-acc-range.
    pub acc_range_echo: Option<u8>,
    pub gyro_range: u8,
    pub clock: [u8; 8],
    pub schedule_start: [u8; 6],
    pub schedule_stop: [u8; 6],
    pub overwrite_protection: u8,
    pub option_button: u8,
    /// Start times of stored sessions, `yy mo dd hh mi ss ms_lo ms_hi`.
    pub saved_entries: Vec<[u8; 8]>,
    /// Samples streamed per session by read-saved-entry.
    pub entry_samples: u32,
    /// Commands the device ignores.
    pub silent: HashSet<u8>,
    /// Every complete command frame received, in order.
    pub written: Vec<Vec<u8>>,
    /// Defer the mode change and notification of start/stop until
    /// [`SimDevice::release_held`].
    pub hold_notices: bool,
    held_mode: Option<u8>,
    held: Vec<u8>,
    inbox: Vec<u8>,
    outgoing: VecDeque<u8>,
}

impl Default for SimState {
    fn default() -> Self {
        Self {
            mode: MODE_USB_COMMAND,
            ack: 0x00,
            acc_range_echo: None,
            gyro_range: 0,
            clock: [24, 1, 1, 0, 0, 0, 0, 0],
            schedule_start: [0, 1, 1, 0, 0, 0],
            schedule_stop: RUN_FOREVER_STOP,
            overwrite_protection: 0,
            option_button: 0,
            saved_entries: Vec::new(),
            entry_samples: 0,
            silent: HashSet::new(),
            written: Vec::new(),
            hold_notices: false,
            held_mode: None,
            held: Vec::new(),
            inbox: Vec::new(),
            outgoing: VecDeque::new(),
        }
    }
}

impl SimState {
    fn emit(&mut self, code: u8, payload: &[u8]) {
        self.outgoing.extend(frame(code, payload));
    }

    /// Switch mode and report it, now or on release.
    fn transition(&mut self, mode: u8, notice: u8) {
        if self.hold_notices {
            self.held_mode = Some(mode);
            self.held.extend(frame(notice, &[0x00]));
        } else {
            self.mode = mode;
            self.emit(notice, &[0x00]);
        }
    }

    fn ack(&mut self) {
        let ack = self.ack;
        self.emit(0x8F, &[ack]);
    }

    fn schedule_payload(&self) -> Vec<u8> {
        let mut out = vec![0u8];
        out.extend_from_slice(&self.schedule_start);
        out.extend_from_slice(&self.schedule_stop);
        out
    }

    fn is_recording(&self) -> bool {
        self.mode & 0x01 == 0x01
    }

    fn process_inbox(&mut self) {
        loop {
            let Some(start) = self.inbox.iter().position(|b| *b == START) else {
                self.inbox.clear();
                return;
            };
            self.inbox.drain(..start);
            if self.inbox.len() < 2 {
                return;
            }
            let code = self.inbox[1];
            let Some(arg_len) = command_arg_len(code) else {
                self.inbox.drain(..2);
                continue;
            };
            let total = arg_len + 3;
            if self.inbox.len() < total {
                return;
            }
            let raw: Vec<u8> = self.inbox.drain(..total).collect();
            let args = raw[2..2 + arg_len].to_vec();
            self.written.push(raw);
            if !self.silent.contains(&code) {
                self.handle(code, &args);
            }
        }
    }

    fn handle(&mut self, code: u8, args: &[u8]) {
        match code {
            0x11 => {
                self.clock.copy_from_slice(args);
                self.ack();
            }
            0x12 => {
                let clock = self.clock;
                self.emit(0x92, &clock);
            }
            0x13 => {
                let payload = self.schedule_payload();
                self.emit(0x93, &payload);
                if !self.is_recording() {
                    let mode = self.mode | 0x01;
                    self.transition(mode, 0x88);
                }
            }
            0x14 => {
                let payload = self.schedule_payload();
                self.emit(0x93, &payload);
            }
            0x15 => {
                if self.is_recording() {
                    self.ack();
                    if self.ack == 0x00 {
                        let mode = self.mode & !0x01;
                        self.transition(mode, 0x89);
                    }
                } else {
                    self.emit(0x8F, &[0x01]);
                }
            }
            0x23 => {
                let echo = self.acc_range_echo.unwrap_or(args[0]);
                self.emit(0xA3, &[echo]);
            }
            0x25 => {
                self.gyro_range = args[0];
                self.ack();
            }
            0x2C => {
                self.option_button = args[0];
                self.ack();
            }
            0x2D => {
                let value = self.option_button;
                self.emit(0xAD, &[value]);
            }
            0x2E => {
                self.overwrite_protection = args[0];
                self.ack();
            }
            0x2F => {
                let value = self.overwrite_protection;
                self.emit(0xAF, &[value]);
            }
            0x35 => {
                self.saved_entries.clear();
                self.ack();
            }
            0x36 => {
                let count = self.saved_entries.len() as u8;
                self.emit(0xB6, &[count]);
            }
            0x37 => {
                let mut payload = vec![0u8; 24];
                if let Some(start) = self.saved_entries.get(usize::from(args[0]).wrapping_sub(1)) {
                    payload[..8].copy_from_slice(start);
                }
                self.emit(0xB7, &payload);
            }
            0x39 => {
                for i in 0..self.entry_samples {
                    let payload = acc_gyro_payload(i * 10, [0, 0, 10_000], [0, 0, 0]);
                    self.emit(0x80, &payload);
                }
                self.emit(0xB9, &[0x00]);
            }
            0x3C => {
                let mode = self.mode;
                self.emit(0xBC, &[mode]);
            }
            _ => self.ack(),
        }
    }
}

fn command_arg_len(code: u8) -> Option<usize> {
    match code {
        0x11 => Some(8),
        0x13 => Some(14),
        0x16 | 0x18 | 0x1A | 0x55 => Some(3),
        0x1C => Some(2),
        0x12 | 0x14 | 0x15 | 0x23 | 0x25 | 0x2C | 0x2D | 0x2E | 0x2F | 0x35 | 0x36 | 0x37
        | 0x39 | 0x3C | 0x50 => Some(1),
        _ => None,
    }
}

/// In-process stand-in for a TSND151 on the far end of a serial link.
#[derive(Clone, Default)]
pub struct SimDevice {
    state: Arc<Mutex<SimState>>,
}

impl SimDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().expect("sim state lock should not be poisoned")
    }

    pub fn connector(&self) -> impl Connector {
        let sim = self.clone();
        move |_: &LinkSettings| -> tsnd_transport::Result<Box<dyn Link>> {
            Ok(Box::new(sim.clone()))
        }
    }

    /// Queue raw bytes for the host to read.
    pub fn inject(&self, bytes: &[u8]) {
        self.state().outgoing.extend(bytes.iter().copied());
    }

    /// Queue one well-formed frame for the host to read.
    pub fn emit(&self, code: u8, payload: &[u8]) {
        self.state().emit(code, payload);
    }

    /// Apply a held start/stop and send its notification.
    pub fn release_held(&self) {
        let mut state = self.state();
        if let Some(mode) = state.held_mode.take() {
            state.mode = mode;
        }
        let held: Vec<u8> = state.held.drain(..).collect();
        state.outgoing.extend(held);
    }

    /// Command codes received so far, in order.
    pub fn written_codes(&self) -> Vec<u8> {
        self.state().written.iter().map(|raw| raw[1]).collect()
    }

    pub fn written_frames(&self) -> Vec<Vec<u8>> {
        self.state().written.clone()
    }
}

impl Read for SimDevice {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        {
            let mut state = self.state();
            if !state.outgoing.is_empty() {
                let n = buf.len().min(state.outgoing.len());
                for (slot, byte) in buf.iter_mut().zip(state.outgoing.drain(..n)) {
                    *slot = byte;
                }
                return Ok(n);
            }
        }
        thread::sleep(Duration::from_millis(1));
        Err(io::Error::new(io::ErrorKind::TimedOut, "no data"))
    }
}

impl Write for SimDevice {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.state();
        state.inbox.extend_from_slice(buf);
        state.process_inbox();
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
