mod common;

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tsnd_device::{DeviceConfig, DeviceError, DeviceMode, Response, RouterStatus};
use tsnd_frame::ResponseCategory;

use common::{fast_config, open, open_with_config, wait_until, SimDevice};

#[test]
fn close_while_idle_reports_clean_stop() {
    let sim = SimDevice::new();
    let device = open(&sim);
    assert_eq!(device.router_status(), RouterStatus::Running);
    assert!(device.is_open());
    assert_eq!(device.endpoint().as_deref(), Some("sim0"));

    thread::sleep(Duration::from_millis(20));
    device.close().expect("close should succeed");

    assert_eq!(device.router_status(), RouterStatus::Stopped);
    assert!(!device.is_open());
    device.close().expect("second close should be a no-op");
}

#[test]
fn close_unblocks_a_pending_wait() {
    let sim = SimDevice::new();
    sim.state().silent.insert(0x3C);
    let device = Arc::new(open(&sim));

    let waiter = {
        let device = Arc::clone(&device);
        thread::spawn(move || device.get_mode())
    };
    assert!(wait_until(Duration::from_secs(2), || sim.written_codes() == vec![0x3C]));

    let started = Instant::now();
    device.close().expect("close should succeed");
    let result = waiter.join().expect("waiter should not panic");

    assert!(matches!(result, Err(DeviceError::Stopped)));
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(device.router_status(), RouterStatus::Stopped);
}

#[test]
fn unknown_code_fails_the_router() {
    let sim = SimDevice::new();
    let device = open(&sim);

    sim.inject(&[0x9A, 0x01]);
    assert!(wait_until(Duration::from_secs(2), || matches!(
        device.router_status(),
        RouterStatus::Failed(_)
    )));

    match device.router_status() {
        RouterStatus::Failed(reason) => assert!(reason.contains("0x01"), "{reason}"),
        other => panic!("expected failure, got {other:?}"),
    }
    assert!(matches!(device.get_mode(), Err(DeviceError::ReaderFailed(_))));
}

#[test]
fn checksum_mismatch_fails_the_router() {
    let sim = SimDevice::new();
    let device = open(&sim);

    let mut corrupted = common::frame(0xBC, &[0x00]);
    if let Some(last) = corrupted.last_mut() {
        *last ^= 0xFF;
    }
    sim.inject(&corrupted);

    assert!(wait_until(Duration::from_secs(2), || matches!(
        device.router_status(),
        RouterStatus::Failed(_)
    )));
}

#[test]
fn noise_before_a_frame_is_skipped() {
    let sim = SimDevice::new();
    let device = open(&sim);

    sim.inject(&[0x00, 0x55, 0xFF]);
    assert_eq!(
        device.get_mode().expect("get_mode should succeed"),
        DeviceMode::UsbCommand
    );
    assert_eq!(device.router_status(), RouterStatus::Running);
}

#[test]
fn telemetry_reaches_a_registered_sink_only() {
    let sim = SimDevice::new();
    let device = open(&sim);

    sim.emit(0x80, &common::acc_gyro_payload(1, [0; 3], [0; 3]));
    device.get_mode().expect("get_mode should succeed");

    let queue = device.subscribe(ResponseCategory::AccGyroData);
    sim.emit(0x80, &common::acc_gyro_payload(1000, [1, 2, 3], [4, 5, 6]));

    let response = queue
        .recv_timeout(Duration::from_secs(2))
        .expect("sample should be routed");
    let sample = response.telemetry().copied().expect("acc/gyro sample");
    assert_eq!(sample.ms, 1000);
    assert_eq!(sample.acc, [1, 2, 3]);
    assert_eq!(sample.gyro, [4, 5, 6]);
    assert!(queue.is_empty());

    device.set_sink(ResponseCategory::AccGyroData, None);
    sim.emit(0x80, &common::acc_gyro_payload(2000, [0; 3], [0; 3]));
    device.get_mode().expect("get_mode should succeed");
    assert!(queue.is_empty());
}

#[test]
fn unregistered_awaited_category_fails_fast() {
    let sim = SimDevice::new();
    let device = open(&sim);

    device.set_sink(ResponseCategory::Mode, None);
    assert!(matches!(
        device.get_mode(),
        Err(DeviceError::NoSink(ResponseCategory::Mode))
    ));
}

#[test]
fn single_attempt_mode_query_times_out() {
    let sim = SimDevice::new();
    sim.state().silent.insert(0x3C);
    let config = DeviceConfig {
        response_timeout: Duration::from_millis(60),
        ..fast_config()
    };
    let device = open_with_config(&sim, config);

    assert_eq!(device.try_get_mode().expect("try_get_mode should complete"), None);
}

#[test]
fn waits_retry_past_the_response_timeout() {
    let sim = SimDevice::new();
    sim.state().silent.insert(0x3C);
    let config = DeviceConfig {
        response_timeout: Duration::from_millis(30),
        ..fast_config()
    };
    let device = open_with_config(&sim, config);

    let late = {
        let sim = sim.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(150));
            sim.emit(0xBC, &[0x02]);
        })
    };
    assert_eq!(
        device.get_mode().expect("get_mode should succeed"),
        DeviceMode::BluetoothCommand
    );
    late.join().expect("emitter should not panic");
}

#[test]
fn stale_replies_are_not_delivered_to_the_next_caller() {
    let sim = SimDevice::new();
    let device = open(&sim);

    sim.emit(0xBC, &[0x03]);
    let mode_queue = device
        .registry()
        .sink(ResponseCategory::Mode)
        .expect("mode sink is registered by default");
    assert!(wait_until(Duration::from_secs(2), || !mode_queue.is_empty()));

    assert_eq!(
        device.get_mode().expect("get_mode should succeed"),
        DeviceMode::UsbCommand
    );
}

#[test]
fn clear_all_pending_empties_every_sink() {
    let sim = SimDevice::new();
    let device = open(&sim);
    let queue = device.subscribe(ResponseCategory::StartRecording);

    sim.emit(0x88, &[0x00]);
    sim.emit(0x8F, &[0x00]);
    assert!(wait_until(Duration::from_secs(2), || !queue.is_empty()));
    assert_eq!(queue.try_recv(), Some(Response::RecordingStarted));

    sim.emit(0x88, &[0x00]);
    assert!(wait_until(Duration::from_secs(2), || !queue.is_empty()));
    assert!(device.clear_all_pending() >= 1);
    assert!(queue.is_empty());
}
