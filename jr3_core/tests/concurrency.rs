//! Stress the shared sample while the decode thread runs at full speed.
//!
//! Every raw axis carries the revolution number, so a sample mixing two
//! revolutions shows up as unequal axis values.
use jr3_core::{ControllerCfg, Sample, SensorController};
use jr3_hardware::sim::{SimulatedSensor, default_eeprom};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

fn counting_sensor() -> SimulatedSensor {
    SimulatedSensor::with_axes(default_eeprom(), |revolution| [(revolution & 0x7FFF) as u16; 6])
}

fn check(sample: &Sample, last_counter: &mut u32) -> bool {
    let consistent = sample.values.iter().all(|&v| v == sample.values[0]);
    let ordered = sample.frame_counter >= *last_counter;
    *last_counter = sample.frame_counter;
    consistent && ordered
}

#[test]
fn polled_samples_are_never_torn() {
    let mut ctrl: SensorController<SimulatedSensor, f32> =
        SensorController::new(counting_sensor(), ControllerCfg::default());
    ctrl.initialize().expect("initialize");
    ctrl.start_sync().expect("start");

    let deadline = Instant::now() + Duration::from_millis(300);
    let mut last = 0u32;
    let mut polls = 0u64;
    while Instant::now() < deadline {
        let sample = ctrl.acquire().expect("running");
        assert!(check(&sample, &mut last), "torn or reordered sample: {sample:?}");
        polls += 1;
    }
    assert!(polls > 1000);
    assert!(last > 0, "decode thread made no progress");
}

#[test]
fn pushed_and_polled_readers_agree_under_load() {
    let mut ctrl: SensorController<SimulatedSensor> =
        SensorController::new(counting_sensor(), ControllerCfg::default());
    ctrl.initialize().expect("initialize");

    let pushed = Arc::new(AtomicU64::new(0));
    let bad = Arc::new(AtomicU64::new(0));
    let (p, b) = (Arc::clone(&pushed), Arc::clone(&bad));
    let mut last_pushed = 0u32;
    ctrl.start_async(
        move |s| {
            p.fetch_add(1, Ordering::Relaxed);
            if !check(s, &mut last_pushed) {
                b.fetch_add(1, Ordering::Relaxed);
            }
        },
        Duration::from_micros(100),
    )
    .expect("start");

    let deadline = Instant::now() + Duration::from_millis(300);
    let mut last_polled = 0u32;
    while Instant::now() < deadline {
        let sample = ctrl.acquire().expect("running");
        assert!(check(&sample, &mut last_polled), "torn or reordered sample: {sample:?}");
    }
    ctrl.stop().expect("stop");
    assert!(pushed.load(Ordering::Relaxed) > 10);
    assert_eq!(bad.load(Ordering::Relaxed), 0);
}
