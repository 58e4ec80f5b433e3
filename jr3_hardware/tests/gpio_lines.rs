#![cfg(all(feature = "hardware", target_os = "linux"))]

use jr3_hardware::{GpioLines, HwError};
use jr3_traits::LineSource;

// NOTE: needs a Raspberry Pi; with the sensor attached the clock toggles, without
// it the pull-ups hold both lines high.

#[test]
fn open_and_sample_lines() {
    let clock_pin = 17u8; // adjust for your test rig
    let data_pin = 27u8; // adjust
    let mut lines = GpioLines::open(clock_pin, data_pin).expect("open gpio lines");
    let _ = lines.read_lines();
}

#[test]
fn rejects_shared_pin() {
    match GpioLines::open(17, 17) {
        Err(HwError::Gpio(msg)) => assert!(msg.contains("cannot share")),
        Err(other) => panic!("unexpected error: {other:?}"),
        Ok(_) => panic!("expected an error for a shared pin"),
    }
}
