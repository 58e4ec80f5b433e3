use jr3_core::calibration::{self, CalibrationImage, IMAGE_SIZE};
use jr3_core::decoder::FrameDecoder;
use jr3_core::mocks::ScriptedFrames;
use jr3_core::{Calibration, Fixed};
use jr3_hardware::sim::{
    HALF, SAMPLE_FULL_SCALES, SimulatedLines, SimulatedSensor, default_eeprom, eeprom_with,
    pack_frame,
};
use rstest::rstest;

fn patterned_image() -> [u8; IMAGE_SIZE] {
    std::array::from_fn(|i| (i as u8).wrapping_mul(31).wrapping_add(7))
}

fn calibration_frame(address: u8, value: u8) -> u32 {
    pack_frame(7, u16::from_be_bytes([address, value]))
}

#[test]
fn sequential_calibration_frames_rebuild_the_image() {
    let image = patterned_image();
    let frames = (0..=255u8).map(|a| calibration_frame(a, image[usize::from(a)]));
    let mut source = ScriptedFrames::new(frames);
    let cal = calibration::parse::<Fixed, _>(&mut source);
    assert_eq!(cal.image(), &image);
    assert_eq!(source.remaining(), 0);
}

#[test]
fn non_calibration_and_stray_frames_are_skipped() {
    let image = patterned_image();
    let mut frames = Vec::new();
    for a in 0..=255u8 {
        frames.push(pack_frame(1, 0x1234));
        if a == 40 {
            // Out-of-sequence byte: must be dropped, not stored at 99.
            frames.push(calibration_frame(99, 0xEE));
        }
        frames.push(calibration_frame(a, image[usize::from(a)]));
    }
    let mut source = ScriptedFrames::new(frames);
    let cal = calibration::parse::<f32, _>(&mut source);
    assert_eq!(cal.image(), &image);
}

#[rstest]
#[case(0)]
#[case(1)]
#[case(128)]
#[case(255)]
fn image_is_complete_from_any_start_address(#[case] start: u8) {
    let mut sensor = SimulatedSensor::new(default_eeprom(), [0; 6]).starting_at(start);
    let cal = calibration::parse::<Fixed, _>(&mut sensor);
    assert_eq!(cal.image(), &default_eeprom());
    assert_eq!(sensor.revolutions(), 256);
    assert_eq!(cal.full_scales.0, SAMPLE_FULL_SCALES);
}

#[test]
fn matrix_and_full_scales_follow_the_byte_layout() {
    let mut coefficients = [[(0u16, 0i8); 6]; 6];
    coefficients[0][0] = HALF;
    coefficients[2][5] = (0xC000, -2);
    coefficients[5][1] = (0x6000, -1);
    let full_scales = [100, 200, 300, 40, 50, 0xFFC4];
    let image = eeprom_with(coefficients, full_scales);

    let cal = Calibration::<f32>::from_image(&image);
    let m = cal.matrix.to_f64();
    assert_eq!(m[0][0], 0.5);
    assert_eq!(m[2][5], -0.125);
    assert_eq!(m[5][1], 0.375);
    assert_eq!(m[1][1], 0.0);
    assert_eq!(cal.full_scales.0, full_scales);
    assert_eq!(cal.full_scales.signed()[5], -60);

    let fixed = Calibration::<Fixed>::from_image(&image);
    assert_eq!(fixed.matrix.to_f64(), m);
}

#[test]
fn bit_level_link_delivers_the_same_image() {
    let eeprom = eeprom_with([[HALF; 6]; 6], SAMPLE_FULL_SCALES);
    let lines = SimulatedLines::new(SimulatedSensor::new(eeprom, [0x0100; 6]).starting_at(77));
    let mut decoder = FrameDecoder::new(lines);
    let cal = calibration::parse::<Fixed, _>(&mut decoder);
    assert_eq!(cal.image(), &eeprom);
}

#[test]
fn image_from_bytes_is_complete() {
    let image = CalibrationImage::from_bytes(patterned_image());
    assert!(image.is_complete());
    assert_eq!(image.filled(), IMAGE_SIZE);
}
