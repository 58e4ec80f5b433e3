#![no_main]
use jr3_core::calibration::IMAGE_SIZE;
use jr3_core::{Calibration, CalibrationImage, Fixed, codec};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Arbitrary (address, value) pairs offered the way calibration frames are.
    let mut image = CalibrationImage::new();
    for pair in data.chunks_exact(2) {
        image.offer(pair[0], pair[1]);
    }
    assert!(image.filled() <= IMAGE_SIZE);

    let fixed = Calibration::<Fixed>::from_image(image.bytes());
    let float = Calibration::<f32>::from_image(image.bytes());
    for (i, row) in fixed.matrix.0.iter().enumerate() {
        for (j, coefficient) in row.iter().enumerate() {
            let _ = coefficient.to_f64();
            let _ = float.matrix.0[i][j].is_nan();
        }
    }
    assert_eq!(fixed.full_scales, float.full_scales);

    for word in data.chunks_exact(2) {
        let raw = u16::from_le_bytes([word[0], word[1]]);
        let _ = codec::encode(codec::decode(raw));
    }
});
