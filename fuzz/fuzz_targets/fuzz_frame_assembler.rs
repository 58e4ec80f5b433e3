#![no_main]
use jr3_core::FrameAssembler;
use jr3_core::frame::FRAME_MASK;
use jr3_traits::LineState;
use libfuzzer_sys::fuzz_target;

// Each input byte is one sample of the two lines (bit 0 clock, bit 1 data).
fuzz_target!(|data: &[u8]| {
    let mut assembler = FrameAssembler::new();
    for &b in data {
        let lines = LineState::new(b & 1 != 0, b & 2 != 0);
        if let Some(frame) = assembler.push(lines) {
            assert_eq!(frame.raw() & !FRAME_MASK, 0);
            assert!(!assembler.in_frame());
            let _ = frame.channel();
            let _ = frame.calibration_byte();
        }
    }
});
