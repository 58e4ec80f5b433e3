use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use jr3_core::calibration::Calibration;
use jr3_core::decoder::FrameDecoder;
use jr3_core::mocks::{ScriptedLines, revolution_frames};
use jr3_core::{AxisFilter, AxisValue, Fixed, Frame, Revolution};
use jr3_hardware::sim::{HALF, SAMPLE_FULL_SCALES, eeprom_with, frame_waveform};
use jr3_traits::FrameSource;

// Dense matrix so every multiply contributes.
fn dense_image() -> [u8; 256] {
    let mut coefficients = [[(0x2000u16, -2i8); 6]; 6];
    for (i, row) in coefficients.iter_mut().enumerate() {
        row[i] = HALF;
    }
    eeprom_with(coefficients, SAMPLE_FULL_SCALES)
}

// xorshift words, fixed seed
fn synth_words(n: usize, seed: u32) -> Vec<[u16; 6]> {
    let mut state = seed.max(1);
    let mut next = || {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        (state >> 16) as u16
    };
    (0..n).map(|_| std::array::from_fn(|_| next())).collect()
}

fn pipeline<V: AxisValue>(frames: &[Frame], cal: &Calibration<V>) -> [V; 6] {
    let mut revolution = Revolution::<V>::new();
    let mut filter = AxisFilter::<V>::new();
    for &frame in frames {
        if let Some(raw) = revolution.push(frame) {
            let decoupled = cal.matrix.apply(&raw);
            filter.update(&decoupled, 0.01);
        }
    }
    filter.reported()
}

pub fn bench_decouple(c: &mut Criterion) {
    let image = dense_image();
    let fixed = Calibration::<Fixed>::from_image(&image);
    let float = Calibration::<f32>::from_image(&image);
    let words = synth_words(4096, 0xC0FFEE);
    let frames: Vec<Frame> = words
        .iter()
        .flat_map(|w| revolution_frames(*w))
        .map(Frame::new)
        .collect();

    let mut group = c.benchmark_group("pipeline_4096_revolutions");
    group.bench_function("fixed", |b| {
        b.iter(|| black_box(pipeline(black_box(&frames), &fixed)))
    });
    group.bench_function("float", |b| {
        b.iter(|| black_box(pipeline(black_box(&frames), &float)))
    });
    group.finish();

    let raw_q = words[0].map(Fixed::from_wire);
    let raw_f = words[0].map(f32::from_wire);
    c.bench_function("matrix_apply_fixed", |b| {
        b.iter(|| black_box(fixed.matrix.apply(black_box(&raw_q))))
    });
    c.bench_function("matrix_apply_float", |b| {
        b.iter(|| black_box(float.matrix.apply(black_box(&raw_f))))
    });
}

pub fn bench_frame_decode(c: &mut Criterion) {
    let levels: Vec<_> = (0..256u32)
        .flat_map(|i| frame_waveform((i % 8) << 16 | i * 97))
        .collect();
    c.bench_function("decode_256_frames", |b| {
        b.iter_batched(
            || FrameDecoder::new(ScriptedLines::new(levels.clone())),
            |mut decoder| {
                for _ in 0..256 {
                    black_box(decoder.await_frame());
                }
            },
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_decouple, bench_frame_decode);
criterion_main!(benches);
