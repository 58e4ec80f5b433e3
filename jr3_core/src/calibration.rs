//! Calibration EEPROM reassembly and parsing.
//!
//! The sensor streams its 256-byte EEPROM one byte per revolution on the
//! calibration channel, with an address that wraps around. The host may
//! start listening at any address; once 256 consecutive addresses have been
//! collected the image is complete.
use crate::frame::{Channel, Frame};
use crate::value::AxisValue;
use jr3_traits::FrameSource;
use tracing::{debug, info};

pub const IMAGE_SIZE: usize = 256;

const MATRIX_BASE: usize = 10;
const ROW_STRIDE: usize = 20;
const COEFFICIENT_STRIDE: usize = 3;
const FULL_SCALE_BASE: usize = 28;

/// Raw-axis counts that correspond to one full scale.
pub const FULL_SCALE_COUNTS: f64 = 16384.0;

#[derive(Debug, Clone)]
pub struct CalibrationImage {
    bytes: [u8; IMAGE_SIZE],
    filled: usize,
    next: u8,
}

impl Default for CalibrationImage {
    fn default() -> Self {
        Self::new()
    }
}

impl CalibrationImage {
    pub const fn new() -> Self {
        Self {
            bytes: [0; IMAGE_SIZE],
            filled: 0,
            next: 0,
        }
    }

    /// Already complete image, e.g. loaded from a dump file.
    pub const fn from_bytes(bytes: [u8; IMAGE_SIZE]) -> Self {
        Self {
            bytes,
            filled: IMAGE_SIZE,
            next: 0,
        }
    }

    /// Store a byte if it is the first one or continues the running address.
    /// Returns whether the byte was taken.
    pub fn offer(&mut self, address: u8, value: u8) -> bool {
        if self.is_complete() || (self.filled != 0 && address != self.next) {
            return false;
        }
        self.bytes[usize::from(address)] = value;
        self.next = address.wrapping_add(1);
        self.filled += 1;
        true
    }

    pub const fn is_complete(&self) -> bool {
        self.filled == IMAGE_SIZE
    }

    pub const fn filled(&self) -> usize {
        self.filled
    }

    pub const fn bytes(&self) -> &[u8; IMAGE_SIZE] {
        &self.bytes
    }
}

/// Row-major 6×6 decoupling matrix: decoupled = M × raw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationMatrix<V>(pub [[V; 6]; 6]);

impl<V: AxisValue> CalibrationMatrix<V> {
    #[inline]
    pub fn apply(&self, raw: &[V; 6]) -> [V; 6] {
        std::array::from_fn(|i| V::dot(&self.0[i], raw))
    }

    pub fn to_f64(&self) -> [[f64; 6]; 6] {
        self.0.map(|row| row.map(V::to_f64))
    }
}

/// Per-axis full scales as stored in the EEPROM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FullScales(pub [u16; 6]);

impl FullScales {
    /// Two's-complement view of the stored words.
    pub fn signed(&self) -> [i16; 6] {
        self.0.map(|w| w as i16)
    }

    /// Convert a reported sample word on `axis` to physical units.
    pub fn scale(&self, axis: usize, word: u16) -> f64 {
        f64::from(word as i16) * f64::from(self.signed()[axis]) / FULL_SCALE_COUNTS
    }
}

#[derive(Debug, Clone)]
pub struct Calibration<V> {
    pub matrix: CalibrationMatrix<V>,
    pub full_scales: FullScales,
    image: [u8; IMAGE_SIZE],
}

impl<V: AxisValue> Calibration<V> {
    pub fn from_image(image: &[u8; IMAGE_SIZE]) -> Self {
        let word = |at: usize| u16::from_le_bytes([image[at], image[at + 1]]);
        let matrix = std::array::from_fn(|i| {
            std::array::from_fn(|j| {
                let at = MATRIX_BASE + ROW_STRIDE * i + COEFFICIENT_STRIDE * j;
                V::from_coefficient(word(at), image[at + 2] as i8)
            })
        });
        let full_scales = std::array::from_fn(|i| word(FULL_SCALE_BASE + ROW_STRIDE * i));
        Self {
            matrix: CalibrationMatrix(matrix),
            full_scales: FullScales(full_scales),
            image: *image,
        }
    }

    pub const fn image(&self) -> &[u8; IMAGE_SIZE] {
        &self.image
    }
}

/// Consume frames until the full EEPROM image has arrived, then parse it.
///
/// Blocks for at least 256 revolutions; non-calibration frames are skipped.
pub fn parse<V, F>(source: &mut F) -> Calibration<V>
where
    V: AxisValue,
    F: FrameSource + ?Sized,
{
    let mut image = CalibrationImage::new();
    let mut frames: u64 = 0;
    let mut skipped: u64 = 0;
    while !image.is_complete() {
        let frame = Frame::new(source.await_frame());
        frames += 1;
        if frame.channel() != Some(Channel::Calibration) {
            continue;
        }
        let (address, value) = frame.calibration_byte();
        if image.filled() == 0 {
            debug!(address, "calibration stream picked up");
        }
        if !image.offer(address, value) {
            skipped += 1;
        }
    }
    let calibration = Calibration::from_image(image.bytes());
    info!(
        frames,
        skipped,
        representation = V::NAME,
        full_scales = ?calibration.full_scales.0,
        "calibration image complete"
    );
    dump(image.bytes());
    calibration
}

fn dump(image: &[u8; IMAGE_SIZE]) {
    if !tracing::enabled!(tracing::Level::DEBUG) {
        return;
    }
    for (row, chunk) in image.chunks(8).enumerate() {
        let hex: Vec<String> = chunk.iter().map(|b| format!("{b:02X}")).collect();
        debug!("[{:02X}] {}", row * 8, hex.join(" "));
    }
}
