//! Simulated JR3 sensor.
//!
//! The sensor transmits an endless cycle of frames: supply voltage, the six
//! force/moment axes in order, then one calibration byte. The calibration
//! address advances by one per cycle, so a full EEPROM image arrives every
//! 256 cycles. `SimulatedSensor` reproduces that cycle at frame level;
//! `SimulatedLines` expands any frame source into clock/data levels.
use std::collections::VecDeque;

use jr3_traits::{FrameSource, LineSource, LineState};
use tracing::trace;

pub const EEPROM_SIZE: usize = 256;
pub const FRAME_BITS: u32 = 20;

const CHANNEL_VOLTAGE: u8 = 0;
const CHANNEL_FORCE_X: u8 = 1;
const CHANNEL_CALIBRATION: u8 = 7;
const CYCLE_LEN: u8 = 8;

/// Supply voltage word reported on channel 0 (not used by the decoder).
const VOLTAGE_WORD: u16 = 0x2000;

/// Full-scale values of a typical 6-axis cell (N, N, N, dNm, dNm, dNm).
pub const SAMPLE_FULL_SCALES: [u16; 6] = [115, 111, 185, 56, 52, 61];

/// Normalized 0.5 as a (mantissa, exponent) coefficient.
pub const HALF: (u16, i8) = (0x4000, 0);

/// Produces the six raw axis words for a given revolution number.
pub type AxisGenerator = Box<dyn FnMut(u32) -> [u16; 6] + Send>;

#[inline]
pub fn pack_frame(channel: u8, payload: u16) -> u32 {
    (u32::from(channel & 0x0F) << 16) | u32::from(payload)
}

/// EEPROM image with the given decoupling coefficients and full scales at
/// the offsets the sensor firmware uses (little-endian words).
pub fn eeprom_with(coefficients: [[(u16, i8); 6]; 6], full_scales: [u16; 6]) -> [u8; EEPROM_SIZE] {
    let mut image = [0u8; EEPROM_SIZE];
    for (i, row) in coefficients.iter().enumerate() {
        for (j, &(mantissa, exponent)) in row.iter().enumerate() {
            let at = 10 + 20 * i + 3 * j;
            image[at..at + 2].copy_from_slice(&mantissa.to_le_bytes());
            image[at + 2] = exponent.to_le_bytes()[0];
        }
        let at = 28 + 20 * i;
        image[at..at + 2].copy_from_slice(&full_scales[i].to_le_bytes());
    }
    image
}

/// Diagonal 0.5 decoupling matrix with `SAMPLE_FULL_SCALES`.
pub fn default_eeprom() -> [u8; EEPROM_SIZE] {
    let mut coefficients = [[(0u16, 0i8); 6]; 6];
    for (i, row) in coefficients.iter_mut().enumerate() {
        row[i] = HALF;
    }
    eeprom_with(coefficients, SAMPLE_FULL_SCALES)
}

/// Line levels for one frame: idle, start pulse, then 20 bits MSB first.
///
/// Data only changes while the clock is low, so no start-pulse signature can
/// appear inside the bit train.
pub fn frame_waveform(frame: u32) -> Vec<LineState> {
    let mut levels = Vec::with_capacity(4 + 2 * FRAME_BITS as usize);
    levels.push(LineState::IDLE);
    levels.push(LineState::IDLE);
    levels.push(LineState::new(true, false));
    levels.push(LineState::IDLE);
    for i in (0..FRAME_BITS).rev() {
        let bit = (frame >> i) & 1 == 1;
        levels.push(LineState::new(false, bit));
        levels.push(LineState::new(true, bit));
    }
    levels
}

pub struct SimulatedSensor {
    eeprom: [u8; EEPROM_SIZE],
    axes: AxisGenerator,
    current: [u16; 6],
    revolution: u32,
    slot: u8,
    address: u8,
}

impl SimulatedSensor {
    /// Sensor reporting the same raw axis words on every revolution.
    pub fn new(eeprom: [u8; EEPROM_SIZE], raw: [u16; 6]) -> Self {
        Self::with_axes(eeprom, move |_| raw)
    }

    /// Sensor whose axis words are computed per revolution.
    pub fn with_axes<G>(eeprom: [u8; EEPROM_SIZE], axes: G) -> Self
    where
        G: FnMut(u32) -> [u16; 6] + Send + 'static,
    {
        Self {
            eeprom,
            axes: Box::new(axes),
            current: [0; 6],
            revolution: 0,
            slot: 0,
            address: 0,
        }
    }

    /// Start the calibration stream at an arbitrary address, as a sensor
    /// powered up before the host would.
    pub fn starting_at(mut self, address: u8) -> Self {
        self.address = address;
        self
    }

    pub fn eeprom(&self) -> &[u8; EEPROM_SIZE] {
        &self.eeprom
    }

    pub fn revolutions(&self) -> u32 {
        self.revolution
    }

    fn next_frame(&mut self) -> u32 {
        let frame = match self.slot {
            CHANNEL_VOLTAGE => pack_frame(CHANNEL_VOLTAGE, VOLTAGE_WORD),
            CHANNEL_CALIBRATION => {
                let address = self.address;
                self.address = address.wrapping_add(1);
                let value = self.eeprom[usize::from(address)];
                pack_frame(CHANNEL_CALIBRATION, u16::from_be_bytes([address, value]))
            }
            axis => {
                if axis == CHANNEL_FORCE_X {
                    self.current = (self.axes)(self.revolution);
                }
                pack_frame(axis, self.current[usize::from(axis - CHANNEL_FORCE_X)])
            }
        };
        self.slot += 1;
        if self.slot == CYCLE_LEN {
            self.slot = 0;
            self.revolution = self.revolution.wrapping_add(1);
        }
        frame
    }
}

impl FrameSource for SimulatedSensor {
    fn await_frame(&mut self) -> u32 {
        self.next_frame()
    }
}

/// Line-level view of a frame source: every frame is replayed as the
/// waveform the physical sensor would put on the wire.
pub struct SimulatedLines<F = SimulatedSensor> {
    frames: F,
    pending: VecDeque<LineState>,
}

impl<F: FrameSource> SimulatedLines<F> {
    pub fn new(frames: F) -> Self {
        Self {
            frames,
            pending: VecDeque::new(),
        }
    }

    pub fn into_inner(self) -> F {
        self.frames
    }
}

impl<F: FrameSource> LineSource for SimulatedLines<F> {
    fn read_lines(&mut self) -> LineState {
        if self.pending.is_empty() {
            let frame = self.frames.await_frame();
            trace!(frame = format_args!("{frame:#07x}"), "sim waveform");
            self.pending.extend(frame_waveform(frame));
        }
        self.pending.pop_front().unwrap_or(LineState::IDLE)
    }
}
