//! Hardware boundary shared by every JR3 crate.
//!
//! The sensor is the timing master: it drives a clock line and a data line and
//! never waits for us. Everything above this crate only needs to sample those
//! two levels, or to receive fully assembled 20-bit frames.

pub mod clock;

pub use clock::{Clock, MonotonicClock};

/// Instantaneous levels of the clock and data inputs, sampled together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LineState {
    pub clock: bool,
    pub data: bool,
}

impl LineState {
    /// Inter-frame idle: both lines high.
    pub const IDLE: Self = Self::new(true, true);

    #[inline]
    pub const fn new(clock: bool, data: bool) -> Self {
        Self { clock, data }
    }
}

/// Polling access to the two sensor lines.
pub trait LineSource {
    /// Read both levels in one go so they are consistent with each other.
    fn read_lines(&mut self) -> LineState;

    fn read_clock(&mut self) -> bool {
        self.read_lines().clock
    }
}

/// Blocking producer of raw 20-bit frames (`channel:4 | payload:16`).
///
/// There is no timeout: an absent sensor clock blocks forever.
pub trait FrameSource {
    fn await_frame(&mut self) -> u32;
}

impl<T: LineSource + ?Sized> LineSource for Box<T> {
    fn read_lines(&mut self) -> LineState {
        (**self).read_lines()
    }

    fn read_clock(&mut self) -> bool {
        (**self).read_clock()
    }
}

impl<T: FrameSource + ?Sized> FrameSource for Box<T> {
    fn await_frame(&mut self) -> u32 {
        (**self).await_frame()
    }
}
