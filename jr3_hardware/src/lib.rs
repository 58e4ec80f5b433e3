//! Hardware backends for the JR3 line interface.
//!
//! - `gpio` (feature `hardware`): real clock/data inputs through `rppal`.
//! - `sim`: a software sensor that emits the same frame cycle and, optionally,
//!   the same line waveform the physical sensor produces.
pub mod error;
#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod gpio;
pub mod sim;

pub use error::HwError;
#[cfg(all(feature = "hardware", target_os = "linux"))]
pub use gpio::GpioLines;
pub use sim::{SimulatedLines, SimulatedSensor, frame_waveform};
