#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Core JR3 decoding logic (hardware-agnostic).
//!
//! All hardware interaction goes through `jr3_traits::LineSource` (clock/data
//! levels) or `jr3_traits::FrameSource` (assembled 20-bit frames).
//!
//! ## Architecture
//!
//! - **Frames**: channel/payload layout and the start-pulse state machine (`frame`, `decoder`)
//! - **Codec**: the sensor's 16-bit wire format to and from f32 or Q31 (`codec`, `fixed_point`, `value`)
//! - **Calibration**: EEPROM image reassembly and the decoupling matrix (`calibration`)
//! - **Pipeline**: strict axis sequencing and the per-axis low-pass filter (`revolution`, `filter`)
//! - **Controller**: decode and push threads around one shared sample (`controller`)
//!
//! ## Numeric representation
//!
//! The pipeline is generic over `AxisValue`. `Fixed` (Q31) is the default and
//! keeps the hot loop in integer arithmetic; `f32` follows the sensor's
//! floating-point convention bit for bit.

pub mod calibration;
pub mod codec;
pub mod command;
pub mod config;
pub mod controller;
pub mod conversions;
pub mod decoder;
pub mod error;
pub mod filter;
pub mod fixed_point;
pub mod frame;
pub mod mocks;
pub mod revolution;
#[cfg(all(feature = "rt", target_os = "linux"))]
pub mod rt;
pub mod value;

pub use calibration::{Calibration, CalibrationImage, CalibrationMatrix, FullScales};
pub use command::{Command, Response};
pub use config::{ConnectProbe, ControllerCfg};
pub use controller::{ControllerState, PushCallback, Sample, SensorController};
pub use decoder::{ChannelFrameSource, EdgeFeeder, FrameAssembler, FrameDecoder};
pub use error::{Jr3Error, Jr3Result};
pub use filter::{AxisFilter, CutoffFrequency, smoothing_factor};
pub use fixed_point::Fixed;
pub use frame::{Channel, Frame};
pub use revolution::Revolution;
pub use value::AxisValue;
