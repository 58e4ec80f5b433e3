//! Runtime configuration for the decoder and controller.
//!
//! These are separate from the TOML-deserialized config in `jr3_config`;
//! see `conversions` for the mapping.
use std::time::Duration;

/// Filter sampling period for a standard JR3 cell (64 kHz).
pub const DEFAULT_SAMPLING_PERIOD_S: f64 = 15.625e-6;

/// Liveness probe budget for `FrameDecoder::is_connected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectProbe {
    /// Clock reads before declaring the link dead.
    pub polls: u32,
    /// Pause between reads; zero spins.
    pub interval: Duration,
}

impl Default for ConnectProbe {
    fn default() -> Self {
        Self {
            polls: 1000,
            interval: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControllerCfg {
    /// T in the filter coefficient α = T / (T + 1/(2πf)).
    pub sampling_period_s: f64,
    /// SCHED_FIFO priority for the push thread (honoured with the `rt` feature).
    pub push_priority: Option<i32>,
}

impl Default for ControllerCfg {
    fn default() -> Self {
        Self {
            sampling_period_s: DEFAULT_SAMPLING_PERIOD_S,
            push_priority: None,
        }
    }
}
