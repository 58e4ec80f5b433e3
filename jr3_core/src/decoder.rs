//! Frame synchronisation on the two-wire link.
//!
//! The sensor drives both lines. A frame is announced by a start pulse (data
//! falls and rises again while the clock stays high) and then carries 20 bits,
//! MSB first, each valid on the rising clock edge. `FrameAssembler` is the
//! state machine over successive line levels; `FrameDecoder` drives it by
//! polling a `LineSource`, and `EdgeFeeder` drives it from edge events.
use crate::config::ConnectProbe;
use crate::frame::{FRAME_BITS, Frame};
use crossbeam_channel as xch;
use jr3_traits::{FrameSource, LineSource, LineState};
use std::time::Duration;

const START_LOW: LineState = LineState::new(true, false);
const LAST_BIT: u8 = (FRAME_BITS - 1) as u8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Waiting for both lines high.
    WaitIdle,
    /// Idle seen; waiting for data to fall with the clock high.
    Idle,
    /// Data low under a high clock; waiting for data to return high.
    StartLow,
    /// Waiting for the clock to fall before bit `n`.
    BitFall(u8),
    /// Waiting for the rising edge that latches bit `n`.
    BitRise(u8),
}

#[derive(Debug, Clone)]
pub struct FrameAssembler {
    phase: Phase,
    acc: u32,
    resyncs: u64,
}

impl Default for FrameAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameAssembler {
    pub const fn new() -> Self {
        Self {
            phase: Phase::WaitIdle,
            acc: 0,
            resyncs: 0,
        }
    }

    /// Forget any partial frame and wait for idle again.
    pub fn reset(&mut self) {
        self.phase = Phase::WaitIdle;
        self.acc = 0;
    }

    /// True once a start pulse completed and bits are being shifted in.
    pub const fn in_frame(&self) -> bool {
        matches!(self.phase, Phase::BitFall(_) | Phase::BitRise(_))
    }

    /// Times start detection fell back to waiting for idle.
    pub const fn resyncs(&self) -> u64 {
        self.resyncs
    }

    /// Feed the next sampled level; yields a frame when its last bit latches.
    pub fn push(&mut self, lines: LineState) -> Option<Frame> {
        match self.phase {
            Phase::WaitIdle => {
                if lines == LineState::IDLE {
                    self.phase = Phase::Idle;
                }
            }
            Phase::Idle => {
                if lines == START_LOW {
                    self.phase = Phase::StartLow;
                } else if lines != LineState::IDLE {
                    self.resync();
                }
            }
            Phase::StartLow => {
                if lines == LineState::IDLE {
                    self.acc = 0;
                    self.phase = Phase::BitFall(LAST_BIT);
                } else if lines != START_LOW {
                    self.resync();
                }
            }
            Phase::BitFall(bit) => {
                if !lines.clock {
                    self.phase = Phase::BitRise(bit);
                }
            }
            Phase::BitRise(bit) => {
                if lines.clock {
                    if lines.data {
                        self.acc |= 1 << bit;
                    }
                    if bit == 0 {
                        // A trailing 1 bit leaves the link idle already; edge
                        // feeds will not report that level a second time.
                        self.phase = if lines == LineState::IDLE {
                            Phase::Idle
                        } else {
                            Phase::WaitIdle
                        };
                        return Some(Frame::new(self.acc));
                    }
                    self.phase = Phase::BitFall(bit - 1);
                }
            }
        }
        None
    }

    fn resync(&mut self) {
        self.phase = Phase::WaitIdle;
        self.resyncs += 1;
    }
}

/// Polling decoder: samples both lines as fast as the source allows.
pub struct FrameDecoder<L> {
    lines: L,
    assembler: FrameAssembler,
}

impl<L: LineSource> FrameDecoder<L> {
    pub fn new(lines: L) -> Self {
        Self {
            lines,
            assembler: FrameAssembler::new(),
        }
    }

    /// Block until the next complete frame. Every call starts by waiting
    /// for idle, so a call made mid-frame skips that frame.
    pub fn read_frame(&mut self) -> Frame {
        self.assembler.reset();
        loop {
            if let Some(frame) = self.assembler.push(self.lines.read_lines()) {
                return frame;
            }
        }
    }

    /// Liveness probe: true as soon as the clock level changes within
    /// `probe.polls` reads. Never blocks beyond the probe budget.
    pub fn is_connected(&mut self, probe: &ConnectProbe) -> bool {
        let initial = self.lines.read_clock();
        for _ in 0..probe.polls {
            if self.lines.read_clock() != initial {
                return true;
            }
            pause(probe.interval);
        }
        tracing::debug!(polls = probe.polls, "no clock activity on the sensor link");
        false
    }

    pub fn resyncs(&self) -> u64 {
        self.assembler.resyncs()
    }

    pub fn lines_mut(&mut self) -> &mut L {
        &mut self.lines
    }

    pub fn into_inner(self) -> L {
        self.lines
    }
}

impl<L: LineSource> FrameSource for FrameDecoder<L> {
    fn await_frame(&mut self) -> u32 {
        self.read_frame().raw()
    }
}

fn pause(interval: Duration) {
    if interval.is_zero() {
        std::hint::spin_loop();
    } else {
        std::thread::sleep(interval);
    }
}

/// Edge-driven front half: call `on_edge` from a GPIO interrupt or any
/// other edge callback with the levels seen after the edge.
pub struct EdgeFeeder {
    assembler: FrameAssembler,
    tx: xch::Sender<u32>,
    dropped: u64,
}

impl EdgeFeeder {
    /// Returns false once the receiving side has gone away.
    pub fn on_edge(&mut self, lines: LineState) -> bool {
        let Some(frame) = self.assembler.push(lines) else {
            return true;
        };
        match self.tx.try_send(frame.raw()) {
            Ok(()) => true,
            Err(xch::TrySendError::Full(_)) => {
                self.dropped += 1;
                tracing::trace!(dropped = self.dropped, "frame consumer lagging; frame dropped");
                true
            }
            Err(xch::TrySendError::Disconnected(_)) => false,
        }
    }

    /// Frames discarded because the consumer had not taken the previous one.
    pub const fn dropped(&self) -> u64 {
        self.dropped
    }

    pub const fn resyncs(&self) -> u64 {
        self.assembler.resyncs()
    }
}

/// Receiving half of an edge-driven decoder.
pub struct ChannelFrameSource {
    rx: xch::Receiver<u32>,
}

impl ChannelFrameSource {
    pub fn try_frame(&self) -> Option<Frame> {
        self.rx.try_recv().ok().map(Frame::new)
    }
}

impl FrameSource for ChannelFrameSource {
    fn await_frame(&mut self) -> u32 {
        if let Ok(raw) = self.rx.recv() {
            return raw;
        }
        // Edge source is gone; like a silent sensor, no frame will ever come.
        tracing::warn!("edge feeder disconnected; frame source blocks forever");
        loop {
            std::thread::park();
        }
    }
}

/// Edge-driven decoder pair buffering at most `capacity` frames.
pub fn edge_channel(capacity: usize) -> (EdgeFeeder, ChannelFrameSource) {
    let (tx, rx) = xch::bounded(capacity.max(1));
    (
        EdgeFeeder {
            assembler: FrameAssembler::new(),
            tx,
            dropped: 0,
        },
        ChannelFrameSource { rx },
    )
}
