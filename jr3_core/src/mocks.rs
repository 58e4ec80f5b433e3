//! Test and helper mocks for jr3_core
use crate::calibration::IMAGE_SIZE;
use crate::frame::{Channel, Frame};
use crossbeam_channel as xch;
use jr3_traits::{FrameSource, LineSource, LineState};
use std::collections::VecDeque;
use std::time::Duration;

/// Replays a fixed list of line levels, then holds the link idle-high with
/// no further clock activity.
#[derive(Debug, Clone)]
pub struct ScriptedLines {
    levels: VecDeque<LineState>,
    reads: usize,
}

impl ScriptedLines {
    pub fn new<I: IntoIterator<Item = LineState>>(levels: I) -> Self {
        Self {
            levels: levels.into_iter().collect(),
            reads: 0,
        }
    }

    pub fn remaining(&self) -> usize {
        self.levels.len()
    }

    pub const fn reads(&self) -> usize {
        self.reads
    }
}

impl LineSource for ScriptedLines {
    fn read_lines(&mut self) -> LineState {
        self.reads += 1;
        self.levels.pop_front().unwrap_or(LineState::IDLE)
    }
}

/// A dead link: the clock never moves.
#[derive(Debug, Clone, Copy, Default)]
pub struct StuckLines {
    pub level: LineState,
}

impl LineSource for StuckLines {
    fn read_lines(&mut self) -> LineState {
        self.level
    }
}

/// Replays a fixed frame list. Panics when exhausted, which in a decode
/// thread shows up as a lost frame source.
#[derive(Debug, Clone)]
pub struct ScriptedFrames {
    frames: VecDeque<u32>,
}

impl ScriptedFrames {
    pub fn new<I: IntoIterator<Item = u32>>(frames: I) -> Self {
        Self {
            frames: frames.into_iter().collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl FrameSource for ScriptedFrames {
    fn await_frame(&mut self) -> u32 {
        match self.frames.pop_front() {
            Some(frame) => frame,
            None => panic!("ScriptedFrames exhausted"),
        }
    }
}

/// Word the fed source reports on the voltage channel while no frames
/// are queued.
pub const IDLE_VOLTAGE: u16 = 0x2000;

/// Sending half of `frame_feed`. Each batch reaches the source atomically,
/// so idle voltage frames never land inside a revolution.
#[derive(Debug, Clone)]
pub struct FrameFeed {
    tx: xch::Sender<Vec<u32>>,
}

impl FrameFeed {
    pub fn send(&self, frames: Vec<u32>) -> bool {
        self.tx.send(frames).is_ok()
    }

    /// One complete FX..MZ revolution.
    pub fn revolution(&self, words: [u16; 6]) -> bool {
        self.send(revolution_frames(words))
    }

    /// All 256 calibration bytes, address 0 first.
    pub fn calibration_image(&self, image: &[u8; IMAGE_SIZE]) -> bool {
        let frames = (0..=u8::MAX)
            .zip(image.iter())
            .map(|(address, &value)| {
                Frame::from_parts(Channel::Calibration, u16::from_be_bytes([address, value])).raw()
            })
            .collect();
        self.send(frames)
    }
}

pub fn revolution_frames(words: [u16; 6]) -> Vec<u32> {
    Channel::AXES
        .iter()
        .zip(words)
        .map(|(&channel, word)| Frame::from_parts(channel, word).raw())
        .collect()
}

/// Receiving half of `frame_feed`: queued frames first, otherwise a voltage
/// frame every `poll`, the way a live sensor never stops clocking.
#[derive(Debug)]
pub struct FedFrames {
    rx: xch::Receiver<Vec<u32>>,
    pending: VecDeque<u32>,
    poll: Duration,
}

impl FrameSource for FedFrames {
    fn await_frame(&mut self) -> u32 {
        if let Some(frame) = self.pending.pop_front() {
            return frame;
        }
        match self.rx.recv_timeout(self.poll) {
            Ok(batch) => {
                self.pending.extend(batch);
                self.pending
                    .pop_front()
                    .unwrap_or_else(|| Frame::from_parts(Channel::Voltage, IDLE_VOLTAGE).raw())
            }
            Err(xch::RecvTimeoutError::Timeout) => {
                Frame::from_parts(Channel::Voltage, IDLE_VOLTAGE).raw()
            }
            Err(xch::RecvTimeoutError::Disconnected) => {
                std::thread::sleep(self.poll);
                Frame::from_parts(Channel::Voltage, IDLE_VOLTAGE).raw()
            }
        }
    }
}

/// Frame source driven by the test thread.
pub fn frame_feed() -> (FrameFeed, FedFrames) {
    let (tx, rx) = xch::unbounded();
    (
        FrameFeed { tx },
        FedFrames {
            rx,
            pending: VecDeque::new(),
            poll: Duration::from_millis(1),
        },
    )
}
