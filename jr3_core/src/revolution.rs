//! Strict FX→MZ sequencing of axis frames into revolutions.
use crate::frame::{Channel, Frame};
use crate::value::AxisValue;

/// Collects one raw value per axis. Any frame other than the expected axis
/// drops the partial revolution and waits for FX again; voltage and
/// calibration frames between MZ and FX are therefore harmless.
#[derive(Debug, Clone)]
pub struct Revolution<V> {
    expected: Channel,
    raw: [V; 6],
    discarded: u64,
}

impl<V: AxisValue> Default for Revolution<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: AxisValue> Revolution<V> {
    pub fn new() -> Self {
        Self {
            expected: Channel::ForceX,
            raw: [V::default(); 6],
            discarded: 0,
        }
    }

    pub const fn expected(&self) -> Channel {
        self.expected
    }

    /// Partial revolutions abandoned because of an out-of-order frame.
    pub const fn discarded(&self) -> u64 {
        self.discarded
    }

    /// Feed a frame; returns the raw axis vector when MZ completes it.
    pub fn push(&mut self, frame: Frame) -> Option<[V; 6]> {
        if frame.channel() != Some(self.expected) {
            if self.expected != Channel::ForceX {
                self.discarded += 1;
                tracing::trace!(frame = %frame, expected = self.expected.label(), "revolution out of sequence");
            }
            self.expected = Channel::ForceX;
            return None;
        }
        let index = self.expected.axis_index()?;
        self.raw[index] = V::from_wire(frame.payload());
        match self.expected.next_axis() {
            Some(next) => {
                self.expected = next;
                None
            }
            None => {
                self.expected = Channel::ForceX;
                Some(self.raw)
            }
        }
    }
}
