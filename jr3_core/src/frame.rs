//! The 20-bit wire frame: a 4-bit channel over a 16-bit payload.

pub const FRAME_BITS: u32 = 20;
pub const FRAME_MASK: u32 = (1 << FRAME_BITS) - 1;

/// Channel identifiers the sensor transmits, in cycle order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Channel {
    Voltage = 0,
    ForceX = 1,
    ForceY = 2,
    ForceZ = 3,
    MomentX = 4,
    MomentY = 5,
    MomentZ = 6,
    Calibration = 7,
}

impl Channel {
    /// The six measurement axes in transmission order.
    pub const AXES: [Self; 6] = [
        Self::ForceX,
        Self::ForceY,
        Self::ForceZ,
        Self::MomentX,
        Self::MomentY,
        Self::MomentZ,
    ];

    /// Position of a measurement axis in a sample, `None` for the others.
    pub const fn axis_index(self) -> Option<usize> {
        match self {
            Self::ForceX => Some(0),
            Self::ForceY => Some(1),
            Self::ForceZ => Some(2),
            Self::MomentX => Some(3),
            Self::MomentY => Some(4),
            Self::MomentZ => Some(5),
            Self::Voltage | Self::Calibration => None,
        }
    }

    /// Axis expected after this one within a revolution; `None` after MZ.
    pub const fn next_axis(self) -> Option<Self> {
        match self {
            Self::ForceX => Some(Self::ForceY),
            Self::ForceY => Some(Self::ForceZ),
            Self::ForceZ => Some(Self::MomentX),
            Self::MomentX => Some(Self::MomentY),
            Self::MomentY => Some(Self::MomentZ),
            Self::MomentZ | Self::Voltage | Self::Calibration => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Voltage => "voltage",
            Self::ForceX => "fx",
            Self::ForceY => "fy",
            Self::ForceZ => "fz",
            Self::MomentX => "mx",
            Self::MomentY => "my",
            Self::MomentZ => "mz",
            Self::Calibration => "calibration",
        }
    }
}

impl TryFrom<u8> for Channel {
    /// Channels 8..=15 are not assigned; the raw id is handed back.
    type Error = u8;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        Ok(match id {
            0 => Self::Voltage,
            1 => Self::ForceX,
            2 => Self::ForceY,
            3 => Self::ForceZ,
            4 => Self::MomentX,
            5 => Self::MomentY,
            6 => Self::MomentZ,
            7 => Self::Calibration,
            other => return Err(other),
        })
    }
}

/// One assembled frame. Bits above the low 20 are always clear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Frame(u32);

impl Frame {
    #[inline]
    pub const fn new(raw: u32) -> Self {
        Self(raw & FRAME_MASK)
    }

    #[inline]
    pub fn from_parts(channel: Channel, payload: u16) -> Self {
        Self((u32::from(channel as u8) << 16) | u32::from(payload))
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn channel_id(self) -> u8 {
        ((self.0 >> 16) & 0x0F) as u8
    }

    #[inline]
    pub fn channel(self) -> Option<Channel> {
        Channel::try_from(self.channel_id()).ok()
    }

    #[inline]
    pub const fn payload(self) -> u16 {
        (self.0 & 0xFFFF) as u16
    }

    /// `(address, value)` carried by a calibration frame.
    #[inline]
    pub const fn calibration_byte(self) -> (u8, u8) {
        let payload = self.payload();
        ((payload >> 8) as u8, (payload & 0xFF) as u8)
    }
}

impl std::fmt::Display for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.channel() {
            Some(channel) => write!(f, "{}:{:#06x}", channel.label(), self.payload()),
            None => write!(f, "ch{}:{:#06x}", self.channel_id(), self.payload()),
        }
    }
}
