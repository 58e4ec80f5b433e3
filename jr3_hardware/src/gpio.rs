use jr3_traits::{LineSource, LineState};
use rppal::gpio::{Gpio, InputPin};
use tracing::debug;

use crate::error::{HwError, Result};

/// Clock and data inputs on the Raspberry Pi GPIO header.
///
/// Both levels come from the same GPLEV register; they are read back to back
/// (clock first), far faster than the sensor toggles either line.
pub struct GpioLines {
    clock: InputPin,
    data: InputPin,
}

impl GpioLines {
    pub fn open(clock_pin: u8, data_pin: u8) -> Result<Self> {
        if clock_pin == data_pin {
            return Err(HwError::Gpio(format!(
                "clock and data cannot share pin {clock_pin}"
            )));
        }
        let gpio = Gpio::new().map_err(|e| HwError::Gpio(e.to_string()))?;
        // Lines idle high between frames; pull-ups keep a disconnected cable quiet.
        let clock = gpio
            .get(clock_pin)
            .map_err(|e| HwError::Gpio(format!("open clock pin {clock_pin}: {e}")))?
            .into_input_pullup();
        let data = gpio
            .get(data_pin)
            .map_err(|e| HwError::Gpio(format!("open data pin {data_pin}: {e}")))?
            .into_input_pullup();
        debug!(clock_pin, data_pin, "jr3 gpio lines opened");
        Ok(Self { clock, data })
    }
}

impl LineSource for GpioLines {
    #[inline]
    fn read_lines(&mut self) -> LineState {
        let clock = self.clock.is_high();
        LineState::new(clock, self.data.is_high())
    }

    #[inline]
    fn read_clock(&mut self) -> bool {
        self.clock.is_high()
    }
}
