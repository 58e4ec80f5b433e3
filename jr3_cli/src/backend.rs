//! Frame source assembly from the typed config.

use eyre::WrapErr;
use jr3_config::{BackendKind, Config, SimCfg};
use jr3_core::{ConnectProbe, FrameDecoder};
use jr3_hardware::{HwError, SimulatedLines, SimulatedSensor, sim};
use jr3_traits::{FrameSource, LineSource};

pub type BoxedSource = Box<dyn FrameSource + Send>;

/// Whatever `backend.kind` selects, before the liveness probe.
pub enum Link {
    /// Line-level input, decoded here.
    Lines(FrameDecoder<Box<dyn LineSource + Send>>),
    /// Already-assembled frames (frame-level simulation).
    Frames(SimulatedSensor),
}

impl Link {
    pub fn open(cfg: &Config) -> eyre::Result<Self> {
        match cfg.backend.kind {
            BackendKind::Sim => {
                let sensor = simulated_sensor(&cfg.sim)?;
                if cfg.sim.bit_level {
                    let lines: Box<dyn LineSource + Send> = Box::new(SimulatedLines::new(sensor));
                    Ok(Self::Lines(FrameDecoder::new(lines)))
                } else {
                    Ok(Self::Frames(sensor))
                }
            }
            BackendKind::Gpio => open_gpio(cfg).map(Self::Lines),
        }
    }

    /// Frame-level sources have no lines to watch and always count as up.
    pub fn is_connected(&mut self, probe: &ConnectProbe) -> bool {
        match self {
            Self::Lines(decoder) => decoder.is_connected(probe),
            Self::Frames(_) => true,
        }
    }

    pub fn into_source(self) -> BoxedSource {
        match self {
            Self::Lines(decoder) => Box::new(decoder),
            Self::Frames(sensor) => Box::new(sensor),
        }
    }
}

/// Open the configured backend and fail with `HwError::NotConnected` when
/// the clock line shows no activity.
pub fn connect(cfg: &Config) -> eyre::Result<BoxedSource> {
    let mut link = Link::open(cfg)?;
    let probe = ConnectProbe::from(&cfg.sensor);
    if !link.is_connected(&probe) {
        return Err(HwError::NotConnected.into());
    }
    tracing::debug!(backend = ?cfg.backend.kind, "sensor link is up");
    Ok(link.into_source())
}

fn simulated_sensor(sim_cfg: &SimCfg) -> eyre::Result<SimulatedSensor> {
    let eeprom = match &sim_cfg.eeprom_csv {
        Some(path) => jr3_config::load_eeprom_csv(path)
            .wrap_err_with(|| format!("load EEPROM CSV {}", path.display()))?,
        None => sim::default_eeprom(),
    };
    Ok(SimulatedSensor::new(eeprom, sim_cfg.raw).starting_at(sim_cfg.start_address))
}

#[cfg(all(feature = "hardware", target_os = "linux"))]
fn open_gpio(cfg: &Config) -> eyre::Result<FrameDecoder<Box<dyn LineSource + Send>>> {
    let pins = cfg
        .pins
        .ok_or_else(|| eyre::eyre!("pins section is required for the gpio backend"))?;
    let lines = jr3_hardware::GpioLines::open(pins.clock, pins.data)?;
    tracing::info!(clock = pins.clock, data = pins.data, "gpio inputs opened");
    let lines: Box<dyn LineSource + Send> = Box::new(lines);
    Ok(FrameDecoder::new(lines))
}

#[cfg(not(all(feature = "hardware", target_os = "linux")))]
fn open_gpio(_cfg: &Config) -> eyre::Result<FrameDecoder<Box<dyn LineSource + Send>>> {
    eyre::bail!("the gpio backend needs a Linux build with the hardware feature")
}
