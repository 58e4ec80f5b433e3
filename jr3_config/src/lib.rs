#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema and EEPROM dump files for the JR3 decoder.
//!
//! - `Config` and its sections are deserialized from TOML and validated.
//! - EEPROM dumps are plain `address,value` CSV files so an image captured
//!   from a real sensor can be replayed by the simulated backend.
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const EEPROM_SIZE: usize = 256;

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Software sensor, no hardware required.
    #[default]
    Sim,
    /// Raspberry Pi GPIO inputs.
    Gpio,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Backend {
    pub kind: BackendKind,
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct Pins {
    pub clock: u8,
    pub data: u8,
}

/// Numeric representation used by the decode pipeline.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Representation {
    /// Q31 fixed point (31 fractional bits over i32).
    #[default]
    Fixed,
    /// IEEE-754 single precision.
    Float,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SensorCfg {
    /// Reciprocal of the revolution rate, drives the filter coefficient.
    pub sampling_period_us: f64,
    pub representation: Representation,
    /// Liveness probe: number of clock polls before giving up.
    pub probe_polls: u32,
    /// Liveness probe: pause between polls (0 = spin).
    pub probe_interval_us: u64,
}

impl Default for SensorCfg {
    fn default() -> Self {
        Self {
            sampling_period_us: 15.625,
            representation: Representation::Fixed,
            probe_polls: 1000,
            probe_interval_us: 0,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FilterCfg {
    /// Low-pass cutoff in hundredths of a hertz; 0 disables filtering.
    pub cutoff_centihz: u16,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StreamMode {
    /// Consumer polls the latest sample.
    #[default]
    Sync,
    /// Samples are pushed to the consumer at a fixed period.
    Async,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StreamCfg {
    pub mode: StreamMode,
    /// Push period for async mode, also the console/stream poll period.
    pub period_us: u64,
    /// Optional SCHED_FIFO priority for the push thread (Linux, `rt` builds).
    pub push_priority: Option<i32>,
}

impl Default for StreamCfg {
    fn default() -> Self {
        Self {
            mode: StreamMode::Sync,
            period_us: 1000,
            push_priority: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SimCfg {
    /// Replay frames as clock/data levels through the real frame decoder.
    pub bit_level: bool,
    /// EEPROM dump to replay instead of the built-in image.
    pub eeprom_csv: Option<PathBuf>,
    /// Raw axis words reported on every revolution.
    pub raw: [u16; 6],
    /// First calibration address the sensor transmits.
    pub start_address: u8,
}

impl Default for SimCfg {
    fn default() -> Self {
        Self {
            bit_level: true,
            eeprom_csv: None,
            raw: [0x1000, 0x0800, 0xF000, 0x0400, 0x0200, 0xFC00],
            start_address: 0,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub backend: Backend,
    /// Required for the gpio backend.
    pub pins: Option<Pins>,
    pub sensor: SensorCfg,
    pub filter: FilterCfg,
    pub stream: StreamCfg,
    pub sim: SimCfg,
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Backend
        if self.backend.kind == BackendKind::Gpio {
            let Some(pins) = self.pins else {
                eyre::bail!("pins section is required for the gpio backend");
            };
            if pins.clock == pins.data {
                eyre::bail!("pins.clock and pins.data must differ");
            }
        }

        // Sensor
        let period = self.sensor.sampling_period_us;
        if !(period.is_finite() && period > 0.0) {
            eyre::bail!("sensor.sampling_period_us must be > 0");
        }
        if period > 1_000_000.0 {
            eyre::bail!("sensor.sampling_period_us is unreasonably large (>1s)");
        }
        if self.sensor.probe_polls == 0 {
            eyre::bail!("sensor.probe_polls must be >= 1");
        }
        if self.sensor.probe_interval_us > 10_000 {
            eyre::bail!("sensor.probe_interval_us must be <= 10000");
        }

        // Stream
        if self.stream.period_us == 0 {
            eyre::bail!("stream.period_us must be >= 1");
        }
        if self.stream.period_us > 10_000_000 {
            eyre::bail!("stream.period_us is unreasonably large (>10s)");
        }
        if let Some(prio) = self.stream.push_priority
            && !(1..=99).contains(&prio)
        {
            eyre::bail!("stream.push_priority must be in 1..=99");
        }

        // Logging
        if let Some(rotation) = self.logging.rotation.as_deref()
            && !matches!(rotation, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never, daily, hourly");
        }

        Ok(())
    }
}

/// One EEPROM byte in a dump file.
///
/// Expected headers:
/// address,value
#[derive(Debug, Deserialize, Serialize, Clone, Copy)]
pub struct EepromRow {
    pub address: u8,
    pub value: u8,
}

/// Load a 256-byte EEPROM dump. Every address must appear exactly once,
/// in any order.
pub fn load_eeprom_csv(path: &Path) -> eyre::Result<[u8; EEPROM_SIZE]> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open EEPROM CSV {:?}: {}", path, e))?;

    // Enforce exact headers
    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let expected = ["address", "value"];
    let actual: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    if actual != expected {
        eyre::bail!(
            "EEPROM CSV must have headers 'address,value', got: {}",
            actual.join(",")
        );
    }

    let mut image = [0u8; EEPROM_SIZE];
    let mut seen = [false; EEPROM_SIZE];
    for (idx, rec) in rdr.deserialize::<EepromRow>().enumerate() {
        let row = rec.map_err(|e| eyre::eyre!("invalid CSV row {}: {}", idx + 2, e))?;
        let at = usize::from(row.address);
        if seen[at] {
            eyre::bail!("EEPROM CSV repeats address {} at row {}", row.address, idx + 2);
        }
        seen[at] = true;
        image[at] = row.value;
    }

    let missing = seen.iter().filter(|s| !**s).count();
    if missing != 0 {
        eyre::bail!("EEPROM CSV is incomplete: {missing} of {EEPROM_SIZE} addresses missing");
    }
    Ok(image)
}

/// Store an EEPROM image as `address,value` rows in address order.
pub fn write_eeprom_csv(path: &Path, image: &[u8; EEPROM_SIZE]) -> eyre::Result<()> {
    let mut wtr = csv::Writer::from_path(path)
        .map_err(|e| eyre::eyre!("create EEPROM CSV {:?}: {}", path, e))?;
    for (address, &value) in (0..=u8::MAX).zip(image.iter()) {
        wtr.serialize(EepromRow { address, value })?;
    }
    wtr.flush()?;
    Ok(())
}
