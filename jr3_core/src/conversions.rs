//! `From` implementations bridging `jr3_config` types to `jr3_core` types.

use crate::config::{ConnectProbe, ControllerCfg};
use crate::filter::CutoffFrequency;
use eyre::WrapErr;
use std::time::Duration;

impl From<&jr3_config::SensorCfg> for ConnectProbe {
    fn from(c: &jr3_config::SensorCfg) -> Self {
        Self {
            polls: c.probe_polls,
            interval: Duration::from_micros(c.probe_interval_us),
        }
    }
}

impl From<&jr3_config::FilterCfg> for CutoffFrequency {
    fn from(c: &jr3_config::FilterCfg) -> Self {
        Self::from_centihertz(c.cutoff_centihz)
    }
}

impl TryFrom<&jr3_config::Config> for ControllerCfg {
    type Error = eyre::Report;

    fn try_from(c: &jr3_config::Config) -> Result<Self, Self::Error> {
        c.validate().wrap_err("invalid configuration")?;
        Ok(Self {
            sampling_period_s: c.sensor.sampling_period_us * 1e-6,
            push_priority: c.stream.push_priority,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_map_to_runtime_defaults() {
        let cfg = jr3_config::load_toml("").expect("parse");
        let ctrl = ControllerCfg::try_from(&cfg).expect("valid");
        assert!((ctrl.sampling_period_s - crate::config::DEFAULT_SAMPLING_PERIOD_S).abs() < 1e-15);
        assert_eq!(ConnectProbe::from(&cfg.sensor), ConnectProbe::default());
        assert!(CutoffFrequency::from(&cfg.filter).is_unfiltered());
    }

    #[test]
    fn invalid_config_is_rejected_with_context() {
        let cfg = jr3_config::load_toml("[stream]\nperiod_us = 0\n").expect("parse");
        let err = ControllerCfg::try_from(&cfg).expect_err("period 0");
        let chain = format!("{err:#}");
        assert!(chain.contains("invalid configuration"));
        assert!(chain.contains("stream.period_us"));
    }
}
