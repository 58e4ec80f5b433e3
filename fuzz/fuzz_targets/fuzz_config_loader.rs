#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parse errors and validation errors are both fine; panics are not.
    if let Ok(cfg) = toml::from_str::<jr3_config::Config>(data) {
        if cfg.validate().is_ok() {
            let _ = jr3_core::ControllerCfg::try_from(&cfg);
        }
    }
});
