//! Human-readable error descriptions and structured JSON error formatting.

use jr3_core::Jr3Error;
use jr3_hardware::HwError;

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(he) = err.downcast_ref::<HwError>() {
        return match he {
            HwError::NotConnected => {
                "What happened: No clock activity was seen on the sensor lines.\nLikely causes: Sensor unpowered, cable unplugged, or clock/data pins swapped.\nHow to fix: Check the cable and the [pins] section, or raise sensor.probe_polls for a slow link.".to_string()
            }
            HwError::Gpio(msg) => format!(
                "What happened: Failed to open the GPIO inputs ({msg}).\nLikely causes: Incorrect pin numbers or insufficient GPIO permissions.\nHow to fix: Fix the [pins] values in the config; ensure the process has permission to access GPIO."
            ),
        };
    }

    if let Some(je) = err.downcast_ref::<Jr3Error>() {
        return match je {
            Jr3Error::NotReady => {
                "What happened: The controller was used before initialization finished.\nLikely causes: The calibration image was never received, or a decode thread failure reset the controller.\nHow to fix: Run `reset` (console) or restart the command to read the calibration again.".to_string()
            }
            Jr3Error::SourceLost => {
                "What happened: The frame source is gone.\nLikely causes: The decode thread panicked while reading the sensor.\nHow to fix: Re-run with --log-level=debug to see the panic, then restart.".to_string()
            }
            Jr3Error::Thread(msg) => format!(
                "What happened: Could not start a worker thread ({msg}).\nLikely causes: Process or memory limits reached.\nHow to fix: Check ulimits and free resources, then retry."
            ),
        };
    }

    // String-based heuristics for errors coming from init or config
    let msg = err.to_string();
    let lower = format!("{err:#}").to_ascii_lowercase();

    if lower.contains("invalid configuration") {
        return format!(
            "What happened: Configuration is invalid ({}).\nLikely causes: Missing [pins] for the gpio backend, or out-of-range values.\nHow to fix: Edit the TOML config and try again.",
            err.root_cause()
        );
    }

    if lower.contains("parse config") {
        return format!(
            "What happened: The config file is not valid TOML for this tool.\nLikely causes: Typo in a key or an unknown enum value.\nHow to fix: Compare against the documented sections. Detail: {}",
            err.root_cause()
        );
    }

    if lower.contains("eeprom csv") {
        return format!(
            "What happened: EEPROM dump could not be used ({}).\nLikely causes: File edited by hand or truncated.\nHow to fix: Re-capture it with `jr3 eeprom --out FILE`.",
            err.root_cause()
        );
    }

    if lower.contains("hardware feature") {
        return "What happened: The gpio backend is not available in this build.\nLikely causes: Built without `--features hardware` or not running on Linux.\nHow to fix: Rebuild with the hardware feature, or set backend.kind = \"sim\".".to_string();
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable reason names for JSON output.
pub fn reason_name(err: &eyre::Report) -> &'static str {
    if let Some(he) = err.downcast_ref::<HwError>() {
        return match he {
            HwError::NotConnected => "NotConnected",
            HwError::Gpio(_) => "Gpio",
        };
    }
    if let Some(je) = err.downcast_ref::<Jr3Error>() {
        return match je {
            Jr3Error::NotReady => "NotReady",
            Jr3Error::SourceLost => "SourceLost",
            Jr3Error::Thread(_) => "Thread",
        };
    }
    if format!("{err:#}").contains("invalid configuration") {
        return "InvalidConfig";
    }
    "Error"
}

/// Sensor-level failures get their own exit codes; everything else is 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if matches!(err.downcast_ref::<HwError>(), Some(HwError::NotConnected)) {
        return 3;
    }
    match err.downcast_ref::<Jr3Error>() {
        Some(Jr3Error::NotReady) => 4,
        Some(Jr3Error::SourceLost) => 5,
        _ => 1,
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;
    json!({ "reason": reason_name(err), "message": humanize(err) }).to_string()
}
