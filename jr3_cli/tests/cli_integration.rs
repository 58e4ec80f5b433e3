use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use assert_cmd::Command;
use tempfile::tempdir;

fn write_config(dir: &tempfile::TempDir, toml: &str) -> PathBuf {
    let path = dir.path().join("jr3.toml");
    fs::write(&path, toml).unwrap();
    path
}

fn jr3() -> Command {
    let mut cmd = Command::cargo_bin("jr3").unwrap();
    cmd.env_remove("RUST_LOG");
    cmd
}

fn toml_path(path: &Path) -> String {
    path.display().to_string().replace('\\', "/")
}

fn stdout_json_lines(output: &std::process::Output) -> Vec<serde_json::Value> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| serde_json::from_str(l).expect("stdout line is JSON"))
        .collect()
}

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["probe"], 0, "connected (sim)", "stdout")]
#[case(&["probe", "--frames", "16"], 0, "fx:0x1000", "stdout")]
#[case(&["eeprom"], 0, "full scales: 115 111 185 56 52 61", "stdout")]
#[case(&["stream", "--count", "2"], 0, "fz", "stdout")]
#[case(&["stream", "--mode", "async", "--count", "3", "--period-us", "500"], 0, "mz", "stdout")]
#[case(&["stream", "--mode", "bogus"], 2, "invalid value", "stderr")]
#[case(&["dose"], 2, "unrecognized subcommand", "stderr")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let mut cmd = jr3();
    for a in args {
        cmd.arg(a);
    }

    let assert = cmd.assert().code(exit_code);

    match stream {
        "stdout" => {
            assert.stdout(predicate::str::contains(needle));
        }
        "stderr" => {
            assert.stderr(predicate::str::contains(needle));
        }
        other => panic!("unknown stream: {other}"),
    }
}

#[rstest]
#[case("fixed")]
#[case("float")]
fn stream_json_reports_decoupled_words(#[case] representation: &str) {
    let dir = tempdir().unwrap();
    let cfg = write_config(
        &dir,
        &format!("[sensor]\nrepresentation = \"{representation}\"\n"),
    );

    let output = jr3()
        .arg("--config")
        .arg(&cfg)
        .arg("--json")
        .args(["stream", "--count", "3"])
        .output()
        .unwrap();
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let lines = stdout_json_lines(&output);
    assert_eq!(lines.len(), 3);
    let mut last_frame = 0;
    for line in &lines {
        // default sim words halved by the diagonal 0.5 matrix
        assert_eq!(line["raw"], serde_json::json!([2048, 1024, -2048, 512, 256, -512]));
        let frame = line["frame"].as_u64().unwrap();
        assert!(frame > last_frame);
        last_frame = frame;
    }
    let fx = lines[0]["fx"].as_f64().unwrap();
    assert!((fx - 2048.0 * 115.0 / 16384.0).abs() < 1e-9);
}

#[rstest]
fn eeprom_dump_round_trips_through_the_simulator() {
    let dir = tempdir().unwrap();
    let dump = dir.path().join("eeprom.csv");

    jr3()
        .args(["eeprom", "--out"])
        .arg(&dump)
        .assert()
        .success();

    let text = fs::read_to_string(&dump).unwrap();
    assert_eq!(text.lines().next(), Some("address,value"));
    assert_eq!(text.lines().count(), 257);
    let image = jr3_config::load_eeprom_csv(&dump).unwrap();
    assert_eq!(image, jr3_hardware::sim::default_eeprom());

    // Replay the dump with the stream starting mid-image.
    let cfg = write_config(
        &dir,
        &format!(
            "[sim]\neeprom_csv = \"{}\"\nstart_address = 100\n",
            toml_path(&dump)
        ),
    );
    let output = jr3()
        .arg("--config")
        .arg(&cfg)
        .arg("--json")
        .arg("eeprom")
        .output()
        .unwrap();
    assert!(output.status.success());
    let lines = stdout_json_lines(&output);
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["full_scales"], serde_json::json!([115, 111, 185, 56, 52, 61]));
    assert_eq!(lines[0]["matrix"][2][2], 0.5);
    assert_eq!(lines[0]["matrix"][2][3], 0.0);
}

#[rstest]
fn replayed_full_scales_drive_physical_units() {
    let dir = tempdir().unwrap();
    let dump = dir.path().join("wide.csv");
    let mut coefficients = [[(0u16, 0i8); 6]; 6];
    for (i, row) in coefficients.iter_mut().enumerate() {
        row[i] = jr3_hardware::sim::HALF;
    }
    let image = jr3_hardware::sim::eeprom_with(coefficients, [1000, 1000, 1000, 100, 100, 100]);
    jr3_config::write_eeprom_csv(&dump, &image).unwrap();

    let cfg = write_config(
        &dir,
        &format!("[sim]\neeprom_csv = \"{}\"\n", toml_path(&dump)),
    );
    let output = jr3()
        .arg("--config")
        .arg(&cfg)
        .arg("--json")
        .args(["stream", "--count", "1"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let lines = stdout_json_lines(&output);
    assert_eq!(lines.len(), 1);
    assert!((lines[0]["fx"].as_f64().unwrap() - 125.0).abs() < 1e-9);
    assert!((lines[0]["mz"].as_f64().unwrap() + 3.125).abs() < 1e-9);
}

#[rstest]
fn cli_reports_bad_eeprom_header() {
    let dir = tempdir().unwrap();
    let bad_csv = dir.path().join("eeprom.csv");
    let mut f = fs::File::create(&bad_csv).unwrap();
    writeln!(f, "addr,byte").unwrap();
    writeln!(f, "0,1").unwrap();

    let cfg = write_config(
        &dir,
        &format!("[sim]\neeprom_csv = \"{}\"\n", toml_path(&bad_csv)),
    );
    jr3()
        .arg("--config")
        .arg(&cfg)
        .arg("probe")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("EEPROM dump could not be used"))
        .stderr(predicate::str::contains("headers"));
}

#[rstest]
#[case("[stream]\nperiod_us = 0\n", "Configuration is invalid")]
#[case("[sensor]\nprobe_polls = 0\n", "sensor.probe_polls")]
#[case("[backend]\nkind = \"gpio\"\n", "pins section is required")]
#[case("[sensor]\nrepresentation = \"double\"\n", "not valid TOML")]
fn invalid_configs_exit_with_code_one(#[case] toml: &str, #[case] needle: &str) {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, toml);
    jr3()
        .arg("--config")
        .arg(&cfg)
        .arg("probe")
        .assert()
        .code(1)
        .stderr(predicate::str::contains(needle));
}

#[rstest]
fn json_mode_emits_structured_errors() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "[stream]\nperiod_us = 0\n");
    let output = jr3()
        .arg("--config")
        .arg(&cfg)
        .arg("--json")
        .arg("stream")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    let error = stderr
        .lines()
        .filter_map(|l| serde_json::from_str::<serde_json::Value>(l).ok())
        .find(|v| v.get("reason").is_some())
        .expect("structured error line");
    assert_eq!(error["reason"], "InvalidConfig");
    assert!(error["message"].as_str().unwrap().contains("stream.period_us"));
}

#[rstest]
#[case(&[], true)]
#[case(&["--log-level", "warn"], false)]
fn console_level_falls_back_to_the_config(#[case] flags: &[&str], #[case] debug_shown: bool) {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "[logging]\nlevel = \"debug\"\n");
    let output = jr3()
        .arg("--config")
        .arg(&cfg)
        .args(flags)
        .arg("probe")
        .output()
        .unwrap();
    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(stderr.contains("configuration loaded"), debug_shown, "stderr: {stderr}");
}

#[rstest]
fn missing_config_file_is_reported() {
    jr3()
        .args(["--config", "/nonexistent/jr3.toml", "probe"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("read config"));
}

#[cfg(not(feature = "hardware"))]
#[rstest]
fn gpio_backend_needs_the_hardware_feature() {
    let dir = tempdir().unwrap();
    let cfg = write_config(
        &dir,
        "[backend]\nkind = \"gpio\"\n[pins]\nclock = 17\ndata = 27\n",
    );
    jr3()
        .arg("--config")
        .arg(&cfg)
        .arg("probe")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("hardware feature"));
}

#[rstest]
fn console_runs_a_command_script() {
    let script = "\
# comment lines are ignored
full-scales
filter 250
bogus
read
start-sync
zero
stop
filter
quit
read
";
    jr3()
        .arg("console")
        .write_stdin(script)
        .assert()
        .success()
        .stdout(predicate::str::contains("full scales: 115 111 185 56 52 61"))
        .stdout(predicate::str::contains("alpha 0.000245"))
        .stdout(predicate::str::contains("no sample: acquisition not running"))
        .stdout(predicate::str::contains("ok"))
        .stderr(predicate::str::contains("unknown command 'bogus'"))
        .stderr(predicate::str::contains("'filter' needs"));
}

#[rstest]
fn console_json_reports_filter_and_samples() {
    let output = jr3()
        .args(["--json", "console"])
        .write_stdin("filter 0\nstart-sync\nfull-scales\nstop\n")
        .output()
        .unwrap();
    assert!(output.status.success());
    let lines = stdout_json_lines(&output);
    assert_eq!(lines[0]["alpha"], 1.0);
    assert_eq!(lines[1]["ok"], true);
    assert_eq!(lines[2]["full_scales"], serde_json::json!([115, 111, 185, 56, 52, 61]));
    assert_eq!(lines[3]["ok"], true);
}
