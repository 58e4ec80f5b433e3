//! Subcommand bodies: probe, eeprom dump, sample streaming and the command
//! console. Everything past the probe is generic over the numeric
//! representation selected by `sensor.representation`.

use crate::backend::{self, BoxedSource, Link};
use crate::cli::{Mode, RtLock};
use crate::rt::setup_rt_once;
use eyre::WrapErr;
use jr3_config::Config;
use jr3_core::{
    AxisValue, Channel, Command, ConnectProbe, ControllerCfg, CutoffFrequency, Frame, FullScales,
    Jr3Error, PushCallback, Response, Sample, SensorController,
};
use jr3_hardware::HwError;
use jr3_traits::FrameSource;
use jr3_traits::clock::{Clock, MonotonicClock};
use serde_json::{Map, Value, json};
use std::io::BufRead;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;
use tracing::{info, warn};

type Controller<V> = SensorController<BoxedSource, V>;

pub fn run_probe(cfg: &Config, json: bool, frames: usize) -> eyre::Result<()> {
    let mut link = Link::open(cfg)?;
    let probe = ConnectProbe::from(&cfg.sensor);
    if !link.is_connected(&probe) {
        return Err(HwError::NotConnected.into());
    }
    let backend = format!("{:?}", cfg.backend.kind).to_ascii_lowercase();
    let mut source = link.into_source();
    let decoded: Vec<Frame> = (0..frames).map(|_| Frame::new(source.await_frame())).collect();
    if json {
        let frames: Vec<String> = decoded.iter().map(ToString::to_string).collect();
        println!(
            "{}",
            json!({ "connected": true, "backend": backend, "frames": frames })
        );
    } else {
        println!("connected ({backend})");
        for frame in &decoded {
            println!("  {frame}");
        }
    }
    Ok(())
}

pub fn run_eeprom<V: AxisValue>(cfg: &Config, json: bool, out: Option<&Path>) -> eyre::Result<()> {
    let mut controller = open_controller::<V>(cfg, ControllerCfg::try_from(cfg)?)?;
    let calibration = controller.initialize()?;
    let image = *calibration.image();
    let matrix = calibration.matrix.to_f64();
    let full_scales = calibration.full_scales.0;

    if let Some(path) = out {
        jr3_config::write_eeprom_csv(path, &image)
            .wrap_err_with(|| format!("write EEPROM CSV {}", path.display()))?;
        info!(path = %path.display(), "EEPROM image stored");
    }

    if json {
        let hex: String = image.iter().map(|b| format!("{b:02x}")).collect();
        println!(
            "{}",
            json!({
                "representation": V::NAME,
                "full_scales": full_scales,
                "matrix": matrix,
                "image": hex,
            })
        );
        return Ok(());
    }

    println!("EEPROM contents:");
    for (row, chunk) in image.chunks(8).enumerate() {
        let hex: Vec<String> = chunk.iter().map(|b| format!("{b:02X}")).collect();
        println!("[{:02X}] {}", row * 8, hex.join(" "));
    }
    println!("\ncalibration matrix ({}):", V::NAME);
    for row in &matrix {
        let cells: Vec<String> = row.iter().map(|c| format!("{c:>10.6}")).collect();
        println!("{}", cells.join(" "));
    }
    println!("\nfull scales: {}", join_words(&full_scales));
    Ok(())
}

/// Effective stream settings after CLI overrides.
#[derive(Debug, Clone, Copy)]
pub struct StreamOpts {
    pub mode: Mode,
    pub cutoff: CutoffFrequency,
    pub period: Duration,
    pub count: Option<u64>,
    pub zero: bool,
    pub rt: bool,
    pub rt_prio: Option<i32>,
    pub rt_lock: Option<RtLock>,
}

pub fn run_stream<V: AxisValue>(
    cfg: &Config,
    json: bool,
    opts: StreamOpts,
    shutdown: &AtomicBool,
) -> eyre::Result<()> {
    let mut ctrl_cfg = ControllerCfg::try_from(cfg)?;
    if opts.rt {
        setup_rt_once(opts.rt_lock.unwrap_or_else(RtLock::os_default));
        ctrl_cfg.push_priority = opts.rt_prio.or(ctrl_cfg.push_priority);
    }
    let mut controller = open_controller::<V>(cfg, ctrl_cfg)?;
    let printer = SamplePrinter {
        json,
        full_scales: controller.initialize()?.full_scales,
    };
    let alpha = controller.set_filter(opts.cutoff)?;
    let done = |printed: u64| opts.count.is_some_and(|n| printed >= n);
    let mut printed = 0u64;

    match opts.mode {
        Mode::Sync => {
            controller.start_sync()?;
            if opts.zero {
                controller.calibrate()?;
            }
            let clock = MonotonicClock::new();
            let mut last_counter = 0;
            while !done(printed) && !shutdown.load(Ordering::Relaxed) {
                clock.wait_precise(opts.period);
                let sample = controller.acquire().ok_or(Jr3Error::SourceLost)?;
                // only fresh revolutions are printed
                if sample.frame_counter == last_counter {
                    continue;
                }
                last_counter = sample.frame_counter;
                printer.print(&sample);
                printed += 1;
            }
        }
        Mode::Async => {
            let (tx, rx) = mpsc::channel::<Sample>();
            controller.start_async(
                move |sample: &Sample| {
                    let _ = tx.send(*sample);
                },
                opts.period,
            )?;
            if opts.zero {
                controller.calibrate()?;
            }
            while !done(printed) && !shutdown.load(Ordering::Relaxed) {
                match rx.recv_timeout(Duration::from_millis(100)) {
                    Ok(sample) => {
                        printer.print(&sample);
                        printed += 1;
                    }
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => return Err(Jr3Error::SourceLost.into()),
                }
            }
        }
    }

    controller.stop()?;
    info!(samples = printed, alpha, mode = ?opts.mode, "stream finished");
    Ok(())
}

pub fn run_console<V: AxisValue>(cfg: &Config, json: bool) -> eyre::Result<()> {
    let mut controller = open_controller::<V>(cfg, ControllerCfg::try_from(cfg)?)?;
    let mut printer = SamplePrinter {
        json,
        full_scales: controller.initialize()?.full_scales,
    };
    info!("console ready; commands: start-sync, start-async <us>, stop, zero, filter <centihz>, full-scales, reset, read, quit");

    for line in std::io::stdin().lock().lines() {
        let line = line.wrap_err("read stdin")?;
        let input = line.trim();
        if input.is_empty() || input.starts_with('#') {
            continue;
        }
        if matches!(input, "quit" | "exit") {
            break;
        }
        let command: Command = match input.parse() {
            Ok(c) => c,
            Err(e) => {
                eprintln!("error: {e}");
                continue;
            }
        };
        let sink = move || -> PushCallback { Box::new(move |sample: &Sample| printer.print(sample)) };
        match controller.apply(command, sink) {
            Ok(response) => {
                if command == Command::Reset
                    && let Some(calibration) = controller.calibration()
                {
                    printer.full_scales = calibration.full_scales;
                }
                printer.response(&response);
            }
            Err(Jr3Error::SourceLost) => return Err(Jr3Error::SourceLost.into()),
            Err(e) => {
                warn!(?command, error = %e, "command rejected");
                eprintln!("error: {e}");
            }
        }
    }

    if controller.is_running() {
        controller.stop()?;
    }
    Ok(())
}

fn open_controller<V: AxisValue>(
    cfg: &Config,
    ctrl_cfg: ControllerCfg,
) -> eyre::Result<Controller<V>> {
    let source = backend::connect(cfg)?;
    Ok(SensorController::new(source, ctrl_cfg))
}

fn join_words(words: &[u16; 6]) -> String {
    words
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Renders samples in physical units (full-scale weighted), text or JSON lines.
#[derive(Debug, Clone, Copy)]
struct SamplePrinter {
    json: bool,
    full_scales: FullScales,
}

impl SamplePrinter {
    fn print(&self, sample: &Sample) {
        println!("{}", self.render(sample));
    }

    fn render(&self, sample: &Sample) -> String {
        let scaled: [f64; 6] =
            std::array::from_fn(|axis| self.full_scales.scale(axis, sample.values[axis]));
        if self.json {
            let mut obj = Map::new();
            obj.insert("frame".into(), json!(sample.frame_counter));
            obj.insert("raw".into(), json!(sample.signed()));
            for (axis, value) in Channel::AXES.iter().zip(scaled) {
                obj.insert(axis.label().into(), json!(value));
            }
            return Value::Object(obj).to_string();
        }
        let mut line = format!("{:>8}", sample.frame_counter);
        for (axis, value) in Channel::AXES.iter().zip(scaled) {
            line.push_str(&format!("  {} {value:>+10.3}", axis.label()));
        }
        line
    }

    fn response(&self, response: &Response) {
        match (response, self.json) {
            (Response::Done, false) => println!("ok"),
            (Response::Done, true) => println!("{}", json!({ "ok": true })),
            (Response::Filter { alpha }, false) => println!("alpha {alpha:.6}"),
            (Response::Filter { alpha }, true) => println!("{}", json!({ "alpha": alpha })),
            (Response::FullScales(words), false) => println!("full scales: {}", join_words(words)),
            (Response::FullScales(words), true) => {
                println!("{}", json!({ "full_scales": words }));
            }
            (Response::Sample(Some(sample)), _) => self.print(sample),
            (Response::Sample(None), false) => println!("no sample: acquisition not running"),
            (Response::Sample(None), true) => println!("{}", json!({ "sample": null })),
        }
    }
}

/// Shared Ctrl-C flag for long-running commands.
pub fn shutdown_flag() -> eyre::Result<Arc<AtomicBool>> {
    let flag = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&flag);
    ctrlc::set_handler(move || handler_flag.store(true, Ordering::SeqCst))
        .wrap_err("install Ctrl-C handler")?;
    Ok(flag)
}
