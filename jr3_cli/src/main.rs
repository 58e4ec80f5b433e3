mod backend;
mod cli;
mod error_fmt;
mod rt;
mod run;

use clap::Parser;
use cli::{Cli, Commands, FILE_GUARD, JSON_MODE, Mode};
use error_fmt::{exit_code_for_error, format_error_json, humanize};
use eyre::WrapErr;
use jr3_config::{Config, Logging, Representation};
use jr3_core::{AxisValue, CutoffFrequency, Fixed};
use run::StreamOpts;
use std::path::Path;
use std::time::Duration;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);
    if let Err(e) = color_eyre::install() {
        eprintln!("failed to install error reporting hooks: {e}");
    }

    if let Err(err) = run(&cli) {
        tracing::error!(error = %err, "command failed");
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", format_error_json(&err));
        } else {
            eprintln!("{}", humanize(&err));
        }
        std::process::exit(exit_code_for_error(&err));
    }
}

fn run(cli: &Cli) -> eyre::Result<()> {
    let cfg = load_config(cli.config.as_deref());
    init_tracing(
        cli.json,
        cli.log_level.as_deref(),
        cfg.as_ref().map(|c| &c.logging).ok(),
    );
    let cfg = cfg?;
    tracing::debug!(
        backend = ?cfg.backend.kind,
        representation = ?cfg.sensor.representation,
        "configuration loaded"
    );
    match cfg.sensor.representation {
        Representation::Fixed => dispatch::<Fixed>(cli, &cfg),
        Representation::Float => dispatch::<f32>(cli, &cfg),
    }
}

fn dispatch<V: AxisValue>(cli: &Cli, cfg: &Config) -> eyre::Result<()> {
    match &cli.cmd {
        Commands::Probe { frames } => run::run_probe(cfg, cli.json, *frames),
        Commands::Eeprom { out } => run::run_eeprom::<V>(cfg, cli.json, out.as_deref()),
        Commands::Stream {
            mode,
            cutoff_centihz,
            period_us,
            count,
            zero,
            rt,
            rt_prio,
            rt_lock,
        } => {
            let opts = StreamOpts {
                mode: mode.unwrap_or_else(|| Mode::from(cfg.stream.mode)),
                cutoff: cutoff_centihz
                    .map_or_else(|| CutoffFrequency::from(&cfg.filter), CutoffFrequency::from_centihertz),
                period: Duration::from_micros(period_us.unwrap_or(cfg.stream.period_us).max(1)),
                count: *count,
                zero: *zero,
                rt: *rt,
                rt_prio: *rt_prio,
                rt_lock: *rt_lock,
            };
            let shutdown = run::shutdown_flag()?;
            run::run_stream::<V>(cfg, cli.json, opts, &shutdown)
        }
        Commands::Console => run::run_console::<V>(cfg, cli.json),
    }
}

/// Without `--config` the built-in defaults apply (simulated sensor).
fn load_config(path: Option<&Path>) -> eyre::Result<Config> {
    let cfg = match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .wrap_err_with(|| format!("read config {}", path.display()))?;
            toml::from_str::<Config>(&text)
                .wrap_err_with(|| format!("parse config {}", path.display()))?
        }
        None => Config::default(),
    };
    cfg.validate().wrap_err("invalid configuration")?;
    Ok(cfg)
}

/// Console logs go to stderr so stdout stays machine-readable; the optional
/// file sink always writes JSON lines.
fn init_tracing(json: bool, level: Option<&str>, logging: Option<&Logging>) {
    let console_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(console_level(level, logging)));
    let console = if json {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_filter(console_filter)
            .boxed()
    } else {
        fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .with_filter(console_filter)
            .boxed()
    };
    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = vec![console];

    if let Some(logging) = logging
        && let Some(file) = logging.file.as_deref()
    {
        let path = Path::new(file);
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let name = path
            .file_name()
            .map_or_else(|| "jr3.log".into(), ToOwned::to_owned);
        let appender = match logging.rotation.as_deref() {
            Some("daily") => tracing_appender::rolling::daily(dir, name),
            Some("hourly") => tracing_appender::rolling::hourly(dir, name),
            _ => tracing_appender::rolling::never(dir, name),
        };
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = FILE_GUARD.set(guard);
        let file_filter = EnvFilter::new(logging.level.as_deref().unwrap_or("info"));
        layers.push(
            fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(file_filter)
                .boxed(),
        );
    }

    let _ = tracing_subscriber::registry().with(layers).try_init();
}

/// `--log-level`, else `[logging].level`, else info.
fn console_level<'a>(flag: Option<&'a str>, logging: Option<&'a Logging>) -> &'a str {
    flag.or_else(|| logging.and_then(|l| l.level.as_deref()))
        .unwrap_or("info")
}
