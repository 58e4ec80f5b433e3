//! Inbound controller commands, one per controller operation.
//!
//! A transport (CAN, serial, the CLI console) turns its own messages into
//! `Command`s and hands them to `SensorController::apply`.
use crate::controller::{PushCallback, Sample, SensorController};
use crate::error::Jr3Result;
use crate::filter::CutoffFrequency;
use crate::value::AxisValue;
use jr3_traits::FrameSource;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    StartSync,
    StartAsync { period: Duration },
    Stop,
    Calibrate,
    SetFilter { cutoff: CutoffFrequency },
    GetFullScales,
    /// Re-run initialization (calibration image included).
    Reset,
    Acquire,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Done,
    /// Smoothing factor now in effect.
    Filter { alpha: f64 },
    FullScales([u16; 6]),
    Sample(Option<Sample>),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseCommandError {
    #[error("empty command")]
    Empty,
    #[error("unknown command '{0}'")]
    Unknown(String),
    #[error("'{command}' needs {what}")]
    MissingArgument { command: &'static str, what: &'static str },
    #[error("invalid argument '{0}'")]
    InvalidArgument(String),
    #[error("unexpected extra input '{0}'")]
    Trailing(String),
}

impl FromStr for Command {
    type Err = ParseCommandError;

    /// Console grammar:
    /// `start-sync`, `start-async <period_us>`, `stop`, `zero`, `filter <centihz>`,
    /// `full-scales`, `reset`, `read`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut words = s.split_whitespace();
        let head = words.next().ok_or(ParseCommandError::Empty)?;
        let command = match head.to_ascii_lowercase().as_str() {
            "start-sync" | "sync" => Self::StartSync,
            "start-async" | "async" => {
                let us = number(words.next(), "start-async", "a period in microseconds")?;
                if us == 0 {
                    return Err(ParseCommandError::InvalidArgument("0".into()));
                }
                Self::StartAsync {
                    period: Duration::from_micros(us),
                }
            }
            "stop" => Self::Stop,
            "zero" | "calibrate" => Self::Calibrate,
            "filter" => {
                let centi = number(words.next(), "filter", "a cutoff in hundredths of a hertz")?;
                let centi = u16::try_from(centi)
                    .map_err(|_| ParseCommandError::InvalidArgument(centi.to_string()))?;
                Self::SetFilter {
                    cutoff: CutoffFrequency::from_centihertz(centi),
                }
            }
            "full-scales" | "fs" => Self::GetFullScales,
            "reset" | "init" => Self::Reset,
            "read" | "acquire" => Self::Acquire,
            other => return Err(ParseCommandError::Unknown(other.to_string())),
        };
        if let Some(extra) = words.next() {
            return Err(ParseCommandError::Trailing(extra.to_string()));
        }
        Ok(command)
    }
}

fn number(
    word: Option<&str>,
    command: &'static str,
    what: &'static str,
) -> Result<u64, ParseCommandError> {
    let word = word.ok_or(ParseCommandError::MissingArgument { command, what })?;
    word.parse()
        .map_err(|_| ParseCommandError::InvalidArgument(word.to_string()))
}

impl<F, V> SensorController<F, V>
where
    F: FrameSource + Send + 'static,
    V: AxisValue,
{
    /// Dispatch one command. `sink` builds the push callback and is only
    /// invoked for `StartAsync`.
    pub fn apply<S>(&mut self, command: Command, sink: S) -> Jr3Result<Response>
    where
        S: FnOnce() -> PushCallback,
    {
        Ok(match command {
            Command::StartSync => {
                self.start_sync()?;
                Response::Done
            }
            Command::StartAsync { period } => {
                self.start_async(sink(), period)?;
                Response::Done
            }
            Command::Stop => {
                self.stop()?;
                Response::Done
            }
            Command::Calibrate => {
                self.calibrate()?;
                Response::Done
            }
            Command::SetFilter { cutoff } => Response::Filter {
                alpha: self.set_filter(cutoff)?,
            },
            Command::GetFullScales => Response::FullScales(self.get_full_scales()?),
            Command::Reset => {
                self.initialize()?;
                Response::Done
            }
            Command::Acquire => Response::Sample(self.acquire()),
        })
    }
}
