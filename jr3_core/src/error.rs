use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Jr3Error {
    /// Every control operation except `initialize` requires a parsed calibration.
    #[error("controller not in ready state: initialize first")]
    NotReady,
    /// The frame source was lost with a panicked or unspawned decode thread.
    #[error("frame source unavailable (decode thread failed)")]
    SourceLost,
    #[error("thread error: {0}")]
    Thread(String),
}

pub type Jr3Result<T> = std::result::Result<T, Jr3Error>;
