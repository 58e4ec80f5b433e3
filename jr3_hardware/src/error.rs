use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("gpio error: {0}")]
    Gpio(String),
    #[error("sensor not connected: no clock activity observed")]
    NotConnected,
}

pub type Result<T> = std::result::Result<T, HwError>;
