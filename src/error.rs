//! Error types
//!
//! Transport failures inside an endpoint never surface here: they end the
//! loop that hit them and are only logged. What remains are the failures a
//! caller can actually act on.

use std::fmt;
use std::io;

use crate::hub::HubError;

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type
#[derive(Debug)]
pub enum Error {
    /// I/O failure (binding the listener, socket configuration)
    Io(io::Error),
    /// Hub control loop is unavailable
    Hub(HubError),
    /// Invalid configuration value
    Config(ConfigError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Hub(e) => write!(f, "Hub error: {}", e),
            Error::Config(e) => write!(f, "Configuration error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Hub(e) => Some(e),
            Error::Config(e) => Some(e),
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<HubError> for Error {
    fn from(e: HubError) -> Self {
        Error::Hub(e)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

/// Configuration parse failures
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Listen address could not be parsed
    InvalidAddress { var: &'static str, value: String },
    /// Byte quota is not a non-negative integer
    InvalidQuota { var: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidAddress { var, value } => {
                write!(f, "{} is not a valid listen address: {:?}", var, value)
            }
            ConfigError::InvalidQuota { var, value } => {
                write!(f, "{} is not a valid byte count: {:?}", var, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
