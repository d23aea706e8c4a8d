use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// A chosen connection strategy is missing a required value, or driver
    /// configuration could not be assembled.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Probe, spawn-then-probe, or attach failed.
    #[error("Connection error: {0}")]
    Connection(String),

    /// An operation requiring an open browser, context, or page was invoked
    /// before initialization.
    #[error("Invalid state: {0}")]
    State(&'static str),

    /// Cookies file missing, unreadable, or not a JSON array.
    #[error("Cookies error: {0}")]
    Cookies(String),

    #[error("Discovery error: {0}")]
    Discovery(String),

    #[error("CDP error: {0}")]
    Cdp(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<chromiumoxide::error::CdpError> for Error {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        Error::Cdp(err.to_string())
    }
}

impl From<kestrel_core::Error> for Error {
    fn from(err: kestrel_core::Error) -> Self {
        match err {
            kestrel_core::Error::Io(e) => Error::Io(e),
            other => Error::Configuration(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
