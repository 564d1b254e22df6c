use thiserror::Error;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Capture engine error: {0}")]
    EngineError(String),

    #[error("Cannot {operation} a session that is {state}")]
    InvalidState {
        operation: &'static str,
        state: &'static str,
    },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

impl CaptureError {
    /// I/O failure carrying an engine message, for errors that did not
    /// originate from a `std::io::Error`.
    pub fn io(message: impl Into<String>) -> Self {
        CaptureError::IoError(std::io::Error::new(
            std::io::ErrorKind::Other,
            message.into(),
        ))
    }
}

impl From<anyhow::Error> for CaptureError {
    fn from(err: anyhow::Error) -> Self {
        CaptureError::ConfigurationError(format!("{:#}", err))
    }
}

pub type Result<T> = std::result::Result<T, CaptureError>;
