//! Error handling for the w1therm sensor crate.

/// A specialized `Result` type for sensor operations.
pub type Result<T> = std::result::Result<T, SensorError>;

/// The main error type for 1-Wire sensor operations.
#[derive(Debug, thiserror::Error)]
pub enum SensorError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Sensor configuration failed validation
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Precision write to the sensor's control file failed
    #[error("Failed to set sensor precision: {0}")]
    Precision(String),

    /// A sensor status record could not be parsed
    #[error("Failed to parse sensor record: {0}")]
    Parse(String),
}

impl SensorError {
    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new precision error
    pub fn precision(msg: impl Into<String>) -> Self {
        Self::Precision(msg.into())
    }

    /// Create a new parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }
}
