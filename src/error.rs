use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Wavefield diverged at step {step} (value {value})")]
    NumericalDivergence { step: usize, value: f64 },

    #[error("Snapshot sink failed: {0}")]
    Sink(String),
}

pub type Result<T> = std::result::Result<T, SimError>;

#[macro_export]
macro_rules! config_err {
    ($($arg:tt)*) => {
        Err($crate::error::SimError::Configuration(format!($($arg)*)))
    };
}
