use thiserror::Error;

pub type DriftResult<T> = Result<T, DriftError>;

#[derive(Error, Debug)]
pub enum DriftError {
    #[error("Non-finite sample {value} for feature '{feature}'")]
    NonFiniteSample { feature: String, value: f64 },

    #[error("Histogram length mismatch: {left} bins vs {right} bins")]
    HistogramLengthMismatch { left: usize, right: usize },

    #[error("Unknown feature: '{0}'")]
    UnknownFeature(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
