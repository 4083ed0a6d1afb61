use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("insufficient data: need at least {required} distinct dates, got {actual}")]
    InsufficientData { required: usize, actual: usize },
    #[error("invalid quantity {quantity}: must be within [{min}, {max}]")]
    InvalidQuantity { quantity: i64, min: u32, max: u32 },
    #[error("missing column: none of {candidates:?} found in headers")]
    MissingColumn { candidates: Vec<String> },
    #[error("date conversion failed: {0}")]
    DateConversion(String),
    #[error("unknown imputation strategy: {0}")]
    InvalidStrategy(String),
    #[error("invalid horizon: {requested} periods requested, at most {max} supported")]
    InvalidHorizon { requested: usize, max: usize },
    #[error("state lock poisoned")]
    StateLock,
}
