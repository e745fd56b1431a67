//! Error type shared by the model, statistics and analysis modules

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("invalid rate matrix at ({from}, {to}): {reason}")]
    InvalidRateMatrix {
        from: &'static str,
        to: &'static str,
        reason: String,
    },

    #[error("probability row {row} sums to {sum} (expected 1)")]
    InvalidProbabilityMatrix { row: &'static str, sum: f64 },

    #[error("time step must be positive and finite, got {0}")]
    InvalidStepSize(f64),

    #[error("{name}: need at least 2 observations for an interval, got {n}")]
    InsufficientSample { name: String, n: usize },

    #[error("paired statistic needs equal lengths, got {left} and {right}")]
    LengthMismatch { left: usize, right: usize },

    /// Zero effect difference between adjacent frontier members.
    /// Dominance pruning should make this unreachable.
    #[error("ICER denominator is zero for strategy '{strategy}'")]
    DegenerateIcer { strategy: String },

    #[error("unknown therapy '{0}' (expected aspirin, dual, warfarin, dabigatran110, dabigatran150)")]
    UnknownTherapy(String),

    #[error("invalid setting: {0}")]
    InvalidSetting(String),

    #[error("strategy '{0}' has no observations")]
    EmptyStrategy(String),

    #[error("distribution error: {0}")]
    Distribution(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

pub type ModelResult<T> = Result<T, ModelError>;
