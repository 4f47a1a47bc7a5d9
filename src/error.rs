//! Error types.
//!
//! - [`VarError`]: typed failures raised by the data preparer and the VAR model
//!   code. Library callers match on these.
//! - [`AppError`]: the application-boundary error (message + process exit code)
//!   used by ingest, exports, and the CLI/TUI front-ends.

/// Result alias for model-layer operations.
pub type VarResult<T> = Result<T, VarError>;

/// Failures of the preparation / estimation / forecasting layer.
///
/// None of these are transient: retrying the same call on the same data fails
/// the same way.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum VarError {
    /// Too few observations for the requested lag order or model complexity.
    #[error("insufficient data: {0}")]
    InsufficientData(String),

    /// Singular, rank-deficient, or otherwise degenerate fit.
    #[error("estimation failed: {0}")]
    Estimation(String),

    /// Diagnostics, forecasts, or analyses requested before `fit_model`.
    #[error("model must be fitted first (call fit_model)")]
    NotFitted,

    /// Input series that must be aligned have different lengths.
    #[error("row count mismatch: {left} vs {right}")]
    DimensionMismatch { left: usize, right: usize },

    /// Caller passed an out-of-range argument (horizon, confidence, name).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl VarError {
    /// Process exit code used when this error reaches the binary.
    pub fn exit_code(&self) -> u8 {
        match self {
            VarError::InvalidArgument(_) | VarError::DimensionMismatch { .. } => 2,
            VarError::InsufficientData(_) => 3,
            VarError::Estimation(_) => 4,
            VarError::NotFitted => 5,
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<VarError> for AppError {
    fn from(err: VarError) -> Self {
        AppError::new(err.exit_code(), err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
