//! Error types for the anofox-tsa library.

use thiserror::Error;

/// Result type alias for analysis and forecasting operations.
pub type Result<T> = std::result::Result<T, ForecastError>;

/// Errors that can occur during analysis, model search or evaluation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ForecastError {
    /// Input data is empty.
    #[error("empty input data")]
    EmptyData,

    /// Series too short for the requested seasonal period or test.
    #[error("insufficient data: need at least {needed}, got {got}")]
    InsufficientData { needed: usize, got: usize },

    /// A single model fit did not converge or produced non-finite estimates.
    #[error("model did not converge: {0}")]
    NonConvergence(String),

    /// An order search exhausted every candidate without a successful fit.
    #[error("no viable {family} model: all {attempted} candidates failed")]
    NoViableModel { family: String, attempted: usize },

    /// Actual and predicted sequences differ in length.
    #[error("length mismatch: expected {expected}, got {got}")]
    LengthMismatch { expected: usize, got: usize },

    /// Unsupported fill, differencing or seasonal-model option.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Invalid parameter value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Timestamp-related error.
    #[error("timestamp error: {0}")]
    TimestampError(String),

    /// Model has not been fitted yet.
    #[error("model must be fitted before prediction")]
    FitRequired,

    /// Missing values detected when not allowed.
    #[error("missing values detected in data")]
    MissingValues,

    /// Computation error (e.g., numerical issues).
    #[error("computation error: {0}")]
    ComputationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_are_descriptive() {
        let err = ForecastError::EmptyData;
        assert_eq!(err.to_string(), "empty input data");

        let err = ForecastError::InsufficientData { needed: 12, got: 5 };
        assert_eq!(
            err.to_string(),
            "insufficient data: need at least 12, got 5"
        );

        let err = ForecastError::LengthMismatch {
            expected: 10,
            got: 9,
        };
        assert_eq!(err.to_string(), "length mismatch: expected 10, got 9");

        let err = ForecastError::NoViableModel {
            family: "ARIMA".to_string(),
            attempted: 216,
        };
        assert_eq!(
            err.to_string(),
            "no viable ARIMA model: all 216 candidates failed"
        );

        let err = ForecastError::InvalidConfiguration("unknown fill method 'zero'".to_string());
        assert_eq!(
            err.to_string(),
            "invalid configuration: unknown fill method 'zero'"
        );
    }

    #[test]
    fn errors_are_clonable_and_comparable() {
        let err1 = ForecastError::NonConvergence("nelder-mead".to_string());
        let err2 = err1.clone();
        assert_eq!(err1, err2);
    }
}
