//! Error taxonomy for the kinetics engine.
//!
//! Exit-code conventions (used by the `kin` binary):
//!
//! - 2: input/schema/usage problems (unreadable files, unmappable columns)
//! - 3: not enough data to fit (samples or temperature points)
//! - 4: non-physical parameters or domain violations

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum AppError {
    /// The input table's columns could not be mapped to (time, absorbance).
    #[error("{0}")]
    Schema(String),

    /// Too few samples or temperature points for a fit.
    #[error("{0}")]
    InsufficientData(String),

    /// Non-physical calibration constants (e.g. `epsilon * path_length <= 0`).
    #[error("{0}")]
    InvalidParameter(String),

    /// Domain violation feeding a logarithm/reciprocal (non-positive k or T).
    #[error("{0}")]
    InvalidInput(String),

    /// Filesystem / CSV / JSON plumbing failures.
    #[error("{0}")]
    Io(String),
}

impl AppError {
    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema(message.into())
    }

    pub fn insufficient_data(message: impl Into<String>) -> Self {
        Self::InsufficientData(message.into())
    }

    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::InvalidParameter(message.into())
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::Io(message.into())
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            AppError::Schema(_) | AppError::Io(_) => 2,
            AppError::InsufficientData(_) => 3,
            AppError::InvalidParameter(_) | AppError::InvalidInput(_) => 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_convention() {
        assert_eq!(AppError::schema("x").exit_code(), 2);
        assert_eq!(AppError::io("x").exit_code(), 2);
        assert_eq!(AppError::insufficient_data("x").exit_code(), 3);
        assert_eq!(AppError::invalid_parameter("x").exit_code(), 4);
        assert_eq!(AppError::invalid_input("x").exit_code(), 4);
    }
}
