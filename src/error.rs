use thiserror::Error;

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

/// Failures raised by the interpolation and optimization core.
///
/// Every variant is fatal for the run that raised it; a pass of the
/// continuous optimizer that does not converge is reported through logging
/// instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OptError {
    #[error(
        "Query (mismatches, cover_extension)=({mismatches}, {cover_extension}) lies outside the measured range of dataset '{dataset}'"
    )]
    OutOfRange {
        dataset: String,
        mismatches: f64,
        cover_extension: f64,
    },

    #[error(
        "Unable to find rectangular bounding box around (mismatches, cover_extension)=({mismatches}, {cover_extension}) for dataset '{dataset}'"
    )]
    NoBoundingBox {
        dataset: String,
        mismatches: f64,
        cover_extension: f64,
    },

    #[error("Corrupt grid for dataset '{dataset}': {detail}")]
    CorruptGrid { dataset: String, detail: String },

    #[error("Initial guess yields too many probes ({count:.0}, but the max is {budget})")]
    InfeasibleSeed { count: f64, budget: u64 },

    #[error(
        "Rounding up made the probe count exceed the budget ({total:.0} >= {budget}); dataset '{dataset}' grew most at (mismatches, cover_extension)=({mismatches}, {cover_extension}). The grid is under-sampled or not monotone there."
    )]
    MonotonicityViolation {
        dataset: String,
        mismatches: i64,
        cover_extension: i64,
        total: f64,
        budget: u64,
    },

    #[error("Interpolated total ({interpolated}) does not match the direct count ({direct})")]
    ConsistencyMismatch { interpolated: f64, direct: u64 },

    #[error(
        "No measured probe count for dataset '{dataset}' at (mismatches, cover_extension)=({mismatches}, {cover_extension})"
    )]
    MissingMeasurement {
        dataset: String,
        mismatches: i64,
        cover_extension: i64,
    },

    #[error("Unknown dataset '{0}'")]
    UnknownDataset(String),

    #[error("Dataset '{dataset}' has no usable parameter bounds: {detail}")]
    InvalidBounds { dataset: String, detail: String },

    #[error("No datasets to optimize")]
    EmptyStore,
}

impl OptError {
    pub fn exit_code(&self) -> u8 {
        match self {
            OptError::OutOfRange { .. } | OptError::NoBoundingBox { .. } => 3,
            OptError::InfeasibleSeed { .. } => 4,
            OptError::MonotonicityViolation { .. } => 5,
            OptError::ConsistencyMismatch { .. } | OptError::MissingMeasurement { .. } => 6,
            OptError::CorruptGrid { .. }
            | OptError::UnknownDataset(_)
            | OptError::InvalidBounds { .. }
            | OptError::EmptyStore => 2,
        }
    }
}

impl From<OptError> for AppError {
    fn from(err: OptError) -> Self {
        AppError::new(err.exit_code(), err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opt_error_maps_to_distinct_exit_codes() {
        let seed: AppError = OptError::InfeasibleSeed { count: 30.0, budget: 25 }.into();
        assert_eq!(seed.exit_code(), 4);
        assert_eq!(seed.to_string(), "Initial guess yields too many probes (30, but the max is 25)");

        let range: AppError = OptError::OutOfRange {
            dataset: "lassa".to_string(),
            mismatches: 7.5,
            cover_extension: 10.0,
        }
        .into();
        assert_eq!(range.exit_code(), 3);
        assert!(range.to_string().contains("lassa"));
        assert!(range.to_string().contains("7.5"));
    }
}
