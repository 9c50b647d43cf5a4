/// Failures the engine reports instead of a result.
///
/// A blank that does not fit the sheet is not one of these; it comes back as a
/// zero-piece layout tagged [`crate::types::FitStatus::BlankExceedsSheet`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    #[error("invalid {field}: {value} (must be a positive, finite number)")]
    InvalidDimension { field: &'static str, value: f64 },

    #[error("blank thickness {blank}mm does not match sheet thickness {sheet}mm")]
    ThicknessMismatch { blank: f64, sheet: f64 },

    #[error("cannot compute sheets required: no blanks fit on the sheet")]
    DivisionByZero,

    #[error("{quantity} evaluated to a non-finite value")]
    NonFiniteResult { quantity: &'static str },

    #[error("sheet catalog: {0}")]
    Catalog(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;

/// Rejects zero, negative, NaN and infinite dimensions.
pub fn positive(field: &'static str, value: f64) -> Result<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(EngineError::InvalidDimension { field, value })
    }
}

/// Surfaces NaN/infinity after a division instead of coercing it.
pub fn finite(quantity: &'static str, value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(EngineError::NonFiniteResult { quantity })
    }
}
