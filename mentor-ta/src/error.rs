use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure modes of the analysis core.
///
/// The core is pure computation, so the only error is a candle window that is
/// too short for the requested component. Degenerate numeric inputs (constant
/// prices, zero volume) are not errors; they take documented fallback values
/// instead of propagating NaN or infinity.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Error)]
pub enum AnalysisError {
    #[error("insufficient candle history: required {required}, provided {actual}")]
    InsufficientData { required: usize, actual: usize },
}
