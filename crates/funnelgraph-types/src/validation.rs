//! Validation report for funnel definitions

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Outcome of validating a funnel definition
///
/// Validation never mutates the definition; calling it twice on the same
/// definition yields identical results.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ValidationOutcome {
    /// Whether the definition can be calculated
    pub is_valid: bool,
    /// Human-readable messages, one per failed rule
    pub errors: Vec<String>,
}

impl ValidationOutcome {
    /// A passing outcome with no errors
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
        }
    }

    /// A failing outcome carrying the given error messages
    pub fn invalid(errors: Vec<String>) -> Self {
        Self {
            is_valid: false,
            errors,
        }
    }
}
