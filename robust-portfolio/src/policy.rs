//! Cut acceptance tolerance.

use crate::error::{PortfolioError, PortfolioResult};

/// Default acceptance tolerance.
pub const DEFAULT_EPSILON: f64 = 1e-2;

/// Accepts a robust cut only when the violation exceeds a fixed `ε`.
///
/// Violations at or below `ε` are ignored, so the loop never cycles on
/// numerically negligible cuts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CutAcceptancePolicy {
    epsilon: f64,
}

impl Default for CutAcceptancePolicy {
    fn default() -> Self {
        Self {
            epsilon: DEFAULT_EPSILON,
        }
    }
}

impl CutAcceptancePolicy {
    /// Create a policy; `epsilon` must be positive and finite.
    pub fn new(epsilon: f64) -> PortfolioResult<Self> {
        if !epsilon.is_finite() || epsilon <= 0.0 {
            return Err(PortfolioError::InvalidData(format!(
                "cut tolerance must be positive and finite, got {}",
                epsilon
            )));
        }
        Ok(Self { epsilon })
    }

    /// The tolerance.
    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// True iff `worst_z < z - ε`.
    pub fn accepts(&self, worst_z: f64, z: f64) -> bool {
        worst_z < z - self.epsilon
    }
}
