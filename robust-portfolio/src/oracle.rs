//! Separation oracle for the worst-case return constraint.
//!
//! For a fixed allocation `x` the oracle computes
//! `min { p · x : p ∈ U(Γ) }` together with the minimising return vector.
//! With `p = p̄ + diag(σ) d` the objective is `p̄·x + (σ∘x)·d`, a linear
//! functional in `d` minimised over the ball `||d|| <= Γ`. The KKT point is
//! `d* = -Γ (σ∘x) / ||σ∘x||`, which gives
//!
//! ```text
//! p*_i    = p̄_i - Γ σ_i² x_i / ||diag(σ) x||
//! worst_z = p̄·x - Γ ||diag(σ) x||
//! ```
//!
//! The minimisation is a strategy behind [`UncertaintyMinimizer`]; the
//! oracle itself is a pure function of the candidate and the set.

use robust_mip::{CutSource, LinearCut, VarId};

use crate::error::OracleError;
use crate::policy::CutAcceptancePolicy;
use crate::uncertainty::UncertaintySet;

/// Norms at or below this are treated as zero.
const NORM_EPS: f64 = 1e-14;

/// Minimiser of the portfolio return over the uncertainty set.
#[derive(Debug, Clone, PartialEq)]
pub struct WorstCase {
    /// Return vector attaining the minimum.
    pub worst_p: Vec<f64>,

    /// Minimum return `worst_p · x`.
    pub worst_z: f64,
}

/// Strategy for `min { p · x : p ∈ U(Γ) }`.
pub trait UncertaintyMinimizer {
    /// Compute the worst-case return vector and value for `x`.
    ///
    /// Fails with [`OracleError::DegenerateNorm`] when `diag(σ) x = 0`.
    fn minimize_over_uncertainty(
        &self,
        set: &UncertaintySet,
        x: &[f64],
    ) -> Result<WorstCase, OracleError>;
}

/// Exact minimiser from the KKT conditions.
#[derive(Debug, Default, Clone, Copy)]
pub struct ClosedFormMinimizer;

impl UncertaintyMinimizer for ClosedFormMinimizer {
    fn minimize_over_uncertainty(
        &self,
        set: &UncertaintySet,
        x: &[f64],
    ) -> Result<WorstCase, OracleError> {
        let norm = set.weighted_norm(x);
        if norm <= NORM_EPS {
            return Err(OracleError::DegenerateNorm);
        }

        let scale = set.radius / norm;
        let worst_p: Vec<f64> = set
            .mean
            .iter()
            .zip(&set.deviation)
            .zip(x)
            .map(|((p, s), xi)| p - scale * s * s * xi)
            .collect();

        Ok(WorstCase {
            worst_z: set.nominal_return(x) - set.radius * norm,
            worst_p,
        })
    }
}

/// Numerical minimiser by projected gradient descent in deviation space.
///
/// The objective is linear in `d`, so each step moves along `-(σ∘x)` and
/// projects back onto the ball. Used where no closed form is available and
/// to cross-check the exact minimiser.
#[derive(Debug, Clone, Copy)]
pub struct ProjectedGradientMinimizer {
    /// Step length as a fraction of the radius.
    pub step: f64,

    /// Iteration cap.
    pub max_iters: usize,

    /// Stop once an iterate moves less than this.
    pub tol: f64,
}

impl Default for ProjectedGradientMinimizer {
    fn default() -> Self {
        Self {
            step: 0.25,
            max_iters: 1_000,
            tol: 1e-12,
        }
    }
}

impl ProjectedGradientMinimizer {
    fn project(d: &mut [f64], radius: f64) {
        let norm = d.iter().map(|v| v * v).sum::<f64>().sqrt();
        if norm > radius {
            let shrink = radius / norm;
            d.iter_mut().for_each(|v| *v *= shrink);
        }
    }
}

impl UncertaintyMinimizer for ProjectedGradientMinimizer {
    fn minimize_over_uncertainty(
        &self,
        set: &UncertaintySet,
        x: &[f64],
    ) -> Result<WorstCase, OracleError> {
        let grad: Vec<f64> = set.deviation.iter().zip(x).map(|(s, xi)| s * xi).collect();
        let grad_norm = grad.iter().map(|g| g * g).sum::<f64>().sqrt();
        if grad_norm <= NORM_EPS {
            return Err(OracleError::DegenerateNorm);
        }

        let n = set.num_assets();
        let mut d = vec![0.0; n];
        let alpha = self.step * set.radius / grad_norm;

        for iter in 0..self.max_iters {
            let mut next: Vec<f64> = d.iter().zip(&grad).map(|(di, g)| di - alpha * g).collect();
            Self::project(&mut next, set.radius);

            let moved = next
                .iter()
                .zip(&d)
                .map(|(a, b)| (a - b) * (a - b))
                .sum::<f64>()
                .sqrt();
            d = next;
            if moved <= self.tol {
                log::trace!("projected gradient converged in {} iterations", iter + 1);
                break;
            }
        }

        let worst_p: Vec<f64> = set
            .mean
            .iter()
            .zip(&set.deviation)
            .zip(&d)
            .map(|((p, s), di)| p + s * di)
            .collect();

        Ok(WorstCase {
            worst_z: UncertaintySet::realized_return(&worst_p, x),
            worst_p,
        })
    }
}

/// A robust cut `z <= worst_p · x`.
#[derive(Debug, Clone, PartialEq)]
pub struct RobustCut {
    /// Coefficients on the allocation.
    pub worst_p: Vec<f64>,

    /// Worst-case return of the candidate that produced the cut.
    pub worst_z: f64,

    /// Amount by which the candidate's claimed return exceeded `worst_z`.
    pub violation: f64,
}

impl RobustCut {
    /// Encode as `z - worst_p · x <= 0` over the master's variables.
    pub fn to_linear_cut(
        &self,
        x_vars: &[VarId],
        z_var: VarId,
        n_vars: usize,
        node_id: u64,
    ) -> LinearCut {
        let mut coefs = vec![0.0; n_vars];
        for (v, p) in x_vars.iter().zip(&self.worst_p) {
            coefs[v.index()] = -p;
        }
        coefs[z_var.index()] = 1.0;
        LinearCut::new(coefs, 0.0, CutSource::Lazy { node_id }).with_name("robust")
    }

    /// Right-hand side `worst_p · x` at a given allocation.
    pub fn bound_at(&self, x: &[f64]) -> f64 {
        UncertaintySet::realized_return(&self.worst_p, x)
    }
}

/// Result of separating a candidate.
#[derive(Debug, Clone, PartialEq)]
pub enum Separation {
    /// The claimed return is robust up to the tolerance.
    NoViolation {
        /// Worst-case return of the candidate.
        worst_z: f64,
        /// True when the weighted norm vanished and the nominal return was used.
        degenerate: bool,
    },

    /// The claimed return is too optimistic.
    Cut(RobustCut),
}

/// Separation oracle over an ellipsoidal uncertainty set.
#[derive(Debug, Clone)]
pub struct SeparationOracle<M = ClosedFormMinimizer> {
    set: UncertaintySet,
    minimizer: M,
    policy: CutAcceptancePolicy,
}

impl SeparationOracle<ClosedFormMinimizer> {
    /// Oracle using the closed-form minimiser.
    pub fn new(set: UncertaintySet, policy: CutAcceptancePolicy) -> Self {
        Self::with_minimizer(set, policy, ClosedFormMinimizer)
    }
}

impl<M: UncertaintyMinimizer> SeparationOracle<M> {
    /// Oracle using a custom minimiser.
    pub fn with_minimizer(set: UncertaintySet, policy: CutAcceptancePolicy, minimizer: M) -> Self {
        Self {
            set,
            minimizer,
            policy,
        }
    }

    /// The uncertainty set.
    pub fn set(&self) -> &UncertaintySet {
        &self.set
    }

    /// The acceptance policy.
    pub fn policy(&self) -> &CutAcceptancePolicy {
        &self.policy
    }

    fn check_dimension(&self, x: &[f64]) -> Result<(), OracleError> {
        if x.len() != self.set.num_assets() {
            return Err(OracleError::DimensionMismatch {
                expected: self.set.num_assets(),
                found: x.len(),
            });
        }
        Ok(())
    }

    /// Worst-case return vector and value for `x`.
    pub fn evaluate(&self, x: &[f64]) -> Result<WorstCase, OracleError> {
        self.check_dimension(x)?;
        self.minimizer.minimize_over_uncertainty(&self.set, x)
    }

    /// Worst-case return of `x`.
    ///
    /// When `diag(σ) x = 0` every return vector in the set earns the
    /// nominal return on `x`, which is returned.
    pub fn worst_case_return(&self, x: &[f64]) -> Result<f64, OracleError> {
        match self.evaluate(x) {
            Ok(wc) => Ok(wc.worst_z),
            Err(OracleError::DegenerateNorm) => Ok(self.set.nominal_return(x)),
            Err(e) => Err(e),
        }
    }

    /// Separate the candidate `(x, z)`.
    ///
    /// Returns a cut when `worst_z < z - ε`. A degenerate norm yields
    /// [`Separation::NoViolation`].
    pub fn separate(&self, x: &[f64], z: f64) -> Result<Separation, OracleError> {
        let wc = match self.evaluate(x) {
            Ok(wc) => wc,
            Err(OracleError::DegenerateNorm) => {
                log::debug!("degenerate weighted norm; candidate treated as robust");
                return Ok(Separation::NoViolation {
                    worst_z: self.set.nominal_return(x),
                    degenerate: true,
                });
            }
            Err(e) => return Err(e),
        };

        if self.policy.accepts(wc.worst_z, z) {
            Ok(Separation::Cut(RobustCut {
                violation: z - wc.worst_z,
                worst_z: wc.worst_z,
                worst_p: wc.worst_p,
            }))
        } else {
            Ok(Separation::NoViolation {
                worst_z: wc.worst_z,
                degenerate: false,
            })
        }
    }
}
