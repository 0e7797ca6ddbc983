//! Ellipsoidal uncertainty set and portfolio instance data.
//!
//! Returns are uncertain within
//! `U(Γ) = { p̄ + diag(σ) d : ||d||₂ <= Γ }`.
//! The set is immutable for the life of a run.

use crate::error::{PortfolioError, PortfolioResult};

/// Ellipsoidal uncertainty set around the mean returns.
#[derive(Debug, Clone, PartialEq)]
pub struct UncertaintySet {
    /// Mean returns p̄.
    pub mean: Vec<f64>,

    /// Per-asset deviations σ.
    pub deviation: Vec<f64>,

    /// Radius Γ of the deviation ball.
    pub radius: f64,
}

impl UncertaintySet {
    /// Create and validate an uncertainty set.
    pub fn new(mean: Vec<f64>, deviation: Vec<f64>, radius: f64) -> PortfolioResult<Self> {
        let set = Self {
            mean,
            deviation,
            radius,
        };
        set.validate()?;
        Ok(set)
    }

    /// Check lengths, finiteness and signs.
    pub fn validate(&self) -> PortfolioResult<()> {
        if self.mean.is_empty() {
            return Err(PortfolioError::InvalidData("no assets".to_string()));
        }
        if self.mean.len() != self.deviation.len() {
            return Err(PortfolioError::InvalidData(format!(
                "{} mean returns but {} deviations",
                self.mean.len(),
                self.deviation.len()
            )));
        }
        if let Some(i) = self.mean.iter().position(|p| !p.is_finite()) {
            return Err(PortfolioError::InvalidData(format!(
                "mean return of asset {} is not finite",
                i
            )));
        }
        if let Some(i) = self
            .deviation
            .iter()
            .position(|s| !s.is_finite() || *s < 0.0)
        {
            return Err(PortfolioError::InvalidData(format!(
                "deviation of asset {} must be finite and non-negative",
                i
            )));
        }
        if !self.radius.is_finite() || self.radius < 0.0 {
            return Err(PortfolioError::InvalidData(format!(
                "radius must be finite and non-negative, got {}",
                self.radius
            )));
        }
        Ok(())
    }

    /// Number of assets.
    pub fn num_assets(&self) -> usize {
        self.mean.len()
    }

    /// Nominal return `p̄ · x`.
    pub fn nominal_return(&self, x: &[f64]) -> f64 {
        self.mean.iter().zip(x).map(|(p, xi)| p * xi).sum()
    }

    /// `||diag(σ) x||₂`.
    pub fn weighted_norm(&self, x: &[f64]) -> f64 {
        self.deviation
            .iter()
            .zip(x)
            .map(|(s, xi)| (s * xi) * (s * xi))
            .sum::<f64>()
            .sqrt()
    }

    /// Largest mean return.
    pub fn max_mean(&self) -> f64 {
        self.mean.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    /// Return of `x` under a fixed return vector `p`.
    pub fn realized_return(p: &[f64], x: &[f64]) -> f64 {
        p.iter().zip(x).map(|(pi, xi)| pi * xi).sum()
    }
}

/// A portfolio instance: uncertainty set plus cardinality budget.
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioData {
    /// Return uncertainty.
    pub set: UncertaintySet,

    /// Maximum number of assets held.
    pub cardinality: usize,
}

impl PortfolioData {
    /// Create an instance with the default budget of `N / 4` assets.
    pub fn new(mean: Vec<f64>, deviation: Vec<f64>, radius: f64) -> PortfolioResult<Self> {
        let set = UncertaintySet::new(mean, deviation, radius)?;
        let cardinality = set.num_assets() / 4;
        Ok(Self { set, cardinality })
    }

    /// Override the cardinality budget.
    pub fn with_cardinality(mut self, cardinality: usize) -> Self {
        self.cardinality = cardinality;
        self
    }

    /// Standard test family with returns rising in the asset index and
    /// risk rising faster.
    ///
    /// For i = 1..N: `p̄_i = 1.15 + i·0.05/N` and
    /// `σ_i = 0.05/(3N) · sqrt(2·i·N·(N+1))`.
    pub fn generated(n: usize, radius: f64) -> PortfolioResult<Self> {
        let nf = n as f64;
        let mean = (1..=n).map(|i| 1.15 + i as f64 * 0.05 / nf).collect();
        let deviation = (1..=n)
            .map(|i| 0.05 / (3.0 * nf) * (2.0 * i as f64 * nf * (nf + 1.0)).sqrt())
            .collect();
        Self::new(mean, deviation, radius)
    }

    /// Number of assets.
    pub fn num_assets(&self) -> usize {
        self.set.num_assets()
    }

    /// Largest mean return, the upper bound on the epigraph variable.
    pub fn max_mean(&self) -> f64 {
        self.set.max_mean()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation() {
        assert!(UncertaintySet::new(vec![], vec![], 1.0).is_err());
        assert!(UncertaintySet::new(vec![1.0], vec![1.0, 2.0], 1.0).is_err());
        assert!(UncertaintySet::new(vec![1.0], vec![-0.1], 1.0).is_err());
        assert!(UncertaintySet::new(vec![f64::NAN], vec![0.1], 1.0).is_err());
        assert!(UncertaintySet::new(vec![1.0], vec![0.1], -1.0).is_err());
        assert!(UncertaintySet::new(vec![1.0], vec![0.0], 0.0).is_ok());
    }

    #[test]
    fn test_norms_and_returns() {
        let set = UncertaintySet::new(vec![1.0, 2.0], vec![3.0, 4.0], 1.0).unwrap();
        assert_eq!(set.nominal_return(&[0.5, 0.5]), 1.5);
        assert_eq!(set.weighted_norm(&[1.0, 1.0]), 5.0);
        assert_eq!(set.max_mean(), 2.0);
    }

    #[test]
    fn test_default_cardinality_rounds_down() {
        let data = PortfolioData::new(vec![1.0; 10], vec![0.1; 10], 1.0).unwrap();
        assert_eq!(data.cardinality, 2);

        let data = PortfolioData::new(vec![1.0; 3], vec![0.1; 3], 1.0).unwrap();
        assert_eq!(data.cardinality, 0);
        assert_eq!(data.with_cardinality(2).cardinality, 2);
    }

    #[test]
    fn test_generated_family() {
        let data = PortfolioData::generated(10, 1.5).unwrap();
        assert_eq!(data.num_assets(), 10);
        assert!((data.set.mean[0] - 1.155).abs() < 1e-12);
        assert!((data.max_mean() - 1.2).abs() < 1e-12);

        // Riskier assets pay more
        assert!(data.set.deviation.windows(2).all(|w| w[0] < w[1]));
        let expected = 0.05 / 30.0 * (2.0 * 10.0 * 10.0 * 11.0_f64).sqrt();
        assert!((data.set.deviation[9] - expected).abs() < 1e-12);
    }
}
