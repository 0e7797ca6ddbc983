//! Lazy cuts of a run, in insertion order, never retracted.

use crate::master::LinearCut;

/// Default entry-wise tolerance on unit-normalised rows below which two cuts
/// are the same.
const DUPLICATE_TOL: f64 = 1e-9;

/// Pool entry.
#[derive(Debug, Clone)]
pub struct PooledCut {
    /// Insertion index.
    pub id: usize,

    /// Handler invocation that produced the cut.
    pub added_round: u64,

    /// The row.
    pub cut: LinearCut,
}

/// Insert and rejection counts.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CutPoolStats {
    /// Cuts stored.
    pub total_added: usize,

    /// Cuts refused because an equal row was already stored.
    pub duplicates_rejected: usize,
}

/// Append-only store of the lazy cuts installed in the master.
#[derive(Debug)]
pub struct CutPool {
    cuts: Vec<PooledCut>,
    round: u64,
    stats: CutPoolStats,
    duplicate_tol: f64,
}

impl Default for CutPool {
    fn default() -> Self {
        Self::with_tolerance(DUPLICATE_TOL)
    }
}

impl CutPool {
    /// Empty pool at round 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty pool treating cuts whose unit-normalised rows agree entry-wise
    /// to `tol` as duplicates.
    ///
    /// Nearly parallel rows make the master basis ill-conditioned, so a
    /// tolerance above round-off also keeps the relaxation solvable.
    pub fn with_tolerance(tol: f64) -> Self {
        Self {
            cuts: Vec::new(),
            round: 0,
            stats: CutPoolStats::default(),
            duplicate_tol: tol,
        }
    }

    /// Start a new handler invocation.
    pub fn next_round(&mut self) {
        self.round += 1;
    }

    /// Handler invocations so far.
    pub fn round(&self) -> u64 {
        self.round
    }

    /// Store `cut` unless a positive multiple of it, up to the duplicate
    /// tolerance, is already pooled.
    ///
    /// Returns the new entry, or `None` for a duplicate.
    pub fn add(&mut self, cut: LinearCut) -> Option<&PooledCut> {
        let tol = self.duplicate_tol;
        if self.cuts.iter().any(|p| same_half_space(&cut, &p.cut, tol)) {
            self.stats.duplicates_rejected += 1;
            return None;
        }
        let id = self.cuts.len();
        self.cuts.push(PooledCut {
            id,
            added_round: self.round,
            cut,
        });
        self.stats.total_added += 1;
        self.cuts.last()
    }

    /// Entry by insertion index.
    pub fn get(&self, id: usize) -> Option<&PooledCut> {
        self.cuts.get(id)
    }

    /// Entries, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &PooledCut> {
        self.cuts.iter()
    }

    /// Worst violation at `x`; 0 for an empty pool or a feasible `x`.
    pub fn max_violation(&self, x: &[f64]) -> f64 {
        self.cuts
            .iter()
            .map(|p| p.cut.violation(x))
            .fold(0.0, f64::max)
    }

    /// `x` violates no pooled cut by more than `tol`.
    pub fn all_satisfied(&self, x: &[f64], tol: f64) -> bool {
        self.max_violation(x) <= tol
    }

    /// Counters.
    pub fn stats(&self) -> &CutPoolStats {
        &self.stats
    }

    /// Stored cuts.
    pub fn len(&self) -> usize {
        self.cuts.len()
    }

    /// No cut stored yet.
    pub fn is_empty(&self) -> bool {
        self.cuts.is_empty()
    }
}

fn unit_row(cut: &LinearCut) -> Option<(Vec<f64>, f64)> {
    let norm = cut.coefs.iter().map(|a| a * a).sum::<f64>().sqrt();
    (norm >= 1e-10).then(|| (cut.coefs.iter().map(|a| a / norm).collect(), cut.rhs / norm))
}

fn same_half_space(a: &LinearCut, b: &LinearCut, tol: f64) -> bool {
    if a.coefs.len() != b.coefs.len() {
        return false;
    }
    match (unit_row(a), unit_row(b)) {
        (Some((ua, ra)), Some((ub, rb))) => {
            (ra - rb).abs() <= tol && ua.iter().zip(&ub).all(|(x, y)| (x - y).abs() <= tol)
        }
        (None, None) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::master::CutSource;

    fn row(coefs: &[f64], rhs: f64) -> LinearCut {
        LinearCut::new(coefs.to_vec(), rhs, CutSource::Lazy { node_id: 0 })
    }

    #[test]
    fn test_rounds_are_stamped() {
        let mut pool = CutPool::new();
        assert_eq!(pool.add(row(&[1.0, 2.0], 3.0)).map(|p| p.id), Some(0));
        pool.next_round();
        assert_eq!(pool.add(row(&[4.0, 5.0], 6.0)).map(|p| p.added_round), Some(1));

        assert_eq!(pool.get(0).map(|p| p.added_round), Some(0));
        assert_eq!(pool.stats().total_added, 2);
        assert_eq!(pool.round(), 1);
    }

    #[test]
    fn test_scaled_copies_are_rejected() {
        let mut pool = CutPool::new();
        assert!(pool.add(row(&[1.0, 2.0], 3.0)).is_some());
        assert!(pool.add(row(&[1.0, 2.0], 3.0)).is_none());
        assert!(pool.add(row(&[2.0, 4.0], 6.0)).is_none());
        // Opposite half-space
        assert!(pool.add(row(&[-1.0, -2.0], -3.0)).is_some());
        // Close but distinct rows from nearby candidates must both survive
        assert!(pool.add(row(&[1.0, 2.01], 3.0)).is_some());

        assert_eq!(pool.len(), 3);
        assert_eq!(
            pool.stats(),
            &CutPoolStats {
                total_added: 3,
                duplicates_rejected: 2
            }
        );
    }

    #[test]
    fn test_nearly_parallel_rows_merge_under_loose_tolerance() {
        let mut pool = CutPool::with_tolerance(1e-2);
        assert!(pool.add(row(&[1.0, 2.0], 3.0)).is_some());
        assert!(pool.add(row(&[1.0, 2.01], 3.0)).is_none());
        assert!(pool.add(row(&[1000.0, 2010.0], 3000.0)).is_none());
        assert!(pool.add(row(&[2.0, 1.0], 3.0)).is_some());
        assert_eq!(pool.stats().duplicates_rejected, 2);
    }

    #[test]
    fn test_violation_queries() {
        let mut pool = CutPool::new();
        assert_eq!(pool.max_violation(&[5.0, 5.0]), 0.0);

        pool.add(row(&[1.0, 0.0], 1.0));
        pool.add(row(&[0.0, 1.0], 2.0));

        assert!(pool.all_satisfied(&[1.0, 2.0], 1e-9));
        assert!(!pool.all_satisfied(&[1.5, 2.0], 1e-9));
        assert!((pool.max_violation(&[1.5, 3.0]) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_iteration_follows_insertion() {
        let mut pool = CutPool::new();
        for k in 0..5 {
            pool.add(row(&[1.0, k as f64], k as f64));
        }
        let ids: Vec<usize> = pool.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4]);
    }
}
