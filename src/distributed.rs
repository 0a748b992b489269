//! # Distributed Module - Work Partitioning
//!
//! Histories are distributed over ranks by disjoint contiguous index ranges
//! covering `[0, n_hist)`. Each rank derives its RNG substream offsets from
//! its `start`, which is what makes the result independent of the rank
//! count. Reductions over rank results are performed in rank order by the
//! driver, so they are deterministic up to floating-point associativity.

use crate::particle::Particle;

/// One rank's contiguous slice of the global history index space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkShare {
    /// Rank index in `[0, n_ranks)`.
    pub rank: usize,
    /// Total number of ranks.
    pub n_ranks: usize,
    /// First global history index owned by this rank.
    pub start: u64,
    /// Number of histories owned by this rank.
    pub size: u64,
    /// Total history count across all ranks.
    pub total: u64,
}

/// Splits `n_hist` histories over `n_ranks` ranks.
///
/// The first `n_hist % n_ranks` ranks receive one extra history; the ranges
/// are disjoint and cover `[0, n_hist)` exactly.
pub fn distribute_work(n_hist: u64, rank: usize, n_ranks: usize) -> WorkShare {
    let n_ranks = n_ranks.max(1);
    let base = n_hist / n_ranks as u64;
    let remainder = n_hist % n_ranks as u64;
    let r = rank as u64;
    let size = base + u64::from(r < remainder);
    let start = r * base + r.min(remainder);
    WorkShare {
        rank,
        n_ranks,
        start,
        size,
        total: n_hist,
    }
}

/// Scales the bank so its total weight equals `target`. Returns the total
/// weight before scaling.
pub fn normalize_weight(bank: &mut [Particle], target: u64) -> f64 {
    let w_total: f64 = bank.iter().map(|p| p.weight).sum();
    if w_total > 0.0 {
        let factor = target as f64 / w_total;
        for p in bank.iter_mut() {
            p.weight *= factor;
        }
    }
    w_total
}
