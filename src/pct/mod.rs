//! # Population Control Module
//!
//! Between iterations the stored bank is reshaped to the configured history
//! count while preserving its total statistical weight, exactly for the
//! combing variants and in expectation for the stochastic ones. The variants
//! form a closed set, selected by name from the input deck:
//!
//! - `SS` simple sampling: pass-through, the natural population is kept.
//! - `SR` splitting and Russian roulette around the average weight.
//! - `CO` combing with one shared random tooth offset.
//! - `COX` combing with an independently jittered tooth per interval.
//! - `DD` duplicate-discard resampling to the target count.
//!
//! All variants draw from the stream that was rebased after the iteration
//! barrier, so their decisions do not depend on how histories were
//! partitioned across ranks.

use crate::particle::Bank;
use crate::rng::RandomLcg;
use serde::{Deserialize, Serialize};


/// Bank-resizing technique applied between iterations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PopulationControl {
    SimpleSampling,
    SplitRoulette,
    Comb,
    CombJitter,
    DuplicateDiscard,
}

impl PopulationControl {
    /// Parses the user-facing technique name.
    pub fn parse(name: &str) -> Result<PopulationControl, String> {
        match name {
            "SS" => Ok(PopulationControl::SimpleSampling),
            "SR" => Ok(PopulationControl::SplitRoulette),
            "CO" => Ok(PopulationControl::Comb),
            "COX" => Ok(PopulationControl::CombJitter),
            "DD" => Ok(PopulationControl::DuplicateDiscard),
            other => Err(format!("unknown population control technique '{other}'")),
        }
    }

    /// User-facing technique name.
    pub fn name(&self) -> &'static str {
        match self {
            PopulationControl::SimpleSampling => "SS",
            PopulationControl::SplitRoulette => "SR",
            PopulationControl::Comb => "CO",
            PopulationControl::CombJitter => "COX",
            PopulationControl::DuplicateDiscard => "DD",
        }
    }

    /// Resizes `bank` towards `target` particles.
    ///
    /// The expected total weight of the result equals the total weight of
    /// the input; the combing variants preserve it exactly.
    pub fn apply(&self, bank: Bank, target: usize, rng: &mut RandomLcg) -> Bank {
        if bank.is_empty() || target == 0 {
            return bank;
        }
        match self {
            PopulationControl::SimpleSampling => bank,
            PopulationControl::SplitRoulette => split_roulette(bank, target, rng),
            PopulationControl::Comb => comb(bank, target, rng, false),
            PopulationControl::CombJitter => comb(bank, target, rng, true),
            PopulationControl::DuplicateDiscard => duplicate_discard(bank, target, rng),
        }
    }
}

fn total_weight(bank: &Bank) -> f64 {
    bank.iter().map(|p| p.weight).sum()
}

/// Splitting below-average weights up, rouletting above-average weights
/// down: every particle yields `floor(w / w_avg + u)` copies at the average
/// weight.
fn split_roulette(bank: Bank, target: usize, rng: &mut RandomLcg) -> Bank {
    let w_avg = total_weight(&bank) / target as f64;
    let mut out = Vec::with_capacity(target);
    for p in &bank {
        let copies = (p.weight / w_avg + rng.next_f64()).floor() as usize;
        for _ in 0..copies {
            let mut q = p.clone();
            q.weight = w_avg;
            out.push(q);
        }
    }
    out
}

/// Weight combing: `target` teeth over the cumulative weight line, every
/// tooth selecting the particle whose interval contains it. With `jitter`
/// each tooth lands at an independent uniform position inside its interval,
/// otherwise all teeth share one random offset.
fn comb(bank: Bank, target: usize, rng: &mut RandomLcg, jitter: bool) -> Bank {
    let w_total = total_weight(&bank);
    let tooth_distance = w_total / target as f64;

    let mut out = Vec::with_capacity(target);
    let offset = rng.next_f64();
    let mut tooth = offset * tooth_distance;
    let mut k = 0usize;
    let mut cumulative = 0.0;
    for p in &bank {
        cumulative += p.weight;
        while k < target && tooth < cumulative {
            let mut q = p.clone();
            q.weight = tooth_distance;
            out.push(q);
            k += 1;
            if k < target {
                let u = if jitter { rng.next_f64() } else { offset };
                tooth = (k as f64 + u) * tooth_distance;
            }
        }
    }
    // Roundoff at the tail of the cumulative sum can starve the last tooth
    while k < target {
        if let Some(p) = bank.last() {
            let mut q = p.clone();
            q.weight = tooth_distance;
            out.push(q);
        }
        k += 1;
    }
    out
}

/// Resampling to the target count: subsample without replacement when the
/// bank is too large, resample with replacement when it is too small. All
/// survivors are rescaled by `n / target` to preserve the total weight.
fn duplicate_discard(bank: Bank, target: usize, rng: &mut RandomLcg) -> Bank {
    let n = bank.len();
    if n == target {
        return bank;
    }
    let scale = n as f64 / target as f64;
    if n > target {
        // Partial Fisher-Yates over the index space
        let mut indices: Vec<usize> = (0..n).collect();
        for i in 0..target {
            let j = i + ((rng.next_f64() * (n - i) as f64) as usize).min(n - i - 1);
            indices.swap(i, j);
        }
        indices[..target]
            .iter()
            .map(|&i| {
                let mut q = bank[i].clone();
                q.weight *= scale;
                q
            })
            .collect()
    } else {
        (0..target)
            .map(|_| {
                let i = ((rng.next_f64() * n as f64) as usize).min(n - 1);
                let mut q = bank[i].clone();
                q.weight *= scale;
                q
            })
            .collect()
    }
}
