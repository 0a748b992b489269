//! # Tally Module - Binned Estimators with Batch Statistics
//!
//! A tally is a Cartesian product of filter grids (spatial, time, energy
//! group, angular) with one or more scores accumulated over it. Scoring is a
//! three-stage pipeline that yields correct sample statistics:
//!
//! 1. every step adds its contribution to a per-history accumulator,
//! 2. at the end of each history the accumulator is folded into running
//!    sum and sum-of-squares arrays (one history is one statistical batch),
//! 3. at iteration closeout the sums become a mean and a sample standard
//!    deviation of the mean.
//!
//! Bins are located by binary search over the edge grids; values outside a
//! grid simply do not score. Steps are binned at their start point, using the
//! particle's shadow snapshot, so a score never mixes the pre-event and
//! post-event state of the quantities it estimates.

use crate::particle::Particle;
use serde::{Deserialize, Serialize};


/// Index of the interval containing `x`: the largest `i` with
/// `grid[i] <= x`, or -1 when `x` lies below the whole grid.
///
/// # Examples
/// ```
/// use transport_lib::tally::binary_search;
///
/// let grid = [0.0, 1.0, 2.0];
/// assert_eq!(binary_search(-0.5, &grid), -1);
/// assert_eq!(binary_search(0.0, &grid), 0);
/// assert_eq!(binary_search(1.5, &grid), 1);
/// assert_eq!(binary_search(2.5, &grid), 2);
/// ```
pub fn binary_search(x: f64, grid: &[f64]) -> isize {
    grid.partition_point(|&edge| edge <= x) as isize - 1
}

/// An ordered sequence of bin edges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub grid: Vec<f64>,
}

impl Filter {
    pub fn new(grid: Vec<f64>) -> Filter {
        Filter { grid }
    }

    /// Number of bins spanned by the grid.
    pub fn n_bins(&self) -> usize {
        self.grid.len().saturating_sub(1)
    }

    /// Bin index of `x`, or `None` when `x` falls outside the grid.
    ///
    /// Bin `i` covers `grid[i] <= x < grid[i+1]`.
    pub fn index_of(&self, x: f64) -> Option<usize> {
        let i = binary_search(x, &self.grid);
        if i < 0 || i as usize >= self.n_bins() {
            None
        } else {
            Some(i as usize)
        }
    }

    /// Width of bin `i`.
    pub fn width(&self, i: usize) -> f64 {
        self.grid[i + 1] - self.grid[i]
    }

    /// Checks the grid is strictly increasing with at least two edges.
    pub fn validate(&self, what: &str) -> Result<(), String> {
        if self.grid.len() < 2 {
            return Err(format!("{what} grid needs at least two edges"));
        }
        if self.grid.windows(2).any(|w| w[0] >= w[1]) {
            return Err(format!("{what} grid must be strictly increasing"));
        }
        Ok(())
    }
}

/// What a score estimates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoreKind {
    /// Track-length flux: `w * distance / bin volume`, binned at the step's
    /// start point.
    Flux,
    /// Time-edge flux: `w / spatial width` credited to every time-grid edge
    /// crossed within the step. Requires a time filter.
    FluxEdge,
    /// Net current through a surface: `w * dir.x`, scored on surface-hit
    /// steps at the crossing point.
    Current,
}

impl ScoreKind {
    /// Parses the user-facing score name.
    pub fn parse(name: &str) -> Result<ScoreKind, String> {
        match name {
            "flux" => Ok(ScoreKind::Flux),
            "flux-edge" => Ok(ScoreKind::FluxEdge),
            "current" => Ok(ScoreKind::Current),
            other => Err(format!("unknown score kind '{other}'")),
        }
    }

    /// User-facing score name, also used as the output dataset name.
    pub fn name(&self) -> &'static str {
        match self {
            ScoreKind::Flux => "flux",
            ScoreKind::FluxEdge => "flux-edge",
            ScoreKind::Current => "current",
        }
    }
}

/// One score with its three accumulator arrays.
///
/// `hist` has one entry per bin of a single iteration; `mean` and `sdev`
/// carry an extra leading iteration dimension.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Score {
    pub kind: ScoreKind,
    pub hist: Vec<f64>,
    pub mean: Vec<f64>,
    pub sdev: Vec<f64>,
}

/// A filtered, multi-score estimator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tally {
    pub name: String,
    pub spatial: Option<Filter>,
    pub time: Option<Filter>,
    pub energy: Option<Filter>,
    pub angular: Option<Filter>,
    pub scores: Vec<Score>,
    /// Bin counts per axis (spatial, time, energy, angular); 1 when absent.
    shape: [usize; 4],
    /// Product of the shape, the bin count of one iteration.
    per_iter: usize,
    n_iter: usize,
}

impl Tally {
    /// Creates a tally; accumulators stay empty until [`Tally::setup_bins`].
    pub fn new(
        name: impl Into<String>,
        spatial: Option<Filter>,
        time: Option<Filter>,
        energy: Option<Filter>,
        angular: Option<Filter>,
        kinds: &[ScoreKind],
    ) -> Tally {
        let scores = kinds
            .iter()
            .map(|&kind| Score {
                kind,
                hist: Vec::new(),
                mean: Vec::new(),
                sdev: Vec::new(),
            })
            .collect();
        Tally {
            name: name.into(),
            spatial,
            time,
            energy,
            angular,
            scores,
            shape: [1; 4],
            per_iter: 0,
            n_iter: 0,
        }
    }

    /// Checks filter grids and score/filter consistency.
    pub fn validate(&self) -> Result<(), String> {
        if self.scores.is_empty() {
            return Err(format!("tally '{}' has no scores", self.name));
        }
        if let Some(f) = &self.spatial {
            f.validate("spatial")?;
        }
        if let Some(f) = &self.time {
            f.validate("time")?;
        }
        if let Some(f) = &self.energy {
            f.validate("energy")?;
        }
        if let Some(f) = &self.angular {
            f.validate("angular")?;
        }
        if self.scores.iter().any(|s| s.kind == ScoreKind::FluxEdge) && self.time.is_none() {
            return Err(format!(
                "tally '{}' scores flux-edge but has no time grid",
                self.name
            ));
        }
        Ok(())
    }

    /// Allocates the accumulator arrays for `n_iter` iterations.
    pub fn setup_bins(&mut self, n_iter: usize) {
        let bins = |f: &Option<Filter>| f.as_ref().map(|f| f.n_bins()).unwrap_or(1);
        self.shape = [
            bins(&self.spatial),
            bins(&self.time),
            bins(&self.energy),
            bins(&self.angular),
        ];
        self.per_iter = self.shape.iter().product();
        self.n_iter = n_iter.max(1);
        for score in &mut self.scores {
            score.hist = vec![0.0; self.per_iter];
            score.mean = vec![0.0; self.per_iter * self.n_iter];
            score.sdev = vec![0.0; self.per_iter * self.n_iter];
        }
    }

    /// Bin count of one iteration.
    pub fn bins_per_iter(&self) -> usize {
        self.per_iter
    }

    /// A copy with the same configuration and zeroed accumulators, used as a
    /// rank-local scratch tally.
    pub fn blank_copy(&self) -> Tally {
        let mut copy = self.clone();
        for score in &mut copy.scores {
            score.hist.fill(0.0);
            score.mean.fill(0.0);
            score.sdev.fill(0.0);
        }
        copy
    }

    /// Scores the step the particle just performed into the per-history
    /// accumulators.
    ///
    /// All state read here is either the shadow snapshot (start of step) or
    /// the per-step record; the particle may already be dead.
    pub fn score(&mut self, p: &Particle) {
        let [_, t_bins, _, _] = self.shape;
        let shape = self.shape;

        // Bin lookups shared by the score kinds; absent filters collapse to
        // bin 0, out-of-grid values withhold the score.
        let energy_bin = match &self.energy {
            Some(f) => f.index_of(p.prev.group as f64),
            None => Some(0),
        };
        let angular_bin = match &self.angular {
            Some(f) => f.index_of(p.dir.x),
            None => Some(0),
        };
        let spatial_start = match &self.spatial {
            Some(f) => f.index_of(p.prev.pos.x),
            None => Some(0),
        };
        let spatial_end = match &self.spatial {
            Some(f) => f.index_of(p.pos.x),
            None => Some(0),
        };
        let time_start = match &self.time {
            Some(f) => f.index_of(p.prev.time),
            None => Some(0),
        };
        let time_end = match &self.time {
            Some(f) => f.index_of(p.time),
            None => Some(0),
        };
        let spatial_width = |bin: usize| self.spatial.as_ref().map(|f| f.width(bin)).unwrap_or(1.0);
        let time_width = |bin: usize| self.time.as_ref().map(|f| f.width(bin)).unwrap_or(1.0);

        // Time-grid edges crossed within the step, as (edge index - 1)
        let crossed_edges: Vec<usize> = match &self.time {
            Some(f) => {
                let lo = f.grid.partition_point(|&edge| edge <= p.prev.time);
                let hi = f.grid.partition_point(|&edge| edge <= p.time);
                (lo..hi).filter(|&k| k >= 1 && k - 1 < t_bins).map(|k| k - 1).collect()
            }
            None => Vec::new(),
        };

        for score in &mut self.scores {
            match score.kind {
                ScoreKind::Flux => {
                    let (Some(s), Some(t), Some(e), Some(a)) =
                        (spatial_start, time_start, energy_bin, angular_bin)
                    else {
                        continue;
                    };
                    let volume = spatial_width(s) * time_width(t);
                    score.hist[flat_index(shape, s, t, e, a)] +=
                        p.prev.weight * p.distance / volume;
                }
                ScoreKind::FluxEdge => {
                    let (Some(s), Some(e), Some(a)) = (spatial_start, energy_bin, angular_bin)
                    else {
                        continue;
                    };
                    for &t in &crossed_edges {
                        score.hist[flat_index(shape, s, t, e, a)] +=
                            p.prev.weight / spatial_width(s);
                    }
                }
                ScoreKind::Current => {
                    if p.surface.is_none() {
                        continue;
                    }
                    let (Some(s), Some(t), Some(e), Some(a)) =
                        (spatial_end, time_end, energy_bin, angular_bin)
                    else {
                        continue;
                    };
                    score.hist[flat_index(shape, s, t, e, a)] += p.prev.weight * p.dir.x;
                }
            }
        }
    }

    /// Folds one history's accumulator into the batch sums of iteration
    /// `i_iter` and clears it.
    pub fn closeout_history(&mut self, i_iter: usize) {
        let offset = i_iter * self.per_iter;
        for score in &mut self.scores {
            for (j, h) in score.hist.iter_mut().enumerate() {
                score.mean[offset + j] += *h;
                score.sdev[offset + j] += *h * *h;
                *h = 0.0;
            }
        }
    }

    /// Turns the batch sums of iteration `i_iter` into a mean and a sample
    /// standard deviation of the mean over `n_total` histories.
    pub fn closeout(&mut self, n_total: u64, i_iter: usize) {
        let n = n_total as f64;
        let offset = i_iter * self.per_iter;
        for score in &mut self.scores {
            for j in offset..offset + self.per_iter {
                let sum = score.mean[j];
                let sum_sq = score.sdev[j];
                let mean = sum / n;
                score.mean[j] = mean;
                score.sdev[j] = if n_total > 1 {
                    ((sum_sq / n - mean * mean).max(0.0) / (n - 1.0)).sqrt()
                } else {
                    0.0
                };
            }
        }
    }

    /// Adds another tally's batch sums into this one (ordered rank
    /// reduction). Both tallies must share a configuration.
    pub fn merge(&mut self, other: &Tally) {
        debug_assert_eq!(self.shape, other.shape);
        debug_assert_eq!(self.scores.len(), other.scores.len());
        for (score, rhs) in self.scores.iter_mut().zip(&other.scores) {
            for (m, x) in score.mean.iter_mut().zip(&rhs.mean) {
                *m += x;
            }
            for (s, x) in score.sdev.iter_mut().zip(&rhs.sdev) {
                *s += x;
            }
        }
    }
}

#[inline]
fn flat_index(shape: [usize; 4], s: usize, t: usize, e: usize, a: usize) -> usize {
    ((s * shape[1] + t) * shape[2] + e) * shape[3] + a
}
