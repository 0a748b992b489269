//! # Simulation Module - Iteration Driver
//!
//! [`Simulator`] owns the problem definition and drives the outer loop:
//! seed the source bank, fan the source loop out over ranks, reduce the rank
//! results in rank order, close out tallies, and rotate the stored bank into
//! the next iteration's source bank through population control.
//!
//! ## Modes
//!
//! - **Fixed source**: histories start from the configured sources; census
//!   survivors are stored and re-tracked step after step until no survivor
//!   remains. Fission neutrons are part of the history that produced them.
//! - **k-eigenvalue**: fission neutrons are the next generation's source;
//!   every iteration updates `k_eff` from the tracked fission production and
//!   records it in `k_mean`.
//!
//! ## Reproducibility
//!
//! One master RNG walks the stream iteration by iteration. Each rank clones
//! it and rebases to its own work offset, so the k-th global history draws
//! from the same substream regardless of the rank count; the master then
//! jumps past the whole iteration and feeds population control from the
//! rebased stream. Rank results are reduced in rank order, which pins the
//! floating-point summation order.

// Per-rank source/history/particle loops
pub mod logic;
// Unit tests
pub mod tests;

use crate::distributed::{WorkShare, distribute_work, normalize_weight};
use crate::geometry::{Cell, Surface};
use crate::material::Material;
use crate::particle::{Bank, Particle, Source};
use crate::pct::PopulationControl;
use crate::rng::{LCG_SEED, LCG_STRIDE, RandomLcg};
use crate::tally::{Tally, binary_search};
use log::{info, warn};
use rayon::prelude::*;
use std::time::Instant;

/// Nudge distance pushing a particle across a surface or time boundary.
pub const EPS_KICK: f64 = 1e-10;
/// Guard added to a total cross section so vacuum-like materials stay finite.
pub const TINY: f64 = 1e-20;

/// Census interval containing `time`, or `None` when the time lies at or
/// past the final census (such a particle is terminated, not tracked).
///
/// The returned index satisfies `census[idx-1] <= time < census[idx]` with
/// the convention that a time exactly on a census edge belongs to the next
/// interval.
pub fn census_index(time: f64, census_time: &[f64]) -> Option<usize> {
    let idx = (binary_search(time, census_time) + 1) as usize;
    if idx < census_time.len() { Some(idx) } else { None }
}

/// The transport problem plus all iteration state.
#[derive(Debug)]
pub struct Simulator {
    /// Per-group particle speeds.
    pub speeds: Vec<f64>,
    /// Material arena.
    pub materials: Vec<Material>,
    /// Surface arena.
    pub surfaces: Vec<Surface>,
    /// Cell arena; point-in-cell resolution scans it in order.
    pub cells: Vec<Cell>,
    /// External sources with normalized selection probabilities.
    pub sources: Vec<Source>,
    /// Tallies accumulated during tracking.
    pub tallies: Vec<Tally>,
    /// Histories per iteration (eigenvalue) or per census step (fixed).
    pub n_hist: u64,

    /// Eigenvalue iteration mode.
    pub mode_eigenvalue: bool,
    /// k-eigenvalue flavor of the eigenvalue mode.
    pub mode_k: bool,
    /// Multiplication factor currently applied to fission yields.
    pub k_eff: f64,
    /// Number of eigenvalue iterations.
    pub n_iter: usize,
    /// Current iteration index.
    pub i_iter: usize,
    /// Recorded k estimate per iteration.
    pub k_mean: Vec<f64>,

    /// Population control applied between iterations.
    pub pct: PopulationControl,
    /// Census time grid, ascending; a finite final entry is a hard time
    /// boundary, a trailing infinity keeps the last interval open.
    pub census_time: Vec<f64>,

    /// RNG base seed.
    pub seed: u64,
    /// RNG draws reserved per history.
    pub stride: u64,
    /// Number of ranks the source loop fans out over.
    pub n_ranks: usize,
    /// Output file basename.
    pub output: String,
    /// Wall-clock runtime of the last `run` call, seconds.
    pub time_total: f64,

    bank_source: Bank,
    bank_stored: Bank,
    nu_sigma_f_sum: f64,
}

impl Simulator {
    /// Creates a simulator in fixed-source mode with default RNG settings,
    /// simple-sampling population control and no census.
    pub fn new(
        speeds: Vec<f64>,
        materials: Vec<Material>,
        surfaces: Vec<Surface>,
        cells: Vec<Cell>,
        sources: Vec<Source>,
        tallies: Vec<Tally>,
        n_hist: u64,
    ) -> Simulator {
        Simulator {
            speeds,
            materials,
            surfaces,
            cells,
            sources,
            tallies,
            n_hist,
            mode_eigenvalue: false,
            mode_k: false,
            k_eff: 1.0,
            n_iter: 1,
            i_iter: 0,
            k_mean: Vec::new(),
            pct: PopulationControl::SimpleSampling,
            census_time: vec![f64::INFINITY],
            seed: LCG_SEED,
            stride: LCG_STRIDE,
            n_ranks: 1,
            output: "output".to_string(),
            time_total: 0.0,
            bank_source: Vec::new(),
            bank_stored: Vec::new(),
            nu_sigma_f_sum: 0.0,
        }
    }

    /// Switches to k-eigenvalue mode with `n_iter` power iterations starting
    /// from the guess `k_init`.
    pub fn set_kmode(&mut self, n_iter: usize, k_init: f64) {
        self.mode_eigenvalue = true;
        self.mode_k = true;
        self.n_iter = n_iter.max(1);
        self.k_eff = k_init;
    }

    /// Selects the population control technique and the census time grid.
    ///
    /// The grid must be strictly increasing and is used as given: a final
    /// finite entry is a hard time boundary that terminates survivors
    /// without banking them, while a trailing infinity keeps the last
    /// interval open. An empty grid means "no census".
    pub fn set_pct(&mut self, pct: PopulationControl, census_time: Vec<f64>) -> Result<(), String> {
        if census_time.windows(2).any(|w| w[0] >= w[1]) {
            return Err("census times must be strictly increasing".to_string());
        }
        self.pct = pct;
        self.census_time = if census_time.is_empty() {
            vec![f64::INFINITY]
        } else {
            census_time
        };
        Ok(())
    }

    /// Preloads the source bank of the first iteration, e.g. from a saved
    /// fission source. The bank must hold exactly `n_hist` particles.
    pub fn set_initial_bank(&mut self, bank: Bank) {
        self.bank_source = bank;
    }

    /// The stored bank left over after `run`; in eigenvalue mode this is the
    /// final generation's fission source.
    pub fn stored_bank(&self) -> &[Particle] {
        &self.bank_stored
    }

    /// Validates the problem and prepares the run.
    fn setup(&mut self) -> Result<(), String> {
        if self.n_hist == 0 {
            return Err("n_hist must be positive".to_string());
        }
        if self.materials.is_empty() {
            return Err("at least one material is required".to_string());
        }
        let groups = self.materials[0].groups();
        for (i, m) in self.materials.iter().enumerate() {
            m.validate().map_err(|e| format!("material {i}: {e}"))?;
            if m.groups() != groups {
                return Err(format!(
                    "material {i} has {} groups, expected {groups}",
                    m.groups()
                ));
            }
        }

        if self.cells.is_empty() {
            return Err("at least one cell is required".to_string());
        }
        for (i, cell) in self.cells.iter().enumerate() {
            if cell.material >= self.materials.len() {
                return Err(format!("cell {i} references unknown material {}", cell.material));
            }
            if let Some(&(sid, _)) = cell
                .surfaces
                .iter()
                .find(|&&(sid, _)| sid >= self.surfaces.len())
            {
                return Err(format!("cell {i} references unknown surface {sid}"));
            }
        }

        if self.sources.is_empty() {
            return Err("at least one source is required".to_string());
        }
        let norm: f64 = self.sources.iter().map(|s| s.prob).sum();
        if norm <= 0.0 {
            return Err("source probabilities must sum to a positive value".to_string());
        }
        if (norm - 1.0).abs() > 1e-12 {
            warn!("source probabilities sum to {norm}; normalizing");
        }
        for s in &mut self.sources {
            s.prob /= norm;
        }

        // Eigenvalue iterations never carry a census
        if self.mode_eigenvalue {
            self.census_time = vec![f64::INFINITY];
            self.k_mean = vec![0.0; self.n_iter];
        }

        let time_dependent = self.census_time.iter().any(|t| t.is_finite())
            || self.tallies.iter().any(|t| t.time.is_some());
        if self.speeds.is_empty() {
            if time_dependent {
                return Err("speeds are required in time-dependent problems".to_string());
            }
            self.speeds = vec![1.0; groups];
        }
        if self.speeds.len() != groups {
            return Err(format!(
                "{} speeds given for {groups} energy groups",
                self.speeds.len()
            ));
        }
        if self.speeds.iter().any(|&v| v <= 0.0) {
            return Err("speeds must be positive".to_string());
        }

        for tally in &mut self.tallies {
            tally.validate()?;
            tally.setup_bins(self.n_iter);
        }

        if !self.bank_source.is_empty() && self.bank_source.len() as u64 != self.n_hist {
            return Err(format!(
                "initial source bank holds {} particles, expected {}",
                self.bank_source.len(),
                self.n_hist
            ));
        }

        self.i_iter = 0;
        self.nu_sigma_f_sum = 0.0;
        Ok(())
    }

    /// Runs the simulation to completion.
    pub fn run(&mut self) -> Result<(), String> {
        let wall = Instant::now();
        self.setup()?;

        let mut rng = RandomLcg::new(self.seed, self.stride);
        info!(
            "starting run: {} histories, {} ranks, pct {}, {}",
            self.n_hist,
            self.n_ranks,
            self.pct.name(),
            if self.mode_k { "k-eigenvalue mode" } else { "fixed-source mode" }
        );

        let mut simulation_end = false;
        while !simulation_end {
            // Where do fission neutrons go this iteration?
            let fission_to_stored = self.mode_eigenvalue;

            // SOURCE LOOP, fanned out over ranks
            let source_bank = std::mem::take(&mut self.bank_source);
            let shares: Vec<WorkShare> = (0..self.n_ranks.max(1))
                .map(|r| distribute_work(self.n_hist, r, self.n_ranks.max(1)))
                .collect();
            let outputs: Vec<logic::RankOutput> = {
                let sim: &Simulator = &*self;
                let base_rng = &rng;
                let source_ref = &source_bank;
                shares
                    .into_par_iter()
                    .map(|share| {
                        logic::run_rank(sim, source_ref, share, base_rng.clone(), fission_to_stored)
                    })
                    .collect()
            };

            // Ordered reduction over ranks
            for out in outputs {
                self.nu_sigma_f_sum += out.nu_sigma_f;
                for (tally, rank_tally) in self.tallies.iter_mut().zip(&out.tallies) {
                    tally.merge(rank_tally);
                }
                self.bank_stored.extend(out.stored);
            }

            if self.mode_eigenvalue {
                for tally in &mut self.tallies {
                    tally.closeout(self.n_hist, self.i_iter);
                }
                self.k_eff = self.nu_sigma_f_sum / self.n_hist as f64;
                self.k_mean[self.i_iter] = self.k_eff;
                self.nu_sigma_f_sum = 0.0;
                info!("iteration {}: k-eff {:.6}", self.i_iter, self.k_eff);
            }

            if self.mode_eigenvalue {
                self.i_iter += 1;
                if self.i_iter == self.n_iter {
                    simulation_end = true;
                }
            } else if self.bank_stored.is_empty() {
                // No census survivor left: the fixed-source problem is done
                simulation_end = true;
            }

            if !simulation_end {
                if self.mode_eigenvalue {
                    normalize_weight(&mut self.bank_stored, self.n_hist);
                }
                // Jump the master stream past everything this iteration
                // consumed; population control draws from the rebased base
                rng.skip_strides(self.n_hist, true);
                let stored = std::mem::take(&mut self.bank_stored);
                self.bank_source = self.pct.apply(stored, self.n_hist as usize, &mut rng);
            } else {
                self.bank_source.clear();
                if !self.mode_eigenvalue {
                    self.bank_stored.clear();
                }
            }
        }

        if !self.mode_eigenvalue {
            for tally in &mut self.tallies {
                tally.closeout(self.n_hist, 0);
            }
        }

        self.time_total = wall.elapsed().as_secs_f64();
        info!("run finished in {:.3} s", self.time_total);
        Ok(())
    }
}
