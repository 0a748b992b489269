//! Per-rank transport: source loop, history loop and the particle event
//! loop with its collision physics.

use super::{EPS_KICK, Simulator, TINY, census_index};
use crate::distributed::WorkShare;
use crate::distribution::sample_isotropic;
use crate::geometry::{SurfaceId, find_cell};
use crate::material::Material;
use crate::particle::{Banks, Particle};
use crate::rng::RandomLcg;
use crate::tally::Tally;
use log::{debug, error};
use std::f64::consts::PI;

/// Everything a rank hands back to the driver for the ordered reduction.
pub(crate) struct RankOutput {
    pub stored: Vec<Particle>,
    pub tallies: Vec<Tally>,
    pub nu_sigma_f: f64,
}

/// Runs one rank's share of the source loop and returns its results.
pub(crate) fn run_rank(
    sim: &Simulator,
    source_bank: &[Particle],
    share: WorkShare,
    mut rng: RandomLcg,
    fission_to_stored: bool,
) -> RankOutput {
    // Rebase to this rank's first history; per-history jumps are relative
    // to this point, so global history k starts from the same substream on
    // every partition
    rng.skip_strides(share.start, true);

    let mut rank = RankContext {
        sim,
        share,
        rng,
        fission_to_stored,
        banks: Banks::default(),
        tallies: sim.tallies.iter().map(Tally::blank_copy).collect(),
        nu_sigma_f: 0.0,
        history_index: share.start,
    };
    rank.loop_source(source_bank);

    debug!(
        "rank {} finished: {} histories, {} stored",
        share.rank,
        share.size,
        rank.banks.stored.len()
    );
    RankOutput {
        stored: rank.banks.stored,
        tallies: rank.tallies,
        nu_sigma_f: rank.nu_sigma_f,
    }
}

/// One rank's mutable tracking state, borrowing the shared problem.
struct RankContext<'a> {
    sim: &'a Simulator,
    share: WorkShare,
    rng: RandomLcg,
    fission_to_stored: bool,
    banks: Banks,
    tallies: Vec<Tally>,
    nu_sigma_f: f64,
    history_index: u64,
}

/// Outcome of the distance race within one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Event {
    Collision,
    Surface,
    Census,
}

impl<'a> RankContext<'a> {
    /// Loops over this rank's histories, seeding each from the source bank
    /// slice or from a freshly sampled source particle.
    fn loop_source(&mut self, source_bank: &[Particle]) {
        let slice: &[Particle] = if source_bank.is_empty() {
            &[]
        } else {
            let lo = self.share.start as usize;
            let hi = (self.share.start + self.share.size) as usize;
            &source_bank[lo..hi.min(source_bank.len())]
        };

        for i in 0..self.share.size {
            // Every history starts at its own substream offset
            self.rng.skip_strides(i, false);
            self.history_index = self.share.start + i;

            let mut p = if slice.is_empty() {
                self.sample_source()
            } else if (i as usize) < slice.len() {
                slice[i as usize].clone()
            } else {
                error!(
                    "source bank exhausted: history {} has no particle (bank slice holds {})",
                    self.history_index,
                    slice.len()
                );
                panic!("source bank shorter than the assigned work range");
            };

            if p.cell.is_none() {
                match find_cell(&self.sim.cells, &self.sim.surfaces, &p.pos) {
                    Some(c) => p.cell = Some(c),
                    None => self.fatal_lost(&p),
                }
            }
            if p.time_idx.is_none() {
                match census_index(p.time, &self.sim.census_time) {
                    Some(idx) => p.time_idx = Some(idx),
                    // Born at or past the final census: terminated unscored
                    None => p.alive = false,
                }
            }

            self.banks.history.push(p);
            self.loop_history();
        }
    }

    /// Picks a source by cumulative probability and samples a particle.
    fn sample_source(&mut self) -> Particle {
        let sources = &self.sim.sources;
        let xi = self.rng.next_f64();
        let mut cumulative = 0.0;
        let mut chosen = sources.len() - 1;
        for (i, source) in sources.iter().enumerate() {
            cumulative += source.prob;
            if xi < cumulative {
                chosen = i;
                break;
            }
        }
        sources[chosen].sample_particle(&mut self.rng)
    }

    /// Drains the history bank LIFO, then closes the history batch out.
    fn loop_history(&mut self) {
        while let Some(p) = self.banks.history.pop() {
            self.loop_particle(p);
        }
        let i_iter = self.sim.i_iter;
        for tally in &mut self.tallies {
            tally.closeout_history(i_iter);
        }
    }

    /// Tracks one particle to its death or census.
    fn loop_particle(&mut self, mut p: Particle) {
        let sim = self.sim;
        while p.alive {
            // Step setup: remember where the step starts
            p.save_previous_state();
            p.speed = sim.speeds[p.group];

            // Distances to the three competing events
            let d_coll = self.collision_distance(&p);
            let (surface, d_surf) = self.nearest_surface(&p);
            let time_idx = match p.time_idx {
                Some(idx) if idx < sim.census_time.len() => idx,
                _ => {
                    error!(
                        "census index out of range for history {} at {}",
                        self.history_index, p.pos
                    );
                    panic!("census index invariant violated");
                }
            };
            let d_census = p.speed * (sim.census_time[time_idx] - p.time);

            // Earliest event wins; exact ties keep the earlier-ranked event
            // so a reflective boundary at census time cannot loop forever
            let mut event = Event::Collision;
            let mut d_move = d_coll;
            if d_move > d_surf {
                event = Event::Surface;
                d_move = d_surf;
            }
            if d_move > d_census {
                event = Event::Census;
                d_move = d_census;
            }

            p.move_by(d_move);

            match event {
                Event::Collision => self.collision(&mut p),
                Event::Surface => {
                    p.surface = surface;
                    self.surface_hit(&mut p);
                }
                Event::Census => {
                    // Push just across the time boundary before saving
                    p.move_by(EPS_KICK * p.speed);
                    let next = time_idx + 1;
                    p.time_idx = Some(next);
                    if next < sim.census_time.len() {
                        let copy = Particle::new(
                            p.pos, p.dir, p.group, p.time, p.weight, p.cell, p.time_idx,
                        );
                        self.banks.stored.push(copy);
                    }
                    // The final census terminates without banking
                    p.alive = false;
                }
            }

            // Score the step that was just performed, dead or alive
            for tally in &mut self.tallies {
                tally.score(&p);
            }
            if sim.mode_eigenvalue {
                if let Some(cell) = p.prev.cell {
                    let material = &sim.materials[sim.cells[cell].material];
                    let g = p.prev.group;
                    self.nu_sigma_f +=
                        p.prev.weight * p.distance * material.nu[g] * material.fission_total[g];
                }
            }

            p.reset_record();
        }
    }

    /// Samples the free-flight distance to the next collision.
    fn collision_distance(&mut self, p: &Particle) -> f64 {
        let material = self.material_of(p);
        let sigma_t = material.total[p.group] + TINY;
        let xi = self.rng.next_f64();
        -xi.ln() / sigma_t
    }

    /// Nearest bounding surface of the current cell, scanning the cell's
    /// surface list in order so exact ties resolve stably.
    fn nearest_surface(&self, p: &Particle) -> (Option<SurfaceId>, f64) {
        let sim = self.sim;
        let cell = match p.cell {
            Some(c) => &sim.cells[c],
            None => self.fatal_lost(p),
        };
        let mut nearest = None;
        let mut d_surf = f64::INFINITY;
        for &(sid, _) in &cell.surfaces {
            let d = sim.surfaces[sid].distance(&p.pos, &p.dir);
            if d < d_surf {
                nearest = Some(sid);
                d_surf = d;
            }
        }
        (nearest, d_surf)
    }

    /// Applies the boundary condition, kicks the particle strictly across
    /// the surface and re-resolves its cell.
    fn surface_hit(&mut self, p: &mut Particle) {
        let sim = self.sim;
        if let Some(sid) = p.surface {
            sim.surfaces[sid].apply_bc(p);
        }
        p.move_by(EPS_KICK);
        if p.alive {
            match find_cell(&sim.cells, &sim.surfaces, &p.pos) {
                Some(c) => p.cell = Some(c),
                None => self.fatal_lost(p),
            }
        }
    }

    /// Samples the collision channel and dispatches it.
    fn collision(&mut self, p: &mut Particle) {
        let material = self.material_of(p);
        let g = p.group;
        let xi = self.rng.next_f64() * material.total[g];
        if xi < material.scatter_total[g] {
            self.scattering(p, material);
        } else if xi < material.scatter_total[g] + material.fission_total[g] {
            self.fission(p, material);
        } else {
            // Capture
            p.alive = false;
        }
    }

    /// Outgoing-group sampling plus direction rotation.
    fn scattering(&mut self, p: &mut Particle, material: &Material) {
        let g = p.group;
        p.group = sample_outgoing_group(
            &material.scatter[g],
            material.scatter_total[g],
            &mut self.rng,
        );
        let mu = 2.0 * self.rng.next_f64() - 1.0;
        let azi = 2.0 * PI * self.rng.next_f64();
        p.dir = p.dir.rotated(mu, azi);
    }

    /// Kills the particle and banks its fission progeny.
    fn fission(&mut self, p: &mut Particle, material: &Material) {
        p.alive = false;
        let g = p.group;
        let nu = material.nu[g];

        // Yield adjusted by the running multiplication factor
        let n = (nu / self.sim.k_eff + self.rng.next_f64()).floor() as usize;
        for _ in 0..n {
            let g_out = sample_outgoing_group(
                &material.fission[g],
                material.fission_total[g],
                &mut self.rng,
            );
            let dir = sample_isotropic(&mut self.rng);
            let neutron =
                Particle::new(p.pos, dir, g_out, p.time, p.weight, p.cell, p.time_idx);
            if self.fission_to_stored {
                self.banks.stored.push(neutron);
            } else {
                self.banks.history.push(neutron);
            }
        }
    }

    fn material_of(&self, p: &Particle) -> &'a Material {
        let sim = self.sim;
        match p.cell {
            Some(c) => &sim.materials[sim.cells[c].material],
            None => self.fatal_lost(p),
        }
    }

    /// A particle outside every cell cannot be tracked further; this is an
    /// unrecoverable geometry error.
    fn fatal_lost(&self, p: &Particle) -> ! {
        error!(
            "particle lost at {} (group {}, history {})",
            p.pos, p.group, self.history_index
        );
        panic!(
            "particle lost at {} (group {}, history {})",
            p.pos, p.group, self.history_index
        );
    }
}

/// Cumulative scan over one row of a transfer matrix.
fn sample_outgoing_group(row: &[f64], row_total: f64, rng: &mut RandomLcg) -> usize {
    let xi = rng.next_f64() * row_total;
    let mut cumulative = 0.0;
    let mut g_out = row.len() - 1;
    for (g, &value) in row.iter().enumerate() {
        cumulative += value;
        if cumulative > xi {
            g_out = g;
            break;
        }
    }
    g_out
}
