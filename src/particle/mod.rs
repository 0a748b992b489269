//! # Particle Module - Histories, Banks and Sources
//!
//! The [`Particle`] record is the unit of work of the whole engine: one
//! alive particle is advanced step by step until it is captured, escapes or
//! is saved at a time census. A shadow [`TrackPoint`] snapshot taken at step
//! entry lets the tallies integrate track-length scores over the step that
//! was just performed, after the event may already have changed group,
//! direction or liveness.
//!
//! Banks are plain append-only vectors of owned particles:
//!
//! - the **source bank** feeds the next source loop,
//! - the **history bank** is drained LIFO inside a history (fission progeny
//!   in fixed-source mode land here and are tracked as part of the same
//!   history),
//! - the **stored bank** collects census survivors and, in eigenvalue mode,
//!   fission neutrons for the next iteration.
//!
//! [`Source`] describes an external particle source as a product of
//! independent distributions with a selection probability.

use crate::distribution::{DirectionDistribution, PointDistribution, ScalarDistribution};
use crate::geometry::{CellId, SurfaceId};
use crate::rng::RandomLcg;
use crate::vector::Vec3;
use serde::{Deserialize, Serialize};


/// Shadow snapshot of the state a step started from.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TrackPoint {
    pub pos: Vec3,
    pub group: usize,
    pub weight: f64,
    pub cell: Option<CellId>,
    pub time: f64,
}

/// A particle in flight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Particle {
    /// Position.
    pub pos: Vec3,
    /// Unit flight direction.
    pub dir: Vec3,
    /// Energy group index.
    pub group: usize,
    /// Time coordinate, non-negative.
    pub time: f64,
    /// Statistical weight, strictly positive while alive.
    pub weight: f64,
    /// Liveness flag; dead particles are dropped by the history loop.
    pub alive: bool,
    /// Cell currently occupied, if resolved.
    pub cell: Option<CellId>,
    /// Surface hit during the current step, if any.
    pub surface: Option<SurfaceId>,
    /// Census interval the particle lives in; `None` until resolved.
    pub time_idx: Option<usize>,
    /// Speed for the current step, set from the per-group table.
    pub speed: f64,
    /// Path length accumulated during the current step.
    pub distance: f64,
    /// Snapshot of the state at step entry.
    pub prev: TrackPoint,
}

impl Particle {
    /// Creates an alive particle with an empty step record.
    pub fn new(
        pos: Vec3,
        dir: Vec3,
        group: usize,
        time: f64,
        weight: f64,
        cell: Option<CellId>,
        time_idx: Option<usize>,
    ) -> Particle {
        Particle {
            pos,
            dir,
            group,
            time,
            weight,
            alive: true,
            cell,
            surface: None,
            time_idx,
            speed: 0.0,
            distance: 0.0,
            prev: TrackPoint::default(),
        }
    }

    /// Records the current state into the shadow snapshot.
    ///
    /// Called at the top of every step, before any distance is sampled.
    pub fn save_previous_state(&mut self) {
        self.prev = TrackPoint {
            pos: self.pos,
            group: self.group,
            weight: self.weight,
            cell: self.cell,
            time: self.time,
        };
    }

    /// Clears the per-step record (path length and surface hit).
    pub fn reset_record(&mut self) {
        self.distance = 0.0;
        self.surface = None;
    }

    /// Moves the particle a path length `d` along its direction, advancing
    /// the clock by `d / speed` and accumulating the step distance.
    pub fn move_by(&mut self, d: f64) {
        self.pos = self.pos + self.dir * d;
        self.time += d / self.speed;
        self.distance += d;
    }
}

/// Append-only particle sequence.
pub type Bank = Vec<Particle>;

/// The two banks a rank mutates while tracking.
#[derive(Debug, Default)]
pub struct Banks {
    /// LIFO bank drained within the current history.
    pub history: Bank,
    /// Census survivors and, in eigenvalue mode, fission neutrons.
    pub stored: Bank,
}

/// An external source: independent sampling laws for position, direction,
/// group and emission time, plus a selection probability.
///
/// Sampling draws in a fixed order (position x, y, z; direction; group;
/// time) so the per-history stream layout is stable. New particles carry
/// unit weight and unresolved cell and census indices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    pub position: PointDistribution,
    pub direction: DirectionDistribution,
    pub group: ScalarDistribution,
    pub time: ScalarDistribution,
    /// Relative selection probability, normalized at setup.
    pub prob: f64,
}

impl Source {
    /// Samples one particle from this source.
    pub fn sample_particle(&self, rng: &mut RandomLcg) -> Particle {
        let pos = self.position.sample(rng);
        let dir = self.direction.sample(rng);
        let group = self.group.sample(rng) as usize;
        let time = self.time.sample(rng);
        Particle::new(pos, dir, group, time, 1.0, None, None)
    }
}
