//! # Distribution Module - Source Sampling Primitives
//!
//! Small tagged-variant samplers used to describe sources: scalar
//! distributions (delta, uniform), per-axis point distributions and flight
//! direction distributions. The set of kinds is closed, so dispatch is a
//! plain `match` rather than trait objects.
//!
//! Every sampler consumes a documented number of stream draws in a
//! documented order; the transport reproducibility contract depends on this,
//! and the unit tests pin it.

use crate::rng::RandomLcg;
use crate::vector::Vec3;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;


/// Scalar sampling law.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ScalarDistribution {
    /// Always returns the stored value. Consumes no draws.
    Delta(f64),
    /// Uniform over `[a, b)`. Consumes one draw.
    Uniform { a: f64, b: f64 },
}

impl ScalarDistribution {
    /// Samples a value from the distribution.
    pub fn sample(&self, rng: &mut RandomLcg) -> f64 {
        match *self {
            ScalarDistribution::Delta(v) => v,
            ScalarDistribution::Uniform { a, b } => a + rng.next_f64() * (b - a),
        }
    }
}

/// Independent per-axis position distribution.
///
/// Sampling draws the axes in x, y, z order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointDistribution {
    pub x: ScalarDistribution,
    pub y: ScalarDistribution,
    pub z: ScalarDistribution,
}

impl PointDistribution {
    /// A delta point at the given coordinates.
    pub fn at(x: f64, y: f64, z: f64) -> Self {
        PointDistribution {
            x: ScalarDistribution::Delta(x),
            y: ScalarDistribution::Delta(y),
            z: ScalarDistribution::Delta(z),
        }
    }

    /// Samples a position, one axis at a time.
    pub fn sample(&self, rng: &mut RandomLcg) -> Vec3 {
        let x = self.x.sample(rng);
        let y = self.y.sample(rng);
        let z = self.z.sample(rng);
        Vec3::new(x, y, z)
    }
}

/// Flight direction sampling law.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DirectionDistribution {
    /// Uniform over the unit sphere. Consumes two draws.
    Isotropic,
    /// Fixed unit direction. Consumes no draws.
    Beam(Vec3),
}

impl DirectionDistribution {
    /// Samples a unit direction.
    pub fn sample(&self, rng: &mut RandomLcg) -> Vec3 {
        match *self {
            DirectionDistribution::Isotropic => sample_isotropic(rng),
            DirectionDistribution::Beam(dir) => dir,
        }
    }
}

/// Samples a direction uniformly over the unit sphere.
///
/// Two draws: polar cosine `mu = 2u - 1` first, then azimuth `2*pi*u`.
pub fn sample_isotropic(rng: &mut RandomLcg) -> Vec3 {
    let mu = 2.0 * rng.next_f64() - 1.0;
    let azi = 2.0 * PI * rng.next_f64();
    let c = (1.0 - mu * mu).max(0.0).sqrt();
    Vec3::new(c * azi.cos(), c * azi.sin(), mu)
}
