//! # Geometry Module - Surfaces, Boundary Conditions and Cells
//!
//! Geometry is described by signed surfaces and half-space cells. Surfaces
//! and cells live in plain ordered vectors owned by the simulator; everything
//! else refers to them through index identifiers, which sidesteps ownership
//! cycles between cells, surfaces and the particles travelling through them.
//!
//! The surface kinds form a closed set (axis-aligned planes and spheres), so
//! evaluation, ray distance and boundary handling dispatch on an enum tag.

use crate::particle::Particle;
use crate::vector::Vec3;
use serde::{Deserialize, Serialize};

// Unit tests
pub mod tests;

/// Index of a surface in the simulator's surface arena.
pub type SurfaceId = usize;
/// Index of a cell in the simulator's cell arena.
pub type CellId = usize;
/// Index of a material in the simulator's material arena.
pub type MaterialId = usize;

/// What happens to a particle that reaches a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoundaryCondition {
    /// Particle keeps flying; the surface only separates cells.
    Transmission,
    /// Particle leaves the problem.
    Vacuum,
    /// Flight direction is mirrored about the surface normal.
    Reflective,
}

/// Geometric shape of a surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SurfaceKind {
    /// Plane `x = x0`.
    PlaneX(f64),
    /// Plane `y = y0`.
    PlaneY(f64),
    /// Plane `z = z0`.
    PlaneZ(f64),
    /// Sphere around `center` with the given radius.
    Sphere { center: Vec3, radius: f64 },
}

/// A signed surface with its boundary condition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Surface {
    pub kind: SurfaceKind,
    pub bc: BoundaryCondition,
}

impl Surface {
    /// Signed evaluation of the surface equation at `pos`.
    ///
    /// Positive on the positive half-space (outside, for spheres).
    pub fn evaluate(&self, pos: &Vec3) -> f64 {
        match self.kind {
            SurfaceKind::PlaneX(x0) => pos.x - x0,
            SurfaceKind::PlaneY(y0) => pos.y - y0,
            SurfaceKind::PlaneZ(z0) => pos.z - z0,
            SurfaceKind::Sphere { center, radius } => {
                (*pos - center).norm_squared() - radius * radius
            }
        }
    }

    /// Distance along `dir` from `pos` to the surface, or infinity when the
    /// flight never reaches it. Only strictly positive distances count, so a
    /// particle sitting on (or numerically past) the surface is not stopped
    /// by it again.
    pub fn distance(&self, pos: &Vec3, dir: &Vec3) -> f64 {
        match self.kind {
            SurfaceKind::PlaneX(x0) => plane_distance(pos.x, dir.x, x0),
            SurfaceKind::PlaneY(y0) => plane_distance(pos.y, dir.y, y0),
            SurfaceKind::PlaneZ(z0) => plane_distance(pos.z, dir.z, z0),
            SurfaceKind::Sphere { center, radius } => {
                // |pos + t*dir - center|^2 = radius^2, dir is unit
                let rel = *pos - center;
                let b = rel.dot(dir);
                let c = rel.norm_squared() - radius * radius;
                let disc = b * b - c;
                if disc < 0.0 {
                    return f64::INFINITY;
                }
                let sqrt_disc = disc.sqrt();
                let t1 = -b - sqrt_disc;
                if t1 > 0.0 {
                    return t1;
                }
                let t2 = -b + sqrt_disc;
                if t2 > 0.0 {
                    return t2;
                }
                f64::INFINITY
            }
        }
    }

    /// Outward unit normal at `pos` (assumed on or near the surface).
    pub fn normal(&self, pos: &Vec3) -> Vec3 {
        match self.kind {
            SurfaceKind::PlaneX(_) => Vec3::x_hat(),
            SurfaceKind::PlaneY(_) => Vec3::y_hat(),
            SurfaceKind::PlaneZ(_) => Vec3::z_hat(),
            SurfaceKind::Sphere { center, .. } => (*pos - center).normalize(),
        }
    }

    /// Applies the boundary condition to a particle sitting on the surface.
    pub fn apply_bc(&self, particle: &mut Particle) {
        match self.bc {
            BoundaryCondition::Transmission => {}
            BoundaryCondition::Vacuum => {
                particle.alive = false;
            }
            BoundaryCondition::Reflective => {
                let n = self.normal(&particle.pos);
                particle.dir = particle.dir - n * (2.0 * particle.dir.dot(&n));
            }
        }
    }
}

fn plane_distance(coord: f64, slope: f64, target: f64) -> f64 {
    if slope == 0.0 {
        return f64::INFINITY;
    }
    let d = (target - coord) / slope;
    if d > 0.0 { d } else { f64::INFINITY }
}

/// A cell: an intersection of signed half-spaces filled with one material.
///
/// A point lies in the cell iff for every `(surface, sign)` entry the signed
/// evaluation of the surface at the point has the stored sign (non-negative
/// for `+1`, non-positive for `-1`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    /// Bounding surfaces with the half-space sign the cell lies on.
    pub surfaces: Vec<(SurfaceId, i8)>,
    /// Material filling the cell.
    pub material: MaterialId,
}

impl Cell {
    /// Point-in-cell test against the surface arena.
    pub fn contains(&self, surfaces: &[Surface], pos: &Vec3) -> bool {
        self.surfaces.iter().all(|&(sid, sign)| {
            let value = surfaces[sid].evaluate(pos);
            if sign >= 0 { value >= 0.0 } else { value <= 0.0 }
        })
    }
}

/// Finds the first cell containing `pos`, scanning in arena order.
pub fn find_cell(cells: &[Cell], surfaces: &[Surface], pos: &Vec3) -> Option<CellId> {
    cells.iter().position(|cell| cell.contains(surfaces, pos))
}
