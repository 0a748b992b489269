//! # Config Module - TOML Input Decks
//!
//! A problem is described by a TOML deck: materials, surfaces, cells,
//! sources and tallies, plus iteration mode, population control, census
//! times, RNG settings and output location. [`Config::load`] reads and
//! parses a deck, [`Config::build`] turns it into a validated
//! [`Simulator`]; everything suspicious is rejected at this stage so the
//! transport loop can assume a well-formed problem.
//!
//! ```toml
//! n_hist = 100000
//! speeds = [1.0]
//! pct = "CO"
//! census_time = [20.0]
//!
//! [[material]]
//! capture = [0.5]
//! scatter = [[0.5]]
//!
//! [[surface]]
//! kind = "plane-x"
//! position = 0.0
//! bc = "vacuum"
//!
//! [[cell]]
//! surfaces = [[0, 1]]
//! material = 0
//!
//! [[source]]
//! position = { x = { delta = 0.0 }, y = { delta = 0.0 }, z = { delta = 0.0 } }
//!
//! [[tally]]
//! name = "flux"
//! spatial = [0.0, 1.0, 2.0]
//! scores = ["flux"]
//! ```

use crate::distribution::{DirectionDistribution, PointDistribution, ScalarDistribution};
use crate::geometry::{BoundaryCondition, Cell, Surface, SurfaceKind};
use crate::io::bank::load_bank;
use crate::material::Material;
use crate::particle::Source;
use crate::pct::PopulationControl;
use crate::rng::{LCG_SEED, LCG_STRIDE};
use crate::simulation::Simulator;
use crate::tally::{Filter, ScoreKind, Tally};
use crate::vector::Vec3;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level input deck.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Histories per iteration (eigenvalue) or per census step (fixed).
    pub n_hist: u64,
    /// Per-group speeds; may be omitted for time-independent problems.
    #[serde(default)]
    pub speeds: Vec<f64>,
    /// Census times, ascending. A final finite entry is a hard time
    /// boundary; append `inf` to keep tracking past the last census.
    #[serde(default)]
    pub census_time: Vec<f64>,
    /// Population control technique name.
    #[serde(default = "default_pct")]
    pub pct: String,
    /// RNG base seed.
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// RNG draws reserved per history.
    #[serde(default = "default_stride")]
    pub stride: u64,
    /// Rank fan-out of the source loop.
    #[serde(default = "default_ranks")]
    pub ranks: usize,
    /// Output file basename.
    #[serde(default = "default_output")]
    pub output: String,
    /// Optional k-eigenvalue block.
    #[serde(default)]
    pub eigenvalue: Option<EigenvalueConfig>,
    /// Optional bincode bank preloading the first source loop.
    #[serde(default)]
    pub initial_bank: Option<String>,

    #[serde(rename = "material")]
    pub materials: Vec<MaterialConfig>,
    #[serde(rename = "surface")]
    pub surfaces: Vec<SurfaceConfig>,
    #[serde(rename = "cell")]
    pub cells: Vec<CellConfig>,
    #[serde(rename = "source")]
    pub sources: Vec<SourceConfig>,
    #[serde(rename = "tally", default)]
    pub tallies: Vec<TallyConfig>,
}

fn default_pct() -> String {
    "SS".to_string()
}
fn default_seed() -> u64 {
    LCG_SEED
}
fn default_stride() -> u64 {
    LCG_STRIDE
}
fn default_ranks() -> usize {
    1
}
fn default_output() -> String {
    "output".to_string()
}
fn default_prob() -> f64 {
    1.0
}

/// k-eigenvalue iteration settings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EigenvalueConfig {
    pub n_iter: usize,
    #[serde(default = "default_k_init")]
    pub k_init: f64,
}

fn default_k_init() -> f64 {
    1.0
}

/// Raw multi-group cross sections.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MaterialConfig {
    pub capture: Vec<f64>,
    pub scatter: Vec<Vec<f64>>,
    #[serde(default)]
    pub fission: Vec<Vec<f64>>,
    #[serde(default)]
    pub nu: Vec<f64>,
}

/// Surface description: a kind tag plus its geometric parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SurfaceConfig {
    /// "plane-x", "plane-y", "plane-z" or "sphere".
    pub kind: String,
    /// Plane coordinate, for the plane kinds.
    #[serde(default)]
    pub position: Option<f64>,
    /// Sphere center.
    #[serde(default)]
    pub center: Option<[f64; 3]>,
    /// Sphere radius.
    #[serde(default)]
    pub radius: Option<f64>,
    /// "transmission", "vacuum" or "reflective".
    pub bc: String,
}

/// Cell description: signed surface references and a material index.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CellConfig {
    /// Pairs `[surface_index, sign]` with sign +1 or -1.
    pub surfaces: Vec<(usize, i8)>,
    pub material: usize,
}

/// Scalar distribution description; exactly one field may be set.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DistConfig {
    #[serde(default)]
    pub delta: Option<f64>,
    #[serde(default)]
    pub uniform: Option<[f64; 2]>,
}

impl DistConfig {
    fn build(&self, what: &str) -> Result<ScalarDistribution, String> {
        match (self.delta, self.uniform) {
            (Some(_), Some(_)) => Err(format!("{what}: delta and uniform are exclusive")),
            (Some(v), None) => Ok(ScalarDistribution::Delta(v)),
            (None, Some([a, b])) => {
                if a >= b {
                    Err(format!("{what}: uniform bounds must satisfy a < b"))
                } else {
                    Ok(ScalarDistribution::Uniform { a, b })
                }
            }
            (None, None) => Ok(ScalarDistribution::Delta(0.0)),
        }
    }
}

/// Direction distribution description; a missing `beam` means isotropic.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DirectionConfig {
    #[serde(default)]
    pub beam: Option<[f64; 3]>,
}

/// Source description.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    pub position: PointConfig,
    #[serde(default)]
    pub direction: DirectionConfig,
    #[serde(default)]
    pub group: DistConfig,
    #[serde(default)]
    pub time: DistConfig,
    #[serde(default = "default_prob")]
    pub prob: f64,
}

/// Per-axis position distribution description.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PointConfig {
    #[serde(default)]
    pub x: DistConfig,
    #[serde(default)]
    pub y: DistConfig,
    #[serde(default)]
    pub z: DistConfig,
}

/// Tally description.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TallyConfig {
    pub name: String,
    #[serde(default)]
    pub spatial: Option<Vec<f64>>,
    #[serde(default)]
    pub time: Option<Vec<f64>>,
    #[serde(default)]
    pub energy: Option<Vec<f64>>,
    #[serde(default)]
    pub angular: Option<Vec<f64>>,
    pub scores: Vec<String>,
}

impl Config {
    /// Reads and parses a deck from disk.
    pub fn load(path: &Path) -> Result<Config, String> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
        toml::from_str(&text).map_err(|e| format!("cannot parse {}: {e}", path.display()))
    }

    /// Builds a validated simulator from the deck.
    pub fn build(self) -> Result<Simulator, String> {
        let mut materials = Vec::with_capacity(self.materials.len());
        for (i, m) in self.materials.into_iter().enumerate() {
            let material = Material::new(m.capture, m.scatter, m.fission, m.nu)
                .map_err(|e| format!("material {i}: {e}"))?;
            materials.push(material);
        }
        let groups = materials.first().map(|m| m.groups()).unwrap_or(0);

        let mut surfaces = Vec::with_capacity(self.surfaces.len());
        for (i, s) in self.surfaces.iter().enumerate() {
            surfaces.push(build_surface(s).map_err(|e| format!("surface {i}: {e}"))?);
        }

        let mut cells = Vec::with_capacity(self.cells.len());
        for (i, c) in self.cells.into_iter().enumerate() {
            if c.surfaces.iter().any(|&(_, sign)| sign != 1 && sign != -1) {
                return Err(format!("cell {i}: surface signs must be +1 or -1"));
            }
            cells.push(Cell {
                surfaces: c.surfaces,
                material: c.material,
            });
        }

        let mut sources = Vec::with_capacity(self.sources.len());
        for (i, s) in self.sources.iter().enumerate() {
            sources.push(build_source(s, groups).map_err(|e| format!("source {i}: {e}"))?);
        }

        let mut tallies = Vec::with_capacity(self.tallies.len());
        for t in &self.tallies {
            tallies.push(build_tally(t).map_err(|e| format!("tally '{}': {e}", t.name))?);
        }

        let mut sim = Simulator::new(
            self.speeds,
            materials,
            surfaces,
            cells,
            sources,
            tallies,
            self.n_hist,
        );
        sim.seed = self.seed;
        sim.stride = self.stride;
        sim.n_ranks = self.ranks.max(1);
        sim.output = self.output;

        let pct = PopulationControl::parse(&self.pct)?;
        sim.set_pct(pct, self.census_time)?;

        if let Some(eig) = self.eigenvalue {
            if eig.n_iter == 0 {
                return Err("eigenvalue.n_iter must be positive".to_string());
            }
            if eig.k_init <= 0.0 {
                return Err("eigenvalue.k_init must be positive".to_string());
            }
            sim.set_kmode(eig.n_iter, eig.k_init);
        }

        if let Some(path) = &self.initial_bank {
            let bank = load_bank(Path::new(path))
                .map_err(|e| format!("cannot load initial bank {path}: {e}"))?;
            sim.set_initial_bank(bank);
        }

        Ok(sim)
    }
}

fn build_surface(config: &SurfaceConfig) -> Result<Surface, String> {
    let bc = match config.bc.as_str() {
        "transmission" => BoundaryCondition::Transmission,
        "vacuum" => BoundaryCondition::Vacuum,
        "reflective" => BoundaryCondition::Reflective,
        other => return Err(format!("unknown boundary condition '{other}'")),
    };
    let position = || {
        config
            .position
            .ok_or_else(|| format!("kind '{}' needs a position", config.kind))
    };
    let kind = match config.kind.as_str() {
        "plane-x" => SurfaceKind::PlaneX(position()?),
        "plane-y" => SurfaceKind::PlaneY(position()?),
        "plane-z" => SurfaceKind::PlaneZ(position()?),
        "sphere" => {
            let center = config
                .center
                .ok_or_else(|| "a sphere needs a center".to_string())?;
            let radius = config
                .radius
                .ok_or_else(|| "a sphere needs a radius".to_string())?;
            if radius <= 0.0 {
                return Err("sphere radius must be positive".to_string());
            }
            SurfaceKind::Sphere {
                center: Vec3::new(center[0], center[1], center[2]),
                radius,
            }
        }
        other => return Err(format!("unknown surface kind '{other}'")),
    };
    Ok(Surface { kind, bc })
}

fn build_source(config: &SourceConfig, groups: usize) -> Result<Source, String> {
    let position = PointDistribution {
        x: config.position.x.build("position.x")?,
        y: config.position.y.build("position.y")?,
        z: config.position.z.build("position.z")?,
    };
    let direction = match config.direction.beam {
        Some([x, y, z]) => {
            let dir = Vec3::new(x, y, z);
            if dir.norm() < 1e-12 {
                return Err("beam direction must be nonzero".to_string());
            }
            DirectionDistribution::Beam(dir.normalize())
        }
        None => DirectionDistribution::Isotropic,
    };
    let group = config.group.build("group")?;
    match group {
        ScalarDistribution::Delta(v) if v < 0.0 || v as usize >= groups.max(1) => {
            return Err(format!("group {v} out of range for {groups} groups"));
        }
        ScalarDistribution::Uniform { a, b } if a < 0.0 || b > groups as f64 => {
            return Err(format!("group range [{a}, {b}) exceeds {groups} groups"));
        }
        _ => {}
    }
    let time = config.time.build("time")?;
    if config.prob <= 0.0 {
        return Err("source probability must be positive".to_string());
    }
    Ok(Source {
        position,
        direction,
        group,
        time,
        prob: config.prob,
    })
}

fn build_tally(config: &TallyConfig) -> Result<Tally, String> {
    let mut kinds = Vec::with_capacity(config.scores.len());
    for name in &config.scores {
        kinds.push(ScoreKind::parse(name)?);
    }
    let filter = |grid: &Option<Vec<f64>>| grid.as_ref().map(|g| Filter::new(g.clone()));
    let tally = Tally::new(
        config.name.clone(),
        filter(&config.spatial),
        filter(&config.time),
        filter(&config.energy),
        filter(&config.angular),
        &kinds,
    );
    tally.validate()?;
    Ok(tally)
}
