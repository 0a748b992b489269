//! # Material Module - Multi-group Cross Sections
//!
//! A material carries, per energy group, the capture, scattering and fission
//! cross sections plus the mean fission neutron yield. The group-to-group
//! scattering and fission spectra are stored as full matrices; their row sums
//! and the total cross section are derived at construction so the closure
//! `Sigma_T = Sigma_C + Sigma_S + Sigma_F` holds by construction and is
//! re-checkable with [`Material::validate`].

use serde::{Deserialize, Serialize};


/// Relative tolerance for the cross-section closure check.
pub const XS_CLOSURE_TOL: f64 = 1e-9;

/// Multi-group cross-section set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Material {
    /// Capture cross section per group.
    pub capture: Vec<f64>,
    /// Group-to-group scattering matrix, `scatter[g][g_out]`.
    pub scatter: Vec<Vec<f64>>,
    /// Group-to-group fission production matrix, `fission[g][g_out]`.
    pub fission: Vec<Vec<f64>>,
    /// Mean fission neutron yield per group.
    pub nu: Vec<f64>,
    /// Row sums of `scatter`.
    pub scatter_total: Vec<f64>,
    /// Row sums of `fission`.
    pub fission_total: Vec<f64>,
    /// Total cross section per group.
    pub total: Vec<f64>,
}

impl Material {
    /// Builds a material from its primary data, deriving row sums and totals.
    ///
    /// `fission` and `nu` may be empty for non-fissile materials, in which
    /// case they are filled with zeros. All per-group data must agree on the
    /// group count and the matrices must be square.
    pub fn new(
        capture: Vec<f64>,
        scatter: Vec<Vec<f64>>,
        fission: Vec<Vec<f64>>,
        nu: Vec<f64>,
    ) -> Result<Material, String> {
        let groups = capture.len();
        if groups == 0 {
            return Err("material needs at least one energy group".to_string());
        }

        let fission = if fission.is_empty() {
            vec![vec![0.0; groups]; groups]
        } else {
            fission
        };
        let nu = if nu.is_empty() { vec![0.0; groups] } else { nu };

        check_matrix("scatter", &scatter, groups)?;
        check_matrix("fission", &fission, groups)?;
        if nu.len() != groups {
            return Err(format!(
                "nu has {} entries but the material has {} groups",
                nu.len(),
                groups
            ));
        }
        if capture.iter().any(|&x| x < 0.0)
            || nu.iter().any(|&x| x < 0.0)
            || scatter.iter().flatten().any(|&x| x < 0.0)
            || fission.iter().flatten().any(|&x| x < 0.0)
        {
            return Err("cross sections and nu must be non-negative".to_string());
        }

        let scatter_total: Vec<f64> = scatter.iter().map(|row| row.iter().sum()).collect();
        let fission_total: Vec<f64> = fission.iter().map(|row| row.iter().sum()).collect();
        let total: Vec<f64> = (0..groups)
            .map(|g| capture[g] + scatter_total[g] + fission_total[g])
            .collect();

        Ok(Material {
            capture,
            scatter,
            fission,
            nu,
            scatter_total,
            fission_total,
            total,
        })
    }

    /// Number of energy groups.
    pub fn groups(&self) -> usize {
        self.capture.len()
    }

    /// Re-checks the closure `Sigma_T = Sigma_C + Sigma_S + Sigma_F` for
    /// every group, within a relative tolerance.
    pub fn validate(&self) -> Result<(), String> {
        for g in 0..self.groups() {
            let sum = self.capture[g] + self.scatter_total[g] + self.fission_total[g];
            let scale = self.total[g].abs().max(1.0);
            if (sum - self.total[g]).abs() > XS_CLOSURE_TOL * scale {
                return Err(format!(
                    "cross sections of group {g} do not close: \
                     capture + scatter + fission = {sum}, total = {}",
                    self.total[g]
                ));
            }
        }
        Ok(())
    }
}

fn check_matrix(name: &str, matrix: &[Vec<f64>], groups: usize) -> Result<(), String> {
    if matrix.len() != groups {
        return Err(format!(
            "{name} matrix has {} rows but the material has {groups} groups",
            matrix.len()
        ));
    }
    for (g, row) in matrix.iter().enumerate() {
        if row.len() != groups {
            return Err(format!(
                "{name} matrix row {g} has {} columns, expected {groups}",
                row.len()
            ));
        }
    }
    Ok(())
}
