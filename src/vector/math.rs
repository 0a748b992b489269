//! Vector math operations for Vec3
//! Norms, normalization, dot product, approximate comparison and the
//! direction rotation used when sampling a scattering angle.

use super::Vec3;

impl Vec3 {
    /// Calculates the squared magnitude of the vector.
    ///
    /// Cheaper than `norm()` when only comparisons are needed.
    #[inline]
    pub fn norm_squared(&self) -> f64 {
        self.x * self.x + self.y * self.y + self.z * self.z
    }

    /// Calculates the magnitude of the vector.
    ///
    /// # Examples
    /// ```
    /// # use transport_lib::vector::Vec3;
    /// let v = Vec3::new(3.0, 4.0, 0.0);
    /// assert_eq!(v.norm(), 5.0);
    /// ```
    #[inline]
    pub fn norm(&self) -> f64 {
        self.norm_squared().sqrt()
    }

    /// Returns a unit vector in the same direction as this vector.
    ///
    /// A zero or near-zero vector normalizes to the zero vector instead of
    /// dividing by zero.
    pub fn normalize(&self) -> Self {
        let norm_sq = self.norm_squared();
        if norm_sq > f64::EPSILON * f64::EPSILON {
            let inv_norm = norm_sq.sqrt().recip();
            Vec3 {
                x: self.x * inv_norm,
                y: self.y * inv_norm,
                z: self.z * inv_norm,
            }
        } else {
            Vec3::zero()
        }
    }

    /// Calculates the dot product with another vector.
    ///
    /// # Examples
    /// ```
    /// # use transport_lib::vector::Vec3;
    /// let a = Vec3::new(1.0, 2.0, 3.0);
    /// let b = Vec3::new(4.0, 5.0, 6.0);
    /// assert_eq!(a.dot(&b), 32.0);
    /// ```
    #[inline]
    pub fn dot(&self, other: &Self) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Checks componentwise approximate equality within `epsilon`.
    #[inline]
    pub fn approx_eq(&self, other: &Self, epsilon: f64) -> bool {
        let epsilon = epsilon.max(f64::EPSILON);
        (self.x - other.x).abs() < epsilon
            && (self.y - other.y).abs() < epsilon
            && (self.z - other.z).abs() < epsilon
    }

    /// Rotates a unit direction by a polar cosine `mu` and azimuth `azi`
    /// measured about the direction itself.
    ///
    /// This is the standard change-of-direction formula for sampling a
    /// scattering angle: the result makes an angle `acos(mu)` with the
    /// original direction, with the azimuthal orientation chosen by `azi`.
    /// When the direction is aligned with the z-axis the formula degenerates
    /// (division by `sqrt(1 - z^2)`), so the roles of y and z are swapped in
    /// that branch. The result is renormalized to keep the unit-norm
    /// guarantee independent of rounding.
    ///
    /// # Arguments
    /// * `mu` - cosine of the polar rotation angle, in [-1, 1]
    /// * `azi` - azimuthal angle in radians
    pub fn rotated(&self, mu: f64, azi: f64) -> Vec3 {
        let cos_azi = azi.cos();
        let sin_azi = azi.sin();
        let ac = (1.0 - mu * mu).max(0.0).sqrt();

        let out = if self.z.abs() < 1.0 {
            let b = (1.0 - self.z * self.z).sqrt();
            let c = ac / b;
            Vec3 {
                x: self.x * mu + (self.x * self.z * cos_azi - self.y * sin_azi) * c,
                y: self.y * mu + (self.y * self.z * cos_azi + self.x * sin_azi) * c,
                z: self.z * mu - cos_azi * ac * b,
            }
        } else {
            // Direction along +-z: interchange y and z in the formula
            let b = (1.0 - self.y * self.y).sqrt();
            let c = ac / b;
            Vec3 {
                x: self.x * mu + (self.x * self.y * cos_azi - self.z * sin_azi) * c,
                z: self.z * mu + (self.z * self.y * cos_azi + self.x * sin_azi) * c,
                y: self.y * mu - cos_azi * ac * b,
            }
        };
        out.normalize()
    }
}
