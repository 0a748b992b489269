#[cfg(test)]
mod units {
    use crate::vector::Vec3;
    use std::f64::consts::PI;

    #[test]
    fn test_arithmetic() {
        let a = Vec3::new(1.0, 2.0, 3.0);
        let b = Vec3::new(-1.0, 0.5, 2.0);

        assert_eq!(a + b, Vec3::new(0.0, 2.5, 5.0));
        assert_eq!(a - b, Vec3::new(2.0, 1.5, 1.0));
        assert_eq!(&a + &b, a + b);
        assert_eq!(&a - &b, a - b);
        assert_eq!(a * 2.0, Vec3::new(2.0, 4.0, 6.0));
        assert_eq!(2.0 * a, a * 2.0);
        assert_eq!(a / 2.0, Vec3::new(0.5, 1.0, 1.5));
        assert_eq!(-a, Vec3::new(-1.0, -2.0, -3.0));
    }

    #[test]
    fn test_norm_and_normalize() {
        let v = Vec3::new(3.0, 4.0, 0.0);
        assert_eq!(v.norm_squared(), 25.0);
        assert_eq!(v.norm(), 5.0);

        let unit = v.normalize();
        assert!((unit.norm() - 1.0).abs() < 1e-15);
        assert!(unit.approx_eq(&Vec3::new(0.6, 0.8, 0.0), 1e-15));

        // Degenerate input stays finite
        assert_eq!(Vec3::zero().normalize(), Vec3::zero());
    }

    #[test]
    fn test_dot() {
        let a = Vec3::new(1.0, 2.0, 3.0);
        let b = Vec3::new(4.0, 5.0, 6.0);
        assert_eq!(a.dot(&b), 32.0);
        assert_eq!(Vec3::x_hat().dot(&Vec3::y_hat()), 0.0);
    }

    #[test]
    fn test_rotated_preserves_unit_norm() {
        let dir = Vec3::new(1.0, 1.0, 1.0).normalize();
        for i in 0..20 {
            let mu = -1.0 + 2.0 * (i as f64 + 0.5) / 20.0;
            let azi = 2.0 * PI * (i as f64) / 20.0;
            let out = dir.rotated(mu, azi);
            assert!(
                (out.norm() - 1.0).abs() < 1e-12,
                "denormalized at mu={mu}: |out|={}",
                out.norm()
            );
        }
    }

    #[test]
    fn test_rotated_polar_cosine() {
        // The rotated direction must make an angle acos(mu) with the original
        let dir = Vec3::new(0.3, -0.4, 0.5).normalize();
        for &mu in &[-0.9, -0.25, 0.0, 0.5, 0.99] {
            let out = dir.rotated(mu, 1.234);
            assert!((dir.dot(&out) - mu).abs() < 1e-12);
        }
    }

    #[test]
    fn test_rotated_axial_singularity() {
        // Directions exactly along +-z exercise the swapped branch
        for dir in [Vec3::z_hat(), -Vec3::z_hat()] {
            let out = dir.rotated(0.5, 0.75);
            assert!((out.norm() - 1.0).abs() < 1e-12);
            assert!((dir.dot(&out) - 0.5).abs() < 1e-12);
        }
    }

    #[test]
    fn test_rotated_identity() {
        // mu = 1 keeps the direction unchanged regardless of azimuth
        let dir = Vec3::new(0.8, 0.0, 0.6);
        let out = dir.rotated(1.0, 2.5);
        assert!(out.approx_eq(&dir, 1e-12));
    }
}
