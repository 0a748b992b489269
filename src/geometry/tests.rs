#[cfg(test)]
mod units {
    use crate::geometry::{
        BoundaryCondition, Cell, Surface, SurfaceKind, find_cell,
    };
    use crate::particle::Particle;
    use crate::vector::Vec3;

    fn plane_x(x0: f64, bc: BoundaryCondition) -> Surface {
        Surface {
            kind: SurfaceKind::PlaneX(x0),
            bc,
        }
    }

    #[test]
    fn test_plane_evaluate_sign() {
        let s = plane_x(2.0, BoundaryCondition::Transmission);
        assert!(s.evaluate(&Vec3::new(3.0, 0.0, 0.0)) > 0.0);
        assert!(s.evaluate(&Vec3::new(1.0, 0.0, 0.0)) < 0.0);
        assert_eq!(s.evaluate(&Vec3::new(2.0, 5.0, -1.0)), 0.0);
    }

    #[test]
    fn test_plane_distance() {
        let s = plane_x(5.0, BoundaryCondition::Vacuum);
        let pos = Vec3::new(1.0, 0.0, 0.0);

        // Head-on approach
        assert_eq!(s.distance(&pos, &Vec3::x_hat()), 4.0);
        // Oblique approach
        let dir = Vec3::new(0.5, 0.0, 0.75_f64.sqrt());
        assert!((s.distance(&pos, &dir) - 8.0).abs() < 1e-12);
        // Moving away or parallel never hits
        assert_eq!(s.distance(&pos, &-Vec3::x_hat()), f64::INFINITY);
        assert_eq!(s.distance(&pos, &Vec3::y_hat()), f64::INFINITY);
    }

    #[test]
    fn test_sphere_distance_roots() {
        let s = Surface {
            kind: SurfaceKind::Sphere {
                center: Vec3::zero(),
                radius: 2.0,
            },
            bc: BoundaryCondition::Vacuum,
        };
        // From inside: one positive root
        assert!((s.distance(&Vec3::zero(), &Vec3::x_hat()) - 2.0).abs() < 1e-12);
        // From outside, aiming at the sphere: nearest root
        let d = s.distance(&Vec3::new(-5.0, 0.0, 0.0), &Vec3::x_hat());
        assert!((d - 3.0).abs() < 1e-12);
        // From outside, aiming away: never
        let d = s.distance(&Vec3::new(5.0, 0.0, 0.0), &Vec3::x_hat());
        assert_eq!(d, f64::INFINITY);
        // Missing the sphere entirely
        let d = s.distance(&Vec3::new(-5.0, 3.0, 0.0), &Vec3::x_hat());
        assert_eq!(d, f64::INFINITY);
    }

    #[test]
    fn test_vacuum_kills() {
        let s = plane_x(0.0, BoundaryCondition::Vacuum);
        let mut p = Particle::new(Vec3::zero(), Vec3::x_hat(), 0, 0.0, 1.0, None, None);
        s.apply_bc(&mut p);
        assert!(!p.alive);
    }

    #[test]
    fn test_reflective_mirrors_direction() {
        let s = plane_x(0.0, BoundaryCondition::Reflective);
        let dir = Vec3::new(0.6, 0.8, 0.0);
        let mut p = Particle::new(Vec3::zero(), dir, 0, 0.0, 1.0, None, None);
        s.apply_bc(&mut p);
        assert!(p.alive);
        assert!(p.dir.approx_eq(&Vec3::new(-0.6, 0.8, 0.0), 1e-12));
        assert!((p.dir.norm() - 1.0).abs() < 1e-12);

        // Reflecting twice restores the original direction
        s.apply_bc(&mut p);
        assert!(p.dir.approx_eq(&dir, 1e-12));
    }

    #[test]
    fn test_transmission_is_noop() {
        let s = plane_x(0.0, BoundaryCondition::Transmission);
        let dir = Vec3::new(0.0, 1.0, 0.0);
        let mut p = Particle::new(Vec3::zero(), dir, 0, 0.0, 1.0, None, None);
        s.apply_bc(&mut p);
        assert!(p.alive);
        assert_eq!(p.dir, dir);
    }

    #[test]
    fn test_cell_contains_half_spaces() {
        // Slab between x = -1 and x = 1
        let surfaces = vec![
            plane_x(-1.0, BoundaryCondition::Vacuum),
            plane_x(1.0, BoundaryCondition::Vacuum),
        ];
        let cell = Cell {
            surfaces: vec![(0, 1), (1, -1)],
            material: 0,
        };
        assert!(cell.contains(&surfaces, &Vec3::zero()));
        assert!(cell.contains(&surfaces, &Vec3::new(-1.0, 9.0, 9.0)));
        assert!(!cell.contains(&surfaces, &Vec3::new(1.5, 0.0, 0.0)));
        assert!(!cell.contains(&surfaces, &Vec3::new(-1.5, 0.0, 0.0)));
    }

    #[test]
    fn test_find_cell_first_match_wins() {
        let surfaces = vec![
            plane_x(-10.0, BoundaryCondition::Vacuum),
            plane_x(0.0, BoundaryCondition::Transmission),
            plane_x(10.0, BoundaryCondition::Vacuum),
        ];
        let cells = vec![
            Cell {
                surfaces: vec![(0, 1), (1, -1)],
                material: 0,
            },
            Cell {
                surfaces: vec![(1, 1), (2, -1)],
                material: 1,
            },
        ];
        assert_eq!(find_cell(&cells, &surfaces, &Vec3::new(-5.0, 0.0, 0.0)), Some(0));
        assert_eq!(find_cell(&cells, &surfaces, &Vec3::new(5.0, 0.0, 0.0)), Some(1));
        // On the shared surface, the first listed cell claims the point
        assert_eq!(find_cell(&cells, &surfaces, &Vec3::zero()), Some(0));
        // Outside everything
        assert_eq!(find_cell(&cells, &surfaces, &Vec3::new(20.0, 0.0, 0.0)), None);
    }
}
