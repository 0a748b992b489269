#[cfg(test)]
mod units {
    use crate::distributed::{distribute_work, normalize_weight};
    use crate::distribution::{DirectionDistribution, PointDistribution, ScalarDistribution};
    use crate::geometry::{BoundaryCondition, Cell, Surface, SurfaceKind};
    use crate::material::Material;
    use crate::particle::{Particle, Source};
    use crate::pct::PopulationControl;
    use crate::simulation::{Simulator, census_index};
    use crate::tally::{Filter, ScoreKind, Tally};
    use crate::vector::Vec3;

    fn plane_x(x0: f64, bc: BoundaryCondition) -> Surface {
        Surface {
            kind: SurfaceKind::PlaneX(x0),
            bc,
        }
    }

    fn point_source(x: f64) -> Source {
        Source {
            position: PointDistribution::at(x, 0.0, 0.0),
            direction: DirectionDistribution::Isotropic,
            group: ScalarDistribution::Delta(0.0),
            time: ScalarDistribution::Delta(0.0),
            prob: 1.0,
        }
    }

    /// One-cell slab on [x_lo, x_hi] filled with material 0.
    fn slab(x_lo: f64, x_hi: f64, bc: BoundaryCondition) -> (Vec<Surface>, Vec<Cell>) {
        let surfaces = vec![plane_x(x_lo, bc), plane_x(x_hi, bc)];
        let cells = vec![Cell {
            surfaces: vec![(0, 1), (1, -1)],
            material: 0,
        }];
        (surfaces, cells)
    }

    #[test]
    fn test_distribute_work_covers_disjointly() {
        for (n_hist, n_ranks) in [(10u64, 1usize), (10, 3), (7, 7), (100, 8), (5, 9)] {
            let shares: Vec<_> = (0..n_ranks)
                .map(|r| distribute_work(n_hist, r, n_ranks))
                .collect();
            let mut covered = 0u64;
            let mut next_start = 0u64;
            for share in &shares {
                assert_eq!(share.start, next_start, "ranges must be contiguous");
                assert_eq!(share.total, n_hist);
                next_start += share.size;
                covered += share.size;
            }
            assert_eq!(covered, n_hist, "N={n_hist} P={n_ranks}");
            // Sizes differ by at most one
            let min = shares.iter().map(|s| s.size).min().unwrap();
            let max = shares.iter().map(|s| s.size).max().unwrap();
            assert!(max - min <= 1);
        }
    }

    #[test]
    fn test_normalize_weight_scales_to_target() {
        let mut bank: Vec<Particle> = (0..4)
            .map(|i| {
                Particle::new(
                    Vec3::zero(),
                    Vec3::x_hat(),
                    0,
                    0.0,
                    (i + 1) as f64,
                    None,
                    None,
                )
            })
            .collect();
        let before = normalize_weight(&mut bank, 20);
        assert_eq!(before, 10.0);
        let after: f64 = bank.iter().map(|p| p.weight).sum();
        assert!((after - 20.0).abs() < 1e-12);
    }

    #[test]
    fn test_census_index_intervals() {
        let grid = [10.0, 20.0, f64::INFINITY];
        assert_eq!(census_index(0.0, &grid), Some(0));
        assert_eq!(census_index(9.99, &grid), Some(0));
        // Exactly on an edge belongs to the next interval
        assert_eq!(census_index(10.0, &grid), Some(1));
        assert_eq!(census_index(15.0, &grid), Some(1));
        assert_eq!(census_index(20.0, &grid), Some(2));
        assert_eq!(census_index(1e30, &grid), Some(2));

        // A grid ending at a finite time terminates late particles
        let finite = [5.0, 10.0];
        assert_eq!(census_index(3.0, &finite), Some(0));
        assert_eq!(census_index(7.0, &finite), Some(1));
        assert_eq!(census_index(10.0, &finite), None);
        assert_eq!(census_index(11.0, &finite), None);
    }

    #[test]
    fn test_void_slab_scores_only_the_source_bin() {
        // No collisions: every history is a single flight from the origin to
        // a vacuum boundary, so all track length is credited to the bin the
        // flight starts in
        let void = Material::new(vec![0.0], vec![vec![0.0]], vec![], vec![]).unwrap();
        let (surfaces, cells) = slab(-10.0, 10.0, BoundaryCondition::Vacuum);
        let grid: Vec<f64> = (0..=8).map(|i| -10.0 + 2.5 * i as f64).collect();
        let tally = Tally::new(
            "flux",
            Some(Filter::new(grid)),
            None,
            None,
            None,
            &[ScoreKind::Flux],
        );
        let mut sim = Simulator::new(
            vec![1.0],
            vec![void],
            surfaces,
            cells,
            vec![point_source(0.0)],
            vec![tally],
            500,
        );
        sim.run().expect("run");

        let score = &sim.tallies[0].scores[0];
        assert_eq!(score.mean.len(), 8);
        for (i, &m) in score.mean.iter().enumerate() {
            if i == 4 {
                assert!(m > 0.0, "source bin must score");
            } else {
                assert_eq!(m, 0.0, "bin {i} scored without any track starting there");
            }
        }
        assert!(score.sdev[4] > 0.0, "nondegenerate bin needs spread");
        assert!(sim.stored_bank().is_empty());
        assert!(sim.time_total >= 0.0);
    }

    fn scattering_slab_sim(n_hist: u64, n_ranks: usize) -> Simulator {
        let material = Material::new(vec![0.5], vec![vec![0.5]], vec![], vec![]).unwrap();
        let (surfaces, cells) = slab(0.0, 10.0, BoundaryCondition::Vacuum);
        let source = Source {
            position: PointDistribution {
                x: ScalarDistribution::Uniform { a: 0.0, b: 10.0 },
                y: ScalarDistribution::Delta(0.0),
                z: ScalarDistribution::Delta(0.0),
            },
            direction: DirectionDistribution::Isotropic,
            group: ScalarDistribution::Delta(0.0),
            time: ScalarDistribution::Delta(0.0),
            prob: 1.0,
        };
        let grid: Vec<f64> = (0..=10).map(|i| i as f64).collect();
        let tally = Tally::new(
            "flux",
            Some(Filter::new(grid)),
            None,
            None,
            None,
            &[ScoreKind::Flux],
        );
        let mut sim = Simulator::new(
            vec![1.0],
            vec![material],
            surfaces,
            cells,
            vec![source],
            vec![tally],
            n_hist,
        );
        sim.n_ranks = n_ranks;
        sim
    }

    #[test]
    fn test_rank_partition_does_not_change_results() {
        let mut single = scattering_slab_sim(300, 1);
        single.run().expect("single-rank run");
        let mut split = scattering_slab_sim(300, 4);
        split.run().expect("four-rank run");

        let a = &single.tallies[0].scores[0];
        let b = &split.tallies[0].scores[0];
        for (x, y) in a.mean.iter().zip(&b.mean) {
            let scale = x.abs().max(1.0);
            assert!(
                (x - y).abs() < 1e-10 * scale,
                "means diverged across partitions: {x} vs {y}"
            );
        }
        for (x, y) in a.sdev.iter().zip(&b.sdev) {
            let scale = x.abs().max(1.0);
            assert!((x - y).abs() < 1e-10 * scale);
        }
    }

    #[test]
    fn test_census_steps_run_to_completion() {
        // Absorbing scatterer with one census: survivors are stored, combed
        // back to the history target and finished in the second step
        let material = Material::new(vec![0.3], vec![vec![0.7]], vec![], vec![]).unwrap();
        let (surfaces, cells) = slab(-50.0, 50.0, BoundaryCondition::Reflective);
        let time_grid = vec![0.0, 5.0, 15.0];
        let tally = Tally::new(
            "flux",
            None,
            Some(Filter::new(time_grid)),
            None,
            None,
            &[ScoreKind::Flux, ScoreKind::FluxEdge],
        );
        let mut sim = Simulator::new(
            vec![1.0],
            vec![material],
            surfaces,
            cells,
            vec![point_source(0.0)],
            vec![tally],
            200,
        );
        sim.set_pct(PopulationControl::Comb, vec![5.0, f64::INFINITY])
            .unwrap();
        sim.run().expect("census run");

        let flux = &sim.tallies[0].scores[0];
        assert!(flux.mean[0] > 0.0, "early time bin must score");
        assert!(flux.mean[1] > 0.0, "post-census bin must score");
        let edge = &sim.tallies[0].scores[1];
        assert!(edge.mean[0] > 0.0, "crossings of the t=5 edge must score");
        assert!(sim.stored_bank().is_empty(), "fixed-source run drains its banks");
    }

    #[test]
    fn test_setup_rejects_bad_problems() {
        let ok = scattering_slab_sim(10, 1);

        // Missing speeds in a time-dependent problem
        let mut sim = scattering_slab_sim(10, 1);
        sim.speeds = Vec::new();
        sim.set_pct(PopulationControl::SimpleSampling, vec![5.0]).unwrap();
        assert!(sim.run().is_err());

        // Wrong speed count
        let mut sim = scattering_slab_sim(10, 1);
        sim.speeds = vec![1.0, 2.0];
        assert!(sim.run().is_err());

        // Unsorted census grid
        let mut sim = scattering_slab_sim(10, 1);
        assert!(
            sim.set_pct(PopulationControl::Comb, vec![10.0, 5.0])
                .is_err()
        );

        // Dangling material reference
        let mut sim = scattering_slab_sim(10, 1);
        sim.cells[0].material = 7;
        assert!(sim.run().is_err());

        // Dangling surface reference
        let mut sim = scattering_slab_sim(10, 1);
        sim.cells[0].surfaces[0].0 = 9;
        assert!(sim.run().is_err());

        // Zero histories
        let mut sim = scattering_slab_sim(10, 1);
        sim.n_hist = 0;
        assert!(sim.run().is_err());

        // Initial bank with the wrong population
        let mut sim = scattering_slab_sim(10, 1);
        sim.set_initial_bank(vec![Particle::new(
            Vec3::new(5.0, 0.0, 0.0),
            Vec3::x_hat(),
            0,
            0.0,
            1.0,
            None,
            None,
        )]);
        assert!(sim.run().is_err());

        // The untouched baseline still runs
        let mut ok = ok;
        assert!(ok.run().is_ok());
    }

    #[test]
    fn test_missing_speeds_default_to_unity_when_time_independent() {
        let mut sim = scattering_slab_sim(50, 1);
        sim.speeds = Vec::new();
        sim.tallies.clear();
        assert!(sim.run().is_ok());
        assert_eq!(sim.speeds, vec![1.0]);
    }
}
