use bhring::{
    exchange_forces, local_cluster, seed_bodies, BHTree, Body, ExchangeBuffers, NVec2, Quadrant,
    SimConfig, Simulator, SingleProcess, CENTRAL_MASS, EPS, G,
};

/// Build a body with zero velocity at (x, y).
fn body(id: u64, x: f64, y: f64, m: f64) -> Body {
    Body::new(id, NVec2::new(x, y), NVec2::zeros(), m, [255, 255, 0])
}

/// Deterministic scatter of `n` bodies inside the given radius, with
/// uneven masses so aggregates are not accidentally symmetric.
fn scatter(n: usize, radius: f64) -> Vec<Body> {
    (0..n)
        .map(|i| {
            let i_f = i as f64;
            body(
                i as u64,
                (i_f * 0.37).sin() * radius * 0.8,
                (i_f * 0.13).cos() * radius * 0.8,
                1.0e20 * (1.0 + (i_f * 0.61).sin().abs()),
            )
        })
        .collect()
}

/// Direct O(n^2) softened pairwise force on every body.
fn direct_forces(all: &[Body]) -> Vec<NVec2> {
    all.iter()
        .map(|b| {
            let mut probe = b.clone();
            probe.reset_force();
            for other in all {
                if other.id != b.id {
                    probe.accumulate_force_from(other);
                }
            }
            probe.f
        })
        .collect()
}

fn test_config(n: usize) -> SimConfig {
    SimConfig {
        n,
        render: false,
        ..SimConfig::default()
    }
}

// ==================================================================================
// Quadrant
// ==================================================================================

#[test]
fn quadrant_contains_closed_bounds() {
    let q = Quadrant::new(0.0, 0.0, 2.0);
    assert!(q.contains(0.0, 0.0));
    assert!(q.contains(1.0, 1.0)); // edges belong to the region
    assert!(q.contains(-1.0, 1.0));
    assert!(!q.contains(1.0 + 1e-12, 0.0));
    assert!(!q.contains(0.0, -1.5));
}

#[test]
fn quadrant_subdivide_geometry() {
    let q = Quadrant::new(2.0, -2.0, 4.0);
    let (nw, ne, sw, se) = q.subdivide();
    for sub in [&nw, &ne, &sw, &se] {
        assert_eq!(sub.length(), 2.0);
    }
    assert!(nw.contains(1.0, -1.0));
    assert!(ne.contains(3.0, -1.0));
    assert!(sw.contains(1.0, -3.0));
    assert!(se.contains(3.0, -3.0));
    // Subdivision never mutates the parent.
    assert_eq!(q.length(), 4.0);
}

// ==================================================================================
// Body
// ==================================================================================

#[test]
fn force_magnitude_matches_softened_law() {
    let a = body(0, 0.0, 0.0, 2.0e20);
    let mut b = body(1, 1.0e6, 0.0, 3.0e20);
    b.compute_force_from(&a);

    let d = 1.0e6;
    let expected = G * 2.0e20 * 3.0e20 / (d * d + EPS * EPS);
    assert!((b.f.x + expected).abs() / expected < 1e-12); // pull is toward a
    assert_eq!(b.f.y, 0.0);
}

#[test]
fn coincident_bodies_exert_finite_force() {
    let a = body(0, 5.0, 5.0, 1.0e20);
    let mut b = body(1, 5.0, 5.0, 1.0e20);
    b.compute_force_from(&a);
    assert!(b.f.x.is_finite() && b.f.y.is_finite());
    assert_eq!(b.f, NVec2::zeros());
}

#[test]
fn update_with_zero_dt_is_identity() {
    let mut b = body(0, 3.0, 4.0, 1.0e20);
    b.v = NVec2::new(10.0, -5.0);
    b.add_force(1.0e15, 2.0e15);
    b.update(0.0);
    assert_eq!(b.r, NVec2::new(3.0, 4.0));
    assert_eq!(b.v, NVec2::new(10.0, -5.0));
}

#[test]
fn plus_is_mass_weighted() {
    let a = body(0, 0.0, 0.0, 1.0);
    let b = body(1, 4.0, 0.0, 3.0);
    let agg = a.plus(&b);
    assert_eq!(agg.m, 4.0);
    assert!((agg.r.x - 3.0).abs() < 1e-12);
    assert_eq!(agg.r.y, 0.0);
}

// ==================================================================================
// BHTree
// ==================================================================================

#[test]
fn tree_conserves_mass_and_center_of_mass() {
    let bodies = scatter(64, 1.0e6);
    let mut tree = BHTree::new(Quadrant::new(0.0, 0.0, 2.0e6), 0.5);
    for b in &bodies {
        tree.insert(b.clone());
    }

    let total: f64 = bodies.iter().map(|b| b.m).sum();
    let com = bodies
        .iter()
        .fold(NVec2::zeros(), |acc, b| acc + b.r * b.m)
        / total;

    let (mass, agg_com) = tree.aggregate().unwrap();
    assert!((mass - total).abs() / total < 1e-12);
    assert!((agg_com - com).norm() < 1e-6 * com.norm().max(1.0));
}

#[test]
fn tree_aggregate_is_insertion_order_independent() {
    let bodies = scatter(32, 1.0e6);
    let quad = Quadrant::new(0.0, 0.0, 2.0e6);

    let mut forward = BHTree::new(quad, 0.5);
    for b in &bodies {
        forward.insert(b.clone());
    }
    let mut backward = BHTree::new(quad, 0.5);
    for b in bodies.iter().rev() {
        backward.insert(b.clone());
    }

    let (m1, c1) = forward.aggregate().unwrap();
    let (m2, c2) = backward.aggregate().unwrap();
    assert!((m1 - m2).abs() / m1 < 1e-12);
    assert!((c1 - c2).norm() < 1e-6);
}

#[test]
fn empty_tree_exerts_no_force() {
    let tree = BHTree::new(Quadrant::new(0.0, 0.0, 2.0e6), 0.5);
    let mut probe = body(99, 1.0, 2.0, 1.0e20);
    tree.update_force(&mut probe);
    assert_eq!(probe.f, NVec2::zeros());
}

#[test]
fn body_exerts_no_force_on_itself() {
    let bodies = scatter(16, 1.0e6);
    let mut tree = BHTree::new(Quadrant::new(0.0, 0.0, 2.0e6), 0.0);
    for b in &bodies {
        tree.insert(b.clone());
    }

    // With theta = 0 the traversal reaches every leaf, so the tree force on
    // a member must equal the direct sum over the other bodies exactly as
    // if the member were absent.
    let expected = direct_forces(&bodies);
    for (b, want) in bodies.iter().zip(&expected) {
        let mut probe = b.clone();
        probe.reset_force();
        tree.update_force(&mut probe);
        let scale = want.norm().max(1.0);
        assert!((probe.f - want).norm() / scale < 1e-9);
    }
}

#[test]
fn lone_body_feels_nothing_from_its_own_tree() {
    let b = body(7, 100.0, -200.0, 1.0e22);
    let mut tree = BHTree::new(Quadrant::new(0.0, 0.0, 2.0e6), 0.5);
    tree.insert(b.clone());

    let mut probe = b.clone();
    probe.reset_force();
    tree.update_force(&mut probe);
    assert_eq!(probe.f, NVec2::zeros());
}

#[test]
fn coincident_insertions_terminate_and_stay_finite() {
    // Two bodies at exactly the same spot bottom out at the subdivision
    // depth limit instead of recursing forever.
    let mut tree = BHTree::new(Quadrant::new(0.0, 0.0, 2.0e6), 0.5);
    tree.insert(body(0, 123.0, 456.0, 1.0e20));
    tree.insert(body(1, 123.0, 456.0, 1.0e20));

    let (mass, _) = tree.aggregate().unwrap();
    assert!((mass - 2.0e20).abs() / 2.0e20 < 1e-12);

    let mut probe = body(2, 500.0, 500.0, 1.0e20);
    tree.update_force(&mut probe);
    assert!(probe.f.x.is_finite() && probe.f.y.is_finite());
    assert!(probe.f.norm() > 0.0);
}

#[test]
fn far_cluster_collapses_to_aggregate() {
    // A tight distant cluster and theta = 1.0: the traversal should use the
    // aggregate, and the result should be close to (but not identical to)
    // the direct sum.
    let cluster: Vec<Body> = (0..8)
        .map(|i| body(i, 1.0e6 + (i as f64) * 10.0, 1.0e6 + (i as f64 % 3.0) * 10.0, 1.0e20))
        .collect();
    let mut tree = BHTree::new(Quadrant::new(0.0, 0.0, 4.0e6), 1.0);
    for b in &cluster {
        tree.insert(b.clone());
    }

    let mut probe = body(100, -1.0e6, -1.0e6, 1.0e20);
    tree.update_force(&mut probe);

    let mut exact = probe.clone();
    exact.reset_force();
    for b in &cluster {
        exact.accumulate_force_from(b);
    }
    let rel = (probe.f - exact.f).norm() / exact.f.norm();
    assert!(rel < 1e-3, "aggregate force too far off: {}", rel);
}

// ==================================================================================
// Ring exchange
// ==================================================================================

/// Run the local pass + ring protocol for `procs` ranks over an in-process
/// cluster and return every rank's bodies afterwards, in rank order.
fn run_ring(all: &[Body], procs: usize, theta: f64, radius: f64) -> Vec<Vec<Body>> {
    let portion = all.len() / procs;
    let endpoints = local_cluster(procs);

    std::thread::scope(|s| {
        let handles: Vec<_> = endpoints
            .into_iter()
            .enumerate()
            .map(|(rank, mut comm)| {
                let mut mine = all[rank * portion..(rank + 1) * portion].to_vec();
                s.spawn(move || {
                    let root = Quadrant::new(0.0, 0.0, 2.0 * radius);
                    let mut tree = BHTree::new(root, theta);
                    for b in &mine {
                        tree.insert(b.clone());
                    }
                    for b in &mut mine {
                        b.reset_force();
                        tree.update_force(b);
                    }
                    let mut bufs = ExchangeBuffers::new(portion);
                    exchange_forces(&mut comm, &mut mine, &tree, &mut bufs).unwrap();
                    mine
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    })
}

#[test]
fn ring_matches_direct_sum() {
    // N = 16, P = 4, theta = 0: the distributed result must equal the
    // all-pairs sum to high precision.
    let radius = 1.0e6;
    let all = scatter(16, radius);
    let expected = direct_forces(&all);

    let per_rank = run_ring(&all, 4, 0.0, radius);
    for (rank, owned) in per_rank.iter().enumerate() {
        for (i, b) in owned.iter().enumerate() {
            let want = expected[rank * 4 + i];
            let scale = want.norm().max(1.0);
            assert!(
                (b.f - want).norm() / scale < 1e-9,
                "rank {} body {} force off: got {:?}, want {:?}",
                rank,
                i,
                b.f,
                want
            );
        }
    }
}

#[test]
fn ring_result_is_ownership_independent() {
    // The same 16 bodies dealt out to 2 vs 4 processes produce the same
    // per-body forces (theta = 0 so partitioning cannot change the math).
    let radius = 1.0e6;
    let all = scatter(16, radius);

    let by_two = run_ring(&all, 2, 0.0, radius);
    let by_four = run_ring(&all, 4, 0.0, radius);

    let flat_two: Vec<&Body> = by_two.iter().flatten().collect();
    let flat_four: Vec<&Body> = by_four.iter().flatten().collect();
    for (a, b) in flat_two.iter().zip(&flat_four) {
        assert_eq!(a.r, b.r);
        let scale = a.f.norm().max(1.0);
        assert!((a.f - b.f).norm() / scale < 1e-9);
    }
}

#[test]
fn all_gather_yields_identical_buffers_everywhere() {
    let procs = 4;
    let portion = 3;
    let endpoints = local_cluster(procs);

    let gathered: Vec<Vec<f64>> = std::thread::scope(|s| {
        let handles: Vec<_> = endpoints
            .into_iter()
            .enumerate()
            .map(|(rank, mut comm)| {
                s.spawn(move || {
                    use bhring::Transport;
                    let send: Vec<f64> =
                        (0..portion).map(|i| (rank * portion + i) as f64).collect();
                    let mut recv = vec![0.0; procs * portion];
                    comm.all_gather(&send, &mut recv).unwrap();
                    comm.barrier().unwrap();
                    recv
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let reference: Vec<f64> = (0..procs * portion).map(|i| i as f64).collect();
    for buf in &gathered {
        assert_eq!(buf, &reference);
    }
}

// ==================================================================================
// Simulator scenarios
// ==================================================================================

#[test]
fn lone_body_drifts_at_constant_velocity() {
    let config = SimConfig {
        steps: Some(50),
        ..test_config(1)
    };
    let dt = config.dt;
    let mut b = body(0, 0.0, 0.0, 1.0e20);
    b.v = NVec2::new(25.0, -10.0);

    let mut sim = Simulator::with_bodies(config, SingleProcess, vec![b], None).unwrap();
    for step in 1..=50u32 {
        sim.step().unwrap();
        let got = sim.bodies()[0].clone();
        assert_eq!(got.f, NVec2::zeros());
        let t = step as f64 * dt;
        assert!((got.r - NVec2::new(25.0 * t, -10.0 * t)).norm() < 1e-9);
    }
}

#[test]
fn orbiting_body_holds_its_radius() {
    let r0 = 1.0e6;
    // Circular speed under the softened force law.
    let v0 = (G * CENTRAL_MASS * r0 / (r0 * r0 + EPS * EPS)).sqrt();

    let central = body(0, 0.0, 0.0, CENTRAL_MASS);
    let mut orbiter = body(1, r0, 0.0, 1.0);
    orbiter.v = NVec2::new(0.0, v0);

    let config = test_config(2);
    let mut sim =
        Simulator::with_bodies(config, SingleProcess, vec![central, orbiter], None).unwrap();

    // Roughly ten orbits at ~300 steps per orbit.
    for _ in 0..3000 {
        sim.step().unwrap();
        let dist = (sim.bodies()[1].r - sim.bodies()[0].r).norm();
        assert!(
            (dist - r0).abs() / r0 < 0.05,
            "orbit radius drifted to {}",
            dist
        );
    }
}

#[test]
fn mirrored_pair_stays_mirrored_across_two_ranks() {
    let radius = 1.0e6;
    let config = SimConfig {
        radius,
        ..test_config(2)
    };

    let endpoints = local_cluster(2);
    let finals: Vec<Body> = std::thread::scope(|s| {
        let handles: Vec<_> = endpoints
            .into_iter()
            .enumerate()
            .map(|(rank, comm)| {
                let config = config.clone();
                s.spawn(move || {
                    let x = if rank == 0 { -2.0e5 } else { 2.0e5 };
                    let b = body(rank as u64, x, 0.0, 1.0e22);
                    let mut sim =
                        Simulator::with_bodies(config, comm, vec![b], None).unwrap();
                    for _ in 0..200 {
                        sim.step().unwrap();
                    }
                    sim.bodies()[0].clone()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let (a, b) = (&finals[0], &finals[1]);
    assert!((a.r + b.r).norm() < 1e-6 * a.r.norm().max(1.0));
    assert!((a.v + b.v).norm() < 1e-6 * a.v.norm().max(1.0));
}

#[test]
fn rendered_step_gathers_the_same_frame_on_every_rank() {
    let config = SimConfig {
        n: 8,
        render: true,
        ..SimConfig::default()
    };

    let endpoints = local_cluster(4);
    let frames: Vec<(Vec<f64>, Vec<f64>)> = std::thread::scope(|s| {
        let handles: Vec<_> = endpoints
            .into_iter()
            .map(|comm| {
                let config = config.clone();
                s.spawn(move || {
                    // No sink anywhere: the gather and barrier still run.
                    let mut sim = Simulator::new(config, comm, None).unwrap();
                    sim.step().unwrap();
                    let (x, y) = sim.gathered();
                    (x.to_vec(), y.to_vec())
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for other in &frames[1..] {
        assert_eq!(frames[0].0, other.0);
        assert_eq!(frames[0].1, other.1);
    }
}

// ==================================================================================
// Configuration and initial conditions
// ==================================================================================

#[test]
fn validation_rejects_bad_configurations() {
    let config = test_config(10);
    assert!(config.validate(3).is_err()); // 10 % 3 != 0
    assert!(config.validate(2).is_ok());

    let bad_dt = SimConfig {
        dt: 0.0,
        ..test_config(4)
    };
    assert!(bad_dt.validate(1).is_err());

    let bad_theta = SimConfig {
        theta: 0.0,
        ..test_config(4)
    };
    assert!(bad_theta.validate(1).is_err());

    let bad_radius = SimConfig {
        radius: -1.0,
        ..test_config(4)
    };
    assert!(bad_radius.validate(1).is_err());
}

#[test]
fn seeded_ranks_fill_the_four_spatial_quadrants() {
    let config = test_config(400);
    let size = 4;

    for rank in 0..size {
        let bodies = seed_bodies(&config, rank, size);
        assert_eq!(bodies.len(), 100);

        for (i, b) in bodies.iter().enumerate() {
            if rank == 0 && i == 0 {
                continue; // the central anchor sits at the origin
            }
            // Even ranks mirror x; ranks in the upper half mirror y.
            if rank % 2 == 0 {
                assert!(b.r.x <= 0.0);
            } else {
                assert!(b.r.x >= 0.0);
            }
            if rank >= size / 2 {
                assert!(b.r.y <= 0.0);
            } else {
                assert!(b.r.y >= 0.0);
            }
            assert!(b.r.x.abs() <= config.radius && b.r.y.abs() <= config.radius);
        }
    }
}

#[test]
fn rank_zero_carries_the_central_anchor() {
    let config = test_config(40);
    let bodies = seed_bodies(&config, 0, 4);
    assert_eq!(bodies[0].m, CENTRAL_MASS);
    assert_eq!(bodies[0].r, NVec2::zeros());
    assert_eq!(bodies[0].v, NVec2::zeros());

    // Other ranks get no anchor, and ids never collide across ranks.
    let mut seen = std::collections::HashSet::new();
    for rank in 0..4 {
        for b in seed_bodies(&config, rank, 4) {
            assert!(seen.insert(b.id), "duplicate id {}", b.id);
        }
    }
}

#[test]
fn seeding_is_deterministic_per_rank() {
    let config = test_config(40);
    let a = seed_bodies(&config, 2, 4);
    let b = seed_bodies(&config, 2, 4);
    for (x, y) in a.iter().zip(&b) {
        assert_eq!(x.r, y.r);
        assert_eq!(x.v, y.v);
    }
    // Different ranks draw different streams.
    let c = seed_bodies(&config, 3, 4);
    assert!(a.iter().zip(&c).any(|(x, y)| x.r != y.r));
}

// ==================================================================================
// Frame sink
// ==================================================================================

#[test]
fn frame_sink_writes_numbered_frames() {
    use bhring::{FrameSink, Renderer};

    let dir = std::env::temp_dir().join(format!("bhring-frames-{}", std::process::id()));
    let mut sink = FrameSink::new(dir.clone(), 64, 64, 1.0e6).unwrap();

    sink.clear([0, 0, 0]);
    sink.draw_point(0.0, 0.0, [255, 0, 0]);
    sink.draw_point(9.0e6, 0.0, [255, 255, 0]); // off-screen, must not panic
    sink.present().unwrap();

    assert_eq!(sink.frames_written(), 1);
    assert!(dir.join("frame_00000.png").exists());
    std::fs::remove_dir_all(&dir).unwrap();
}
