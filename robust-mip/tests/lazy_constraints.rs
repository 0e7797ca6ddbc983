//! Integration tests for branch-and-bound with lazy constraints.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use robust_mip::{
    solve_mip, CandidateContext, ConstraintSense, MicroLpBackend, MipProblem, MipResult,
    MipSettings, MipSolver, MipStatus, NoLazyConstraints, NodeSelection, ObjectiveSense,
    ProblemBuilder, VarId,
};

/// Random 0-1 knapsack: max v.x  s.t.  w.x <= cap.
fn random_knapsack(rng: &mut ChaCha8Rng, n: usize) -> (MipProblem, Vec<VarId>, Vec<f64>, Vec<f64>, f64) {
    let values: Vec<f64> = (0..n).map(|_| rng.gen_range(1..20) as f64).collect();
    let weights: Vec<f64> = (0..n).map(|_| rng.gen_range(1..10) as f64).collect();
    let cap = (weights.iter().sum::<f64>() / 2.0).floor();

    let mut b = ProblemBuilder::new(ObjectiveSense::Maximize);
    let vars: Vec<VarId> = values.iter().map(|&v| b.add_binary(v)).collect();
    b.add_constraint(
        vars.iter().zip(&weights).map(|(&v, &w)| (v, w)),
        ConstraintSense::Le,
        cap,
    );
    (b.build().unwrap(), vars, values, weights, cap)
}

/// Best knapsack value by enumeration, picking at most `max_items`.
fn brute_force(values: &[f64], weights: &[f64], cap: f64, max_items: usize) -> f64 {
    let n = values.len();
    let mut best = 0.0_f64;
    for mask in 0u32..(1 << n) {
        if mask.count_ones() as usize > max_items {
            continue;
        }
        let (mut v, mut w) = (0.0, 0.0);
        for i in 0..n {
            if mask & (1 << i) != 0 {
                v += values[i];
                w += weights[i];
            }
        }
        if w <= cap {
            best = best.max(v);
        }
    }
    best
}

fn exact() -> MipSettings {
    MipSettings {
        gap_tol: 0.0,
        gap_abs_tol: 1e-9,
        ..Default::default()
    }
}

#[test]
fn test_knapsack_matches_enumeration() {
    let mut rng = ChaCha8Rng::seed_from_u64(7);

    for _ in 0..5 {
        let (prob, _, values, weights, cap) = random_knapsack(&mut rng, 8);
        let result = solve_mip(&prob, &exact(), &mut NoLazyConstraints);
        assert!(result.is_ok(), "Solve failed: {:?}", result.err());

        let sol = result.unwrap();
        let expected = brute_force(&values, &weights, cap, usize::MAX);
        assert!(sol.status.is_optimal());
        assert!(
            (sol.obj_val - expected).abs() < 1e-6,
            "obj {} vs enumeration {}",
            sol.obj_val,
            expected
        );
    }
}

#[test]
fn test_hidden_cardinality_enforced_lazily() {
    let mut rng = ChaCha8Rng::seed_from_u64(11);
    let max_items = 2;

    for _ in 0..5 {
        let (prob, vars, values, weights, cap) = random_knapsack(&mut rng, 8);

        // The cardinality row is never given to the master up front
        let mut handler = |ctx: &mut CandidateContext<'_>| -> MipResult<()> {
            let picked: f64 = ctx.values_of(&vars).iter().sum();
            if picked > max_items as f64 + 0.5 {
                ctx.add_lazy(vars.iter().map(|&v| (v, 1.0)), max_items as f64)?;
            }
            Ok(())
        };

        let mut solver = MipSolver::new(MicroLpBackend::new(), exact());
        let sol = solver.solve(&prob, &mut handler).unwrap();

        let expected = brute_force(&values, &weights, cap, max_items);
        assert!(sol.status.is_optimal());
        assert!(
            (sol.obj_val - expected).abs() < 1e-6,
            "obj {} vs enumeration {}",
            sol.obj_val,
            expected
        );
        assert!(sol.x.iter().sum::<f64>() <= max_items as f64 + 1e-6);
        assert!(solver.cut_pool().all_satisfied(&sol.x, 1e-6));
    }
}

#[test]
fn test_node_selection_strategies_agree() {
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    let (prob, _, values, weights, cap) = random_knapsack(&mut rng, 7);
    let expected = brute_force(&values, &weights, cap, usize::MAX);

    for selection in [
        NodeSelection::BestBound,
        NodeSelection::DepthFirst,
        NodeSelection::Hybrid { dive_freq: 3 },
    ] {
        let settings = exact().with_node_selection(selection);
        let sol = solve_mip(&prob, &settings, &mut NoLazyConstraints).unwrap();
        assert!(
            (sol.obj_val - expected).abs() < 1e-6,
            "{:?}: obj {} vs {}",
            selection,
            sol.obj_val,
            expected
        );
    }
}

#[test]
fn test_mixed_integer_with_continuous() {
    // min x0 + x1 + x2  s.t. x0 + x1 + x2 >= 2.5, x0,x1 binary, x2 in [0, 1]
    let mut b = ProblemBuilder::new(ObjectiveSense::Minimize);
    let x0 = b.add_binary(1.0);
    let x1 = b.add_binary(1.0);
    let x2 = b.add_continuous(0.0, 1.0, 1.0);
    b.add_constraint([(x0, 1.0), (x1, 1.0), (x2, 1.0)], ConstraintSense::Ge, 2.5);
    let prob = b.build().unwrap();

    let sol = solve_mip(&prob, &exact(), &mut NoLazyConstraints).unwrap();
    assert!(sol.status.is_optimal());
    assert!((sol.obj_val - 2.5).abs() < 1e-6);
    assert!(prob.is_integer_feasible(&sol.x, 1e-6));
    assert!(prob.satisfies_bounds(&sol.x, 1e-6));
    assert!(prob.constraint_violation(&sol.x) < 1e-6);

    println!("MILP solve: status={:?}, obj={:.4}, x={:?}", sol.status, sol.obj_val, sol.x);
}

#[test]
fn test_infeasible_after_lazy_cuts() {
    // x0 + x1 >= 1 in the model; the callback forbids every selection
    let mut b = ProblemBuilder::new(ObjectiveSense::Minimize);
    let x0 = b.add_binary(1.0);
    let x1 = b.add_binary(2.0);
    b.add_constraint([(x0, 1.0), (x1, 1.0)], ConstraintSense::Ge, 1.0);
    let prob = b.build().unwrap();

    let mut handler = |ctx: &mut CandidateContext<'_>| -> MipResult<()> {
        for v in [x0, x1] {
            if ctx.value(v) > 0.5 {
                ctx.add_lazy([(v, 1.0)], 0.0)?;
            }
        }
        Ok(())
    };

    let sol = solve_mip(&prob, &exact(), &mut handler).unwrap();
    assert_eq!(sol.status, MipStatus::Infeasible);
    assert!(sol.cuts_added >= 2);
}

#[test]
fn test_time_limit_reports_limit() {
    let mut rng = ChaCha8Rng::seed_from_u64(5);
    let (prob, _, _, _, _) = random_knapsack(&mut rng, 8);

    let settings = exact().with_time_limit(0.0);
    let sol = solve_mip(&prob, &settings, &mut NoLazyConstraints).unwrap();
    assert_eq!(sol.status, MipStatus::TimeLimit);
    assert!(sol.status.is_limit());
}
