//! Branch and bound behavior on models built directly through the solver API

use schemapress::solver::{BranchAndBound, Model, Sense, SolveRequest, Solver, SolverError, VarHint};
use std::time::{Duration, Instant};

/// Pick `a_i` (free) or `b_i` (cost 1) per row, where conflicting rows may not
/// both pick `a`. Minimizing cost is a maximum independent set problem, which
/// the search cannot close on a few hundred rows.
fn conflict_model(rows: usize, edges_per_row: usize) -> (Model, Vec<usize>) {
    let mut model = Model::new();
    let mut free = Vec::with_capacity(rows);
    for i in 0..rows {
        let a = model.add_var(format!("a{}", i), 0);
        let b = model.add_var(format!("b{}", i), 1);
        model.add_row(format!("pick{}", i), vec![(a, 1), (b, 1)], Sense::Eq, 1);
        free.push(a.0);
    }

    let mut state: u64 = 0x2545_f491_4f6c_dd1d;
    let mut next = move || {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        (state >> 33) as usize
    };
    for i in 0..rows {
        for _ in 0..edges_per_row {
            let j = next() % rows;
            if i != j {
                let (a, b) = (free[i], free[j]);
                model.add_row(
                    format!("conflict{},{}", i, j),
                    vec![(schemapress::solver::VarId(a), 1), (schemapress::solver::VarId(b), 1)],
                    Sense::Le,
                    1,
                );
            }
        }
    }
    (model, free)
}

#[test]
fn test_time_limit_returns_best_known() {
    let (model, _) = conflict_model(180, 6);
    let started = Instant::now();
    let solution = BranchAndBound::new()
        .solve(SolveRequest::new(&model, Duration::from_secs(1)))
        .unwrap();

    assert!(!solution.is_optimal);
    assert!(model.is_feasible(&solution.values));
    assert_eq!(model.objective(&solution.values), solution.objective);
    assert!(solution.gap() > 0.0);
    assert!(solution.best_bound < solution.objective as f64);
    // limit plus one check interval of slack
    assert!(started.elapsed() < Duration::from_secs(5));
}

/// Rows of `{p, a, b}` where `p` can never be chosen, tied together by a row
/// with odd right-hand side and even coefficients. No assignment is feasible,
/// but bound propagation only notices one level above the leaves, so every
/// descend is preceded by one failed child.
fn parity_model(rows: usize) -> Model {
    let mut model = Model::new();
    let mut total = Vec::new();
    for i in 0..rows {
        let p = model.add_var(format!("p{}", i), 0);
        let a = model.add_var(format!("a{}", i), 0);
        let b = model.add_var(format!("b{}", i), 0);
        model.add_row(format!("pick{}", i), vec![(p, 1), (a, 1), (b, 1)], Sense::Eq, 1);
        model.add_row(format!("never{}", i), vec![(p, 1), (p, 1)], Sense::Le, 1);
        total.push((a, 2));
        total.push((b, 2));
    }
    model.add_row("parity", total, Sense::Eq, 2 * rows as i64 + 1);
    model
}

#[test]
fn test_time_limit_holds_when_children_fail() {
    let model = parity_model(40);
    let started = Instant::now();
    let result = BranchAndBound::new().solve(SolveRequest::new(&model, Duration::from_millis(200)));

    assert!(matches!(result, Err(SolverError::NoSolution { .. })), "{:?}", result);
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[test]
fn test_small_parity_model_is_infeasible() {
    let model = parity_model(4);
    let result = BranchAndBound::new().solve(SolveRequest::new(&model, Duration::from_secs(10)));
    assert!(matches!(result, Err(SolverError::InfeasibleModel(_))));
}

#[test]
fn test_warm_start_survives_timeout() {
    let (model, free) = conflict_model(180, 6);
    // everything on the costly side is always feasible
    let mut start = vec![false; model.num_vars()];
    for a in &free {
        start[a + 1] = true;
    }
    let worst = model.objective(&start);
    let hints: Vec<VarHint> = free
        .iter()
        .map(|&a| VarHint {
            var: schemapress::solver::VarId(a + 1),
            value: true,
        })
        .collect();

    let solution = BranchAndBound::new()
        .solve(
            SolveRequest::new(&model, Duration::from_secs(1))
                .with_warm_start(&start)
                .with_hints(&hints),
        )
        .unwrap();
    assert!(solution.objective <= worst);
    assert!(model.is_feasible(&solution.values));
}

#[test]
fn test_small_model_is_solved_exactly() {
    let (model, _) = conflict_model(12, 2);
    let solution = BranchAndBound::new()
        .solve(SolveRequest::new(&model, Duration::from_secs(10)))
        .unwrap();
    assert!(solution.is_optimal);
    assert_eq!(solution.gap(), 0.0);

    // brute force over the free variables
    let rows = 12;
    let mut best = i64::MAX;
    for mask in 0u32..(1 << rows) {
        let mut values = vec![false; model.num_vars()];
        for i in 0..rows {
            let pick_free = mask & (1 << i) != 0;
            values[2 * i] = pick_free;
            values[2 * i + 1] = !pick_free;
        }
        if model.is_feasible(&values) {
            best = best.min(model.objective(&values));
        }
    }
    assert_eq!(solution.objective, best);
}

#[test]
fn test_objective_limit_below_optimum() {
    let (model, _) = conflict_model(12, 2);
    let optimum = BranchAndBound::new()
        .solve(SolveRequest::new(&model, Duration::from_secs(10)))
        .unwrap()
        .objective;
    if optimum == 0 {
        return;
    }
    let err = BranchAndBound::new()
        .solve(SolveRequest::new(&model, Duration::from_secs(10)).with_objective_limit(optimum - 1))
        .unwrap_err();
    assert!(matches!(err, SolverError::InfeasibleModel(_)));
}
