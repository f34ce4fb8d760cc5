//! Depth-first branch and bound for 0/1 programs
//!
//! The backend exploits the shape of assignment models without depending on
//! them:
//!
//! - *choice rows* (`Σ x = 1` over unit coefficients, pairwise disjoint) are
//!   branched on as a whole, one option per child;
//! - *implications* (`a·x − a·y ≤ 0`) let the positive cost of `y` be shared
//!   among the choice rows whose options imply it, giving a lower bound
//!   `fixed cost + Σ row floors` that stays valid however `y` is activated;
//! - every other row is enforced by bound propagation over the partial
//!   assignment.
//!
//! Row floors are maintained incrementally and restored from the trail on
//! backtrack. The search is an explicit stack of frames, so depth is bounded
//! by memory rather than the call stack.

use crate::common::constants::{BOUND_EPSILON, TIME_CHECK_INTERVAL};
use crate::solver::{Model, Sense, SolveRequest, Solution, Solver, SolverError, SolverResult, VarId};
use std::collections::BTreeSet;
use std::time::{Duration, Instant};
use tracing::debug;

/// Built-in exact backend
#[derive(Debug, Clone, Copy, Default)]
pub struct BranchAndBound;

impl BranchAndBound {
    pub fn new() -> Self {
        Self
    }
}

impl Solver for BranchAndBound {
    fn name(&self) -> &'static str {
        "branch_and_bound"
    }

    fn solve(&self, request: SolveRequest<'_>) -> SolverResult<Solution> {
        let started = Instant::now();
        request.model.check()?;
        if let Some(values) = request.warm_start {
            if values.len() != request.model.num_vars() {
                return Err(SolverError::InvalidModel(format!(
                    "warm start has {} values for {} variables",
                    values.len(),
                    request.model.num_vars()
                )));
            }
        }

        let structure = Structure::detect(request.model);
        debug!(
            vars = request.model.num_vars(),
            rows = request.model.num_rows(),
            choice_rows = structure.choice_rows.len(),
            "starting branch and bound"
        );
        Search::new(&request, &structure, started).run()
    }
}

/// Model structure recognized once per solve
struct Structure {
    /// Model indices of disjoint unit-coefficient `= 1` rows
    choice_rows: Vec<usize>,
    /// Choice row (index into `choice_rows`) containing each variable
    choice_of: Vec<Option<usize>>,
    /// Variables forced to 1 when the key variable is 1
    implies: Vec<Vec<VarId>>,
    /// Portion of a variable's cost charged to each dependent choice row
    share: Vec<f64>,
    /// Choice rows whose floor reads the variable's share
    dependents: Vec<Vec<usize>>,
    /// Rows each variable appears in
    var_rows: Vec<Vec<usize>>,
    /// Sum of negative costs outside choice rows
    neg_slack: f64,
}

impl Structure {
    fn detect(model: &Model) -> Self {
        let n = model.num_vars();
        let mut var_rows: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut choice_rows = Vec::new();
        let mut choice_of: Vec<Option<usize>> = vec![None; n];
        let mut implies: Vec<Vec<VarId>> = vec![Vec::new(); n];
        let mut implied_by: Vec<Vec<VarId>> = vec![Vec::new(); n];

        for (r, row) in model.rows().iter().enumerate() {
            for (var, _) in &row.terms {
                if var_rows[var.0].last() != Some(&r) {
                    var_rows[var.0].push(r);
                }
            }

            let distinct: BTreeSet<VarId> = row.terms.iter().map(|(var, _)| *var).collect();
            let is_choice = row.sense == Sense::Eq
                && row.rhs == 1
                && !row.terms.is_empty()
                && distinct.len() == row.terms.len()
                && row
                    .terms
                    .iter()
                    .all(|(var, coef)| *coef == 1 && choice_of[var.0].is_none());
            if is_choice {
                for (var, _) in &row.terms {
                    choice_of[var.0] = Some(choice_rows.len());
                }
                choice_rows.push(r);
                continue;
            }

            if let (Sense::Le, 0, [(a, ca), (b, cb)]) = (row.sense, row.rhs, row.terms.as_slice()) {
                if *ca > 0 && *cb == -*ca {
                    implies[a.0].push(*b);
                    implied_by[b.0].push(*a);
                } else if *cb > 0 && *ca == -*cb {
                    implies[b.0].push(*a);
                    implied_by[a.0].push(*b);
                }
            }
        }
        for list in implies.iter_mut() {
            list.sort();
            list.dedup();
        }

        let mut share = vec![0.0; n];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut neg_slack = 0.0;
        for (v, var) in model.vars().iter().enumerate() {
            if choice_of[v].is_some() {
                continue;
            }
            if var.cost < 0 {
                neg_slack += var.cost as f64;
                continue;
            }
            let rows: BTreeSet<usize> = implied_by[v]
                .iter()
                .filter_map(|x| choice_of[x.0])
                .collect();
            if var.cost > 0 && !rows.is_empty() {
                share[v] = var.cost as f64 / rows.len() as f64;
                dependents[v] = rows.into_iter().collect();
            }
        }

        Self {
            choice_rows,
            choice_of,
            implies,
            share,
            dependents,
            var_rows,
            neg_slack,
        }
    }
}

/// Undo log entry
enum Change {
    Fixed(VarId),
    Floor(usize, f64),
}

/// A branching decision point
#[derive(Debug, Clone, Copy)]
enum Unit {
    Choice(usize),
    Var(VarId),
}

struct Frame {
    /// Position in the static unit order
    unit: usize,
    options: Vec<(VarId, bool)>,
    pos: usize,
    /// Trail length before this frame's current option was applied
    mark: usize,
}

struct Search<'a> {
    model: &'a Model,
    structure: &'a Structure,
    hints: Vec<Option<bool>>,
    warm_start: Option<&'a [bool]>,
    limit: Option<i64>,
    assign: Vec<Option<bool>>,
    trail: Vec<Change>,
    fixed_cost: i64,
    floors: Vec<f64>,
    floor_sum: f64,
    units: Vec<Unit>,
    incumbent: Option<(Vec<bool>, i64)>,
    started: Instant,
    time_limit: Duration,
    nodes: u64,
    /// Steps since the clock was last read
    ticks: u64,
    timed_out: bool,
}

impl<'a> Search<'a> {
    fn new(request: &SolveRequest<'a>, structure: &'a Structure, started: Instant) -> Self {
        let n = request.model.num_vars();
        let mut hints = vec![None; n];
        for hint in request.hints {
            if let Some(slot) = hints.get_mut(hint.var.0) {
                *slot = Some(hint.value);
            }
        }

        let mut search = Self {
            model: request.model,
            structure,
            hints,
            warm_start: request.warm_start,
            limit: request.objective_limit,
            assign: vec![None; n],
            trail: Vec::new(),
            fixed_cost: 0,
            floors: vec![0.0; structure.choice_rows.len()],
            floor_sum: 0.0,
            units: Vec::new(),
            incumbent: None,
            started,
            time_limit: request.time_limit,
            nodes: 0,
            ticks: 0,
            timed_out: false,
        };
        search.units = search.unit_order();
        search
    }

    /// Choice rows by descending regret, then the remaining variables
    fn unit_order(&self) -> Vec<Unit> {
        let mut rows: Vec<(usize, f64)> = (0..self.structure.choice_rows.len())
            .map(|c| {
                let mut scores: Vec<f64> = self
                    .choice_terms(c)
                    .map(|var| self.score(var))
                    .collect();
                scores.sort_by(|a, b| a.total_cmp(b));
                let regret = match scores.as_slice() {
                    [first, second, ..] => second - first,
                    _ => 0.0,
                };
                (c, regret)
            })
            .collect();
        rows.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

        let mut units: Vec<Unit> = rows.into_iter().map(|(c, _)| Unit::Choice(c)).collect();
        units.extend(
            (0..self.model.num_vars())
                .filter(|v| self.structure.choice_of[*v].is_none())
                .map(|v| Unit::Var(VarId(v))),
        );
        units
    }

    fn run(mut self) -> SolverResult<Solution> {
        if let Some(values) = self.warm_start {
            let objective = self.model.objective(values);
            let within_limit = self.limit.map_or(true, |limit| objective <= limit);
            if self.model.is_feasible(values) && within_limit {
                debug!(objective, "accepted warm start");
                self.incumbent = Some((values.to_vec(), objective));
            } else {
                debug!(objective, "warm start rejected");
            }
        }

        for c in 0..self.floors.len() {
            self.floors[c] = self.compute_floor(c);
        }
        self.floor_sum = self.floors.iter().sum();

        let mut queue: Vec<usize> = (0..self.model.num_rows()).collect();
        let root_ok = self.propagate(&mut queue);
        let root_bound = self.bound();
        if root_ok {
            self.search();
        }
        self.finish(root_ok, root_bound)
    }

    fn search(&mut self) {
        let mut stack: Vec<Frame> = Vec::new();
        let mut descend = true;

        loop {
            if descend {
                self.nodes += 1;
                if self.out_of_time() {
                    return;
                }
                if self.bound() <= self.cutoff() + BOUND_EPSILON {
                    let start = stack.last().map_or(0, |frame| frame.unit + 1);
                    match self.next_unit(start) {
                        Some(unit) => {
                            let options = self.options(self.units[unit]);
                            stack.push(Frame {
                                unit,
                                options,
                                pos: 0,
                                mark: self.trail.len(),
                            });
                        }
                        None => self.record_leaf(),
                    }
                }
            }

            descend = false;
            while !stack.is_empty() {
                if self.out_of_time() {
                    return;
                }
                let Some(frame) = stack.last_mut() else {
                    break;
                };
                self.undo_to(frame.mark);
                let Some(&(var, value)) = frame.options.get(frame.pos) else {
                    stack.pop();
                    continue;
                };
                frame.pos += 1;
                if self.assign[var.0].is_some() {
                    continue;
                }
                let mut queue = Vec::new();
                self.fix(var, value, &mut queue);
                if self.propagate(&mut queue) {
                    descend = true;
                    break;
                }
                self.nodes += 1;
            }
            if !descend {
                return;
            }
        }
    }

    /// Reads the clock once every `TIME_CHECK_INTERVAL` steps. Every descend
    /// and every child tried while backtracking counts as a step.
    fn out_of_time(&mut self) -> bool {
        self.ticks += 1;
        if self.ticks >= TIME_CHECK_INTERVAL {
            self.ticks = 0;
            if self.started.elapsed() >= self.time_limit {
                self.timed_out = true;
            }
        }
        self.timed_out
    }

    fn finish(self, root_ok: bool, root_bound: f64) -> SolverResult<Solution> {
        let elapsed = self.started.elapsed();
        match self.incumbent {
            Some((values, objective)) => {
                let is_optimal = !self.timed_out;
                let best_bound = if is_optimal {
                    objective as f64
                } else {
                    root_bound.min(objective as f64)
                };
                debug!(
                    objective,
                    is_optimal,
                    nodes = self.nodes,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "branch and bound finished"
                );
                Ok(Solution {
                    values,
                    objective,
                    is_optimal,
                    best_bound,
                    nodes: self.nodes,
                    elapsed,
                })
            }
            None if self.timed_out => Err(SolverError::NoSolution {
                elapsed,
                nodes: self.nodes,
            }),
            None if !root_ok => Err(SolverError::InfeasibleModel(
                "constraints conflict before branching".to_string(),
            )),
            None => Err(SolverError::InfeasibleModel(match self.limit {
                Some(limit) => format!("no assignment with objective at most {}", limit),
                None => format!("search exhausted after {} nodes", self.nodes),
            })),
        }
    }

    fn choice_terms(&self, c: usize) -> impl Iterator<Item = VarId> + 'a {
        let model = self.model;
        model.rows()[self.structure.choice_rows[c]]
            .terms
            .iter()
            .map(|(var, _)| *var)
    }

    /// Cost of choosing `var` including its share of unfixed implied costs
    fn score(&self, var: VarId) -> f64 {
        let implied: f64 = self.structure.implies[var.0]
            .iter()
            .filter(|y| self.assign[y.0].is_none())
            .map(|y| self.structure.share[y.0])
            .sum();
        self.model.vars()[var.0].cost as f64 + implied
    }

    fn compute_floor(&self, c: usize) -> f64 {
        let mut floor: Option<f64> = None;
        for var in self.choice_terms(c) {
            match self.assign[var.0] {
                Some(true) => return 0.0,
                Some(false) => {}
                None => {
                    let score = self.score(var);
                    floor = Some(floor.map_or(score, |f| f.min(score)));
                }
            }
        }
        floor.unwrap_or(0.0)
    }

    fn refresh_floor(&mut self, c: usize) {
        let floor = self.compute_floor(c);
        let old = self.floors[c];
        if floor != old {
            self.trail.push(Change::Floor(c, old));
            self.floor_sum += floor - old;
            self.floors[c] = floor;
        }
    }

    fn bound(&self) -> f64 {
        self.fixed_cost as f64 + self.floor_sum + self.structure.neg_slack
    }

    /// Largest objective still worth exploring
    fn cutoff(&self) -> f64 {
        let mut cutoff = f64::INFINITY;
        if let Some((_, objective)) = &self.incumbent {
            cutoff = (objective - 1) as f64;
        }
        if let Some(limit) = self.limit {
            cutoff = cutoff.min(limit as f64);
        }
        cutoff
    }

    fn fix(&mut self, var: VarId, value: bool, queue: &mut Vec<usize>) {
        let structure = self.structure;
        self.assign[var.0] = Some(value);
        self.trail.push(Change::Fixed(var));
        if value {
            self.fixed_cost += self.model.vars()[var.0].cost;
        }
        queue.extend_from_slice(&structure.var_rows[var.0]);
        if let Some(c) = structure.choice_of[var.0] {
            self.refresh_floor(c);
        }
        for &c in &structure.dependents[var.0] {
            self.refresh_floor(c);
        }
    }

    fn undo_to(&mut self, mark: usize) {
        while self.trail.len() > mark {
            match self.trail.pop() {
                Some(Change::Fixed(var)) => {
                    if self.assign[var.0] == Some(true) {
                        self.fixed_cost -= self.model.vars()[var.0].cost;
                    }
                    self.assign[var.0] = None;
                }
                Some(Change::Floor(c, old)) => {
                    self.floor_sum += old - self.floors[c];
                    self.floors[c] = old;
                }
                None => break,
            }
        }
    }

    /// Fixes every value forced by the queued rows. Returns false on conflict.
    fn propagate(&mut self, queue: &mut Vec<usize>) -> bool {
        let model = self.model;
        while let Some(r) = queue.pop() {
            let row = &model.rows()[r];
            let (mut min, mut max) = (0i64, 0i64);
            for &(var, coef) in &row.terms {
                match self.assign[var.0] {
                    Some(true) => {
                        min += coef;
                        max += coef;
                    }
                    Some(false) => {}
                    None if coef < 0 => min += coef,
                    None => max += coef,
                }
            }

            let upper = matches!(row.sense, Sense::Le | Sense::Eq);
            let lower = matches!(row.sense, Sense::Ge | Sense::Eq);
            if (upper && min > row.rhs) || (lower && max < row.rhs) {
                return false;
            }

            for &(var, coef) in &row.terms {
                if coef == 0 || self.assign[var.0].is_some() {
                    continue;
                }
                let forced = if upper && min + coef.abs() > row.rhs {
                    Some(coef < 0)
                } else if lower && max - coef.abs() < row.rhs {
                    Some(coef > 0)
                } else {
                    None
                };
                if let Some(value) = forced {
                    self.fix(var, value, queue);
                }
            }
        }
        true
    }

    fn next_unit(&self, start: usize) -> Option<usize> {
        (start..self.units.len()).find(|&i| match self.units[i] {
            Unit::Choice(c) => !self
                .choice_terms(c)
                .any(|var| self.assign[var.0] == Some(true)),
            Unit::Var(var) => self.assign[var.0].is_none(),
        })
    }

    /// Children of a unit, most promising first
    fn options(&self, unit: Unit) -> Vec<(VarId, bool)> {
        match unit {
            Unit::Choice(c) => {
                let mut open: Vec<(VarId, f64)> = self
                    .choice_terms(c)
                    .filter(|var| self.assign[var.0].is_none())
                    .map(|var| (var, self.score(var)))
                    .collect();
                open.sort_by(|a, b| {
                    let hinted_a = self.hints[a.0 .0] == Some(true);
                    let hinted_b = self.hints[b.0 .0] == Some(true);
                    hinted_b
                        .cmp(&hinted_a)
                        .then(a.1.total_cmp(&b.1))
                        .then(a.0.cmp(&b.0))
                });
                open.into_iter().map(|(var, _)| (var, true)).collect()
            }
            Unit::Var(var) => {
                let cost = self.model.vars()[var.0].cost;
                let preferred = self.hints[var.0].unwrap_or(cost < 0);
                vec![(var, preferred), (var, !preferred)]
            }
        }
    }

    fn record_leaf(&mut self) {
        let values: Vec<bool> = self.assign.iter().map(|v| v.unwrap_or(false)).collect();
        if !self.model.is_feasible(&values) {
            return;
        }
        let objective = self.model.objective(&values);
        if (objective as f64) <= self.cutoff() + BOUND_EPSILON {
            debug!(objective, nodes = self.nodes, "improved incumbent");
            self.incumbent = Some((values, objective));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::VarHint;

    fn solve(model: &Model) -> SolverResult<Solution> {
        BranchAndBound::new().solve(SolveRequest::new(model, Duration::from_secs(10)))
    }

    /// Two groups that can share one entry, each with a verbatim fallback
    fn shared_entry_model() -> (Model, [VarId; 5]) {
        let mut model = Model::new();
        let a_verbatim = model.add_var("a_verbatim", 10);
        let a_ref = model.add_var("a_ref", 2);
        let b_verbatim = model.add_var("b_verbatim", 10);
        let b_ref = model.add_var("b_ref", 2);
        let entry = model.add_var("entry", 9);
        model.add_row("choose_a", vec![(a_verbatim, 1), (a_ref, 1)], Sense::Eq, 1);
        model.add_row("choose_b", vec![(b_verbatim, 1), (b_ref, 1)], Sense::Eq, 1);
        model.add_row("a_needs_entry", vec![(a_ref, 1), (entry, -1)], Sense::Le, 0);
        model.add_row("b_needs_entry", vec![(b_ref, 1), (entry, -1)], Sense::Le, 0);
        (model, [a_verbatim, a_ref, b_verbatim, b_ref, entry])
    }

    #[test]
    fn test_shared_entry_pays_off() {
        let (model, [_, a_ref, _, b_ref, entry]) = shared_entry_model();
        let solution = solve(&model).unwrap();
        assert!(solution.is_optimal);
        assert_eq!(solution.objective, 13);
        assert!(solution.is_set(a_ref) && solution.is_set(b_ref) && solution.is_set(entry));
        assert_eq!(solution.gap(), 0.0);
    }

    #[test]
    fn test_structure_detection() {
        let (model, [a_verbatim, a_ref, _, _, entry]) = shared_entry_model();
        let structure = Structure::detect(&model);
        assert_eq!(structure.choice_rows, vec![0, 1]);
        assert_eq!(structure.choice_of[a_verbatim.0], Some(0));
        assert_eq!(structure.implies[a_ref.0], vec![entry]);
        assert_eq!(structure.dependents[entry.0], vec![0, 1]);
        assert!((structure.share[entry.0] - 4.5).abs() < 1e-9);
    }

    #[test]
    fn test_collision_row_respected() {
        let (mut model, [_, a_ref, _, b_ref, _]) = shared_entry_model();
        model.add_row("collision", vec![(a_ref, 1), (b_ref, 1)], Sense::Le, 1);
        let solution = solve(&model).unwrap();
        assert!(model.is_feasible(&solution.values));
        assert_eq!(solution.objective, 10 + 2 + 9);
    }

    #[test]
    fn test_warm_start_and_hints() {
        let (model, [a_verbatim, _, b_verbatim, _, _]) = shared_entry_model();
        let start = vec![true, false, true, false, false];
        let hints = [
            VarHint { var: a_verbatim, value: true },
            VarHint { var: b_verbatim, value: true },
        ];
        let request = SolveRequest::new(&model, Duration::from_secs(10))
            .with_warm_start(&start)
            .with_hints(&hints);
        let solution = BranchAndBound::new().solve(request).unwrap();
        assert!(solution.is_optimal);
        assert_eq!(solution.objective, 13);
    }

    #[test]
    fn test_infeasible_model() {
        let mut model = Model::new();
        let a = model.add_var("a", 1);
        let b = model.add_var("b", 1);
        model.add_row("one", vec![(a, 1), (b, 1)], Sense::Eq, 1);
        model.add_row("a_off", vec![(a, 1)], Sense::Le, 0);
        model.add_row("b_off", vec![(b, 1)], Sense::Le, 0);
        assert!(matches!(solve(&model), Err(SolverError::InfeasibleModel(_))));
    }

    #[test]
    fn test_objective_limit() {
        let (model, _) = shared_entry_model();
        let request = SolveRequest::new(&model, Duration::from_secs(10)).with_objective_limit(12);
        let err = BranchAndBound::new().solve(request).unwrap_err();
        assert!(err.to_string().contains("at most 12"));
    }

    #[test]
    fn test_general_rows() {
        // knapsack-like: pick at least two of three, minimize cost
        let mut model = Model::new();
        let vars: Vec<VarId> = [4, 3, 5]
            .iter()
            .enumerate()
            .map(|(i, cost)| model.add_var(format!("x{}", i), *cost))
            .collect();
        model.add_row("cover", vars.iter().map(|v| (*v, 1)).collect(), Sense::Ge, 2);
        let solution = solve(&model).unwrap();
        assert_eq!(solution.objective, 7);
        assert_eq!(solution.values, vec![true, true, false]);
    }

    #[test]
    fn test_rejects_short_warm_start() {
        let (model, _) = shared_entry_model();
        let start = [true];
        let request = SolveRequest::new(&model, Duration::from_secs(1)).with_warm_start(&start);
        assert!(matches!(
            BranchAndBound::new().solve(request),
            Err(SolverError::InvalidModel(_))
        ));
    }
}
