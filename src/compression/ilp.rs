//! Integer program formulation
//!
//! One binary per (group, candidate) says "this group uses this candidate",
//! one binary per referenced dictionary entry says "this entry is defined".
//!
//! ```text
//! minimize   Σ weight·length·x  +  Σ definition_cost·y
//! subject to Σ_c x[g,c] = 1                 for every group g
//!            x[g,c] − y[e] ≤ 0              for every candidate c referencing entry e
//!            x[a] + x[b] ≤ 1                for every collision pair (a, b)
//! ```
//!
//! The model is solved through the [`Solver`] boundary, seeded with the greedy
//! assignment as warm start and as branching hints unless ablated.

use crate::annotation::ElementGroup;
use crate::common::error::{SchemaPressError, SchemaPressResult};
use crate::compression::greedy::GreedyCompressor;
use crate::compression::traits::{Compressor, Outcome};
use crate::compression::types::{Assignment, CandidateSet, Method, SolveStats};
use crate::compression::CompressionInstance;
use crate::config::CompressorConfig;
use crate::solver::{Model, Sense, SolveRequest, Solution, Solver, VarHint, VarId};
use std::sync::Arc;
use tracing::{debug, error, info};

/// The built model plus the mapping back to groups and entries
#[derive(Debug, Clone)]
pub struct IlpModel {
    pub model: Model,
    /// Variable of each (group, candidate)
    pub choice_vars: Vec<Vec<VarId>>,
    /// Activation variable of each entry, if any candidate references it
    pub entry_vars: Vec<Option<VarId>>,
}

/// Translates groups and candidates into a [`Model`]
pub struct IlpBuilder;

impl IlpBuilder {
    pub fn build(groups: &[ElementGroup], candidates: &CandidateSet) -> IlpModel {
        let mut model = Model::new();

        let mut entry_vars: Vec<Option<VarId>> = vec![None; candidates.entries.len()];
        for options in &candidates.per_group {
            for entry in options.iter().filter_map(|c| c.entry) {
                if entry_vars[entry].is_none() {
                    let e = &candidates.entries[entry];
                    entry_vars[entry] =
                        Some(model.add_var(format!("y[{}]", e.key), e.definition_cost as i64));
                }
            }
        }

        let mut choice_vars = Vec::with_capacity(groups.len());
        for group in groups {
            let vars: Vec<VarId> = candidates
                .candidates(group.id)
                .iter()
                .enumerate()
                .map(|(idx, c)| {
                    model.add_var(
                        format!("x[{},{}]", group.id, idx),
                        (group.weight() * c.length) as i64,
                    )
                })
                .collect();
            choice_vars.push(vars);
        }

        for group in groups {
            let vars = &choice_vars[group.id];
            model.add_row(
                format!("choose[{}]", group.id),
                vars.iter().map(|v| (*v, 1)).collect(),
                Sense::Eq,
                1,
            );
            for (idx, candidate) in candidates.candidates(group.id).iter().enumerate() {
                if let Some(y) = candidate.entry.and_then(|e| entry_vars[e]) {
                    model.add_row(
                        format!("define[{},{}]", group.id, idx),
                        vec![(vars[idx], 1), (y, -1)],
                        Sense::Le,
                        0,
                    );
                }
            }
        }

        for pair in &candidates.collisions {
            let a = choice_vars[pair.first.0][pair.first.1];
            let b = choice_vars[pair.second.0][pair.second.1];
            model.add_row(
                format!("collide[{},{}]", a, b),
                vec![(a, 1), (b, 1)],
                Sense::Le,
                1,
            );
        }

        debug!(
            vars = model.num_vars(),
            rows = model.num_rows(),
            "built integer program"
        );
        IlpModel {
            model,
            choice_vars,
            entry_vars,
        }
    }
}

impl IlpModel {
    /// Full variable assignment equivalent to `assignment`
    pub fn warm_start(&self, assignment: &Assignment) -> Vec<bool> {
        let mut values = vec![false; self.model.num_vars()];
        for (group, vars) in self.choice_vars.iter().enumerate() {
            if let Some(var) = assignment.choices.get(group).and_then(|&c| vars.get(c)) {
                values[var.0] = true;
            }
        }
        for &entry in &assignment.active_entries {
            if let Some(Some(var)) = self.entry_vars.get(entry) {
                values[var.0] = true;
            }
        }
        values
    }

    /// Prefer the chosen candidate of every group
    pub fn hints(&self, assignment: &Assignment) -> Vec<VarHint> {
        self.choice_vars
            .iter()
            .enumerate()
            .filter_map(|(group, vars)| {
                let choice = *assignment.choices.get(group)?;
                vars.get(choice).map(|&var| VarHint { var, value: true })
            })
            .collect()
    }

    /// Reads back the chosen candidate per group
    pub fn assignment(
        &self,
        solution: &Solution,
        candidates: &CandidateSet,
    ) -> SchemaPressResult<Assignment> {
        let mut choices = Vec::with_capacity(self.choice_vars.len());
        for (group, vars) in self.choice_vars.iter().enumerate() {
            let chosen: Vec<usize> = vars
                .iter()
                .enumerate()
                .filter(|(_, var)| solution.is_set(**var))
                .map(|(idx, _)| idx)
                .collect();
            match chosen.as_slice() {
                [idx] => choices.push(*idx),
                _ => {
                    return Err(SchemaPressError::CollisionViolation(format!(
                        "solver selected {} candidates for group {}",
                        chosen.len(),
                        group
                    )))
                }
            }
        }
        Ok(Assignment::from_choices(choices, candidates))
    }
}

/// Exact compression through a [`Solver`]
pub struct IlpCompressor {
    solver: Arc<dyn Solver>,
    config: CompressorConfig,
}

impl IlpCompressor {
    pub fn new(solver: Arc<dyn Solver>, config: CompressorConfig) -> Self {
        Self { solver, config }
    }
}

impl Compressor for IlpCompressor {
    fn method(&self) -> Method {
        Method::Ilp
    }

    fn compress(&self, instance: &CompressionInstance) -> SchemaPressResult<Outcome> {
        let groups = &instance.groups;
        let candidates = &instance.candidates;
        let greedy = GreedyCompressor::new().assign(groups, candidates);
        let ilp = IlpBuilder::build(groups, candidates);

        let start = ilp.warm_start(&greedy);
        let hints = ilp.hints(&greedy);
        let limit = candidates.verbatim_length(groups) as i64;

        let mut request =
            SolveRequest::new(&ilp.model, self.config.time_limit).with_objective_limit(limit);
        if self.config.warm_start() {
            request = request.with_warm_start(&start);
        }
        if self.config.hints() {
            request = request.with_hints(&hints);
        }

        let solution = self.solver.solve(request).map_err(|err| {
            let err = SchemaPressError::from(err);
            if err.is_invariant_breach() {
                error!(
                    schema = %instance.schema,
                    solver = self.solver.name(),
                    vars = ilp.model.num_vars(),
                    rows = ilp.model.num_rows(),
                    groups = groups.len(),
                    collisions = candidates.collisions.len(),
                    error = %err,
                    "solver rejected a model with a verbatim fallback for every group"
                );
            }
            err
        })?;

        let assignment = ilp.assignment(&solution, candidates)?;
        let stats = SolveStats {
            solver: self.solver.name().to_string(),
            objective: solution.objective,
            is_optimal: solution.is_optimal,
            best_bound: solution.best_bound,
            gap: solution.gap(),
            nr_variables: ilp.model.num_vars(),
            nr_constraints: ilp.model.num_rows(),
            nodes: solution.nodes,
        };
        info!(
            schema = %instance.schema,
            objective = stats.objective,
            is_optimal = stats.is_optimal,
            gap = stats.gap,
            nodes = stats.nodes,
            elapsed_ms = solution.elapsed.as_millis() as u64,
            "integer program solved"
        );
        Ok(Outcome {
            assignment,
            solve: Some(stats),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::{extract, merge_elements};
    use crate::compression::candidates::CandidateGenerator;
    use crate::schema::{Column, Schema, Table};
    use crate::solver::BranchAndBound;

    fn instance() -> (Vec<ElementGroup>, CandidateSet) {
        let tables = (0..3)
            .map(|i| {
                Table::new(format!("t{}", i))
                    .with_column(Column::new("created_at", "TIMESTAMP").with_constraint("NOT NULL"))
            })
            .collect();
        let groups = merge_elements(&extract(&Schema::new("s", tables)), true);
        let set = CandidateGenerator::new(&CompressorConfig::default()).generate(&groups);
        (groups, set)
    }

    #[test]
    fn test_model_shape() {
        let (groups, set) = instance();
        let ilp = IlpBuilder::build(&groups, &set);
        let entries_used = ilp.entry_vars.iter().flatten().count();
        assert_eq!(ilp.model.num_vars(), set.candidate_count() + entries_used);

        let implications: usize = set
            .per_group
            .iter()
            .map(|options| options.iter().filter(|c| c.entry.is_some()).count())
            .sum();
        assert_eq!(
            ilp.model.num_rows(),
            groups.len() + implications + set.collisions.len()
        );
    }

    #[test]
    fn test_warm_start_is_feasible() {
        let (groups, set) = instance();
        let ilp = IlpBuilder::build(&groups, &set);
        let greedy = GreedyCompressor::new().assign(&groups, &set);
        let start = ilp.warm_start(&greedy);
        assert!(ilp.model.is_feasible(&start));
        assert_eq!(
            ilp.model.objective(&start) as usize,
            greedy.total_length(&groups, &set).unwrap()
        );
        assert_eq!(ilp.hints(&greedy).len(), groups.len());
    }

    #[test]
    fn test_solution_round_trips_to_assignment() {
        let (groups, set) = instance();
        let ilp = IlpBuilder::build(&groups, &set);
        let solution = BranchAndBound::new()
            .solve(SolveRequest::new(&ilp.model, std::time::Duration::from_secs(5)))
            .unwrap();
        let assignment = ilp.assignment(&solution, &set).unwrap();
        assert_eq!(
            assignment.total_length(&groups, &set).unwrap() as i64,
            solution.objective
        );
    }
}
