//! 0/1 integer program boundary
//!
//! The compression pipeline states its optimization problem as a [`Model`] of
//! binary variables, linear rows and a linear objective, and hands it to a
//! [`Solver`] together with an optional warm start, branching hints and a
//! wall-clock limit. Nothing upstream of this module knows how a backend
//! represents or searches the model.

pub mod branch_bound;

pub use branch_bound::BranchAndBound;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Handle of a binary variable inside a [`Model`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VarId(pub usize);

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// A binary variable with its objective coefficient
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub cost: i64,
}

/// Comparison of a row's activity against its right-hand side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sense {
    Le,
    Eq,
    Ge,
}

/// A linear constraint `Σ coef·var (sense) rhs`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    pub name: String,
    pub terms: Vec<(VarId, i64)>,
    pub sense: Sense,
    pub rhs: i64,
}

impl Row {
    pub fn activity(&self, values: &[bool]) -> i64 {
        self.terms
            .iter()
            .filter(|(var, _)| values.get(var.0).copied().unwrap_or(false))
            .map(|(_, coef)| coef)
            .sum()
    }

    pub fn is_satisfied(&self, values: &[bool]) -> bool {
        let activity = self.activity(values);
        match self.sense {
            Sense::Le => activity <= self.rhs,
            Sense::Eq => activity == self.rhs,
            Sense::Ge => activity >= self.rhs,
        }
    }
}

/// Minimization model over binary variables
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Model {
    vars: Vec<Variable>,
    rows: Vec<Row>,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_var(&mut self, name: impl Into<String>, cost: i64) -> VarId {
        let id = VarId(self.vars.len());
        self.vars.push(Variable {
            name: name.into(),
            cost,
        });
        id
    }

    pub fn add_row(
        &mut self,
        name: impl Into<String>,
        terms: Vec<(VarId, i64)>,
        sense: Sense,
        rhs: i64,
    ) -> usize {
        self.rows.push(Row {
            name: name.into(),
            terms,
            sense,
            rhs,
        });
        self.rows.len() - 1
    }

    pub fn vars(&self) -> &[Variable] {
        &self.vars
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn num_vars(&self) -> usize {
        self.vars.len()
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn objective(&self, values: &[bool]) -> i64 {
        self.vars
            .iter()
            .zip(values)
            .filter(|(_, on)| **on)
            .map(|(var, _)| var.cost)
            .sum()
    }

    /// First row violated by `values`, if any
    pub fn first_violation(&self, values: &[bool]) -> Option<&Row> {
        self.rows.iter().find(|row| !row.is_satisfied(values))
    }

    pub fn is_feasible(&self, values: &[bool]) -> bool {
        values.len() == self.vars.len() && self.first_violation(values).is_none()
    }

    /// Checks that every row only references declared variables
    pub fn check(&self) -> SolverResult<()> {
        for row in &self.rows {
            if let Some((var, _)) = row.terms.iter().find(|(var, _)| var.0 >= self.vars.len()) {
                return Err(SolverError::InvalidModel(format!(
                    "row '{}' references undeclared variable {}",
                    row.name, var
                )));
            }
        }
        Ok(())
    }
}

/// Preferred value for a variable, used to order branching
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VarHint {
    pub var: VarId,
    pub value: bool,
}

/// Everything a backend receives for one solve
#[derive(Debug, Clone)]
pub struct SolveRequest<'a> {
    pub model: &'a Model,
    /// Complete assignment to start from, ignored when infeasible
    pub warm_start: Option<&'a [bool]>,
    pub hints: &'a [VarHint],
    pub time_limit: Duration,
    /// Only assignments with objective at most this value are accepted
    pub objective_limit: Option<i64>,
}

impl<'a> SolveRequest<'a> {
    pub fn new(model: &'a Model, time_limit: Duration) -> Self {
        Self {
            model,
            warm_start: None,
            hints: &[],
            time_limit,
            objective_limit: None,
        }
    }

    pub fn with_warm_start(mut self, values: &'a [bool]) -> Self {
        self.warm_start = Some(values);
        self
    }

    pub fn with_hints(mut self, hints: &'a [VarHint]) -> Self {
        self.hints = hints;
        self
    }

    pub fn with_objective_limit(mut self, limit: i64) -> Self {
        self.objective_limit = Some(limit);
        self
    }
}

/// Best assignment found by a backend
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    pub values: Vec<bool>,
    pub objective: i64,
    /// The search completed, so no better assignment exists
    pub is_optimal: bool,
    /// Proven lower bound on the optimal objective
    pub best_bound: f64,
    pub nodes: u64,
    pub elapsed: Duration,
}

impl Solution {
    pub fn is_set(&self, var: VarId) -> bool {
        self.values.get(var.0).copied().unwrap_or(false)
    }

    /// Relative distance between the objective and the proven bound
    pub fn gap(&self) -> f64 {
        if self.is_optimal || self.objective == 0 {
            return 0.0;
        }
        let objective = self.objective as f64;
        ((objective - self.best_bound) / objective.abs()).max(0.0)
    }
}

/// Solver failure modes
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    /// The search completed without finding a feasible assignment
    #[error("model is infeasible: {0}")]
    InfeasibleModel(String),

    /// The time limit expired before any feasible assignment was found
    #[error("no feasible assignment after {elapsed:?} ({nodes} nodes)")]
    NoSolution { elapsed: Duration, nodes: u64 },

    #[error("invalid model: {0}")]
    InvalidModel(String),
}

pub type SolverResult<T> = std::result::Result<T, SolverError>;

/// A 0/1 integer program backend
pub trait Solver: Send + Sync {
    fn name(&self) -> &'static str;

    /// Minimize the model's objective within the request's time limit
    fn solve(&self, request: SolveRequest<'_>) -> SolverResult<Solution>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_evaluation() {
        let mut model = Model::new();
        let a = model.add_var("a", 3);
        let b = model.add_var("b", 5);
        model.add_row("choice", vec![(a, 1), (b, 1)], Sense::Eq, 1);

        assert_eq!(model.num_vars(), 2);
        assert_eq!(model.num_rows(), 1);
        assert!(model.is_feasible(&[true, false]));
        assert!(!model.is_feasible(&[true, true]));
        assert!(!model.is_feasible(&[true]));
        assert_eq!(model.objective(&[false, true]), 5);
        assert_eq!(model.first_violation(&[false, false]).unwrap().name, "choice");
    }

    #[test]
    fn test_check_rejects_unknown_variable() {
        let mut model = Model::new();
        let a = model.add_var("a", 1);
        model.add_row("bad", vec![(a, 1), (VarId(7), 1)], Sense::Le, 1);
        assert!(matches!(model.check(), Err(SolverError::InvalidModel(_))));
    }

    #[test]
    fn test_gap() {
        let solution = Solution {
            values: vec![],
            objective: 100,
            is_optimal: false,
            best_bound: 80.0,
            nodes: 0,
            elapsed: Duration::ZERO,
        };
        assert!((solution.gap() - 0.2).abs() < 1e-9);
    }
}
