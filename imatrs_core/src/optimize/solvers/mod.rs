//! Interface between optimization problems and the solvers used to solve them
pub mod microlp;

use crate::optimize::objective::ObjectiveSense;
use crate::optimize::variable::VariableType;
use crate::optimize::ProblemSolution;
use thiserror::Error;

/// A solver which can be loaded with variables, constraints, and an objective, and then
/// asked for a solution
///
/// Infeasible and unbounded problems are reported through the status of the returned
/// [`ProblemSolution`], errors are reserved for problems the solver can't handle.
pub trait Solver {
    /// Remove all variables, constraints, and objective terms
    fn clear(&mut self);

    fn add_continuous_variable(
        &mut self,
        id: &str,
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<(), SolverError>;

    fn add_binary_variable(&mut self, id: &str) -> Result<(), SolverError>;

    fn add_equality_constraint(
        &mut self,
        id: &str,
        variables: &[&str],
        coefficients: &[f64],
        equals: f64,
    ) -> Result<(), SolverError>;

    fn add_inequality_constraint(
        &mut self,
        id: &str,
        variables: &[&str],
        coefficients: &[f64],
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<(), SolverError>;

    fn add_linear_objective_term(
        &mut self,
        variable_id: &str,
        coefficient: f64,
    ) -> Result<(), SolverError>;

    fn set_objective_sense(&mut self, objective_sense: ObjectiveSense) -> Result<(), SolverError>;

    /// Solve the loaded problem
    fn solve(&mut self) -> Result<ProblemSolution, SolverError>;
}

/// Errors raised by a solver
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    /// The solver doesn't support this kind of variable
    #[error("Solver does not support {0} variables")]
    UnsupportedVariableType(VariableType),
    /// A variable was added twice
    #[error("Variable {0} was already added to the solver")]
    DuplicateVariable(String),
    /// A constraint or objective term referenced an unknown variable
    #[error("Variable {0} has not been added to the solver")]
    NonExistentVariable(String),
    /// Solver failed for a reason other than infeasibility or unboundedness
    #[error("Solver failed: {0}")]
    InternalError(String),
}
