//! Provides struct representing an optimization problem
use crate::optimize::constraint::Constraint;
use crate::optimize::objective::{Objective, ObjectiveSense, ObjectiveTerm};
use crate::optimize::solvers::{Solver, SolverError};
use crate::optimize::variable::{Variable, VariableBuilder, VariableType};
use crate::optimize::ProblemSolution;
use indexmap::IndexMap;
use thiserror::Error;

/// An optimization problem
///
/// Variables and constraints are keyed by id and kept in insertion order, so building the
/// same problem twice yields identical problems.
#[derive(Debug, Clone, PartialEq)]
pub struct Problem {
    /// Name of the problem, used when reporting results
    name: String,
    /// Objective to optimize
    objective: Objective,
    /// Variables of the optimization problem
    variables: IndexMap<String, Variable>,
    /// Constraints of the optimization problem
    constraints: IndexMap<String, Constraint>,
    /// Type of problem
    problem_type: ProblemType,
}

impl Problem {
    // region Creation Functions
    /// Create a new optimization problem
    pub fn new(objective_sense: ObjectiveSense) -> Self {
        Self {
            name: String::from("problem"),
            objective: Objective::new(objective_sense),
            variables: IndexMap::new(),
            constraints: IndexMap::new(),
            problem_type: ProblemType::LinearContinuous,
        }
    }

    /// Create a new maximization problem
    pub fn new_maximization() -> Self {
        Self::new(ObjectiveSense::Maximize)
    }

    /// Create a new minimization problem
    pub fn new_minimization() -> Self {
        Self::new(ObjectiveSense::Minimize)
    }

    /// Set the name of the problem
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    // endregion Creation Functions

    // region Accessors
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn objective(&self) -> &Objective {
        &self.objective
    }

    pub fn variables(&self) -> &IndexMap<String, Variable> {
        &self.variables
    }

    pub fn variable(&self, id: &str) -> Option<&Variable> {
        self.variables.get(id)
    }

    pub fn constraints(&self) -> &IndexMap<String, Constraint> {
        &self.constraints
    }

    pub fn constraint(&self, id: &str) -> Option<&Constraint> {
        self.constraints.get(id)
    }

    pub fn problem_type(&self) -> ProblemType {
        self.problem_type
    }
    // endregion Accessors

    // region Update Objective Sense
    /// Update the objective sense of the problem
    pub fn update_objective_sense(&mut self, sense: ObjectiveSense) {
        self.objective.set_sense(sense);
    }
    // endregion Update Objective Sense

    // region Adding Variables
    /// Add a variable to the optimization problem
    pub fn add_variable(&mut self, mut variable: Variable) -> Result<(), ProblemError> {
        // Validate that the variable can in fact be added to the problem
        self.validate_variable(&variable)?;
        variable.index = self.variables.len();
        match variable.variable_type {
            VariableType::Continuous => {}
            VariableType::Binary => {
                self.problem_type = ProblemType::LinearMixedInteger;
            }
        }
        self.variables.insert(variable.id.clone(), variable);
        Ok(())
    }

    /// Create a new variable and add it to the optimization problem
    pub fn add_new_variable(
        &mut self,
        id: &str,
        name: Option<&str>,
        variable_type: VariableType,
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<(), ProblemError> {
        let mut builder = VariableBuilder::default();
        builder
            .id(id)
            .variable_type(variable_type)
            .lower_bound(lower_bound)
            .upper_bound(upper_bound);
        if let Some(name) = name {
            builder.name(name);
        }
        let new_var = builder
            .build()
            .map_err(|err| ProblemError::InvalidVariable(err.to_string()))?;
        self.add_variable(new_var)
    }

    /// Create a new binary variable and add it to the optimization problem
    pub fn add_new_binary_variable(&mut self, id: &str) -> Result<(), ProblemError> {
        self.add_new_variable(id, None, VariableType::Binary, 0., 1.)
    }
    // endregion Adding Variables

    // region Adding Constraints
    /// Add a constraint to the problem
    pub fn add_constraint(&mut self, constraint: Constraint) -> Result<(), ProblemError> {
        self.validate_constraint(&constraint)?;
        self.constraints
            .insert(constraint.get_id().to_string(), constraint);
        Ok(())
    }

    /// Create a new equality constraint using variable ids, and add it to the model
    pub fn add_new_equality_constraint_by_id(
        &mut self,
        id: &str,
        variables: &[&str],
        coefficients: &[f64],
        equals: f64,
    ) -> Result<(), ProblemError> {
        if variables.len() != coefficients.len() {
            return Err(ProblemError::MismatchedTerms(id.to_string()));
        }
        self.add_constraint(Constraint::new_equality(id, variables, coefficients, equals))
    }

    /// Create a new inequality constraint using variable ids, and add it to the model
    ///
    /// Either bound may be infinite for a one sided constraint.
    pub fn add_new_inequality_constraint_by_id(
        &mut self,
        id: &str,
        variables: &[&str],
        coefficients: &[f64],
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<(), ProblemError> {
        if variables.len() != coefficients.len() {
            return Err(ProblemError::MismatchedTerms(id.to_string()));
        }
        self.add_constraint(Constraint::new_inequality(
            id,
            variables,
            coefficients,
            lower_bound,
            upper_bound,
        ))
    }

    // endregion Adding Constraints

    // region Adding Objective Terms
    /// Add a new linear term to the objective using the variable id
    pub fn add_new_linear_objective_term_by_id(
        &mut self,
        variable_id: &str,
        coefficient: f64,
    ) -> Result<(), ProblemError> {
        if !self.variables.contains_key(variable_id) {
            return Err(ProblemError::NonExistentVariablesInObjective);
        }
        self.objective
            .add_term(ObjectiveTerm::new_linear(variable_id, coefficient));
        Ok(())
    }

    /// Remove all terms from the objective
    pub fn remove_all_objective_terms(&mut self) {
        self.objective.remove_all_terms();
    }
    // endregion Adding Objective Terms

    // region update variable bounds
    /// Update the bounds of a variable
    pub fn update_variable_bounds(
        &mut self,
        id: &str,
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<(), ProblemError> {
        if lower_bound > upper_bound {
            return Err(ProblemError::InvalidVariableBounds(id.to_string()));
        }
        match self.variables.get_mut(id) {
            Some(var) => {
                var.lower_bound = lower_bound;
                var.upper_bound = upper_bound;
            }
            None => return Err(ProblemError::NonExistentVariable(id.to_string())),
        };
        Ok(())
    }
    // endregion update variable bounds

    // region Solve
    /// Load the problem into `solver` and solve it
    ///
    /// The solver is cleared first, so a single solver can be reused across problems.
    pub fn solve<S: Solver>(&self, solver: &mut S) -> Result<ProblemSolution, SolverError> {
        solver.clear();
        for (id, var) in &self.variables {
            match var.variable_type {
                VariableType::Continuous => {
                    solver.add_continuous_variable(id, var.lower_bound, var.upper_bound)?
                }
                VariableType::Binary => solver.add_binary_variable(id)?,
            }
        }
        for constraint in self.constraints.values() {
            let ids: Vec<&str> = constraint
                .get_terms()
                .iter()
                .map(|t| t.variable.as_str())
                .collect();
            let coefficients: Vec<f64> =
                constraint.get_terms().iter().map(|t| t.coefficient).collect();
            match constraint {
                Constraint::Equality { id, equals, .. } => {
                    solver.add_equality_constraint(id, &ids, &coefficients, *equals)?
                }
                Constraint::Inequality {
                    id,
                    lower_bound,
                    upper_bound,
                    ..
                } => solver.add_inequality_constraint(
                    id,
                    &ids,
                    &coefficients,
                    *lower_bound,
                    *upper_bound,
                )?,
            }
        }
        for term in self.objective.terms() {
            solver.add_linear_objective_term(&term.variable, term.coefficient)?;
        }
        solver.set_objective_sense(self.objective.sense())?;
        log::debug!(
            "Solving {} with {} variables and {} constraints",
            self.name,
            self.variables.len(),
            self.constraints.len()
        );
        solver.solve()
    }
    // endregion Solve

    // region Validation Functions
    /// Check that a variable to be added is valid to add to this problem
    fn validate_variable(&self, variable: &Variable) -> Result<(), ProblemError> {
        if self.variables.contains_key(&variable.id) {
            return Err(ProblemError::VariableIdAlreadyExists(variable.id.clone()));
        };
        if variable.lower_bound > variable.upper_bound
            || variable.lower_bound.is_nan()
            || variable.upper_bound.is_nan()
        {
            return Err(ProblemError::InvalidVariableBounds(variable.id.clone()));
        }
        Ok(())
    }

    /// Check that a constraint to be added is valid to add to this Problem
    fn validate_constraint(&self, constraint: &Constraint) -> Result<(), ProblemError> {
        let id = constraint.get_id();
        if self.constraints.contains_key(id) {
            return Err(ProblemError::ConstraintAlreadyExists(id.to_string()));
        }
        if let Constraint::Inequality {
            lower_bound,
            upper_bound,
            ..
        } = constraint
        {
            if lower_bound > upper_bound {
                return Err(ProblemError::InvalidConstraintBounds(id.to_string()));
            }
        }
        let terms = constraint.get_terms();
        for (position, term) in terms.iter().enumerate() {
            if !self.variables.contains_key(&term.variable) {
                return Err(ProblemError::NonExistentVariablesInConstraint(id.to_string()));
            }
            if terms[..position].iter().any(|t| t.variable == term.variable) {
                return Err(ProblemError::RepeatedVariableInConstraint(id.to_string()));
            }
        }
        Ok(())
    }
    // endregion Validation Functions

    // region Check Problem
    pub fn has_integer_variables(&self) -> bool {
        self.variables
            .values()
            .any(|v| v.variable_type != VariableType::Continuous)
    }
    // endregion Check Problem
}

/// Types of optimization problems
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProblemType {
    /// Problem with linear objectives and constraints, and continuous variables
    LinearContinuous,
    /// Problem with linear objective and constraints, with integer and continuous variables
    LinearMixedInteger,
}

/// Errors associated with the Problem
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProblemError {
    /// Error when trying to add a variable with the same id as an existing variable
    #[error("Tried to add variable {0} with the same id as an existing variable")]
    VariableIdAlreadyExists(String),
    /// Error when trying to add variable with invalid bounds
    #[error("Tried to add variable {0} with lower_bound > upper_bound")]
    InvalidVariableBounds(String),
    /// Error when a variable could not be built
    #[error("Unable to build variable: {0}")]
    InvalidVariable(String),
    /// Error when trying to add a constraint with the same id as an existing constraint
    #[error("Tried to add constraint {0} with the same id as an existing constraint")]
    ConstraintAlreadyExists(String),
    /// Error when trying to add a constraint with invalid bounds
    #[error("Tried to add inequality constraint {0} with lower_bound > upper_bound")]
    InvalidConstraintBounds(String),
    /// Error when trying to add a constraint that contains variables not in the model
    #[error("Tried to add constraint {0} with variables not in the model")]
    NonExistentVariablesInConstraint(String),
    /// Error when a constraint lists the same variable twice
    #[error("Constraint {0} lists a variable more than once")]
    RepeatedVariableInConstraint(String),
    /// Error when the number of variables and coefficients differ
    #[error("Constraint {0} has a different number of variables and coefficients")]
    MismatchedTerms(String),
    /// Error when trying to add an objective term which includes variables not in the model
    #[error("Tried adding an objective term with variables not in the model")]
    NonExistentVariablesInObjective,
    /// Error when trying to perform an update on a variable that doesn't exist
    #[error("Tried to access variable {0} which doesn't exist")]
    NonExistentVariable(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimize::solvers::microlp::MicrolpSolver;
    use crate::optimize::OptimizationStatus;

    #[test]
    fn new_problem() {
        let max_problem = Problem::new_maximization();
        assert_eq!(max_problem.objective.sense(), ObjectiveSense::Maximize);

        let min_problem = Problem::new_minimization().with_name("min");
        assert_eq!(min_problem.objective.sense(), ObjectiveSense::Minimize);
        assert_eq!(min_problem.name(), "min");
    }

    #[test]
    fn update_objective_sense() {
        let mut problem = Problem::new(ObjectiveSense::Maximize);
        problem.update_objective_sense(ObjectiveSense::Minimize);
        assert_eq!(problem.objective.sense(), ObjectiveSense::Minimize);
        problem.update_objective_sense(ObjectiveSense::Maximize);
        assert_eq!(problem.objective.sense(), ObjectiveSense::Maximize);
    }

    #[test]
    fn add_variables() {
        let mut problem = Problem::new(ObjectiveSense::Maximize);

        problem
            .add_new_variable("x", None, VariableType::Continuous, 64., 100.)
            .unwrap();
        let var = problem.variable("x").unwrap();
        assert_eq!(var.variable_type, VariableType::Continuous);
        assert_eq!(var.index, 0);
        assert!((var.lower_bound - 64.0).abs() < 1e-25);
        assert!((var.upper_bound - 100.0).abs() < 1e-25);
        assert_eq!(problem.problem_type, ProblemType::LinearContinuous);

        // Add another variable, this time a binary variable
        problem.add_new_binary_variable("y").unwrap();
        let var = problem.variable("y").unwrap();
        assert_eq!(var.variable_type, VariableType::Binary);
        assert_eq!(var.index, 1);
        assert_eq!(problem.problem_type, ProblemType::LinearMixedInteger);
        assert!(problem.has_integer_variables());
    }

    #[test]
    fn add_bad_variable() {
        let mut problem = Problem::new(ObjectiveSense::Maximize);

        let res = problem.add_new_variable("x", None, VariableType::Continuous, 100., 64.);
        assert_eq!(res, Err(ProblemError::InvalidVariableBounds("x".to_string())));

        problem
            .add_new_variable("x", Some("first"), VariableType::Continuous, 0., 1.)
            .unwrap();
        let res = problem.add_new_variable("x", None, VariableType::Continuous, 0., 1.);
        assert_eq!(res, Err(ProblemError::VariableIdAlreadyExists("x".to_string())));
    }

    #[test]
    fn add_constraint() {
        let mut problem = Problem::new(ObjectiveSense::Maximize);

        problem
            .add_new_variable("x", None, VariableType::Continuous, 64., 100.)
            .unwrap();
        problem
            .add_new_variable("y", None, VariableType::Continuous, 64., 100.)
            .unwrap();

        problem
            .add_new_equality_constraint_by_id("test_equality", &["x", "y"], &[2., 3.], 200.)
            .unwrap();
        match problem.constraint("test_equality").unwrap() {
            Constraint::Equality { equals, .. } => assert!((equals - 200.).abs() < 1e-25),
            Constraint::Inequality { .. } => panic!("Incorrect constraint type added"),
        }

        problem
            .add_new_inequality_constraint_by_id(
                "test_inequality",
                &["x", "y"],
                &[2., 3.],
                100.,
                200.,
            )
            .unwrap();
        match problem.constraint("test_inequality").unwrap() {
            Constraint::Inequality {
                lower_bound,
                upper_bound,
                ..
            } => {
                assert!((lower_bound - 100.).abs() < 1e-25);
                assert!((upper_bound - 200.).abs() < 1e-25);
            }
            Constraint::Equality { .. } => panic!("Incorrect constraint type added"),
        }
    }

    #[test]
    fn add_bad_constraint() {
        let mut problem = Problem::new(ObjectiveSense::Maximize);

        problem
            .add_new_variable("x", None, VariableType::Continuous, 64., 100.)
            .unwrap();
        problem
            .add_new_variable("y", None, VariableType::Continuous, 64., 100.)
            .unwrap();

        assert_eq!(
            problem.add_new_inequality_constraint_by_id(
                "bad_bounds",
                &["x", "y"],
                &[2., 3.],
                200.,
                100.,
            ),
            Err(ProblemError::InvalidConstraintBounds("bad_bounds".to_string()))
        );
        assert_eq!(
            problem.add_new_equality_constraint_by_id("missing", &["x", "z"], &[1., 1.], 0.),
            Err(ProblemError::NonExistentVariablesInConstraint(
                "missing".to_string()
            ))
        );
        assert_eq!(
            problem.add_new_equality_constraint_by_id("repeated", &["x", "x"], &[1., 1.], 0.),
            Err(ProblemError::RepeatedVariableInConstraint(
                "repeated".to_string()
            ))
        );
        assert_eq!(
            problem.add_new_equality_constraint_by_id("short", &["x", "y"], &[1.], 0.),
            Err(ProblemError::MismatchedTerms("short".to_string()))
        );
        assert_eq!(
            problem.add_new_linear_objective_term_by_id("z", 1.),
            Err(ProblemError::NonExistentVariablesInObjective)
        );
    }

    #[test]
    fn solve_linear_problem() {
        // maximize x + y subject to x + 2y <= 4, 0 <= x <= 3, y >= 0
        let mut problem = Problem::new_maximization();
        problem
            .add_new_variable("x", None, VariableType::Continuous, 0., 3.)
            .unwrap();
        problem
            .add_new_variable("y", None, VariableType::Continuous, 0., f64::INFINITY)
            .unwrap();
        problem
            .add_new_inequality_constraint_by_id(
                "c",
                &["x", "y"],
                &[1., 2.],
                f64::NEG_INFINITY,
                4.,
            )
            .unwrap();
        problem.add_new_linear_objective_term_by_id("x", 1.).unwrap();
        problem.add_new_linear_objective_term_by_id("y", 1.).unwrap();

        let solution = problem.solve(&mut MicrolpSolver::default()).unwrap();
        assert_eq!(solution.status, OptimizationStatus::Optimal);
        assert!((solution.objective_value.unwrap() - 3.5).abs() < 1e-6);
        assert!((solution.value("x").unwrap() - 3.).abs() < 1e-6);
        assert!((solution.value("y").unwrap() - 0.5).abs() < 1e-6);
    }
}
