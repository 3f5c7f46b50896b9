//! Solver interface for the microlp solver
//!
//! microlp builds its problem in one pass, so variables and constraints are buffered here
//! and the microlp problem is assembled when [`Solver::solve`] is called.

use crate::configuration;
use crate::optimize::objective::ObjectiveSense;
use crate::optimize::solvers::{Solver, SolverError};
use crate::optimize::variable::VariableType;
use crate::optimize::{OptimizationStatus, ProblemSolution};
use ::microlp::{ComparisonOp, OptimizationDirection};
use indexmap::IndexMap;

/// Pure rust simplex and branch and bound solver
#[derive(Clone, Debug)]
pub struct MicrolpSolver {
    variables: IndexMap<String, BufferedVariable>,
    constraints: Vec<BufferedConstraint>,
    sense: ObjectiveSense,
}

#[derive(Clone, Debug)]
struct BufferedVariable {
    variable_type: VariableType,
    lower_bound: f64,
    upper_bound: f64,
    objective_coefficient: f64,
}

#[derive(Clone, Debug)]
struct BufferedConstraint {
    /// (variable index, coefficient), one entry per variable
    terms: Vec<(usize, f64)>,
    comparison: ComparisonOp,
    rhs: f64,
}

impl Default for MicrolpSolver {
    fn default() -> Self {
        Self {
            variables: IndexMap::new(),
            constraints: Vec::new(),
            sense: ObjectiveSense::Maximize,
        }
    }
}

impl MicrolpSolver {
    pub fn new() -> Self {
        Self::default()
    }

    fn add_variable(
        &mut self,
        id: &str,
        variable_type: VariableType,
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<(), SolverError> {
        if self.variables.contains_key(id) {
            return Err(SolverError::DuplicateVariable(id.to_string()));
        }
        self.variables.insert(
            id.to_string(),
            BufferedVariable {
                variable_type,
                lower_bound,
                upper_bound,
                objective_coefficient: 0.,
            },
        );
        Ok(())
    }

    /// Convert ids to indices, merging repeated variables and dropping zero coefficients
    fn collect_terms(
        &self,
        variables: &[&str],
        coefficients: &[f64],
    ) -> Result<Vec<(usize, f64)>, SolverError> {
        let mut terms: Vec<(usize, f64)> = Vec::with_capacity(variables.len());
        for (id, coefficient) in variables.iter().zip(coefficients) {
            let index = self
                .variables
                .get_index_of(*id)
                .ok_or_else(|| SolverError::NonExistentVariable(id.to_string()))?;
            match terms.iter_mut().find(|(i, _)| *i == index) {
                Some(existing) => existing.1 += coefficient,
                None => terms.push((index, *coefficient)),
            }
        }
        terms.retain(|(_, coefficient)| *coefficient != 0.);
        Ok(terms)
    }
}

impl Solver for MicrolpSolver {
    fn clear(&mut self) {
        self.variables.clear();
        self.constraints.clear();
        self.sense = ObjectiveSense::Maximize;
    }

    fn add_continuous_variable(
        &mut self,
        id: &str,
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<(), SolverError> {
        self.add_variable(id, VariableType::Continuous, lower_bound, upper_bound)
    }

    fn add_binary_variable(&mut self, id: &str) -> Result<(), SolverError> {
        self.add_variable(id, VariableType::Binary, 0., 1.)
    }

    fn add_equality_constraint(
        &mut self,
        _id: &str,
        variables: &[&str],
        coefficients: &[f64],
        equals: f64,
    ) -> Result<(), SolverError> {
        let terms = self.collect_terms(variables, coefficients)?;
        self.constraints.push(BufferedConstraint {
            terms,
            comparison: ComparisonOp::Eq,
            rhs: equals,
        });
        Ok(())
    }

    fn add_inequality_constraint(
        &mut self,
        _id: &str,
        variables: &[&str],
        coefficients: &[f64],
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<(), SolverError> {
        let terms = self.collect_terms(variables, coefficients)?;
        if lower_bound == upper_bound {
            self.constraints.push(BufferedConstraint {
                terms,
                comparison: ComparisonOp::Eq,
                rhs: lower_bound,
            });
            return Ok(());
        }
        if lower_bound.is_finite() {
            self.constraints.push(BufferedConstraint {
                terms: terms.clone(),
                comparison: ComparisonOp::Ge,
                rhs: lower_bound,
            });
        }
        if upper_bound.is_finite() {
            self.constraints.push(BufferedConstraint {
                terms,
                comparison: ComparisonOp::Le,
                rhs: upper_bound,
            });
        }
        Ok(())
    }

    fn add_linear_objective_term(
        &mut self,
        variable_id: &str,
        coefficient: f64,
    ) -> Result<(), SolverError> {
        match self.variables.get_mut(variable_id) {
            Some(var) => {
                var.objective_coefficient += coefficient;
                Ok(())
            }
            None => Err(SolverError::NonExistentVariable(variable_id.to_string())),
        }
    }

    fn set_objective_sense(&mut self, objective_sense: ObjectiveSense) -> Result<(), SolverError> {
        self.sense = objective_sense;
        Ok(())
    }

    fn solve(&mut self) -> Result<ProblemSolution, SolverError> {
        let direction = match self.sense {
            ObjectiveSense::Minimize => OptimizationDirection::Minimize,
            ObjectiveSense::Maximize => OptimizationDirection::Maximize,
        };
        let mut problem = ::microlp::Problem::new(direction);
        let handles: Vec<::microlp::Variable> = self
            .variables
            .values()
            .map(|var| match var.variable_type {
                VariableType::Continuous => problem
                    .add_var(var.objective_coefficient, (var.lower_bound, var.upper_bound)),
                VariableType::Binary => problem.add_binary_var(var.objective_coefficient),
            })
            .collect();
        for constraint in &self.constraints {
            problem.add_constraint(
                constraint
                    .terms
                    .iter()
                    .map(|(index, coefficient)| (handles[*index], *coefficient)),
                constraint.comparison,
                constraint.rhs,
            );
        }
        log::debug!(
            "microlp problem with {} variables and {} rows",
            handles.len(),
            self.constraints.len()
        );

        let solution = match problem.solve() {
            Ok(solution) => solution,
            Err(::microlp::Error::Infeasible) => {
                return Ok(ProblemSolution::without_values(
                    OptimizationStatus::Infeasible,
                ))
            }
            Err(::microlp::Error::Unbounded) => {
                return Ok(ProblemSolution::without_values(
                    OptimizationStatus::Unbounded,
                ))
            }
            Err(::microlp::Error::InternalError(message)) => {
                return Err(SolverError::InternalError(message))
            }
        };

        let integrality_tolerance = configuration::current().integrality_tolerance;
        let variable_values: IndexMap<String, f64> = self
            .variables
            .iter()
            .zip(&handles)
            .map(|((id, var), handle)| {
                let value = *solution.var_value(*handle);
                let value = match var.variable_type {
                    VariableType::Continuous => value,
                    VariableType::Binary => {
                        let rounded = value.round();
                        if (rounded - value).abs() <= integrality_tolerance {
                            rounded
                        } else {
                            value
                        }
                    }
                };
                (id.clone(), value)
            })
            .collect();

        Ok(ProblemSolution {
            status: OptimizationStatus::Optimal,
            objective_value: Some(solution.objective()),
            variable_values: Some(variable_values),
        })
    }
}
