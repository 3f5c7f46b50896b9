//! A single integration run, from raw expression table to structured result
use crate::configuration;
use crate::expression::align::{align, cell_type_name, RawExpressionTable};
use crate::expression::discretize::Discretization;
use crate::expression::ExpressionTable;
use crate::integration::builder::ProblemBuilder;
use crate::integration::classify::{classify_reactions, ReactionTiers};
use crate::integration::fva::{ForcedSet, FvaBuilder, FvaResult};
use crate::integration::objective::{objective_threshold, ObjectiveThreshold};
use crate::integration::parameters::IntegrationParameters;
use crate::integration::result::{InfeasibleRecord, IntegrationResult, ResultExtractor};
use crate::integration::weights::weight_coefficients;
use crate::integration::IntegrationError;
use crate::metabolic_model::model::Model;
use crate::optimize::solvers::Solver;

/// How a run ended
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Completed(Box<IntegrationResult>),
    /// A problem of the run had no feasible solution, the run was skipped
    Infeasible(InfeasibleRecord),
}

/// Inputs shared by the integration and variability problems
struct Prepared {
    table: ExpressionTable,
    discretization: Discretization,
    tiers: ReactionTiers,
    threshold: ObjectiveThreshold,
}

/// One expression column of one expression table, integrated with one parameter set
///
/// The model and expression table are only read, so several runs can share them.
pub struct IntegrationRun<'a> {
    model: &'a Model,
    expression: &'a RawExpressionTable,
    gene_column: String,
    expression_column: String,
    parameters: IntegrationParameters,
}

impl<'a> IntegrationRun<'a> {
    pub fn new(
        model: &'a Model,
        expression: &'a RawExpressionTable,
        gene_column: &str,
        expression_column: &str,
        parameters: IntegrationParameters,
    ) -> Self {
        Self {
            model,
            expression,
            gene_column: gene_column.to_string(),
            expression_column: expression_column.to_string(),
            parameters,
        }
    }

    pub fn parameters(&self) -> &IntegrationParameters {
        &self.parameters
    }

    /// Cell type name derived from the expression column
    pub fn cell_type(&self) -> String {
        cell_type_name(&self.expression_column)
    }

    fn problem_name(&self) -> String {
        self.parameters.objective_kind.to_string()
    }

    fn prepare<S: Solver>(&self, solver: &mut S) -> Result<Prepared, IntegrationError> {
        self.parameters.validate(self.model)?;
        let mut table = align(
            self.model,
            self.expression,
            &self.gene_column,
            &self.expression_column,
            self.parameters.species_filter,
        )?;
        let discretization = self.parameters.discretizer()?.discretize(&mut table)?;
        let tiers = classify_reactions(self.model, &table, self.parameters.cascade);
        let threshold = objective_threshold(self.model, self.parameters.optimum_fraction, solver)?;
        Ok(Prepared {
            table,
            discretization,
            tiers,
            threshold,
        })
    }

    /// Run every step and gather the result
    ///
    /// An infeasible problem ends the run with [`RunOutcome::Infeasible`], every other
    /// failure is returned as an error.
    pub fn run<S: Solver>(&self, solver: &mut S) -> Result<RunOutcome, IntegrationError> {
        match self.solve(solver) {
            Ok(result) => Ok(RunOutcome::Completed(Box::new(result))),
            Err(IntegrationError::Infeasible { problem }) => {
                log::warn!(
                    "Skipping {} for cell type {}, problem {} is infeasible",
                    self.problem_name(),
                    self.cell_type(),
                    problem
                );
                Ok(RunOutcome::Infeasible(InfeasibleRecord::new(
                    &self.problem_name(),
                    &self.cell_type(),
                    &self.parameters,
                )))
            }
            Err(err) => Err(err),
        }
    }

    fn solve<S: Solver>(&self, solver: &mut S) -> Result<IntegrationResult, IntegrationError> {
        let prepared = self.prepare(solver)?;
        let weights = weight_coefficients(
            self.model,
            &prepared.tiers,
            &prepared.table,
            &prepared.discretization.scaled,
            self.parameters.objective_kind,
            configuration::current().missing_expression_value,
        )?;
        let problem = ProblemBuilder::new(
            self.model,
            &self.parameters,
            &prepared.tiers,
            &weights,
            &prepared.threshold,
        )
        .with_name(&self.problem_name())
        .build()?;
        let solution = problem.solve(solver)?;
        let extractor = ResultExtractor {
            model: self.model,
            tiers: &prepared.tiers,
            table: &prepared.table,
            discretization: &prepared.discretization,
            parameters: &self.parameters,
        };
        extractor.extract(&self.cell_type(), &problem, &solution)
    }

    /// Flux range of `reaction_id` with the high tier reactions of `set` forced active
    pub fn run_fva<S: Solver>(
        &self,
        reaction_id: &str,
        set: ForcedSet,
        solver: &mut S,
    ) -> Result<FvaResult, IntegrationError> {
        let prepared = self.prepare(solver)?;
        FvaBuilder::new(
            self.model,
            &self.parameters,
            &prepared.tiers,
            &prepared.threshold,
        )
        .run(reaction_id, set, solver)
    }
}
