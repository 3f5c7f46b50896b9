//! Structured results of an integration run
use crate::expression::discretize::{DiscretizationMethod, Discretization, Quantiles, Thresholds};
use crate::expression::{ExpressionLabel, ExpressionTable};
use crate::integration::builder::{flux_id, forward_id, reverse_id, ImatProblem};
use crate::integration::classify::{ReactionTiers, Tier};
use crate::integration::parameters::{FixedExchange, IntegrationParameters, ObjectiveKind};
use crate::integration::IntegrationError;
use crate::metabolic_model::model::Model;
use crate::optimize::solvers::SolverError;
use crate::optimize::{OptimizationStatus, ProblemSolution};

/// Flux and activity of one reaction at the optimum
#[derive(Debug, Clone, PartialEq)]
pub struct ReactionFlux {
    pub reaction_id: String,
    pub flux: f64,
    pub tier: Option<Tier>,
    /// Forward indicator, for reactions given indicators
    pub forward: Option<f64>,
    /// Reverse indicator, for reactions given indicators
    pub reverse: Option<f64>,
    /// Objective weight, for weighted objectives
    pub weight: Option<f64>,
}

/// Expression of one model gene after discretization
#[derive(Debug, Clone, PartialEq)]
pub struct GeneRecord {
    pub gene_id: String,
    pub raw: Option<f64>,
    pub scaled: Option<f64>,
    pub label: Option<ExpressionLabel>,
}

/// Parameters and statistics a result was produced with
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSummary {
    pub method: DiscretizationMethod,
    pub quantiles: Option<Quantiles>,
    pub raw_thresholds: Thresholds,
    pub scaled_thresholds: Thresholds,
    pub mean: f64,
    pub standard_deviation: f64,
    pub median: f64,
    pub epsilon: f64,
    pub optimum_fraction: f64,
    pub required_flux: f64,
    pub fixed_exchange: Option<FixedExchange>,
    pub objective_kind: ObjectiveKind,
}

/// Everything a completed run produces
#[derive(Debug, Clone, PartialEq)]
pub struct IntegrationResult {
    pub problem_name: String,
    pub cell_type: String,
    pub status: OptimizationStatus,
    pub objective_value: f64,
    /// One row per model reaction, in model order
    pub reactions: Vec<ReactionFlux>,
    pub genes: Vec<GeneRecord>,
    pub parameters: ParameterSummary,
    /// Model genes without a measurement
    pub missing_genes: Vec<String>,
}

impl IntegrationResult {
    pub fn reaction(&self, reaction_id: &str) -> Option<&ReactionFlux> {
        self.reactions.iter().find(|r| r.reaction_id == reaction_id)
    }
}

/// Identity of a run whose problem had no feasible solution
#[derive(Debug, Clone, PartialEq)]
pub struct InfeasibleRecord {
    pub problem_name: String,
    pub cell_type: String,
    pub epsilon: f64,
    pub method: DiscretizationMethod,
    pub quantiles: Option<Quantiles>,
    pub fixed_exchange: Option<f64>,
}

impl InfeasibleRecord {
    pub fn new(problem_name: &str, cell_type: &str, parameters: &IntegrationParameters) -> Self {
        Self {
            problem_name: problem_name.to_string(),
            cell_type: cell_type.to_string(),
            epsilon: parameters.epsilon,
            method: parameters.discretization_method,
            quantiles: parameters.quantiles,
            fixed_exchange: parameters.fixed_exchange.as_ref().map(|e| e.value),
        }
    }
}

/// Reads a solved problem back into an [`IntegrationResult`]
pub struct ResultExtractor<'a> {
    pub model: &'a Model,
    pub tiers: &'a ReactionTiers,
    pub table: &'a ExpressionTable,
    pub discretization: &'a Discretization,
    pub parameters: &'a IntegrationParameters,
}

impl ResultExtractor<'_> {
    pub fn extract(
        &self,
        cell_type: &str,
        problem: &ImatProblem,
        solution: &ProblemSolution,
    ) -> Result<IntegrationResult, IntegrationError> {
        let value = |id: &str| {
            solution
                .value(id)
                .ok_or_else(|| SolverError::NonExistentVariable(id.to_string()))
        };
        let mut reactions = Vec::with_capacity(self.model.reactions.len());
        for id in self.model.reactions.keys() {
            let (forward, reverse) = if problem.indicator_reactions.contains(id) {
                (
                    Some(value(&forward_id(id))?.round()),
                    Some(value(&reverse_id(id))?.round()),
                )
            } else {
                (None, None)
            };
            reactions.push(ReactionFlux {
                reaction_id: id.clone(),
                flux: value(&flux_id(id))?,
                tier: self.tiers.tier_of(id),
                forward,
                reverse,
                weight: problem.weights.get(id).copied(),
            });
        }

        let genes = self
            .table
            .genes
            .iter()
            .map(|(id, expression)| GeneRecord {
                gene_id: id.clone(),
                raw: expression.raw,
                scaled: expression.scaled,
                label: expression.label,
            })
            .collect();

        Ok(IntegrationResult {
            problem_name: problem.name().to_string(),
            cell_type: cell_type.to_string(),
            status: solution.status,
            objective_value: solution.objective_value.unwrap_or(0.),
            reactions,
            genes,
            parameters: self.summary(problem),
            missing_genes: self.table.missing_genes.clone(),
        })
    }

    fn summary(&self, problem: &ImatProblem) -> ParameterSummary {
        let d = self.discretization;
        ParameterSummary {
            method: d.method,
            quantiles: d.quantiles,
            raw_thresholds: d.raw,
            scaled_thresholds: d.scaled,
            mean: d.mean,
            standard_deviation: d.standard_deviation,
            median: d.median,
            epsilon: self.parameters.epsilon,
            optimum_fraction: problem.threshold.fraction,
            required_flux: problem.threshold.required_flux,
            fixed_exchange: self.parameters.fixed_exchange.clone(),
            objective_kind: problem.objective_kind,
        }
    }
}
