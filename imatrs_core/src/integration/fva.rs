//! Flux variability of a single reaction under forced activity
//!
//! Candidates for forcing are first tested in isolation, each in a fresh problem with only
//! mass balance and the run's bounds, so the model itself is never touched. Candidates that
//! cannot carry ε flux on their own are excluded and reported. The remaining ones are forced
//! to carry at least ε flux, in either direction for reversible reactions, while the
//! reaction of interest is minimized and maximized.
use crate::configuration;
use crate::integration::builder::{
    add_direction_coupling, add_flux_variables, add_mass_balance, add_minimum_objective, flux_id,
    require_optimal,
};
use crate::integration::classify::ReactionTiers;
use crate::integration::objective::ObjectiveThreshold;
use crate::integration::parameters::IntegrationParameters;
use crate::integration::{known_reaction, IntegrationError};
use crate::metabolic_model::model::Model;
use crate::optimize::objective::ObjectiveSense;
use crate::optimize::problem::Problem;
use crate::optimize::solvers::Solver;
use crate::optimize::OptimizationStatus;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// Which high tier reactions are forced active
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForcedSet {
    /// High tier reactions that can only carry flux in one direction
    #[default]
    IrreversibleHighTier,
    /// Every high tier reaction
    AllHighTier,
}

/// Flux range of a reaction under forced activity
#[derive(Debug, Clone, PartialEq)]
pub struct FvaResult {
    pub reaction_id: String,
    pub minimum: f64,
    pub maximum: f64,
    /// Reactions forced to carry flux
    pub forced: IndexSet<String>,
    /// Candidates that could not carry flux on their own
    pub excluded: IndexSet<String>,
}

/// Bounds tried when testing whether a reaction can carry `epsilon` flux, in order
pub fn trial_bounds((lower, upper): (f64, f64), epsilon: f64) -> Vec<(f64, f64)> {
    if lower >= 0. {
        vec![(epsilon, upper)]
    } else if upper <= 0. {
        vec![(lower, -epsilon)]
    } else {
        vec![(epsilon, upper), (lower, -epsilon)]
    }
}

/// Whether the network stays feasible with the flux of `reaction_id` restricted to `bounds`
///
/// Every other reaction keeps the bounds given by `parameters`.
pub fn is_feasible_with_bounds<S: Solver>(
    model: &Model,
    parameters: &IntegrationParameters,
    reaction_id: &str,
    (lower, upper): (f64, f64),
    solver: &mut S,
) -> Result<bool, IntegrationError> {
    known_reaction(model, reaction_id)?;
    if lower > upper {
        return Ok(false);
    }
    let mut problem =
        Problem::new_maximization().with_name(&format!("feasibility_{}", reaction_id));
    add_flux_variables(&mut problem, model, |r| parameters.effective_bounds(r))?;
    add_mass_balance(&mut problem, model)?;
    problem.update_variable_bounds(&flux_id(reaction_id), lower, upper)?;
    let solution = problem.solve(solver)?;
    match solution.status {
        OptimizationStatus::Optimal | OptimizationStatus::Unbounded => Ok(true),
        OptimizationStatus::Infeasible => Ok(false),
    }
}

/// Builds and solves the variability problems of one reaction
pub struct FvaBuilder<'a> {
    model: &'a Model,
    parameters: &'a IntegrationParameters,
    tiers: &'a ReactionTiers,
    threshold: &'a ObjectiveThreshold,
}

impl<'a> FvaBuilder<'a> {
    pub fn new(
        model: &'a Model,
        parameters: &'a IntegrationParameters,
        tiers: &'a ReactionTiers,
        threshold: &'a ObjectiveThreshold,
    ) -> Self {
        Self {
            model,
            parameters,
            tiers,
            threshold,
        }
    }

    /// High tier reactions considered for forcing
    pub fn candidates(&self, set: ForcedSet) -> Result<Vec<&'a str>, IntegrationError> {
        let mut candidates = Vec::new();
        for id in &self.tiers.high {
            let reaction = known_reaction(self.model, id)?;
            let (lower, upper) = self.parameters.effective_bounds(reaction);
            let keep = match set {
                ForcedSet::AllHighTier => true,
                ForcedSet::IrreversibleHighTier => lower >= 0. || upper <= 0.,
            };
            if keep {
                candidates.push(id.as_str());
            }
        }
        Ok(candidates)
    }

    /// Split `candidates` into those that can carry ε flux alone and those that can't
    pub fn feasible_forced_set<S: Solver>(
        &self,
        candidates: &[&str],
        solver: &mut S,
    ) -> Result<(IndexSet<String>, IndexSet<String>), IntegrationError> {
        let mut forced = IndexSet::new();
        let mut excluded = IndexSet::new();
        for id in candidates {
            let bounds = self
                .parameters
                .effective_bounds(known_reaction(self.model, id)?);
            let mut feasible = false;
            for trial in trial_bounds(bounds, self.parameters.epsilon) {
                if is_feasible_with_bounds(self.model, self.parameters, id, trial, solver)? {
                    feasible = true;
                    break;
                }
            }
            if feasible {
                forced.insert(id.to_string());
            } else {
                log::warn!("Reaction {} can't carry flux on its own, not forcing it", id);
                excluded.insert(id.to_string());
            }
        }
        Ok((forced, excluded))
    }

    /// Problem optimizing the flux of `reaction_id` with every reaction of `forced` active
    pub fn build(
        &self,
        reaction_id: &str,
        forced: &IndexSet<String>,
        sense: ObjectiveSense,
    ) -> Result<Problem, IntegrationError> {
        known_reaction(self.model, reaction_id)?;
        let name = match sense {
            ObjectiveSense::Minimize => format!("fva_min_{}", reaction_id),
            ObjectiveSense::Maximize => format!("fva_max_{}", reaction_id),
        };
        let mut problem = Problem::new(sense).with_name(&name);
        add_flux_variables(&mut problem, self.model, |r| {
            self.parameters.effective_bounds(r)
        })?;
        add_mass_balance(&mut problem, self.model)?;
        for coupling in &self.parameters.direction_couplings {
            add_direction_coupling(&mut problem, coupling)?;
        }
        add_minimum_objective(&mut problem, self.threshold)?;
        for id in forced {
            self.add_forced_activity(&mut problem, id)?;
        }
        problem.add_new_linear_objective_term_by_id(&flux_id(reaction_id), 1.)?;
        log::debug!(
            "Built {} with {} forced reactions and {} constraints",
            name,
            forced.len(),
            problem.constraints().len()
        );
        Ok(problem)
    }

    /// Require at least ε flux through `reaction_id`, in one direction for a reversible
    /// reaction
    fn add_forced_activity(
        &self,
        problem: &mut Problem,
        reaction_id: &str,
    ) -> Result<(), IntegrationError> {
        let epsilon = self.parameters.epsilon;
        let (lower, upper) = self
            .parameters
            .effective_bounds(known_reaction(self.model, reaction_id)?);
        let v = flux_id(reaction_id);
        if lower >= 0. {
            problem.add_new_inequality_constraint_by_id(
                &format!("forced_forward_{}", reaction_id),
                &[&v],
                &[1.],
                epsilon,
                f64::INFINITY,
            )?;
        } else if upper <= 0. {
            problem.add_new_inequality_constraint_by_id(
                &format!("forced_reverse_{}", reaction_id),
                &[&v],
                &[1.],
                f64::NEG_INFINITY,
                -epsilon,
            )?;
        } else {
            let config = configuration::current();
            let lower = if lower.is_finite() { lower } else { config.lower_bound };
            let upper = if upper.is_finite() { upper } else { config.upper_bound };
            let big_m = lower.abs().max(upper.abs()) + epsilon;
            let y = format!("ydir_{}", reaction_id);
            problem.add_new_binary_variable(&y)?;
            // y = 1 gives v >= ε, y = 0 gives v <= -ε
            problem.add_new_inequality_constraint_by_id(
                &format!("forced_forward_{}", reaction_id),
                &[&v, &y],
                &[1., -big_m],
                epsilon - big_m,
                f64::INFINITY,
            )?;
            problem.add_new_inequality_constraint_by_id(
                &format!("forced_reverse_{}", reaction_id),
                &[&v, &y],
                &[1., -big_m],
                f64::NEG_INFINITY,
                -epsilon,
            )?;
        }
        Ok(())
    }

    /// Minimum and maximum flux of `reaction_id` with the feasible part of `set` forced
    ///
    /// Either problem being infeasible is an error.
    pub fn run<S: Solver>(
        &self,
        reaction_id: &str,
        set: ForcedSet,
        solver: &mut S,
    ) -> Result<FvaResult, IntegrationError> {
        known_reaction(self.model, reaction_id)?;
        let candidates = self.candidates(set)?;
        let (forced, excluded) = self.feasible_forced_set(&candidates, solver)?;

        let mut optimize = |sense: ObjectiveSense| -> Result<f64, IntegrationError> {
            let problem = self.build(reaction_id, &forced, sense)?;
            let solution = require_optimal(problem.solve(solver)?, problem.name())?;
            Ok(solution.objective_value.unwrap_or(0.))
        };
        let minimum = optimize(ObjectiveSense::Minimize)?;
        let maximum = optimize(ObjectiveSense::Maximize)?;
        log::info!(
            "Flux of {} ranges from {} to {} with {} reactions forced",
            reaction_id,
            minimum,
            maximum,
            forced.len()
        );
        Ok(FvaResult {
            reaction_id: reaction_id.to_string(),
            minimum,
            maximum,
            forced,
            excluded,
        })
    }
}
