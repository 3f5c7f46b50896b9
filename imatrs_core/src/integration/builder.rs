//! Assembly of the integration problem
//!
//! Every reaction gets a flux variable `v_<rxn>`, bounded by its effective bounds. Reactions
//! with an activity indicator also get the binaries `yf_<rxn>`, `yr_<rxn>` and
//! `ytot_<rxn> = yf_<rxn> + yr_<rxn>`.
//!
//! For a high or moderate reaction with effective bounds `[lb, ub]` the indicators certify
//! flux of at least ε in one direction:
//! - `v + yf (lb - ε) >= lb`, so `yf = 1` forces `v >= ε`
//! - `v + yr (ub + ε) <= ub`, so `yr = 1` forces `v <= -ε`
//!
//! For a low reaction `yf = 1` pushes the flux to zero:
//! - `v + lb yf >= lb`
//! - `v + ub yf <= ub`
//!
//! Infinite effective bounds are replaced by the configured default magnitudes.
use crate::configuration;
use crate::integration::classify::{ReactionTiers, Tier};
use crate::integration::objective::ObjectiveThreshold;
use crate::integration::parameters::{DirectionCoupling, IntegrationParameters, ObjectiveKind};
use crate::integration::{known_reaction, IntegrationError};
use crate::metabolic_model::model::Model;
use crate::metabolic_model::reaction::{finite_bounds, Reaction};
use crate::optimize::problem::Problem;
use crate::optimize::solvers::Solver;
use crate::optimize::variable::VariableType;
use crate::optimize::{OptimizationStatus, ProblemSolution};
use indexmap::{IndexMap, IndexSet};

// region Identifiers
pub fn flux_id(reaction_id: &str) -> String {
    format!("v_{}", reaction_id)
}

pub fn forward_id(reaction_id: &str) -> String {
    format!("yf_{}", reaction_id)
}

pub fn reverse_id(reaction_id: &str) -> String {
    format!("yr_{}", reaction_id)
}

pub fn total_id(reaction_id: &str) -> String {
    format!("ytot_{}", reaction_id)
}
// endregion Identifiers

// region Shared Assembly
/// Add a flux variable for every reaction of `model`, with bounds given by `bounds`
pub(crate) fn add_flux_variables<F>(
    problem: &mut Problem,
    model: &Model,
    bounds: F,
) -> Result<(), IntegrationError>
where
    F: Fn(&Reaction) -> (f64, f64),
{
    for (id, reaction) in &model.reactions {
        let (lower, upper) = bounds(reaction);
        problem.add_new_variable(
            &flux_id(id),
            Some(id.as_str()),
            VariableType::Continuous,
            lower,
            upper,
        )?;
    }
    Ok(())
}

/// Steady state: the stoichiometry weighted flux through every metabolite is zero
///
/// Metabolites no reaction touches are skipped.
pub(crate) fn add_mass_balance(
    problem: &mut Problem,
    model: &Model,
) -> Result<(), IntegrationError> {
    let stoichiometry = model.stoichiometric_matrix()?;
    for (row, met_id) in stoichiometry.row_iter().zip(model.metabolites.keys()) {
        if row.nnz() == 0 {
            continue;
        }
        let ids: Vec<String> = row
            .col_indices()
            .iter()
            .filter_map(|col| model.reactions.get_index(*col))
            .map(|(rxn_id, _)| flux_id(rxn_id))
            .collect();
        let vars: Vec<&str> = ids.iter().map(|s| s.as_str()).collect();
        problem.add_new_equality_constraint_by_id(
            &format!("mass_balance_{}", met_id),
            &vars,
            row.values(),
            0.,
        )?;
    }
    Ok(())
}

/// Require the objective reaction to carry at least the threshold flux
pub(crate) fn add_minimum_objective(
    problem: &mut Problem,
    threshold: &ObjectiveThreshold,
) -> Result<(), IntegrationError> {
    problem.add_new_inequality_constraint_by_id(
        "minimum_objective",
        &[&flux_id(&threshold.reaction_id)],
        &[1.],
        threshold.required_flux,
        f64::INFINITY,
    )?;
    Ok(())
}

/// Indicator constraints forcing at least `epsilon` flux in the direction chosen by `yf`/`yr`
fn add_active_constraints(
    problem: &mut Problem,
    id: &str,
    bounds: (f64, f64),
    epsilon: f64,
) -> Result<(), IntegrationError> {
    let (lower, upper) = finite_bounds(bounds);
    let v = flux_id(id);
    problem.add_new_inequality_constraint_by_id(
        &format!("active_forward_{}", id),
        &[&v, &forward_id(id)],
        &[1., lower - epsilon],
        lower,
        f64::INFINITY,
    )?;
    problem.add_new_inequality_constraint_by_id(
        &format!("active_reverse_{}", id),
        &[&v, &reverse_id(id)],
        &[1., upper + epsilon],
        f64::NEG_INFINITY,
        upper,
    )?;
    Ok(())
}

/// Indicator constraints pushing the flux to zero when `yf` is set
fn add_inactive_constraints(
    problem: &mut Problem,
    id: &str,
    bounds: (f64, f64),
) -> Result<(), IntegrationError> {
    let (lower, upper) = finite_bounds(bounds);
    let v = flux_id(id);
    problem.add_new_inequality_constraint_by_id(
        &format!("inactive_lower_{}", id),
        &[&v, &forward_id(id)],
        &[1., lower],
        lower,
        f64::INFINITY,
    )?;
    problem.add_new_inequality_constraint_by_id(
        &format!("inactive_upper_{}", id),
        &[&v, &forward_id(id)],
        &[1., upper],
        f64::NEG_INFINITY,
        upper,
    )?;
    Ok(())
}

fn add_indicator_variables(
    problem: &mut Problem,
    reaction_id: &str,
) -> Result<(), IntegrationError> {
    let (yf, yr, ytot) = (
        forward_id(reaction_id),
        reverse_id(reaction_id),
        total_id(reaction_id),
    );
    problem.add_new_binary_variable(&yf)?;
    problem.add_new_binary_variable(&yr)?;
    problem.add_new_binary_variable(&ytot)?;
    problem.add_new_equality_constraint_by_id(
        &format!("total_{}", reaction_id),
        &[&ytot, &yf, &yr],
        &[1., -1., -1.],
        0.,
    )?;
    Ok(())
}

/// Reactions of a group share one binary `y`, with `v <= M y` and `v >= -M (1 - y)`
pub(crate) fn add_direction_coupling(
    problem: &mut Problem,
    coupling: &DirectionCoupling,
) -> Result<(), IntegrationError> {
    let big_m = coupling.big_m.unwrap_or_else(|| {
        let config = configuration::current();
        config.lower_bound.abs().max(config.upper_bound.abs())
    });
    let y = format!("ycouple_{}", coupling.id);
    problem.add_new_binary_variable(&y)?;
    for rxn_id in &coupling.reactions {
        let v = flux_id(rxn_id);
        problem.add_new_inequality_constraint_by_id(
            &format!("coupling_{}_{}_upper", coupling.id, rxn_id),
            &[&v, &y],
            &[1., -big_m],
            f64::NEG_INFINITY,
            0.,
        )?;
        problem.add_new_inequality_constraint_by_id(
            &format!("coupling_{}_{}_lower", coupling.id, rxn_id),
            &[&v, &y],
            &[1., -big_m],
            -big_m,
            f64::INFINITY,
        )?;
    }
    Ok(())
}

/// Turn a solution into an error unless it is optimal
pub(crate) fn require_optimal(
    solution: ProblemSolution,
    problem_name: &str,
) -> Result<ProblemSolution, IntegrationError> {
    match solution.status {
        OptimizationStatus::Optimal => Ok(solution),
        OptimizationStatus::Infeasible => Err(IntegrationError::Infeasible {
            problem: problem_name.to_string(),
        }),
        OptimizationStatus::Unbounded => Err(IntegrationError::Unbounded {
            problem: problem_name.to_string(),
        }),
    }
}
// endregion Shared Assembly

/// An assembled integration problem, with what is needed to read its solution back
#[derive(Debug, Clone, PartialEq)]
pub struct ImatProblem {
    pub problem: Problem,
    /// Reactions given activity indicators, in tier order
    pub indicator_reactions: IndexSet<String>,
    /// Objective weight of each weighted reaction
    pub weights: IndexMap<String, f64>,
    pub threshold: ObjectiveThreshold,
    pub objective_kind: ObjectiveKind,
}

impl ImatProblem {
    pub fn name(&self) -> &str {
        self.problem.name()
    }

    /// Solve the problem, infeasible and unbounded problems are errors
    pub fn solve<S: Solver>(&self, solver: &mut S) -> Result<ProblemSolution, IntegrationError> {
        let solution = self.problem.solve(solver)?;
        log::info!("Problem {} solved with status {:?}", self.name(), solution.status);
        require_optimal(solution, self.name())
    }
}

/// Builds the integration problem for one set of tiers
pub struct ProblemBuilder<'a> {
    name: String,
    model: &'a Model,
    parameters: &'a IntegrationParameters,
    tiers: &'a ReactionTiers,
    weights: &'a IndexMap<String, f64>,
    threshold: &'a ObjectiveThreshold,
}

impl<'a> ProblemBuilder<'a> {
    pub fn new(
        model: &'a Model,
        parameters: &'a IntegrationParameters,
        tiers: &'a ReactionTiers,
        weights: &'a IndexMap<String, f64>,
        threshold: &'a ObjectiveThreshold,
    ) -> Self {
        Self {
            name: parameters.objective_kind.to_string(),
            model,
            parameters,
            tiers,
            weights,
            threshold,
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Tiers whose reactions get activity indicators
    fn indicator_tiers(&self) -> &'static [Tier] {
        if self.parameters.objective_kind.is_weighted() {
            &[Tier::High, Tier::Moderate, Tier::Low]
        } else {
            &[Tier::High, Tier::Low]
        }
    }

    pub fn build(&self) -> Result<ImatProblem, IntegrationError> {
        let mut problem = Problem::new_maximization().with_name(&self.name);
        add_flux_variables(&mut problem, self.model, |r| {
            self.parameters.effective_bounds(r)
        })?;
        add_mass_balance(&mut problem, self.model)?;
        for coupling in &self.parameters.direction_couplings {
            add_direction_coupling(&mut problem, coupling)?;
        }
        add_minimum_objective(&mut problem, self.threshold)?;

        let mut indicator_reactions = IndexSet::new();
        for tier in self.indicator_tiers() {
            for id in self.tiers.tier(*tier) {
                let bounds = self
                    .parameters
                    .effective_bounds(known_reaction(self.model, id)?);
                add_indicator_variables(&mut problem, id)?;
                match tier {
                    Tier::High | Tier::Moderate => {
                        add_active_constraints(&mut problem, id, bounds, self.parameters.epsilon)?
                    }
                    Tier::Low => add_inactive_constraints(&mut problem, id, bounds)?,
                }
                indicator_reactions.insert(id.clone());
            }
        }
        self.add_objective(&mut problem)?;
        log::debug!(
            "Built {} with {} variables, {} constraints and {} indicator reactions",
            self.name,
            problem.variables().len(),
            problem.constraints().len(),
            indicator_reactions.len()
        );

        Ok(ImatProblem {
            problem,
            indicator_reactions,
            weights: self.weights.clone(),
            threshold: self.threshold.clone(),
            objective_kind: self.parameters.objective_kind,
        })
    }

    fn add_objective(&self, problem: &mut Problem) -> Result<(), IntegrationError> {
        let weight = |id: &str| self.weights.get(id).copied().unwrap_or(1.);
        let kind = self.parameters.objective_kind;
        let active_tiers: &[Tier] = if kind.is_weighted() {
            &[Tier::High, Tier::Moderate]
        } else {
            &[Tier::High]
        };
        for tier in active_tiers {
            for id in self.tiers.tier(*tier) {
                let c = if kind.is_weighted() { weight(id) } else { 1. };
                problem.add_new_linear_objective_term_by_id(&forward_id(id), c)?;
                problem.add_new_linear_objective_term_by_id(&reverse_id(id), c)?;
            }
        }
        for id in &self.tiers.low {
            let c = match kind {
                ObjectiveKind::TripleWeighted => weight(id),
                ObjectiveKind::Plain | ObjectiveKind::Weighted => 1.,
            };
            problem.add_new_linear_objective_term_by_id(&forward_id(id), c)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integration::parameters::{BoundOverride, FixedExchange};
    use crate::integration::test_models::two_reaction_model;
    use crate::metabolic_model::metabolite::MetaboliteBuilder;
    use crate::metabolic_model::reaction::ReactionBuilder;
    use crate::optimize::constraint::Constraint;
    use crate::optimize::solvers::microlp::MicrolpSolver;

    fn threshold(required_flux: f64) -> ObjectiveThreshold {
        ObjectiveThreshold {
            reaction_id: "R_out".to_string(),
            optimum: 10.,
            fraction: required_flux * 10.,
            required_flux,
        }
    }

    fn tiers(high: &[&str], moderate: &[&str], low: &[&str]) -> ReactionTiers {
        let set = |ids: &[&str]| ids.iter().map(|s| s.to_string()).collect();
        ReactionTiers {
            high: set(high),
            moderate: set(moderate),
            low: set(low),
        }
    }

    fn parameters(kind: ObjectiveKind) -> IntegrationParameters {
        IntegrationParameters {
            objective_kind: kind,
            epsilon: 1.,
            ..Default::default()
        }
    }

    fn solve(
        model: &Model,
        params: &IntegrationParameters,
        tiers: &ReactionTiers,
        weights: &IndexMap<String, f64>,
        threshold: &ObjectiveThreshold,
    ) -> ProblemSolution {
        ProblemBuilder::new(model, params, tiers, weights, threshold)
            .build()
            .unwrap()
            .solve(&mut MicrolpSolver::new())
            .unwrap()
    }

    #[test]
    fn plain_objective_on_two_reactions() {
        let model = two_reaction_model();
        let params = parameters(ObjectiveKind::Plain);
        let tiers = tiers(&["R_in"], &[], &["R_out"]);
        let solution = solve(&model, &params, &tiers, &IndexMap::new(), &threshold(10.));
        assert!((solution.objective_value.unwrap() - 1.).abs() < 1e-6);
        assert!((solution.value("v_R_in").unwrap() - 10.).abs() < 1e-6);
        assert!((solution.value("v_R_out").unwrap() - 10.).abs() < 1e-6);
        assert_eq!(solution.value("yf_R_in"), Some(1.));
        assert_eq!(solution.value("yr_R_in"), Some(0.));
        assert_eq!(solution.value("ytot_R_in"), Some(1.));
        assert_eq!(solution.value("yf_R_out"), Some(0.));
    }

    #[test]
    fn weighted_objective_on_two_reactions() {
        let model = two_reaction_model();
        let params = parameters(ObjectiveKind::Weighted);
        let tiers = tiers(&["R_in"], &[], &["R_out"]);
        let weights = IndexMap::from([("R_in".to_string(), 1.2)]);
        let solution = solve(&model, &params, &tiers, &weights, &threshold(10.));
        assert!((solution.objective_value.unwrap() - 1.2).abs() < 1e-6);
    }

    #[test]
    fn low_tier_weighting() {
        let model = two_reaction_model();
        let tiers = tiers(&["R_in"], &[], &["R_out"]);
        let weights = IndexMap::from([("R_in".to_string(), 0.3), ("R_out".to_string(), 0.8)]);

        // shutting both reactions off earns the low indicator instead of the high one
        let triple = parameters(ObjectiveKind::TripleWeighted);
        let solution = solve(&model, &triple, &tiers, &weights, &threshold(0.));
        assert!((solution.objective_value.unwrap() - 0.8).abs() < 1e-6);
        assert!(solution.value("v_R_in").unwrap().abs() < 1e-6);
        assert!(solution.value("v_R_out").unwrap().abs() < 1e-6);
        assert_eq!(solution.value("yf_R_out"), Some(1.));

        // the weighted objective counts the low indicator at unit weight
        let weighted = parameters(ObjectiveKind::Weighted);
        let solution = solve(&model, &weighted, &tiers, &weights, &threshold(0.));
        assert!((solution.objective_value.unwrap() - 1.).abs() < 1e-6);
    }

    #[test]
    fn moderate_tier_indicators() {
        let model = two_reaction_model();
        let tiers = tiers(&[], &["R_in"], &[]);
        let threshold = threshold(0.);
        let weights = IndexMap::new();

        let plain = parameters(ObjectiveKind::Plain);
        let built = ProblemBuilder::new(&model, &plain, &tiers, &weights, &threshold)
            .build()
            .unwrap();
        assert!(built.indicator_reactions.is_empty());
        assert!(built.problem.variable("yf_R_in").is_none());

        let weighted = parameters(ObjectiveKind::Weighted);
        let built = ProblemBuilder::new(&model, &weighted, &tiers, &weights, &threshold)
            .build()
            .unwrap();
        assert!(built.indicator_reactions.contains("R_in"));
        assert!(built.problem.constraint("active_forward_R_in").is_some());
        assert!(built.problem.constraint("active_reverse_R_in").is_some());
        assert!((built.problem.objective().coefficient("yf_R_in") - 1.).abs() < 1e-12);
    }

    #[test]
    fn constraint_layout() {
        let model = two_reaction_model();
        let params = parameters(ObjectiveKind::Plain);
        let tiers = tiers(&["R_in"], &[], &["R_out"]);
        let built = ProblemBuilder::new(&model, &params, &tiers, &IndexMap::new(), &threshold(8.))
            .with_name("toy")
            .build()
            .unwrap();
        assert_eq!(built.name(), "toy");
        let problem = &built.problem;
        assert_eq!(
            problem.constraint("mass_balance_A").unwrap().to_string(),
            "1*v_R_in + -1*v_R_out = 0"
        );
        assert_eq!(
            problem.constraint("active_forward_R_in").unwrap().to_string(),
            "0 <= 1*v_R_in + -1*yf_R_in <= inf"
        );
        assert_eq!(
            problem.constraint("active_reverse_R_in").unwrap().to_string(),
            "-inf <= 1*v_R_in + 11*yr_R_in <= 10"
        );
        assert_eq!(
            problem.constraint("inactive_upper_R_out").unwrap().to_string(),
            "-inf <= 1*v_R_out + 10*yf_R_out <= 10"
        );
        assert_eq!(
            problem.constraint("total_R_in").unwrap().to_string(),
            "1*ytot_R_in + -1*yf_R_in + -1*yr_R_in = 0"
        );
        match problem.constraint("minimum_objective").unwrap() {
            Constraint::Inequality { lower_bound, .. } => assert_eq!(*lower_bound, 8.),
            Constraint::Equality { .. } => panic!("minimum objective should be an inequality"),
        }
    }

    #[test]
    fn building_is_deterministic() {
        let model = two_reaction_model();
        let params = parameters(ObjectiveKind::Weighted);
        let tiers = tiers(&["R_in"], &[], &["R_out"]);
        let weights = IndexMap::from([("R_in".to_string(), 1.2)]);
        let threshold = threshold(10.);
        let first = ProblemBuilder::new(&model, &params, &tiers, &weights, &threshold)
            .build()
            .unwrap();
        let second = ProblemBuilder::new(&model, &params, &tiers, &weights, &threshold)
            .build()
            .unwrap();
        assert_eq!(first, second);
        let mut solver = MicrolpSolver::new();
        assert_eq!(
            first.solve(&mut solver).unwrap().objective_value,
            second.solve(&mut solver).unwrap().objective_value
        );
    }

    #[test]
    fn overrides_shape_flux_bounds() {
        let model = two_reaction_model();
        let params = IntegrationParameters {
            fixed_exchange: Some(FixedExchange {
                reaction_id: "R_in".to_string(),
                value: 4.,
            }),
            bound_overrides: IndexMap::from([(
                "R_out".to_string(),
                BoundOverride {
                    lower: None,
                    upper: Some(6.),
                },
            )]),
            ..Default::default()
        };
        let no_tiers = ReactionTiers::default();
        let built = ProblemBuilder::new(
            &model,
            &params,
            &no_tiers,
            &IndexMap::new(),
            &threshold(0.),
        )
        .build()
        .unwrap();
        let v_in = built.problem.variable("v_R_in").unwrap();
        assert_eq!((v_in.lower_bound, v_in.upper_bound), (4., 4.));
        let v_out = built.problem.variable("v_R_out").unwrap();
        assert_eq!((v_out.lower_bound, v_out.upper_bound), (0., 6.));

        // fixing the input above what the output can take is infeasible
        let params = IntegrationParameters {
            fixed_exchange: Some(FixedExchange {
                reaction_id: "R_in".to_string(),
                value: 8.,
            }),
            ..params
        };
        let built = ProblemBuilder::new(
            &model,
            &params,
            &no_tiers,
            &IndexMap::new(),
            &threshold(0.),
        )
        .build()
        .unwrap();
        assert!(matches!(
            built.solve(&mut MicrolpSolver::new()),
            Err(IntegrationError::Infeasible { .. })
        ));
    }

    #[test]
    fn indicators_use_overridden_bounds() {
        let model = two_reaction_model();
        let params = IntegrationParameters {
            bound_overrides: IndexMap::from([
                (
                    "R_in".to_string(),
                    BoundOverride {
                        lower: Some(-0.5),
                        upper: None,
                    },
                ),
                (
                    "R_out".to_string(),
                    BoundOverride {
                        lower: None,
                        upper: Some(6.),
                    },
                ),
            ]),
            ..parameters(ObjectiveKind::Plain)
        };
        let tiers = tiers(&["R_in"], &[], &["R_out"]);
        let built = ProblemBuilder::new(&model, &params, &tiers, &IndexMap::new(), &threshold(0.))
            .build()
            .unwrap();
        let problem = &built.problem;
        // with yf = 0 the widened lower bound stays reachable
        assert_eq!(
            problem.constraint("active_forward_R_in").unwrap().to_string(),
            "-0.5 <= 1*v_R_in + -1.5*yf_R_in <= inf"
        );
        assert_eq!(
            problem.constraint("inactive_upper_R_out").unwrap().to_string(),
            "-inf <= 1*v_R_out + 6*yf_R_out <= 6"
        );
    }

    #[test]
    fn direction_coupling() {
        // A is made by R1 and R2 and never consumed, so R1 = -R2
        let mut model = Model::new_empty();
        model.add_metabolite(MetaboliteBuilder::default().id("A").build().unwrap());
        for id in ["R1", "R2"] {
            model.add_reaction(
                ReactionBuilder::default()
                    .id(id)
                    .metabolites(IndexMap::from([("A".to_string(), 1.)]))
                    .lower_bound(-10.)
                    .upper_bound(10.)
                    .build()
                    .unwrap(),
            );
        }
        model.set_objective_coefficient("R1", 1.);
        let required = ObjectiveThreshold {
            reaction_id: "R1".to_string(),
            optimum: 10.,
            fraction: 50.,
            required_flux: 5.,
        };
        let free = IntegrationParameters::default();
        let solution = solve(&model, &free, &ReactionTiers::default(), &IndexMap::new(), &required);
        assert!(solution.value("v_R1").unwrap() >= 5. - 1e-6);

        let coupled = IntegrationParameters {
            direction_couplings: vec![DirectionCoupling {
                id: "pair".to_string(),
                reactions: vec!["R1".to_string(), "R2".to_string()],
                big_m: Some(100.),
            }],
            ..Default::default()
        };
        let built = ProblemBuilder::new(
            &model,
            &coupled,
            &ReactionTiers::default(),
            &IndexMap::new(),
            &required,
        )
        .build()
        .unwrap();
        assert!(built.problem.constraint("coupling_pair_R2_lower").is_some());
        assert!(matches!(
            built.solve(&mut MicrolpSolver::new()),
            Err(IntegrationError::Infeasible { .. })
        ));
    }
}
