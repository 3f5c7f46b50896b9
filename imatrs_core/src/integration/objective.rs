//! Unconstrained optimum of the model objective, and the flux required of it
use crate::integration::builder::{add_flux_variables, add_mass_balance, flux_id, require_optimal};
use crate::integration::IntegrationError;
use crate::metabolic_model::model::Model;
use crate::optimize::problem::Problem;
use crate::optimize::solvers::Solver;

/// Minimum flux the objective reaction must carry
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectiveThreshold {
    pub reaction_id: String,
    /// Optimum of the objective over the native bounds
    pub optimum: f64,
    /// Percentage of the optimum required
    pub fraction: f64,
    /// `fraction / 100 * optimum`
    pub required_flux: f64,
}

/// Maximize the model objective subject to mass balance and the native bounds
pub fn unconstrained_optimum<S: Solver>(
    model: &Model,
    solver: &mut S,
) -> Result<f64, IntegrationError> {
    let (objective_id, coefficient) = model.objective_reaction()?;
    let mut problem = Problem::new_maximization().with_name("unconstrained_optimum");
    add_flux_variables(&mut problem, model, |r| (r.lower_bound, r.upper_bound))?;
    add_mass_balance(&mut problem, model)?;
    problem.add_new_linear_objective_term_by_id(&flux_id(objective_id), coefficient)?;
    let solution = require_optimal(problem.solve(solver)?, problem.name())?;
    let optimum = solution.objective_value.unwrap_or(0.);
    log::info!("Unconstrained optimum of {} is {}", objective_id, optimum);
    Ok(optimum)
}

/// Compute the flux the objective reaction must reach, `optimum_fraction` percent of the
/// unconstrained optimum
pub fn objective_threshold<S: Solver>(
    model: &Model,
    optimum_fraction: f64,
    solver: &mut S,
) -> Result<ObjectiveThreshold, IntegrationError> {
    let optimum = unconstrained_optimum(model, solver)?;
    let (reaction_id, _) = model.objective_reaction()?;
    Ok(ObjectiveThreshold {
        reaction_id: reaction_id.to_string(),
        optimum,
        fraction: optimum_fraction,
        required_flux: optimum * optimum_fraction / 100.,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integration::test_models::two_reaction_model;
    use crate::metabolic_model::model::ModelError;
    use crate::optimize::solvers::microlp::MicrolpSolver;
    use std::path::PathBuf;

    #[test]
    fn two_reaction_optimum() {
        let model = two_reaction_model();
        let threshold = objective_threshold(&model, 80., &mut MicrolpSolver::new()).unwrap();
        assert_eq!(threshold.reaction_id, "R_out");
        assert!((threshold.optimum - 10.).abs() < 1e-6);
        assert!((threshold.required_flux - 8.).abs() < 1e-6);
    }

    #[test]
    fn toy_model_optimum() {
        let model = Model::read_json(
            PathBuf::from(env!("CARGO_MANIFEST_DIR"))
                .join("test_data")
                .join("toy_model.json"),
        )
        .unwrap();
        // BIOMASS is limited by the uptake of A
        let optimum = unconstrained_optimum(&model, &mut MicrolpSolver::new()).unwrap();
        assert!((optimum - 10.).abs() < 1e-6);
    }

    #[test]
    fn multiple_objectives() {
        let mut model = two_reaction_model();
        model.set_objective_coefficient("R_in", 1.);
        assert!(matches!(
            unconstrained_optimum(&model, &mut MicrolpSolver::new()),
            Err(IntegrationError::Model(ModelError::MultipleObjectives(_)))
        ));
    }

    #[test]
    fn unbounded_optimum() {
        let mut model = two_reaction_model();
        for reaction in model.reactions.values_mut() {
            reaction.upper_bound = f64::INFINITY;
        }
        assert!(matches!(
            unconstrained_optimum(&model, &mut MicrolpSolver::new()),
            Err(IntegrationError::Unbounded { .. })
        ));
    }
}
