//! Integration of discretized expression data into a metabolic model
//!
//! Expression is turned into reaction tiers by [`classify`], which [`builder`] encodes as a
//! mixed integer problem whose solution is gathered by [`result`]. [`pipeline`] runs the
//! whole sequence for one expression column and parameter set, and [`fva`] bounds single
//! reactions under forced activity.
pub mod builder;
pub mod classify;
pub mod fva;
pub mod objective;
pub mod parameters;
pub mod pipeline;
pub mod result;
pub mod weights;

use crate::expression::ExpressionError;
use crate::io::gpr_parse::GprParseError;
use crate::metabolic_model::model::{Model, ModelError};
use crate::metabolic_model::reaction::Reaction;
use crate::optimize::problem::ProblemError;
use crate::optimize::solvers::SolverError;
use thiserror::Error;

/// Errors raised while building or solving an integration problem
#[derive(Error, Debug)]
pub enum IntegrationError {
    /// Malformed run parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    /// An override or query names a reaction that isn't in the model
    #[error("Reaction {0} is not in the model")]
    UnknownReaction(String),
    /// The solver found no feasible solution
    #[error("Problem {problem} is infeasible")]
    Infeasible { problem: String },
    /// The objective of the problem is unbounded
    #[error("Problem {problem} is unbounded")]
    Unbounded { problem: String },
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Expression(#[from] ExpressionError),
    #[error("Unable to evaluate a gene rule: {0}")]
    Rule(#[from] GprParseError),
    #[error(transparent)]
    Problem(#[from] ProblemError),
    #[error(transparent)]
    Solver(#[from] SolverError),
    #[error("Unable to write results: {0}")]
    Io(#[from] std::io::Error),
}

/// Look up a reaction named by a parameter or query
pub(crate) fn known_reaction<'m>(
    model: &'m Model,
    id: &str,
) -> Result<&'m Reaction, IntegrationError> {
    model
        .reactions
        .get(id)
        .ok_or_else(|| IntegrationError::UnknownReaction(id.to_string()))
}
