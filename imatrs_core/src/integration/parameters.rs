//! Parameters of a single integration run
use crate::expression::discretize::{DiscretizationMethod, Discretizer, Quantiles};
use crate::expression::SpeciesFilter;
use crate::integration::{known_reaction, IntegrationError};
use crate::metabolic_model::model::Model;
use crate::metabolic_model::reaction::Reaction;
use derive_builder::Builder;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::path::Path;

/// Exchange reaction fixed by [`FixedExchange::oxygen`]
pub const OXYGEN_EXCHANGE: &str = "EX_o2_e";

/// Which objective the integration problem maximizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectiveKind {
    /// Count of satisfied high and low indicators
    #[default]
    Plain,
    /// High and moderate indicators weighted by expression, low at unit weight
    Weighted,
    /// Every tier weighted by expression
    TripleWeighted,
}

impl ObjectiveKind {
    /// Whether moderate reactions get indicators and weights
    pub fn is_weighted(&self) -> bool {
        !matches!(self, ObjectiveKind::Plain)
    }
}

impl Display for ObjectiveKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ObjectiveKind::Plain => write!(f, "iMAT"),
            ObjectiveKind::Weighted => write!(f, "weighted_iMAT"),
            ObjectiveKind::TripleWeighted => write!(f, "triple_weighted_iMAT"),
        }
    }
}

/// How the gene sets of the tier cascade are applied to a rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CascadeSemantics {
    /// The set holds the genes considered present
    Presence,
    /// The set holds knocked out genes, every other gene is present
    #[default]
    Knockout,
}

/// Exchange reaction pinned to a single flux value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixedExchange {
    #[serde(default = "default_exchange_id")]
    pub reaction_id: String,
    pub value: f64,
}

fn default_exchange_id() -> String {
    OXYGEN_EXCHANGE.to_string()
}

impl FixedExchange {
    /// Fix the oxygen exchange
    pub fn oxygen(value: f64) -> Self {
        Self {
            reaction_id: default_exchange_id(),
            value,
        }
    }
}

/// Replacement for one or both bounds of a reaction
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundOverride {
    #[serde(default)]
    pub lower: Option<f64>,
    #[serde(default)]
    pub upper: Option<f64>,
}

impl BoundOverride {
    pub fn apply(&self, (lower, upper): (f64, f64)) -> (f64, f64) {
        (self.lower.unwrap_or(lower), self.upper.unwrap_or(upper))
    }
}

/// Reactions forced to carry flux in the same direction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectionCoupling {
    /// Used in the ids of the coupling variable and constraints
    pub id: String,
    pub reactions: Vec<String>,
    /// Defaults to the configured bound magnitude
    #[serde(default)]
    pub big_m: Option<f64>,
}

/// Parameters of a single integration run
#[derive(Builder, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[builder(default)]
#[serde(default)]
pub struct IntegrationParameters {
    pub discretization_method: DiscretizationMethod,
    /// Percentiles for the quantile method, 40 and 70 when not given
    #[builder(setter(strip_option))]
    pub quantiles: Option<Quantiles>,
    /// Minimum flux of an active reaction
    pub epsilon: f64,
    /// Percentage of the unconstrained optimum the objective reaction must reach
    pub optimum_fraction: f64,
    /// Species to keep, detected from the expression file when not given
    #[builder(setter(strip_option))]
    pub species_filter: Option<SpeciesFilter>,
    #[builder(setter(strip_option))]
    pub fixed_exchange: Option<FixedExchange>,
    pub bound_overrides: IndexMap<String, BoundOverride>,
    pub direction_couplings: Vec<DirectionCoupling>,
    pub objective_kind: ObjectiveKind,
    pub cascade: CascadeSemantics,
}

impl Default for IntegrationParameters {
    fn default() -> Self {
        Self {
            discretization_method: DiscretizationMethod::Mean,
            quantiles: None,
            epsilon: 1.0,
            optimum_fraction: 80.,
            species_filter: None,
            fixed_exchange: None,
            bound_overrides: IndexMap::new(),
            direction_couplings: Vec::new(),
            objective_kind: ObjectiveKind::Plain,
            cascade: CascadeSemantics::Knockout,
        }
    }
}

impl IntegrationParameters {
    /// Read parameters from a JSON file, missing fields take their default
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, IntegrationError> {
        let data = std::fs::read_to_string(path)?;
        serde_json::from_str(&data).map_err(|err| {
            IntegrationError::InvalidParameter(format!("unable to parse parameters: {}", err))
        })
    }

    /// Discretizer described by the method and quantiles
    pub fn discretizer(&self) -> Result<Discretizer, IntegrationError> {
        Ok(Discretizer::new(
            self.discretization_method,
            self.quantiles,
        )?)
    }

    /// Check the parameters against `model` before anything is built
    pub fn validate(&self, model: &Model) -> Result<(), IntegrationError> {
        if !(self.epsilon.is_finite() && self.epsilon > 0.) {
            return Err(IntegrationError::InvalidParameter(format!(
                "epsilon must be positive, got {}",
                self.epsilon
            )));
        }
        if !(0. ..=100.).contains(&self.optimum_fraction) {
            return Err(IntegrationError::InvalidParameter(format!(
                "optimum fraction must be between 0 and 100, got {}",
                self.optimum_fraction
            )));
        }
        self.discretizer()?;

        if let Some(exchange) = &self.fixed_exchange {
            known_reaction(model, &exchange.reaction_id)?;
        }
        for id in self.bound_overrides.keys() {
            let (lower, upper) = self.effective_bounds(known_reaction(model, id)?);
            if lower > upper {
                return Err(IntegrationError::InvalidParameter(format!(
                    "override gives {} a lower bound above its upper bound",
                    id
                )));
            }
        }
        for coupling in &self.direction_couplings {
            for id in &coupling.reactions {
                known_reaction(model, id)?;
            }
            if let Some(big_m) = coupling.big_m {
                if !(big_m.is_finite() && big_m > 0.) {
                    return Err(IntegrationError::InvalidParameter(format!(
                        "coupling {} needs a positive big M",
                        coupling.id
                    )));
                }
            }
        }
        Ok(())
    }

    /// Flux bounds of `reaction` once overrides and the fixed exchange are applied
    ///
    /// The fixed exchange takes precedence over a bound override of the same reaction.
    pub fn effective_bounds(&self, reaction: &Reaction) -> (f64, f64) {
        if let Some(exchange) = &self.fixed_exchange {
            if exchange.reaction_id == reaction.id {
                return (exchange.value, exchange.value);
            }
        }
        let native = (reaction.lower_bound, reaction.upper_bound);
        match self.bound_overrides.get(&reaction.id) {
            Some(bound_override) => bound_override.apply(native),
            None => native,
        }
    }
}
