//! This module provides a struct for representing reactions
use crate::configuration;
use crate::metabolic_model::gene::Gpr;
use derive_builder::Builder;
use indexmap::IndexMap;

/// Represents a reaction in the metabolic model
#[derive(Builder, Debug, Clone, PartialEq)]
pub struct Reaction {
    /// Used to identify the reaction
    #[builder(setter(into))]
    pub id: String,
    /// Metabolite stoichiometry of the reaction
    #[builder(default = "IndexMap::new()")]
    pub metabolites: IndexMap<String, f64>,
    /// Human-readable reaction name
    #[builder(default = "None")]
    pub name: Option<String>,
    /// Gene Protein Reaction rule
    #[builder(default = "None")]
    pub gpr: Option<Gpr>,
    /// Gene Protein Reaction rule as written in the model source
    #[builder(default = "None", setter(into))]
    pub gene_reaction_rule: Option<String>,
    /// Lower flux bound
    #[builder(default = "configuration::current().lower_bound")]
    pub lower_bound: f64,
    /// Upper flux bound
    #[builder(default = "configuration::current().upper_bound")]
    pub upper_bound: f64,
    /// Reaction subsystem
    #[builder(default = "None")]
    pub subsystem: Option<String>,
    /// Notes about the reaction
    #[builder(default = "None")]
    pub notes: Option<String>,
    /// Reaction Annotations
    #[builder(default = "None")]
    pub annotation: Option<String>,
}

impl Reaction {
    /// Rule text with its operators in written order
    ///
    /// Reactions built without source text render their parsed rule, which is fully
    /// parenthesized.
    pub fn rule_text(&self) -> Option<String> {
        self.gene_reaction_rule
            .clone()
            .or_else(|| self.gpr.as_ref().map(|gpr| gpr.to_string_id()))
    }

}

/// `(lower, upper)` with infinite values replaced by the configured default magnitudes
///
/// Indicator constraints multiply bounds into coefficients, so they need finite values.
pub fn finite_bounds((lower, upper): (f64, f64)) -> (f64, f64) {
    let config = configuration::current();
    let lower = if lower.is_finite() {
        lower
    } else {
        config.lower_bound
    };
    let upper = if upper.is_finite() {
        upper
    } else {
        config.upper_bound
    };
    (lower, upper)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_uses_configured_bounds() {
        let rxn = ReactionBuilder::default().id("R1").build().unwrap();
        assert!((rxn.lower_bound + 1000.).abs() < 1e-25);
        assert!((rxn.upper_bound - 1000.).abs() < 1e-25);
        assert_eq!(rxn.rule_text(), None);
    }

    #[test]
    fn infinite_bounds_are_clamped() {
        let (lb, ub) = finite_bounds((f64::NEG_INFINITY, 5.));
        assert!((lb + 1000.).abs() < 1e-25);
        assert!((ub - 5.).abs() < 1e-25);
    }

    #[test]
    fn rule_text_prefers_source() {
        let gpr = Gpr::Or(vec![
            Gpr::Gene("a".to_string()),
            Gpr::And(vec![Gpr::Gene("b".to_string()), Gpr::Gene("c".to_string())]),
        ]);
        let rxn = ReactionBuilder::default()
            .id("R1")
            .gpr(Some(gpr.clone()))
            .build()
            .unwrap();
        assert_eq!(rxn.rule_text().unwrap(), "(a or (b and c))");
        let rxn = ReactionBuilder::default()
            .id("R1")
            .gpr(Some(gpr))
            .gene_reaction_rule(Some("a or b and c".to_string()))
            .build()
            .unwrap();
        assert_eq!(rxn.rule_text().unwrap(), "a or b and c");
    }
}
