//! Classification of reactions into confidence tiers from their gene rules
use crate::expression::{ExpressionLabel, ExpressionTable};
use crate::integration::parameters::CascadeSemantics;
use crate::io::gpr_parse::{reduce_gpr, GprParseError};
use crate::metabolic_model::gene::Gpr;
use crate::metabolic_model::model::Model;
use crate::metabolic_model::reaction::Reaction;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Confidence tier of a reaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    High,
    Moderate,
    Low,
}

impl Display for Tier {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Tier::High => write!(f, "high"),
            Tier::Moderate => write!(f, "moderate"),
            Tier::Low => write!(f, "low"),
        }
    }
}

/// Reaction ids of each tier, in model order
///
/// The three sets are disjoint, reactions without a rule are in none of them.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReactionTiers {
    pub high: IndexSet<String>,
    pub moderate: IndexSet<String>,
    pub low: IndexSet<String>,
}

impl ReactionTiers {
    pub fn tier_of(&self, reaction_id: &str) -> Option<Tier> {
        if self.high.contains(reaction_id) {
            Some(Tier::High)
        } else if self.moderate.contains(reaction_id) {
            Some(Tier::Moderate)
        } else if self.low.contains(reaction_id) {
            Some(Tier::Low)
        } else {
            None
        }
    }

    pub fn tier(&self, tier: Tier) -> &IndexSet<String> {
        match tier {
            Tier::High => &self.high,
            Tier::Moderate => &self.moderate,
            Tier::Low => &self.low,
        }
    }

    fn insert(&mut self, tier: Tier, reaction_id: &str) {
        match tier {
            Tier::High => self.high.insert(reaction_id.to_string()),
            Tier::Moderate => self.moderate.insert(reaction_id.to_string()),
            Tier::Low => self.low.insert(reaction_id.to_string()),
        };
    }
}

/// Genes grouped by expression label
struct LabelSets<'t> {
    low: IndexSet<&'t str>,
    low_moderate: IndexSet<&'t str>,
    all: IndexSet<&'t str>,
}

impl<'t> LabelSets<'t> {
    fn new(table: &'t ExpressionTable) -> Self {
        let low: IndexSet<&str> = table
            .genes_with_label(ExpressionLabel::Low)
            .into_iter()
            .collect();
        let mut low_moderate = low.clone();
        low_moderate.extend(table.genes_with_label(ExpressionLabel::Moderate));
        let mut all = low_moderate.clone();
        all.extend(table.genes_with_label(ExpressionLabel::High));
        Self {
            low,
            low_moderate,
            all,
        }
    }
}

/// Sort the reactions of `model` into tiers using the labels of `table`
///
/// Rules are pruned of the genes of the excluded species first. A reaction whose rule is
/// missing or pruned away entirely stays unclassified.
pub fn classify_reactions(
    model: &Model,
    table: &ExpressionTable,
    semantics: CascadeSemantics,
) -> ReactionTiers {
    let sets = LabelSets::new(table);
    let mut tiers = ReactionTiers::default();
    for (id, reaction) in &model.reactions {
        let rule = match reaction
            .gpr
            .as_ref()
            .and_then(|gpr| gpr.without_genes_matching(table.species.excluded_prefix()))
        {
            Some(rule) => rule,
            None => continue,
        };
        if let Some(tier) = cascade(&rule, &sets, semantics) {
            tiers.insert(tier, id);
        }
    }
    log::info!(
        "Classified reactions: {} high, {} moderate, {} low",
        tiers.high.len(),
        tiers.moderate.len(),
        tiers.low.len()
    );
    tiers
}

/// Test the rule against growing gene sets, the first failure decides the tier
fn cascade(rule: &Gpr, sets: &LabelSets, semantics: CascadeSemantics) -> Option<Tier> {
    let satisfied = |genes: &IndexSet<&str>| match semantics {
        CascadeSemantics::Presence => rule.is_satisfied_by(&|g: &str| genes.contains(g)),
        CascadeSemantics::Knockout => rule.is_satisfied_by(&|g: &str| !genes.contains(g)),
    };
    if !satisfied(&sets.low) {
        Some(Tier::Low)
    } else if !satisfied(&sets.low_moderate) {
        Some(Tier::Moderate)
    } else if !satisfied(&sets.all) {
        Some(Tier::High)
    } else {
        None
    }
}

/// Expression of the gene limiting a reaction
///
/// The rule text is reduced with min over AND and max over OR of the scaled expression, in
/// the order the operators are written, using `default` for genes without a value. Genes
/// of the excluded species are dropped first. None when the reaction has no rule or nothing
/// is left of it.
pub fn leading_expression(
    reaction: &Reaction,
    table: &ExpressionTable,
    default: f64,
) -> Result<Option<f64>, GprParseError> {
    let rule = match reaction.rule_text() {
        Some(rule) => rule,
        None => return Ok(None),
    };
    let excluded = table.species.excluded_prefix();
    reduce_gpr(&rule, &|gene: &str| {
        if gene.starts_with(excluded) {
            None
        } else {
            Some(table.scaled(gene).unwrap_or(default))
        }
    })
}
