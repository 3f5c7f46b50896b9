//! Expression derived weights for the weighted objectives
use crate::expression::discretize::Thresholds;
use crate::expression::ExpressionTable;
use crate::integration::classify::{leading_expression, ReactionTiers, Tier};
use crate::integration::parameters::ObjectiveKind;
use crate::io::gpr_parse::GprParseError;
use crate::metabolic_model::model::Model;
use indexmap::IndexMap;

/// Weight of a reaction in `tier` whose leading expression is `x`
///
/// Thresholds are those of the scaled column. A zero or non finite denominator gives 1.
pub fn weight(tier: Tier, x: f64, scaled: &Thresholds) -> f64 {
    let ratio = |numerator: f64, denominator: f64| {
        let c = numerator / denominator;
        if denominator == 0. || !c.is_finite() {
            1.
        } else {
            c
        }
    };
    match tier {
        Tier::High => (x - scaled.upper) + 1.,
        Tier::Moderate => ratio(x - scaled.lower, scaled.upper - scaled.lower),
        Tier::Low => ratio(x, scaled.lower),
    }
}

/// Weights of the weighted reactions of an objective
///
/// High and moderate reactions are weighted by the weighted objectives, low reactions only
/// by the triple weighted one. The plain objective has no weights.
pub fn weight_coefficients(
    model: &Model,
    tiers: &ReactionTiers,
    table: &ExpressionTable,
    scaled: &Thresholds,
    kind: ObjectiveKind,
    missing_value: f64,
) -> Result<IndexMap<String, f64>, GprParseError> {
    let weighted_tiers: &[Tier] = match kind {
        ObjectiveKind::Plain => &[],
        ObjectiveKind::Weighted => &[Tier::High, Tier::Moderate],
        ObjectiveKind::TripleWeighted => &[Tier::High, Tier::Moderate, Tier::Low],
    };
    let mut weights = IndexMap::new();
    for tier in weighted_tiers {
        for id in tiers.tier(*tier) {
            let x = match model.reactions.get(id) {
                Some(reaction) => leading_expression(reaction, table, missing_value)?,
                None => None,
            }
            .unwrap_or(missing_value);
            weights.insert(id.clone(), weight(*tier, x, scaled));
        }
    }
    Ok(weights)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::{ExpressionLabel, GeneExpression, SpeciesFilter};
    use crate::integration::test_models::two_reaction_model;

    const THRESHOLDS: Thresholds = Thresholds {
        lower: 0.25,
        upper: 0.75,
    };

    #[test]
    fn tier_weights() {
        assert!((weight(Tier::High, 0.95, &THRESHOLDS) - 1.2).abs() < 1e-12);
        assert!((weight(Tier::Moderate, 0.5, &THRESHOLDS) - 0.5).abs() < 1e-12);
        assert!((weight(Tier::Low, 0.2, &THRESHOLDS) - 0.8).abs() < 1e-12);
    }

    #[test]
    fn degenerate_thresholds() {
        let flat = Thresholds {
            lower: 0.,
            upper: 0.,
        };
        assert_eq!(weight(Tier::Moderate, 0.3, &flat), 1.);
        assert_eq!(weight(Tier::Low, 0.3, &flat), 1.);
        assert_eq!(weight(Tier::High, 0.3, &flat), 1.3);
    }

    #[test]
    fn coefficients_by_objective() {
        let model = two_reaction_model();
        let mut genes = IndexMap::new();
        genes.insert(
            "g1".to_string(),
            GeneExpression {
                raw: Some(9.5),
                scaled: Some(0.95),
                label: Some(ExpressionLabel::High),
            },
        );
        let table = ExpressionTable {
            column: "cell".to_string(),
            species: SpeciesFilter::Myxococcus,
            genes,
            missing_genes: Vec::new(),
        };
        let mut tiers = ReactionTiers::default();
        tiers.high.insert("R_in".to_string());
        // g2 has no value, so the missing value is used
        tiers.low.insert("R_out".to_string());

        let coefficients = |kind, missing_value| {
            weight_coefficients(&model, &tiers, &table, &THRESHOLDS, kind, missing_value).unwrap()
        };
        assert!(coefficients(ObjectiveKind::Plain, 0.5).is_empty());

        let weighted = coefficients(ObjectiveKind::Weighted, 0.5);
        assert_eq!(weighted.len(), 1);
        assert!((weighted["R_in"] - 1.2).abs() < 1e-12);

        let triple = coefficients(ObjectiveKind::TripleWeighted, 0.2);
        assert!((triple["R_out"] - 0.8).abs() < 1e-12);
    }
}
