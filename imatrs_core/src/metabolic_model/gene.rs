//! This module provides the Gene struct, representing a gene, and the Gpr enum, representing a
//! gene protein reaction rule
use std::fmt::{Display, Formatter};

use derive_builder::Builder;

/// Structure Representing a Gene
#[derive(Builder, Clone, Debug, Eq, PartialEq)]
pub struct Gene {
    /// Used to identify the gene
    #[builder(setter(into))]
    pub id: String,
    /// Human Readable Gene Name
    #[builder(default = "None")]
    pub name: Option<String>,
    /// Notes about the gene
    #[builder(default = "None")]
    pub notes: Option<String>,
    /// Gene Annotations
    #[builder(default = "None")]
    pub annotation: Option<String>,
}

impl Gene {
    /// Create a gene with only an id
    pub fn new(id: &str) -> Gene {
        Gene {
            id: id.to_string(),
            name: None,
            notes: None,
            annotation: None,
        }
    }
}

impl Display for Gene {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id)
    }
}

// region GPR
/// Representation of a Gene Protein Reaction Rule as an AST
///
/// Operator nodes hold any number of children, a chain such as `a and b and c` is a single
/// [`Gpr::And`] node with three children.
#[derive(Clone, Debug, PartialEq)]
pub enum Gpr {
    /// A terminal gene node, holding the gene id
    Gene(String),
    /// All children are required (enzyme complex)
    And(Vec<Gpr>),
    /// Any child is sufficient (isozymes)
    Or(Vec<Gpr>),
}

/// Types of Allowed GPR Operations
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GprOperatorType {
    /// Or, results in active if any child is active
    Or,
    /// And, results in active if all children are active
    And,
}

impl Gpr {
    /// Create a new gene node
    pub fn new_gene_node(gene: &str) -> Gpr {
        Gpr::Gene(gene.to_string())
    }

    /// Combine two nodes with an operator
    ///
    /// When `left` is already a node of the same operator, `right` is appended to its children
    /// so chains stay flat.
    pub fn new_binary_operation(left: Gpr, operator: GprOperatorType, right: Gpr) -> Gpr {
        match (operator, left) {
            (GprOperatorType::And, Gpr::And(mut children)) => {
                children.push(right);
                Gpr::And(children)
            }
            (GprOperatorType::Or, Gpr::Or(mut children)) => {
                children.push(right);
                Gpr::Or(children)
            }
            (GprOperatorType::And, left) => Gpr::And(vec![left, right]),
            (GprOperatorType::Or, left) => Gpr::Or(vec![left, right]),
        }
    }

    /// Evaluate the rule given a predicate deciding which genes are present
    pub fn is_satisfied_by<F>(&self, present: &F) -> bool
    where
        F: Fn(&str) -> bool,
    {
        match self {
            Gpr::Gene(id) => present(id),
            Gpr::And(children) => children.iter().all(|c| c.is_satisfied_by(present)),
            Gpr::Or(children) => children.iter().any(|c| c.is_satisfied_by(present)),
        }
    }

    /// Remove every gene whose id starts with `prefix`
    ///
    /// Operator nodes left with a single child are replaced by that child, and nodes left
    /// with no children are removed. Returns None if nothing remains.
    pub fn without_genes_matching(&self, prefix: &str) -> Option<Gpr> {
        match self {
            Gpr::Gene(id) => {
                if id.starts_with(prefix) {
                    None
                } else {
                    Some(self.clone())
                }
            }
            Gpr::And(children) => {
                Self::collapse(children, prefix).map(|mut c| match c.len() {
                    1 => c.remove(0),
                    _ => Gpr::And(c),
                })
            }
            Gpr::Or(children) => {
                Self::collapse(children, prefix).map(|mut c| match c.len() {
                    1 => c.remove(0),
                    _ => Gpr::Or(c),
                })
            }
        }
    }

    fn collapse(children: &[Gpr], prefix: &str) -> Option<Vec<Gpr>> {
        let kept: Vec<Gpr> = children
            .iter()
            .filter_map(|c| c.without_genes_matching(prefix))
            .collect();
        if kept.is_empty() {
            None
        } else {
            Some(kept)
        }
    }

    /// Generate a GPR string with gene ids from the GPR AST
    pub fn to_string_id(&self) -> String {
        match self {
            Gpr::Gene(id) => id.to_string(),
            Gpr::And(children) => Self::join(children, " and "),
            Gpr::Or(children) => Self::join(children, " or "),
        }
    }

    fn join(children: &[Gpr], separator: &str) -> String {
        let parts: Vec<String> = children.iter().map(|c| c.to_string_id()).collect();
        format!("({})", parts.join(separator))
    }
}

impl Display for Gpr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_string_id())
    }
}
// endregion GPR

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn gene(id: &str) -> Gpr {
        Gpr::new_gene_node(id)
    }

    #[test]
    fn builder_defaults() {
        let g = GeneBuilder::default().id("MXAN_0001").build().unwrap();
        assert_eq!(g, Gene::new("MXAN_0001"));
        assert_eq!(format!("{}", g), "MXAN_0001");
    }

    #[test]
    fn chains_flatten() {
        let chain = Gpr::new_binary_operation(
            Gpr::new_binary_operation(gene("a"), GprOperatorType::And, gene("b")),
            GprOperatorType::And,
            gene("c"),
        );
        assert_eq!(chain, Gpr::And(vec![gene("a"), gene("b"), gene("c")]));

        let mixed = Gpr::new_binary_operation(
            Gpr::new_binary_operation(gene("a"), GprOperatorType::And, gene("b")),
            GprOperatorType::Or,
            gene("c"),
        );
        assert_eq!(
            mixed,
            Gpr::Or(vec![Gpr::And(vec![gene("a"), gene("b")]), gene("c")])
        );
    }

    #[test]
    fn satisfaction() {
        let rule = Gpr::And(vec![gene("a"), Gpr::Or(vec![gene("b"), gene("c")])]);
        let present: HashSet<&str> = ["a", "c"].into_iter().collect();
        assert!(rule.is_satisfied_by(&|g| present.contains(g)));
        let present: HashSet<&str> = ["b", "c"].into_iter().collect();
        assert!(!rule.is_satisfied_by(&|g| present.contains(g)));
    }

    #[test]
    fn pruning() {
        let rule = Gpr::Or(vec![gene("MXAN_1"), gene("ENSG1"), gene("MXAN_2")]);
        assert_eq!(
            rule.without_genes_matching("ENSG"),
            Some(Gpr::Or(vec![gene("MXAN_1"), gene("MXAN_2")]))
        );

        let rule = Gpr::And(vec![Gpr::Or(vec![gene("MXAN_1"), gene("ENSG1")]), gene("MXAN_3")]);
        assert_eq!(
            rule.without_genes_matching("ENSG"),
            Some(Gpr::And(vec![gene("MXAN_1"), gene("MXAN_3")]))
        );

        let rule = Gpr::Or(vec![gene("ENSG1"), gene("ENSG2")]);
        assert_eq!(rule.without_genes_matching("ENSG"), None);
    }

    #[test]
    fn display() {
        assert_eq!(format!("{}", gene("ActiveGene1")), "ActiveGene1");
        let rule = Gpr::Or(vec![Gpr::And(vec![gene("a"), gene("b")]), gene("c")]);
        assert_eq!(format!("{}", rule), "((a and b) or c)");
    }
}
