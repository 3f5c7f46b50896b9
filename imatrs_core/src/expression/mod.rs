//! Gene expression tables aligned to a metabolic model, and their discretization
pub mod align;
pub mod discretize;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use thiserror::Error;

/// Discrete expression class of a gene
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExpressionLabel {
    Low,
    Moderate,
    High,
}

impl ExpressionLabel {
    /// Numeric form of the label: -1, 0 or +1
    pub fn value(&self) -> i8 {
        match self {
            ExpressionLabel::Low => -1,
            ExpressionLabel::Moderate => 0,
            ExpressionLabel::High => 1,
        }
    }
}

impl Display for ExpressionLabel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value())
    }
}

/// Expression of a single gene
///
/// `scaled` and `label` are filled in by the discretizer, and stay None for genes without a
/// measurement.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GeneExpression {
    pub raw: Option<f64>,
    pub scaled: Option<f64>,
    pub label: Option<ExpressionLabel>,
}

impl GeneExpression {
    pub fn new(raw: Option<f64>) -> Self {
        Self {
            raw,
            scaled: None,
            label: None,
        }
    }
}

/// Species whose genes are kept when aligning, identified by gene id prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeciesFilter {
    /// *Myxococcus xanthus* genes (`MXAN…`), human genes are excluded
    Myxococcus,
    /// Human genes (`ENSG…`), *Myxococcus* genes are excluded
    Human,
}

impl SpeciesFilter {
    /// Detect the species from a gene id
    pub fn detect(gene_id: &str) -> Result<SpeciesFilter, ExpressionError> {
        if gene_id.starts_with(SpeciesFilter::Myxococcus.kept_prefix()) {
            Ok(SpeciesFilter::Myxococcus)
        } else if gene_id.starts_with(SpeciesFilter::Human.kept_prefix()) {
            Ok(SpeciesFilter::Human)
        } else {
            Err(ExpressionError::SpeciesMismatch(gene_id.to_string()))
        }
    }

    /// Prefix of the gene ids that are kept
    pub fn kept_prefix(&self) -> &'static str {
        match self {
            SpeciesFilter::Myxococcus => "MXAN",
            SpeciesFilter::Human => "ENSG",
        }
    }

    /// Prefix of the gene ids removed from rules before evaluation
    pub fn excluded_prefix(&self) -> &'static str {
        match self {
            SpeciesFilter::Myxococcus => "ENSG",
            SpeciesFilter::Human => "MXAN",
        }
    }
}

/// A single expression column aligned to the genes of a model
#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionTable {
    /// Name of the expression column the values came from
    pub column: String,
    /// Species the table was aligned for
    pub species: SpeciesFilter,
    /// Expression of every model gene of the species, measured genes first
    pub genes: IndexMap<String, GeneExpression>,
    /// Model genes with no row in the expression file
    pub missing_genes: Vec<String>,
}

impl ExpressionTable {
    pub fn gene(&self, id: &str) -> Option<&GeneExpression> {
        self.genes.get(id)
    }

    /// Scaled expression of a gene, None for unknown or unmeasured genes
    pub fn scaled(&self, id: &str) -> Option<f64> {
        self.genes.get(id).and_then(|g| g.scaled)
    }

    pub fn label(&self, id: &str) -> Option<ExpressionLabel> {
        self.genes.get(id).and_then(|g| g.label)
    }

    /// Ids of the genes carrying `label`, in table order
    pub fn genes_with_label(&self, label: ExpressionLabel) -> Vec<&str> {
        self.genes
            .iter()
            .filter(|(_, g)| g.label == Some(label))
            .map(|(id, _)| id.as_str())
            .collect()
    }

    /// Raw values that are present, in table order
    pub fn present_raw_values(&self) -> Vec<f64> {
        self.genes.values().filter_map(|g| g.raw).collect()
    }
}

/// Errors raised while reading, aligning, or discretizing expression data
#[derive(Error, Debug)]
pub enum ExpressionError {
    /// Malformed discretization parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    /// Gene ids follow neither supported naming convention
    #[error("Gene id {0} is neither a MXAN nor an ENSG identifier")]
    SpeciesMismatch(String),
    /// Requested column is not in the file
    #[error("Column {0} is not in the expression file")]
    MissingColumn(String),
    /// A cell could not be read as a number
    #[error("Gene {gene} has a non numeric value {value:?} in column {column}")]
    InvalidValue {
        gene: String,
        column: String,
        value: String,
    },
    /// No rows, or no measured values in the selected column
    #[error("Expression data has no measured values")]
    Empty,
    #[error("Unable to parse expression file: {0}")]
    Csv(#[from] csv::Error),
    #[error("Unable to read expression file: {0}")]
    Io(#[from] std::io::Error),
}
