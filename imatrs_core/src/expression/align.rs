//! Reading expression files and aligning them to the genes of a model
use crate::expression::{ExpressionError, ExpressionTable, GeneExpression, SpeciesFilter};
use crate::metabolic_model::model::Model;
use indexmap::IndexMap;
use std::io::Read;
use std::path::Path;

/// Cells read as a missing measurement
const ABSENT_MARKERS: [&str; 5] = ["", "NA", "NaN", "nan", "null"];

/// Expression file as read from disk, before any column is selected
#[derive(Debug, Clone)]
pub struct RawExpressionTable {
    headers: Vec<String>,
    rows: Vec<csv::StringRecord>,
}

impl RawExpressionTable {
    /// Read a delimited table with a header row
    pub fn from_reader<R: Read>(reader: R, delimiter: u8) -> Result<Self, ExpressionError> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);
        let headers = reader.headers()?.iter().map(String::from).collect();
        let rows = reader
            .records()
            .collect::<Result<Vec<csv::StringRecord>, csv::Error>>()?;
        Ok(Self { headers, rows })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Number of data rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn column_index(&self, column: &str) -> Result<usize, ExpressionError> {
        self.headers
            .iter()
            .position(|h| h == column)
            .ok_or_else(|| ExpressionError::MissingColumn(column.to_string()))
    }
}

/// Read an expression file, tab separated if the extension is `.tsv` and comma separated
/// otherwise
pub fn read_expression_file<P: AsRef<Path>>(
    path: P,
) -> Result<RawExpressionTable, ExpressionError> {
    let path = path.as_ref();
    let delimiter = match path.extension().and_then(|ext| ext.to_str()) {
        Some("tsv") => b'\t',
        _ => b',',
    };
    let file = std::fs::File::open(path)?;
    RawExpressionTable::from_reader(file, delimiter)
}

/// Parse a single expression cell
///
/// # Returns
/// - `Some(None)`: the cell marks a missing measurement
/// - `Some(Some(value))`: a measurement
/// - `None`: the cell isn't a number
fn parse_cell(cell: &str) -> Option<Option<f64>> {
    if ABSENT_MARKERS.contains(&cell) {
        return Some(None);
    }
    match cell.parse::<f64>() {
        Ok(value) if value.is_nan() => Some(None),
        Ok(value) => Some(Some(value)),
        Err(_) => None,
    }
}

/// Align one expression column to the genes of `model`
///
/// Only model genes of the kept species appear in the result: measured genes first, in model
/// order, followed by the unmeasured ones which are also listed in
/// [`ExpressionTable::missing_genes`]. The species is detected from the first gene id of the
/// file when `species` is None.
pub fn align(
    model: &Model,
    raw: &RawExpressionTable,
    gene_column: &str,
    expression_column: &str,
    species: Option<SpeciesFilter>,
) -> Result<ExpressionTable, ExpressionError> {
    let gene_idx = raw.column_index(gene_column)?;
    let value_idx = raw.column_index(expression_column)?;

    let first_gene = raw
        .rows
        .first()
        .and_then(|row| row.get(gene_idx))
        .ok_or(ExpressionError::Empty)?;
    let species = match species {
        Some(species) => species,
        None => SpeciesFilter::detect(first_gene)?,
    };

    let mut measured: IndexMap<&str, Option<f64>> = IndexMap::with_capacity(raw.len());
    for row in &raw.rows {
        let gene = row.get(gene_idx).unwrap_or("");
        let cell = row.get(value_idx).unwrap_or("");
        let value = parse_cell(cell).ok_or_else(|| ExpressionError::InvalidValue {
            gene: gene.to_string(),
            column: expression_column.to_string(),
            value: cell.to_string(),
        })?;
        if measured.contains_key(gene) {
            log::warn!("Gene {} appears more than once, keeping the first row", gene);
            continue;
        }
        measured.insert(gene, value);
    }

    let mut genes = IndexMap::new();
    let mut missing_genes = Vec::new();
    for gene_id in model.genes.keys() {
        if !gene_id.starts_with(species.kept_prefix()) {
            continue;
        }
        match measured.get(gene_id.as_str()) {
            Some(value) => {
                genes.insert(gene_id.clone(), GeneExpression::new(*value));
            }
            None => missing_genes.push(gene_id.clone()),
        }
    }
    for gene_id in &missing_genes {
        genes.insert(gene_id.clone(), GeneExpression::new(None));
    }
    if !missing_genes.is_empty() {
        log::warn!(
            "{} model genes have no expression data in column {}",
            missing_genes.len(),
            expression_column
        );
    }

    Ok(ExpressionTable {
        column: expression_column.to_string(),
        species,
        genes,
        missing_genes,
    })
}

/// Name used for a cell type in output paths, runs of `.` in the column name become `_`
pub fn cell_type_name(column: &str) -> String {
    let mut name = String::with_capacity(column.len());
    let mut previous_dot = false;
    for c in column.chars() {
        if c == '.' {
            if !previous_dot {
                name.push('_');
            }
            previous_dot = true;
        } else {
            name.push(c);
            previous_dot = false;
        }
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn test_data(file: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("test_data")
            .join(file)
    }

    fn toy_model() -> Model {
        Model::read_json(test_data("toy_model.json")).unwrap()
    }

    #[test]
    fn align_csv() {
        let model = toy_model();
        let raw = read_expression_file(test_data("expression.csv")).unwrap();
        let table = align(&model, &raw, "gene", "cell.type..A", None).unwrap();
        assert_eq!(table.species, SpeciesFilter::Myxococcus);
        let ids: Vec<&str> = table.genes.keys().map(|k| k.as_str()).collect();
        assert_eq!(ids, vec!["MXAN_0001", "MXAN_0002", "MXAN_0003", "MXAN_0004"]);
        // duplicate row for MXAN_0001 is ignored
        assert_eq!(table.gene("MXAN_0001").unwrap().raw, Some(10.));
        assert_eq!(table.gene("MXAN_0004").unwrap().raw, None);
        assert_eq!(table.missing_genes, vec!["MXAN_0004".to_string()]);
        assert!(table.gene("ENSG00000001").is_none());
    }

    #[test]
    fn align_tsv_with_absent_cells() {
        let model = toy_model();
        let raw = read_expression_file(test_data("expression.tsv")).unwrap();
        let table = align(&model, &raw, "gene", "cellB", None).unwrap();
        assert_eq!(table.gene("MXAN_0003").unwrap().raw, None);
        assert_eq!(table.gene("MXAN_0002").unwrap().raw, Some(3.5));
        // absent cells are still measured rows, not missing genes
        assert_eq!(table.missing_genes, vec!["MXAN_0004".to_string()]);
    }

    #[test]
    fn missing_column() {
        let model = toy_model();
        let raw = read_expression_file(test_data("expression.csv")).unwrap();
        assert!(matches!(
            align(&model, &raw, "gene", "not_a_column", None),
            Err(ExpressionError::MissingColumn(col)) if col == "not_a_column"
        ));
    }

    #[test]
    fn invalid_value() {
        let model = toy_model();
        let data = "gene,value\nMXAN_0001,1.0\nMXAN_0002,high\n";
        let raw = RawExpressionTable::from_reader(data.as_bytes(), b',').unwrap();
        assert!(matches!(
            align(&model, &raw, "gene", "value", None),
            Err(ExpressionError::InvalidValue { gene, .. }) if gene == "MXAN_0002"
        ));
    }

    #[test]
    fn species_mismatch_and_override() {
        let model = toy_model();
        let data = "gene,value\nb0001,1.0\nENSG00000001,2.0\n";
        let raw = RawExpressionTable::from_reader(data.as_bytes(), b',').unwrap();
        assert!(matches!(
            align(&model, &raw, "gene", "value", None),
            Err(ExpressionError::SpeciesMismatch(_))
        ));
        let table = align(&model, &raw, "gene", "value", Some(SpeciesFilter::Human)).unwrap();
        assert_eq!(table.genes.len(), 1);
        assert_eq!(table.gene("ENSG00000001").unwrap().raw, Some(2.));
    }

    #[test]
    fn empty_file() {
        let model = toy_model();
        let raw = RawExpressionTable::from_reader("gene,value\n".as_bytes(), b',').unwrap();
        assert!(raw.is_empty());
        assert!(matches!(
            align(&model, &raw, "gene", "value", None),
            Err(ExpressionError::Empty)
        ));
    }

    #[test]
    fn cell_type_names() {
        assert_eq!(cell_type_name("cell.type..A"), "cell_type_A");
        assert_eq!(cell_type_name("plain"), "plain");
        assert_eq!(cell_type_name("a...b."), "a_b_");
    }
}
