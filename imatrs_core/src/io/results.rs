//! Module providing TSV output for integration results
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

use crate::expression::discretize::DiscretizationMethod;
use crate::integration::result::{InfeasibleRecord, IntegrationResult};

const INFEASIBLE_DIR: &str = "infeasible_combinations";
const INFEASIBLE_FILE: &str = "infeasible_combinations.tsv";

/// Errors raised while writing results
#[derive(Error, Debug)]
pub enum ResultsError {
    #[error("Unable to write results file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unable to write results table: {0}")]
    Csv(#[from] csv::Error),
}

/// Discretization part of a result file name
fn discretization_label(method: DiscretizationMethod, quantiles: Option<(u32, u32)>) -> String {
    match (method, quantiles) {
        (DiscretizationMethod::Quantile, Some((lower, upper))) => {
            format!("quantiles_{}_{}", lower, upper)
        }
        _ => method.to_string(),
    }
}

/// Path a result is written to below `dir`
///
/// `<dir>/<problem>/<cell type>/epsilon_<ε>_<discretization>[_oxygenLevel_<x>].tsv`
pub fn result_path<P: AsRef<Path>>(dir: P, result: &IntegrationResult) -> PathBuf {
    let params = &result.parameters;
    let mut file_name = format!(
        "epsilon_{}_{}",
        params.epsilon,
        discretization_label(params.method, params.quantiles.map(|q| (q.lower, q.upper)))
    );
    if let Some(exchange) = &params.fixed_exchange {
        file_name.push_str(&format!("_oxygenLevel_{}", exchange.value));
    }
    file_name.push_str(".tsv");
    dir.as_ref()
        .join(&result.problem_name)
        .join(&result.cell_type)
        .join(file_name)
}

fn optional(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Write the reaction table of `result` below `dir`, returning the file written
///
/// The table is written to a temporary file next to the target and then moved into place,
/// so the target is either absent or complete. The temporary file is removed on failure.
pub fn write_result<P: AsRef<Path>>(
    dir: P,
    result: &IntegrationResult,
) -> Result<PathBuf, ResultsError> {
    let path = result_path(dir, result);
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;
    let mut temp = NamedTempFile::new_in(parent)?;
    let weighted = result.parameters.objective_kind.is_weighted();

    {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .from_writer(&mut temp);
        let mut header = vec!["reaction_id", "flux_value", "classification", "y_f", "y_r"];
        if weighted {
            header.push("c_value");
        }
        writer.write_record(&header)?;
        for row in &result.reactions {
            let mut record = vec![
                row.reaction_id.clone(),
                row.flux.to_string(),
                row.tier.map(|t| t.to_string()).unwrap_or_default(),
                optional(row.forward),
                optional(row.reverse),
            ];
            if weighted {
                record.push(optional(row.weight));
            }
            writer.write_record(&record)?;
        }
        writer.flush()?;
    }

    temp.persist(&path).map_err(|err| err.error)?;
    log::info!("Wrote {} reactions to {}", result.reactions.len(), path.display());
    Ok(path)
}

/// Append `record` to the table of infeasible runs below `dir`
///
/// The header is written only when the table is new.
pub fn append_infeasible<P: AsRef<Path>>(
    dir: P,
    record: &InfeasibleRecord,
) -> Result<PathBuf, ResultsError> {
    let table_dir = dir.as_ref().join(INFEASIBLE_DIR);
    fs::create_dir_all(&table_dir)?;
    let path = table_dir.join(INFEASIBLE_FILE);
    let is_new = !path.exists();
    let file = OpenOptions::new().create(true).append(true).open(&path)?;
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .from_writer(file);
    if is_new {
        writer.write_record([
            "problem",
            "cell_type",
            "epsilon",
            "discretization",
            "oxygen_level",
        ])?;
    }
    writer.write_record([
        record.problem_name.clone(),
        record.cell_type.clone(),
        record.epsilon.to_string(),
        discretization_label(record.method, record.quantiles.map(|q| (q.lower, q.upper))),
        optional(record.fixed_exchange),
    ])?;
    writer.flush()?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::discretize::{Quantiles, Thresholds};
    use crate::integration::classify::Tier;
    use crate::integration::parameters::{FixedExchange, ObjectiveKind};
    use crate::integration::result::{ParameterSummary, ReactionFlux};
    use crate::optimize::OptimizationStatus;
    use tempfile::tempdir;

    fn result(kind: ObjectiveKind, fixed_exchange: Option<FixedExchange>) -> IntegrationResult {
        IntegrationResult {
            problem_name: kind.to_string(),
            cell_type: "cell_A".to_string(),
            status: OptimizationStatus::Optimal,
            objective_value: 1.,
            reactions: vec![
                ReactionFlux {
                    reaction_id: "R_in".to_string(),
                    flux: 10.,
                    tier: Some(Tier::High),
                    forward: Some(1.),
                    reverse: Some(0.),
                    weight: Some(1.2),
                },
                ReactionFlux {
                    reaction_id: "EX_A".to_string(),
                    flux: -2.5,
                    tier: None,
                    forward: None,
                    reverse: None,
                    weight: None,
                },
            ],
            genes: Vec::new(),
            parameters: ParameterSummary {
                method: DiscretizationMethod::Quantile,
                quantiles: Some(Quantiles {
                    lower: 25,
                    upper: 75,
                }),
                raw_thresholds: Thresholds {
                    lower: 1.,
                    upper: 2.,
                },
                scaled_thresholds: Thresholds {
                    lower: 0.25,
                    upper: 0.75,
                },
                mean: 1.5,
                standard_deviation: 0.5,
                median: 1.5,
                epsilon: 0.5,
                optimum_fraction: 80.,
                required_flux: 8.,
                fixed_exchange,
                objective_kind: kind,
            },
            missing_genes: Vec::new(),
        }
    }

    #[test]
    fn result_paths() {
        let plain = result(ObjectiveKind::Plain, None);
        assert_eq!(
            result_path("out", &plain),
            PathBuf::from("out/iMAT/cell_A/epsilon_0.5_quantiles_25_75.tsv")
        );
        let oxygen = result(ObjectiveKind::Weighted, Some(FixedExchange::oxygen(-10.)));
        assert_eq!(
            result_path("out", &oxygen),
            PathBuf::from(
                "out/weighted_iMAT/cell_A/epsilon_0.5_quantiles_25_75_oxygenLevel_-10.tsv"
            )
        );
    }

    #[test]
    fn write_plain_table() {
        let dir = tempdir().unwrap();
        let path = write_result(dir.path(), &result(ObjectiveKind::Plain, None)).unwrap();
        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(
            contents,
            "reaction_id\tflux_value\tclassification\ty_f\ty_r\n\
             R_in\t10\thigh\t1\t0\n\
             EX_A\t-2.5\t\t\t\n"
        );
        // nothing but the table is left behind
        let entries: Vec<_> = fs::read_dir(path.parent().unwrap()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn write_weighted_table() {
        let dir = tempdir().unwrap();
        let path = write_result(dir.path(), &result(ObjectiveKind::Weighted, None)).unwrap();
        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines[0], "reaction_id\tflux_value\tclassification\ty_f\ty_r\tc_value");
        assert_eq!(lines[1], "R_in\t10\thigh\t1\t0\t1.2");
    }

    #[test]
    fn failed_write_leaves_no_temporary_file() {
        let dir = tempdir().unwrap();
        let result = result(ObjectiveKind::Plain, None);
        let path = result_path(dir.path(), &result);
        // a directory in place of the table can't be replaced
        fs::create_dir_all(&path).unwrap();
        assert!(matches!(
            write_result(dir.path(), &result),
            Err(ResultsError::Io(_))
        ));
        let entries: Vec<PathBuf> = fs::read_dir(path.parent().unwrap())
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect();
        assert_eq!(entries, vec![path]);
    }

    #[test]
    fn append_infeasible_records() {
        let dir = tempdir().unwrap();
        let record = InfeasibleRecord {
            problem_name: "iMAT".to_string(),
            cell_type: "cell_A".to_string(),
            epsilon: 1.,
            method: DiscretizationMethod::Mean,
            quantiles: None,
            fixed_exchange: Some(-5.),
        };
        append_infeasible(dir.path(), &record).unwrap();
        let path = append_infeasible(dir.path(), &record).unwrap();
        let contents = fs::read_to_string(path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "problem\tcell_type\tepsilon\tdiscretization\toxygen_level");
        assert_eq!(lines[1], "iMAT\tcell_A\t1\tmean\t-5");
        assert_eq!(lines[1], lines[2]);
    }
}
