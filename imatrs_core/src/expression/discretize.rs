//! Scaling expression values and discretizing them into low, moderate, and high
use crate::expression::{ExpressionError, ExpressionLabel, ExpressionTable};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Policy used to choose the low and high thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscretizationMethod {
    /// Thresholds at mean ± half a standard deviation
    Mean,
    /// Thresholds at two percentiles of the column
    Quantile,
}

impl Display for DiscretizationMethod {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            DiscretizationMethod::Mean => write!(f, "mean"),
            DiscretizationMethod::Quantile => write!(f, "quantile"),
        }
    }
}

/// Percentiles used by [`DiscretizationMethod::Quantile`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quantiles {
    pub lower: u32,
    pub upper: u32,
}

impl Default for Quantiles {
    fn default() -> Self {
        Quantiles {
            lower: 40,
            upper: 70,
        }
    }
}

/// Lower and upper threshold of a column
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub lower: f64,
    pub upper: f64,
}

/// Outcome of discretizing a column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discretization {
    pub method: DiscretizationMethod,
    /// Percentiles used, None for the mean method
    pub quantiles: Option<Quantiles>,
    /// Thresholds on the raw values
    pub raw: Thresholds,
    /// Thresholds on the scaled values
    pub scaled: Thresholds,
    pub mean: f64,
    pub standard_deviation: f64,
    pub median: f64,
}

/// Turns a continuous expression column into three classes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Discretizer {
    method: DiscretizationMethod,
    quantiles: Option<Quantiles>,
}

impl Discretizer {
    /// Create a discretizer, checking the method and quantiles agree
    ///
    /// The quantile method without quantiles uses [`Quantiles::default`], 40 and 70.
    ///
    /// # Errors
    /// [`ExpressionError::InvalidParameter`] when the lower quantile isn't below the upper one,
    /// when the upper quantile is above 99, or when quantiles are given for the mean method.
    pub fn new(
        method: DiscretizationMethod,
        quantiles: Option<Quantiles>,
    ) -> Result<Self, ExpressionError> {
        let quantiles = match (method, quantiles) {
            (DiscretizationMethod::Mean, None) => None,
            (DiscretizationMethod::Mean, Some(_)) => {
                return Err(ExpressionError::InvalidParameter(
                    "quantiles can't be used with the mean method".to_string(),
                ))
            }
            (DiscretizationMethod::Quantile, None) => Some(Quantiles::default()),
            (DiscretizationMethod::Quantile, Some(q)) => {
                if q.lower >= q.upper {
                    return Err(ExpressionError::InvalidParameter(format!(
                        "lower quantile {} must be below upper quantile {}",
                        q.lower, q.upper
                    )));
                }
                if q.upper > 99 {
                    return Err(ExpressionError::InvalidParameter(format!(
                        "upper quantile {} is above 99",
                        q.upper
                    )));
                }
                Some(q)
            }
        };
        Ok(Self { method, quantiles })
    }

    pub fn method(&self) -> DiscretizationMethod {
        self.method
    }

    pub fn quantiles(&self) -> Option<Quantiles> {
        self.quantiles
    }

    /// Scale and label every measured gene of `table`
    ///
    /// Genes without a measurement keep no scaled value and no label.
    pub fn discretize(
        &self,
        table: &mut ExpressionTable,
    ) -> Result<Discretization, ExpressionError> {
        let raw_values = table.present_raw_values();
        if raw_values.is_empty() {
            return Err(ExpressionError::Empty);
        }
        let (min, max) = raw_values
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), x| {
                (lo.min(*x), hi.max(*x))
            });
        let range = max - min;
        let scale = |x: f64| if range > 0. { (x - min) / range } else { 0. };
        let scaled_values: Vec<f64> = raw_values.iter().map(|x| scale(*x)).collect();

        let raw = self.thresholds(&raw_values);
        let scaled = self.thresholds(&scaled_values);

        for gene in table.genes.values_mut() {
            if let Some(x) = gene.raw {
                gene.scaled = Some(scale(x));
                gene.label = Some(label(x, &raw));
            }
        }

        let mut sorted = raw_values.clone();
        sorted.sort_by(f64::total_cmp);
        let discretization = Discretization {
            method: self.method,
            quantiles: self.quantiles,
            raw,
            scaled,
            mean: mean(&raw_values),
            standard_deviation: sample_standard_deviation(&raw_values),
            median: percentile(&sorted, 50.),
        };
        log::debug!(
            "Discretized {} with thresholds {:?}",
            table.column,
            discretization.raw
        );
        Ok(discretization)
    }

    fn thresholds(&self, values: &[f64]) -> Thresholds {
        match self.quantiles {
            None => {
                let center = mean(values);
                let half_sd = 0.5 * sample_standard_deviation(values);
                Thresholds {
                    lower: center - half_sd,
                    upper: center + half_sd,
                }
            }
            Some(q) => {
                let mut sorted = values.to_vec();
                sorted.sort_by(f64::total_cmp);
                Thresholds {
                    lower: percentile(&sorted, q.lower as f64),
                    upper: percentile(&sorted, q.upper as f64),
                }
            }
        }
    }
}

/// Values exactly at a threshold are moderate
fn label(x: f64, thresholds: &Thresholds) -> ExpressionLabel {
    if x > thresholds.upper {
        ExpressionLabel::High
    } else if x < thresholds.lower {
        ExpressionLabel::Low
    } else {
        ExpressionLabel::Moderate
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Standard deviation with n - 1 degrees of freedom, 0 for fewer than two values
fn sample_standard_deviation(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.;
    }
    let center = mean(values);
    let sum_squares: f64 = values.iter().map(|x| (x - center).powi(2)).sum();
    (sum_squares / (values.len() - 1) as f64).sqrt()
}

/// Percentile `q` (0 to 100) of sorted values, interpolating linearly between ranks
pub fn percentile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let position = q / 100. * (sorted.len() - 1) as f64;
    let below = position.floor() as usize;
    let above = position.ceil() as usize;
    let fraction = position - below as f64;
    sorted[below] + (sorted[above] - sorted[below]) * fraction
}
