//! Process wide defaults shared by model construction and problem assembly
use std::sync::{LazyLock, RwLock};

pub static CONFIGURATION: LazyLock<RwLock<Configuration>> =
    LazyLock::new(|| RwLock::new(Configuration::default()));

#[derive(Clone, Debug, PartialEq)]
pub struct Configuration {
    /// Lower bound given to reactions that do not specify one, and the magnitude used
    /// in place of an infinite lower bound inside indicator constraints
    pub lower_bound: f64,
    /// Upper bound given to reactions that do not specify one, and the magnitude used
    /// in place of an infinite upper bound inside indicator constraints
    pub upper_bound: f64,
    /// Maximum distance from 0 or 1 for a binary value to be accepted as integral
    pub integrality_tolerance: f64,
    /// Scaled expression used for genes without a measurement
    pub missing_expression_value: f64,
}

impl Default for Configuration {
    fn default() -> Self {
        Configuration {
            lower_bound: -1000.,
            upper_bound: 1000.,
            integrality_tolerance: 1e-06,
            missing_expression_value: 0.5,
        }
    }
}

/// Snapshot of the current configuration
///
/// A poisoned lock still holds a valid configuration, so its contents are used as is.
pub fn current() -> Configuration {
    match CONFIGURATION.read() {
        Ok(config) => config.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Configuration::default();
        assert!((config.lower_bound + 1000.).abs() < 1e-25);
        assert!((config.upper_bound - 1000.).abs() < 1e-25);
        assert!((config.missing_expression_value - 0.5).abs() < 1e-25);
    }

    #[test]
    fn snapshot_matches_global() {
        assert_eq!(current(), *CONFIGURATION.read().unwrap());
    }
}
