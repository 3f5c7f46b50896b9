//! Provides struct for representing an optimization problem's objective

/// Represents the Objective of an optimization problem
#[derive(Debug, Clone, PartialEq)]
pub struct Objective {
    /// Terms included in the objective (See [`ObjectiveTerm`])
    pub(crate) terms: Vec<ObjectiveTerm>,
    /// Sense of the objective (maximize, or minimize), see [`ObjectiveSense`]
    pub(crate) sense: ObjectiveSense,
}

impl Objective {
    /// Create a new empty objective, with a given sense
    pub fn new(sense: ObjectiveSense) -> Self {
        Self {
            terms: Vec::new(),
            sense,
        }
    }

    /// Change the sense of the objective
    pub fn set_sense(&mut self, sense: ObjectiveSense) {
        self.sense = sense;
    }

    /// Sense of the objective
    pub fn sense(&self) -> ObjectiveSense {
        self.sense
    }

    /// Terms of the objective
    pub fn terms(&self) -> &[ObjectiveTerm] {
        &self.terms
    }

    /// Add a new term to the objective
    ///
    /// A second term on an existing variable is merged into the first one, so each variable
    /// carries a single coefficient.
    pub fn add_term(&mut self, term: ObjectiveTerm) {
        match self.terms.iter_mut().find(|t| t.variable == term.variable) {
            Some(existing) => existing.coefficient += term.coefficient,
            None => self.terms.push(term),
        }
    }

    /// Coefficient of a variable, 0 when the variable is not in the objective
    pub fn coefficient(&self, variable_id: &str) -> f64 {
        self.terms
            .iter()
            .find(|t| t.variable == variable_id)
            .map(|t| t.coefficient)
            .unwrap_or(0.)
    }

    /// Remove all terms from the objective
    pub fn remove_all_terms(&mut self) {
        self.terms.clear();
    }
}

/// Represents the sense of the objective, whether it should be maximized or minimized
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectiveSense {
    /// The objective should be minimized
    Minimize,
    /// The objective should be maximized
    Maximize,
}

/// A linear term in the objective
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectiveTerm {
    /// Id of the variable in the objective term
    pub variable: String,
    /// Coefficient for the term
    pub coefficient: f64,
}

impl ObjectiveTerm {
    /// Create a new linear objective term
    pub fn new_linear(variable: &str, coefficient: f64) -> Self {
        ObjectiveTerm {
            variable: variable.to_string(),
            coefficient,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terms_merge() {
        let mut objective = Objective::new(ObjectiveSense::Maximize);
        objective.add_term(ObjectiveTerm::new_linear("x", 1.));
        objective.add_term(ObjectiveTerm::new_linear("y", 2.));
        objective.add_term(ObjectiveTerm::new_linear("x", 0.5));
        assert_eq!(objective.terms().len(), 2);
        assert!((objective.coefficient("x") - 1.5).abs() < 1e-12);
        assert!((objective.coefficient("z")).abs() < 1e-12);
        objective.remove_all_terms();
        assert!(objective.terms().is_empty());
    }
}
