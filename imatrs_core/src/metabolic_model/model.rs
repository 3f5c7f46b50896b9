//! This module provides the Model struct for representing an entire metabolic model
use crate::metabolic_model::gene::Gene;
use crate::metabolic_model::metabolite::Metabolite;
use crate::metabolic_model::reaction::Reaction;

use indexmap::IndexMap;
use nalgebra_sparse::{CooMatrix, CsrMatrix};
use thiserror::Error;

/// Represents a Genome Scale Metabolic Model
///
/// The model is treated as read only by the integration pipeline, bound changes are applied
/// to the optimization problem built from it rather than to the model itself.
#[derive(Clone, Debug, PartialEq)]
pub struct Model {
    /// Map of reaction ids to Reaction Objects
    pub reactions: IndexMap<String, Reaction>,
    /// Map of gene ids to Gene Objects
    pub genes: IndexMap<String, Gene>,
    /// Map of metabolite ids to Metabolite Objects
    pub metabolites: IndexMap<String, Metabolite>,
    /// Map of reaction ids to objective function coefficients
    pub objective: IndexMap<String, f64>,
    /// Id associated with the Model
    pub id: Option<String>,
    /// Compartments in the model
    ///
    /// An IndexMap<String, String> of {short name: long name}
    pub compartments: Option<IndexMap<String, String>>,
    /// A version identifier for the Model, stored as a string
    pub version: Option<String>,
}

impl Model {
    pub fn new_empty() -> Self {
        Model {
            reactions: IndexMap::new(),
            genes: IndexMap::new(),
            metabolites: IndexMap::new(),
            objective: IndexMap::new(),
            id: None,
            compartments: None,
            version: None,
        }
    }

    /// Add a reaction to the model
    ///
    /// # Parameters
    /// - reaction: Reaction to add
    ///
    /// # Examples
    /// ```rust
    /// use imatrs_core::metabolic_model::model::Model;
    /// use imatrs_core::metabolic_model::reaction::ReactionBuilder;
    /// let mut model = Model::new_empty();
    /// let new_reaction = ReactionBuilder::default().id("new_reaction").build().unwrap();
    /// model.add_reaction(new_reaction);
    /// ```
    pub fn add_reaction(&mut self, reaction: Reaction) {
        let id = reaction.id.clone();
        self.reactions.insert(id, reaction);
    }

    /// Add a gene to the model
    ///
    /// # Examples
    /// ```rust
    /// use imatrs_core::metabolic_model::gene::GeneBuilder;
    /// use imatrs_core::metabolic_model::model::Model;
    /// let mut model = Model::new_empty();
    /// let new_gene = GeneBuilder::default().id("new_gene").build().unwrap();
    /// model.add_gene(new_gene);
    /// ```
    pub fn add_gene(&mut self, gene: Gene) {
        let id = gene.id.clone();
        self.genes.insert(id, gene);
    }

    /// Add a metabolite to the model
    pub fn add_metabolite(&mut self, metabolite: Metabolite) {
        let id = metabolite.id.clone();
        self.metabolites.insert(id, metabolite);
    }

    /// Set the objective coefficient of a reaction
    pub fn set_objective_coefficient(&mut self, reaction_id: &str, coefficient: f64) {
        self.objective.insert(reaction_id.to_string(), coefficient);
    }

    /// Get a reaction by id
    pub fn reaction(&self, reaction_id: &str) -> Result<&Reaction, ModelError> {
        self.reactions
            .get(reaction_id)
            .ok_or_else(|| ModelError::UnknownReaction(reaction_id.to_string()))
    }

    /// Find the single reaction carrying a nonzero objective coefficient
    ///
    /// # Returns
    /// - `Ok`: reaction id and its coefficient
    /// - `Err`: [`ModelError::MultipleObjectives`] if more than one reaction has a nonzero
    ///   coefficient, [`ModelError::NoObjective`] if none does
    pub fn objective_reaction(&self) -> Result<(&str, f64), ModelError> {
        let nonzero: Vec<(&String, &f64)> = self
            .objective
            .iter()
            .filter(|(_, coef)| **coef != 0.)
            .collect();
        match nonzero.as_slice() {
            [] => Err(ModelError::NoObjective),
            [(id, coef)] => {
                self.reaction(id)?;
                Ok((id.as_str(), **coef))
            }
            many => Err(ModelError::MultipleObjectives(
                many.iter().map(|(id, _)| id.to_string()).collect(),
            )),
        }
    }

    /// Build the stoichiometric matrix
    ///
    /// Rows follow the order of [`Model::metabolites`] and columns the order of
    /// [`Model::reactions`]. Repeated entries are summed.
    pub fn stoichiometric_matrix(&self) -> Result<CsrMatrix<f64>, ModelError> {
        let mut coo = CooMatrix::new(self.metabolites.len(), self.reactions.len());
        for (col, (rxn_id, rxn)) in self.reactions.iter().enumerate() {
            for (met_id, coef) in &rxn.metabolites {
                let row = match self.metabolites.get_index_of(met_id) {
                    Some(row) => row,
                    None => {
                        return Err(ModelError::UnknownMetabolite {
                            reaction: rxn_id.clone(),
                            metabolite: met_id.clone(),
                        })
                    }
                };
                coo.push(row, col, *coef);
            }
        }
        Ok(CsrMatrix::from(&coo))
    }
}

/// Errors raised when querying a model
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ModelError {
    /// More than one reaction has a nonzero objective coefficient
    #[error("More than one reaction has a nonzero objective coefficient: {0:?}")]
    MultipleObjectives(Vec<String>),
    /// No reaction has a nonzero objective coefficient
    #[error("No reaction has a nonzero objective coefficient")]
    NoObjective,
    /// A reaction id that is not in the model
    #[error("Reaction {0} is not in the model")]
    UnknownReaction(String),
    /// A reaction references a metabolite that is not in the model
    #[error("Reaction {reaction} references metabolite {metabolite} which is not in the model")]
    UnknownMetabolite {
        reaction: String,
        metabolite: String,
    },
}
