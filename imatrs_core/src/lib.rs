//! Core rust implementation of imatrs, integrating gene expression into constraint based
//! metabolic models with the iMAT family of mixed integer problems.

pub mod configuration;
pub mod expression;
pub mod integration;
pub mod io;
pub mod metabolic_model;
pub mod optimize;
