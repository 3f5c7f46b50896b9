//! Module for reading models and writing integration results
pub mod gpr_parse;
pub mod json;
pub mod results;
