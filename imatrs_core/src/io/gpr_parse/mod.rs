//! Module for parsing Gene Protein Reaction strings into AST values

use crate::io::gpr_parse::lexer::LexerError;
use crate::io::gpr_parse::parser::ParseError;
use crate::metabolic_model::gene::{Gene, Gpr};
use indexmap::IndexMap;
use thiserror::Error;

mod lexer;
pub mod parser;
mod reduce;

/// Parse a Gene Protein Reaction string into a GPR Tree
///
/// # Parameters
/// - `input`: &str representing the gene protein reaction rule
/// - `gene_map`: map of gene id strings to genes, genes named in the rule but missing from
///   the map are added to it
///
/// # Returns
/// Parse result which is
/// - `Ok`: The root node of the GPR tree.
/// - `Err`: Returns the GprParseError describing the issue with the GPR rule which
///     was being parsed.
///
/// # Examples
/// ```rust
/// use indexmap::IndexMap;
/// use imatrs_core::io::gpr_parse::parse_gpr;
/// let gpr: &str = "MXAN_0001 and MXAN_0002";
/// let mut gene_map = IndexMap::new();
/// let gpr_tree = parse_gpr(gpr, &mut gene_map).unwrap();
/// assert_eq!(gene_map.len(), 2);
/// ```
pub fn parse_gpr(
    input: &str,
    gene_map: &mut IndexMap<String, Gene>,
) -> Result<Gpr, GprParseError> {
    let tokens = lexer::Lexer::new(input).lex()?;
    let mut parser = parser::GPRParser::new(tokens, gene_map);
    Ok(parser.parse()?)
}

/// Reduce a Gene Protein Reaction string to one value, taking the minimum over AND and the
/// maximum over OR in the order the operators are written
///
/// Unlike [`parse_gpr`] there is no precedence between the operators, only parentheses
/// group. Genes for which `value_of` returns None are dropped from the rule, and None is
/// returned when no gene is left.
///
/// # Examples
/// ```rust
/// use imatrs_core::io::gpr_parse::reduce_gpr;
/// let value_of = |g: &str| match g {
///     "A" => Some(0.2),
///     "B" => Some(0.9),
///     _ => Some(0.4),
/// };
/// // (B or A) and C
/// assert_eq!(reduce_gpr("B or A and C", &value_of).unwrap(), Some(0.4));
/// ```
pub fn reduce_gpr<F>(input: &str, value_of: &F) -> Result<Option<f64>, GprParseError>
where
    F: Fn(&str) -> Option<f64>,
{
    let tokens = lexer::Lexer::new(input).lex()?;
    Ok(reduce::LeftToRightReducer::new(tokens, value_of).reduce()?)
}

/// Enum representing possible lex and parse errors
#[derive(Debug, Error)]
pub enum GprParseError {
    /// Lexing Error
    #[error("Error occurred during lexing (conversion of GPR string to tokens): {0}")]
    LexingError(#[from] LexerError),
    /// Parsing Error
    #[error("Error occurred during parsing (conversion of tokens to GPR tree): {0}")]
    ParsingError(#[from] ParseError),
}
