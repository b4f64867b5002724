//! Module for parsing Gene Protein Reaction strings into AST values

use indexmap::IndexMap;
use thiserror::Error;

use crate::metabolic::gene::Gene;
use crate::metabolic::model::Gpr;

pub use lexer::LexerError;
pub use parser::ParseError;

mod lexer;
pub mod parser;
mod token;

/// Parse a Gene Protein Reaction string into a GPR Tree
///
/// # Parameters
/// - `input`: &str representing the gene protein reaction rule
/// - `gene_map`: map of gene id strings to genes, genes referenced by the rule but missing
///   from the map are inserted
///
/// # Returns
/// - `Ok(None)`: The rule was empty (or only whitespace)
/// - `Ok(Some(gpr))`: The root node of the GPR tree
/// - `Err`: The GprParseError describing the issue with the rule
///
/// # Examples
/// ```rust
/// use indexmap::IndexMap;
/// use metabolic_chat::metabolic::gpr_parse::parse_gpr;
/// let mut gene_map = IndexMap::new();
/// let gpr = parse_gpr("Rv0001 and Rv0002", &mut gene_map).unwrap().unwrap();
/// assert_eq!(gpr.to_string(), "(Rv0001 and Rv0002)");
/// assert_eq!(gene_map.len(), 2);
/// ```
pub fn parse_gpr(
    input: &str,
    gene_map: &mut IndexMap<String, Gene>,
) -> Result<Option<Gpr>, GprParseError> {
    if input.trim().is_empty() {
        return Ok(None);
    }
    let tokens = lexer::Lexer::new(input).lex()?;
    let mut parser = parser::GPRParser::new(tokens, gene_map);
    Ok(Some(parser.parse()?))
}

/// Enum representing possible lex and parse errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GprParseError {
    /// Lexing Error
    #[error("Error while lexing GPR: {0}")]
    LexingError(#[from] LexerError),
    /// Parsing Error
    #[error("Error while parsing GPR: {0}")]
    ParsingError(#[from] ParseError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metabolic::gene::GeneBuilder;

    #[test]
    fn test_parse_gpr_keeps_known_genes() {
        let mut gene_map: IndexMap<String, Gene> = IndexMap::new();
        gene_map.insert(
            "Rv0001".to_string(),
            GeneBuilder::default()
                .id("Rv0001".to_string())
                .name(Some("dnaA".to_string()))
                .build()
                .unwrap(),
        );
        let gpr = parse_gpr("Rv0001 and (Rv0002 or Rv0003)", &mut gene_map)
            .unwrap()
            .unwrap();
        assert_eq!(gpr.to_string(), "(Rv0001 and (Rv0002 or Rv0003))");
        assert_eq!(gene_map.len(), 3);
        assert_eq!(gene_map["Rv0001"].name.as_deref(), Some("dnaA"));
    }

    #[test]
    fn test_empty_rule() {
        let mut gene_map = IndexMap::new();
        assert_eq!(parse_gpr("  ", &mut gene_map), Ok(None));
    }

    #[test]
    fn test_errors_are_wrapped() {
        let mut gene_map = IndexMap::new();
        assert!(matches!(
            parse_gpr("g1 | g2", &mut gene_map),
            Err(GprParseError::LexingError(_))
        ));
        assert!(matches!(
            parse_gpr("g1 and", &mut gene_map),
            Err(GprParseError::ParsingError(_))
        ));
    }
}
