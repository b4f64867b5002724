use indexmap::IndexMap;
use thiserror::Error;

use crate::metabolic::gene::Gene;
use crate::metabolic::gpr_parse::token::Token;
use crate::metabolic::model::{Gpr, GprOperatorType};

/*
GPR Grammar:
expression -> disjunction
disjunction -> conjunction ( "OR" conjunction )* ;
conjunction -> unary ( "AND" unary )* ;
unary -> "NOT" unary | primary ;
primary -> GENE | "(" expression ")" ;

e.g. ( Gene1 AND Gene2) OR (Gene3 AND NOT Gene4)
 */

/// GPR Parser
pub struct GPRParser<'gm> {
    /// Vector of tokens from the GPR string
    tokens: Vec<Token>,
    /// Current token being processed
    current: usize,
    /// Map containing the Genes
    pub(crate) gene_map: &'gm mut IndexMap<String, Gene>,
}

impl<'gm> GPRParser<'gm> {
    /// Create a new GPRParser, `tokens` must end with [`Token::Eof`]
    pub fn new(tokens: Vec<Token>, gene_map: &'gm mut IndexMap<String, Gene>) -> GPRParser<'gm> {
        GPRParser {
            tokens,
            current: 0,
            gene_map,
        }
    }

    // region Parsing Functions

    /// Parse the token vector into a GPR AST
    pub fn parse(&mut self) -> Result<Gpr, ParseError> {
        let gpr = self.disjunction()?;
        if !self.is_at_end() {
            return Err(ParseError::EarlyTermination);
        }
        Ok(gpr)
    }

    fn disjunction(&mut self) -> Result<Gpr, ParseError> {
        let mut expr = self.conjunction()?;
        while self.match_token(&Token::Or) {
            let right = self.conjunction()?;
            expr = Gpr::new_binary_operation(expr, GprOperatorType::Or, right)
                .map_err(|_| ParseError::InvalidBinaryOperator)?;
        }
        Ok(expr)
    }

    fn conjunction(&mut self) -> Result<Gpr, ParseError> {
        let mut expr = self.unary()?;
        while self.match_token(&Token::And) {
            let right = self.unary()?;
            expr = Gpr::new_binary_operation(expr, GprOperatorType::And, right)
                .map_err(|_| ParseError::InvalidBinaryOperator)?;
        }
        Ok(expr)
    }

    fn unary(&mut self) -> Result<Gpr, ParseError> {
        if self.match_token(&Token::Not) {
            let right = self.unary()?;
            return Gpr::new_unary_operation(GprOperatorType::Not, right)
                .map_err(|_| ParseError::InvalidUnaryOperator);
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Gpr, ParseError> {
        if let Some(identifier) = self.match_identifier() {
            self.insert_if_needed(&identifier);
            return Ok(Gpr::new_gene_node(&identifier));
        }

        if self.match_token(&Token::LeftParen) {
            let expr = self.disjunction()?;
            self.consume(&Token::RightParen, "Expect ')' after expression.")?;
            return Ok(expr);
        }

        Err(ParseError::ExpectedExpression)
    }

    // endregion Parsing Functions

    // region parsing helper functions

    /// If the current token matches `token` advance past it and return true
    fn match_token(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.advance();
            return true;
        }
        false
    }

    /// If the current token is an identifier, advance past it and return the gene id
    fn match_identifier(&mut self) -> Option<String> {
        if let Token::Identifier(id) = self.peek() {
            let id = id.clone();
            self.advance();
            return Some(id);
        }
        None
    }

    fn check(&self, token: &Token) -> bool {
        !self.is_at_end() && self.peek() == token
    }

    fn advance(&mut self) {
        if !self.is_at_end() {
            self.current += 1;
        }
    }

    fn is_at_end(&self) -> bool {
        matches!(self.peek(), Token::Eof)
    }

    fn peek(&self) -> &Token {
        self.tokens.get(self.current).unwrap_or(&Token::Eof)
    }

    fn consume(&mut self, token: &Token, msg: &str) -> Result<(), ParseError> {
        if self.check(token) {
            self.advance();
            return Ok(());
        }
        Err(ParseError::MissingToken(msg.to_string()))
    }

    // endregion parsing helper functions

    /// Insert a new active gene for `gene_id` unless the map already has one
    fn insert_if_needed(&mut self, gene_id: &str) {
        if !self.gene_map.contains_key(gene_id) {
            self.gene_map
                .insert(gene_id.to_string(), Gene::new_id_only(gene_id));
        }
    }
}

/// Enum representing possible parse errors
#[derive(Debug, Error, PartialEq, Clone)]
pub enum ParseError {
    /// Token was expected to be a binary operator but was not
    #[error("Invalid binary operator encountered, expected only `and` and `or`")]
    InvalidBinaryOperator,
    /// Token was expected to be a unary operator but was not
    #[error("Invalid unary operator encountered, expected only `not`")]
    InvalidUnaryOperator,
    /// Missing expected token (e.g. a right parenthesis)
    #[error("Missing expected token: {0}")]
    MissingToken(String),
    /// No expression found when one was expected
    #[error("No expression found, check that the GPR string is not empty")]
    ExpectedExpression,
    /// Expression was not completed when parsing terminated
    #[error("Parsing terminated early, check for a `not` between two gene identifiers/grouped expressions")]
    EarlyTermination,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metabolic::gpr_parse::lexer::Lexer;

    fn parse(source: &str) -> Result<Gpr, ParseError> {
        let tokens = Lexer::new(source).lex().unwrap();
        let mut gene_map = IndexMap::new();
        GPRParser::new(tokens, &mut gene_map).parse()
    }

    #[test]
    fn single_gene_parse() {
        assert_eq!(parse("Rv1304").unwrap(), Gpr::new_gene_node("Rv1304"));
    }

    #[test]
    fn and_binds_tighter_than_or() {
        let gpr = parse("Rv0001 or Rv0002 and Rv0003").unwrap();
        assert_eq!(format!("{}", gpr), "(Rv0001 or (Rv0002 and Rv0003))");
    }

    #[test]
    fn grouping_parse() {
        let gpr = parse("(Rv3141 or Rv0023) and Rv0018").unwrap();
        assert_eq!(format!("{}", gpr), "((Rv3141 or Rv0023) and Rv0018)");
    }

    #[test]
    fn repeated_binary_is_left_associative() {
        let gpr = parse("Rv0001 and Rv0002 and Rv0003").unwrap();
        assert_eq!(format!("{}", gpr), "((Rv0001 and Rv0002) and Rv0003)");
    }

    #[test]
    fn not_parse() {
        let gpr = parse("not Rv0023").unwrap();
        assert_eq!(format!("{}", gpr), "(not Rv0023)");
    }

    #[test]
    fn parse_errors() {
        assert_eq!(parse("Rv0001 not Rv0023"), Err(ParseError::EarlyTermination));
        assert_eq!(parse(""), Err(ParseError::ExpectedExpression));
        assert_eq!(parse("Rv0001 and"), Err(ParseError::ExpectedExpression));
        assert!(matches!(
            parse("(Rv0001 or Rv0002"),
            Err(ParseError::MissingToken(_))
        ));
    }
}
