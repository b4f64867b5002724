//! Lex a GPR string into a series of tokens for later parsing

use thiserror::Error;

use crate::metabolic::gpr_parse::token::Token;

pub struct Lexer {
    source: Vec<char>,
    tokens: Vec<Token>,
    start: usize,
    current: usize,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Lexer {
            source: source.chars().collect(),
            tokens: Vec::new(),
            start: 0,
            current: 0,
        }
    }

    /// Convert the source into tokens, always terminated by [`Token::Eof`]
    pub fn lex(mut self) -> Result<Vec<Token>, LexerError> {
        while !self.is_at_end() {
            self.start = self.current;
            self.scan_token()?;
        }
        self.tokens.push(Token::Eof);
        Ok(self.tokens)
    }

    fn scan_token(&mut self) -> Result<(), LexerError> {
        let c: char = self.advance();
        match c {
            // Single Character Tokens
            '(' => self.add_token(Token::LeftParen),
            ')' => self.add_token(Token::RightParen),
            // Whitespace
            ' ' | '\r' | '\n' | '\t' => {}
            // Identifiers and Operators
            c if Lexer::is_identifier_char(c) => self.read_identifier(),
            c => {
                return Err(LexerError::InvalidCharacter {
                    character: c,
                    position: self.start,
                })
            }
        };
        Ok(())
    }

    fn advance(&mut self) -> char {
        let char_at_current = self.source[self.current];
        self.current += 1;
        char_at_current
    }

    fn read_identifier(&mut self) {
        while Lexer::is_identifier_char(self.peek()) {
            self.advance();
        }

        let text: String = self.source[self.start..self.current].iter().collect();

        match text.to_ascii_lowercase().as_str() {
            "and" => self.add_token(Token::And),
            "or" => self.add_token(Token::Or),
            "not" => self.add_token(Token::Not),
            _ => self.add_token(Token::Identifier(text)),
        }
    }

    fn is_identifier_char(c: char) -> bool {
        c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-' | ':')
    }

    fn peek(&self) -> char {
        if self.is_at_end() {
            return '\0';
        }
        self.source[self.current]
    }

    fn add_token(&mut self, token: Token) {
        self.tokens.push(token);
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }
}

/// Errors encountered while lexing
#[derive(Debug, Error, PartialEq, Clone)]
pub enum LexerError {
    #[error("Invalid character '{character}' at position {position}")]
    InvalidCharacter { character: char, position: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_gene() {
        let tokens = Lexer::new("Rv0023").lex().unwrap();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0], Token::Identifier(String::from("Rv0023")));
    }

    #[test]
    fn test_grouping() {
        let tokens = Lexer::new("(Rv0023 OR Rv0123)").lex().unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::LeftParen,
                Token::Identifier(String::from("Rv0023")),
                Token::Or,
                Token::Identifier(String::from("Rv0123")),
                Token::RightParen,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_identifier_characters() {
        let tokens = Lexer::new("10458.1 and not gene-2:a_b").lex().unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Identifier(String::from("10458.1")),
                Token::And,
                Token::Not,
                Token::Identifier(String::from("gene-2:a_b")),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_invalid_character() {
        assert_eq!(
            Lexer::new("g1 & g2").lex(),
            Err(LexerError::InvalidCharacter {
                character: '&',
                position: 3
            })
        );
    }
}
