//! Reduction of a rule's tokens to a single value, operators applied in the order written
use crate::io::gpr_parse::lexer::Token;
use crate::io::gpr_parse::parser::ParseError;
use crate::metabolic_model::gene::GprOperatorType;

/// Returned when reading past the end of the token vector
static EOF: Token = Token::Eof;

/// Reduces a token vector without operator precedence
///
/// Parenthesized groups are reduced first, then every group is folded left to right with
/// min for AND and max for OR. Genes valued None are dropped together with the operator
/// joining them to the rest of their group, and a group with nothing left is dropped from
/// its parent in the same way.
pub struct LeftToRightReducer<'v, F> {
    tokens: Vec<Token>,
    current: usize,
    value_of: &'v F,
}

impl<'v, F> LeftToRightReducer<'v, F>
where
    F: Fn(&str) -> Option<f64>,
{
    pub fn new(tokens: Vec<Token>, value_of: &'v F) -> Self {
        Self {
            tokens,
            current: 0,
            value_of,
        }
    }

    /// Reduce the whole token vector, None when every gene was dropped
    pub fn reduce(&mut self) -> Result<Option<f64>, ParseError> {
        let value = self.group()?;
        if *self.peek() != Token::Eof {
            return Err(ParseError::EarlyTermination);
        }
        Ok(value)
    }

    fn group(&mut self) -> Result<Option<f64>, ParseError> {
        let mut value = self.operand()?;
        loop {
            let operator = match self.peek() {
                Token::And => GprOperatorType::And,
                Token::Or => GprOperatorType::Or,
                _ => break,
            };
            self.current += 1;
            let right = self.operand()?;
            value = match (value, right) {
                (Some(left), Some(right)) => Some(match operator {
                    GprOperatorType::And => left.min(right),
                    GprOperatorType::Or => left.max(right),
                }),
                (left, None) => left,
                (None, right) => right,
            };
        }
        Ok(value)
    }

    fn operand(&mut self) -> Result<Option<f64>, ParseError> {
        match self.peek().clone() {
            Token::Identifier(id) => {
                self.current += 1;
                Ok((self.value_of)(&id))
            }
            Token::LeftParen => {
                self.current += 1;
                let value = self.group()?;
                if *self.peek() != Token::RightParen {
                    return Err(ParseError::MissingToken(
                        "Expect ')' after expression.".to_string(),
                    ));
                }
                self.current += 1;
                Ok(value)
            }
            _ => Err(ParseError::ExpectedExpression),
        }
    }

    fn peek(&self) -> &Token {
        self.tokens.get(self.current).unwrap_or(&EOF)
    }
}
