// Copyright 2024 OctoFHIR Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Pratt parser for query expressions
//!
//! ### Precedence levels (highest to lowest)
//! - **Postfix** (9): `.member`, `.op(...)`, `[key]`
//! - **Unary** (8): `!`, `-`
//! - **Multiplicative** (7): `*`, `/`, `%`
//! - **Additive** (6): `+`, `-`
//! - **Relational** (5): `<`, `<=`, `>`, `>=`
//! - **Equality** (4): `==`, `!=`, `~=`
//! - **And** (3): `&&` (n-ary)
//! - **Or** (2): `||` (n-ary)
//! - **Conditional** (1): `c ? a : b` (right associative)
//!
//! Lambdas (`x | body`, `{a = e, x | body}`) are only recognised in
//! collection-operator argument position.

use super::error::{ParseError, ParseResult};
use super::span::{Spanned, char_offset};
use super::tokenizer::{Token, Tokenizer};
use crate::ast::{
    BinaryOperator, CollectionOperator, EVERYTHING, Expression, ExpressionError,
    ExpressionFactory, ITEM, Precedence,
};
use crate::model::Pattern;

/// Precedence of a binary operator token
fn get_precedence(token: &Token<'_>) -> Option<Precedence> {
    match token {
        Token::EqualEqual | Token::NotEqual | Token::Matches => Some(Precedence::Equality),
        Token::Less | Token::LessEqual | Token::Greater | Token::GreaterEqual => {
            Some(Precedence::Relational)
        }
        Token::Plus | Token::Minus => Some(Precedence::Additive),
        Token::Star | Token::Slash | Token::Percent => Some(Precedence::Multiplicative),
        Token::AndAnd => Some(Precedence::And),
        Token::OrOr => Some(Precedence::Or),
        Token::Question => Some(Precedence::Conditional),
        _ => None,
    }
}

/// Binary operator for a token
fn token_to_binary_op(token: &Token<'_>) -> Option<BinaryOperator> {
    match token {
        Token::EqualEqual => Some(BinaryOperator::Equal),
        Token::NotEqual => Some(BinaryOperator::NotEqual),
        Token::Matches => Some(BinaryOperator::Matches),
        Token::Less => Some(BinaryOperator::Less),
        Token::LessEqual => Some(BinaryOperator::LessOrEqual),
        Token::Greater => Some(BinaryOperator::Greater),
        Token::GreaterEqual => Some(BinaryOperator::GreaterOrEqual),
        Token::Plus => Some(BinaryOperator::Add),
        Token::Minus => Some(BinaryOperator::Subtract),
        Token::Star => Some(BinaryOperator::Multiply),
        Token::Slash => Some(BinaryOperator::Divide),
        Token::Percent => Some(BinaryOperator::Modulo),
        _ => None,
    }
}

/// Which variable a bare expression is implicitly evaluated against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParseMode {
    /// Predicate: `item` is bound and unknown identifiers are members of it
    Predicate,
    /// Full query: `everything` is bound
    Query,
}

/// Parser state over a pre-tokenized input
pub struct PrattParser<'input> {
    input: &'input str,
    tokens: Vec<Spanned<Token<'input>>>,
    pos: usize,
    factory: ExpressionFactory,
    mode: ParseMode,
    scope: Vec<String>,
}

impl<'input> PrattParser<'input> {
    /// Tokenize `input` and prepare to parse it in `mode`
    pub fn new(input: &'input str, mode: ParseMode, factory: ExpressionFactory) -> ParseResult<Self> {
        let tokens = Tokenizer::new(input).tokenize_all()?;
        let root = match mode {
            ParseMode::Predicate => ITEM,
            ParseMode::Query => EVERYTHING,
        };
        Ok(Self {
            input,
            tokens,
            pos: 0,
            factory,
            mode,
            scope: vec![root.to_string()],
        })
    }

    /// Parse the whole input as one expression
    pub fn parse(mut self) -> ParseResult<Expression> {
        let expr = self.parse_expression(Precedence::Lowest)?;
        match self.tokens.get(self.pos) {
            None => Ok(expr),
            Some(token) => Err(self.unexpected(token, "end of input")),
        }
    }

    fn current(&self) -> Option<&Token<'input>> {
        self.tokens.get(self.pos).map(|t| &t.value)
    }

    fn peek(&self, offset: usize) -> Option<&Token<'input>> {
        self.tokens.get(self.pos + offset).map(|t| &t.value)
    }

    fn advance(&mut self) -> Option<Spanned<Token<'input>>> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn start_byte(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map_or(self.input.len(), |t| t.start)
    }

    fn end_byte(&self) -> usize {
        self.pos
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map_or(0, |t| t.end)
    }

    fn unexpected(&self, token: &Spanned<Token<'input>>, expected: &str) -> ParseError {
        ParseError::UnexpectedToken {
            token: token.text(self.input).to_string(),
            expected: expected.to_string(),
            position: char_offset(self.input, token.start),
        }
    }

    fn end_of_input(&self, expected: &str) -> ParseError {
        ParseError::UnexpectedEndOfInput {
            expected: expected.to_string(),
            position: self.input.chars().count(),
        }
    }

    fn error_here(&self, expected: &str) -> ParseError {
        match self.tokens.get(self.pos) {
            Some(token) => self.unexpected(token, expected),
            None => self.end_of_input(expected),
        }
    }

    fn expect(&mut self, expected: Token<'input>, description: &str) -> ParseResult<()> {
        match self.current() {
            Some(token) if *token == expected => {
                self.pos += 1;
                Ok(())
            }
            _ => Err(self.error_here(description)),
        }
    }

    fn expect_identifier(&mut self, description: &str) -> ParseResult<&'input str> {
        match self.current() {
            Some(Token::Identifier(name)) => {
                let name = *name;
                self.pos += 1;
                Ok(name)
            }
            _ => Err(self.error_here(description)),
        }
    }

    fn invalid(&self, start: usize, error: ExpressionError) -> ParseError {
        let end = self.end_byte().max(start);
        ParseError::InvalidExpression {
            text: self.input.get(start..end).unwrap_or_default().to_string(),
            message: error.to_string(),
            position: char_offset(self.input, start),
        }
    }

    fn is_declared(&self, name: &str) -> bool {
        self.scope.iter().rev().any(|declared| declared == name)
    }

    /// Parse an expression whose operators bind at least as tight as `min`
    fn parse_expression(&mut self, min: Precedence) -> ParseResult<Expression> {
        let start = self.start_byte();
        let mut left = self.parse_unary()?;

        while let Some(token) = self.current().cloned() {
            let Some(precedence) = get_precedence(&token) else {
                break;
            };
            if precedence < min {
                break;
            }

            match token {
                Token::Question => {
                    self.pos += 1;
                    let then_expr = self.parse_expression(Precedence::Conditional)?;
                    self.expect(Token::Colon, "':' in conditional")?;
                    let else_expr = self.parse_expression(Precedence::Conditional)?;
                    left = self.factory.conditional(left, then_expr, else_expr);
                }
                Token::AndAnd | Token::OrOr => {
                    let is_and = matches!(token, Token::AndAnd);
                    let separator = token;
                    let mut operands = vec![left];
                    while self.current() == Some(&separator) {
                        self.pos += 1;
                        operands.push(self.parse_expression(precedence.next_level())?);
                    }
                    let built = if is_and {
                        self.factory.and(operands)
                    } else {
                        self.factory.or(operands)
                    };
                    left = built.map_err(|e| self.invalid(start, e))?;
                }
                _ => {
                    let Some(op) = token_to_binary_op(&token) else {
                        break;
                    };
                    self.pos += 1;
                    let right = self.parse_expression(precedence.next_level())?;
                    left = self.factory.binary(op, left, right);
                }
            }
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> ParseResult<Expression> {
        match self.current() {
            Some(Token::Bang) => {
                self.pos += 1;
                let operand = self.parse_unary()?;
                Ok(self.factory.not(operand))
            }
            Some(Token::Minus) => {
                if self.peek(1) == Some(&Token::MinIntegerMagnitude)
                    && !matches!(self.peek(2), Some(Token::Dot | Token::LeftBracket))
                {
                    self.pos += 2;
                    return Ok(self.factory.integer(i64::MIN));
                }
                self.pos += 1;
                let operand = self.parse_unary()?;
                Ok(self.factory.negate(operand))
            }
            _ => {
                let start = self.start_byte();
                let primary = self.parse_primary()?;
                self.parse_postfix(primary, start)
            }
        }
    }

    fn parse_postfix(&mut self, mut expr: Expression, start: usize) -> ParseResult<Expression> {
        loop {
            match self.current() {
                Some(Token::Dot) => {
                    self.pos += 1;
                    let name = self.expect_identifier("member or operator name")?;
                    if self.current() == Some(&Token::LeftParen) {
                        let Some(op) = CollectionOperator::from_name(name) else {
                            return Err(self.invalid(
                                start,
                                ExpressionError::UnknownFunction {
                                    name: name.to_string(),
                                },
                            ));
                        };
                        self.pos += 1;
                        let args = self.parse_arguments(true)?;
                        expr = self
                            .factory
                            .collection(op, expr, args)
                            .map_err(|e| self.invalid(start, e))?;
                    } else {
                        expr = self.factory.member(expr, name);
                    }
                }
                Some(Token::LeftBracket) => {
                    self.pos += 1;
                    let key = self.parse_expression(Precedence::Lowest)?;
                    self.expect(Token::RightBracket, "']'")?;
                    expr = self.factory.at(expr, key);
                }
                _ => return Ok(expr),
            }
        }
    }

    fn parse_primary(&mut self) -> ParseResult<Expression> {
        let start = self.start_byte();
        let Some(token) = self.advance() else {
            return Err(self.end_of_input("an expression"));
        };

        match token.value {
            Token::Integer(value) => Ok(self.factory.integer(value)),
            Token::MinIntegerMagnitude => Err(ParseError::InvalidLiteral {
                literal: token.text(self.input).to_string(),
                message: "number too large to fit in target type".to_string(),
                position: char_offset(self.input, token.start),
            }),
            Token::String(value) => Ok(self.factory.string(value)),
            Token::Regex(ref source) => Pattern::new(source)
                .map(|pattern| self.factory.pattern(pattern))
                .map_err(|e| ParseError::InvalidLiteral {
                    literal: token.text(self.input).to_string(),
                    message: e.to_string(),
                    position: char_offset(self.input, token.start),
                }),
            Token::True => Ok(self.factory.boolean(true)),
            Token::False => Ok(self.factory.boolean(false)),
            Token::Null => Ok(self.factory.null()),
            Token::IndexedParameter(index) => Ok(self.factory.indexed_parameter(index)),
            Token::KeyedParameter(key) => Ok(self.factory.keyed_parameter(key)),
            Token::LeftParen => {
                let inner = self.parse_expression(Precedence::Lowest)?;
                self.expect(Token::RightParen, "')'")?;
                Ok(inner)
            }
            Token::LeftBracket => {
                let items = self.parse_list(Token::RightBracket, "']'")?;
                self.factory
                    .array(items)
                    .map_err(|e| self.invalid(start, e))
            }
            Token::Identifier(name) => {
                if self.current() == Some(&Token::LeftParen) {
                    self.pos += 1;
                    let args = self.parse_arguments(false)?;
                    return self
                        .factory
                        .function(name, args)
                        .map_err(|e| self.invalid(start, e));
                }
                if self.is_declared(name) || self.mode == ParseMode::Query {
                    Ok(self.factory.variable(name))
                } else {
                    Ok(self.factory.member(self.factory.item(), name))
                }
            }
            _ => Err(self.unexpected(&token, "an expression")),
        }
    }

    /// Comma separated expressions up to `close`, which is consumed
    fn parse_list(&mut self, close: Token<'input>, description: &str) -> ParseResult<Vec<Expression>> {
        let mut items = Vec::new();
        if self.current() == Some(&close) {
            self.pos += 1;
            return Ok(items);
        }
        loop {
            items.push(self.parse_expression(Precedence::Lowest)?);
            match self.current() {
                Some(Token::Comma) => self.pos += 1,
                Some(token) if *token == close => {
                    self.pos += 1;
                    return Ok(items);
                }
                _ => return Err(self.error_here(description)),
            }
        }
    }

    /// Call arguments after `(`; lambdas are accepted when `allow_lambda`
    fn parse_arguments(&mut self, allow_lambda: bool) -> ParseResult<Vec<Expression>> {
        if !allow_lambda {
            return self.parse_list(Token::RightParen, "',' or ')'");
        }
        let mut args = Vec::new();
        if self.current() == Some(&Token::RightParen) {
            self.pos += 1;
            return Ok(args);
        }
        loop {
            args.push(self.parse_argument()?);
            match self.current() {
                Some(Token::Comma) => self.pos += 1,
                Some(Token::RightParen) => {
                    self.pos += 1;
                    return Ok(args);
                }
                _ => return Err(self.error_here("',' or ')'")),
            }
        }
    }

    fn parse_argument(&mut self) -> ParseResult<Expression> {
        match (self.current(), self.peek(1)) {
            (Some(Token::LeftBrace), _) => self.parse_curried_lambda(),
            (Some(Token::Identifier(_)), Some(Token::Pipe)) => {
                let start = self.start_byte();
                let variable = self.expect_identifier("lambda parameter")?;
                self.pos += 1;
                self.parse_lambda_body(start, Vec::new(), variable)
            }
            _ => self.parse_expression(Precedence::Lowest),
        }
    }

    fn parse_curried_lambda(&mut self) -> ParseResult<Expression> {
        let start = self.start_byte();
        self.expect(Token::LeftBrace, "'{'")?;
        let mut assignments = Vec::new();
        loop {
            let name = self.expect_identifier("assignment or lambda parameter")?;
            match self.current() {
                Some(Token::Assign) => {
                    self.pos += 1;
                    let value = self.parse_expression(Precedence::Conditional)?;
                    assignments.push((name.to_string(), value));
                    self.expect(Token::Comma, "','")?;
                }
                Some(Token::Pipe) => {
                    self.pos += 1;
                    let lambda = self.parse_lambda_body(start, assignments, name)?;
                    self.expect(Token::RightBrace, "'}'")?;
                    return Ok(lambda);
                }
                _ => return Err(self.error_here("'=' or '|'")),
            }
        }
    }

    fn parse_lambda_body(
        &mut self,
        start: usize,
        assignments: Vec<(String, Expression)>,
        variable: &str,
    ) -> ParseResult<Expression> {
        let depth = self.scope.len();
        self.scope
            .extend(assignments.iter().map(|(name, _)| name.clone()));
        self.scope.push(variable.to_string());
        let body = self.parse_expression(Precedence::Lowest);
        self.scope.truncate(depth);
        let body = body?;
        self.factory
            .curried_lambda(assignments, variable, body)
            .map_err(|e| self.invalid(start, e))
    }
}

/// Parse `input` in `mode` with a default factory
pub fn parse_expression_pratt(input: &str, mode: ParseMode) -> ParseResult<Expression> {
    PrattParser::new(input, mode, ExpressionFactory::new())?.parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{ExpressionNode, LiteralValue};

    fn query(input: &str) -> Expression {
        parse_expression_pratt(input, ParseMode::Query).unwrap()
    }

    fn predicate(input: &str) -> Expression {
        parse_expression_pratt(input, ParseMode::Predicate).unwrap()
    }

    #[test]
    fn test_precedence() {
        assert_eq!(query("1 + 2 * 3").to_string(), "1 + 2 * 3");
        assert_eq!(query("(1 + 2) * 3").to_string(), "(1 + 2) * 3");
        assert_eq!(query("a || b && c").to_string(), "a || b && c");
        assert!(matches!(query("a || b && c").as_ref(), ExpressionNode::Or(ops) if ops.len() == 2));
        assert!(matches!(query("a && b && c").as_ref(), ExpressionNode::And(ops) if ops.len() == 3));
    }

    #[test]
    fn test_predicate_mode_reads_bare_identifiers_from_item() {
        let expr = predicate("id == $0");
        assert_eq!(expr.to_string(), "item.id == $0");
        assert_eq!(expr, predicate("item.id == $0"));
    }

    #[test]
    fn test_lambda_scoping() {
        let expr = predicate("requirements.exists(r | r.optional)");
        assert_eq!(expr.to_string(), "item.requirements.exists(r | r.optional)");

        let expr = query("everything.select(x | x.id == 'a')");
        assert_eq!(expr.to_string(), "everything.select(x | x.id == 'a')");
    }

    #[test]
    fn test_curried_lambda() {
        let text = "everything.traverse({cache = set(), x | x.requirements})";
        assert_eq!(query(text).to_string(), text);
    }

    #[test]
    fn test_negative_literal() {
        assert_eq!(*query("-5"), ExpressionNode::Literal(LiteralValue::Integer(-5)));
        assert_eq!(query("3 - -5").to_string(), "3 - -5");
    }

    #[test]
    fn test_smallest_integer_literal() {
        let min = ExpressionFactory::default().integer(i64::MIN);
        assert_eq!(query(&min.to_string()), min);
        assert_eq!(query("1 - -9223372036854775808").to_string(), "1 - -9223372036854775808");
        assert!(matches!(
            parse_expression_pratt("9223372036854775808", ParseMode::Query),
            Err(ParseError::InvalidLiteral { position: 0, .. })
        ));
        assert!(matches!(
            parse_expression_pratt("1 - 9223372036854775808", ParseMode::Query),
            Err(ParseError::InvalidLiteral { position: 4, .. })
        ));
    }

    #[test]
    fn test_errors() {
        let err = parse_expression_pratt("a ==", ParseMode::Query).unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedEndOfInput { position: 4, .. }));

        let err = parse_expression_pratt("a b", ParseMode::Query).unwrap_err();
        assert_eq!(err.position(), 2);
        assert_eq!(err.offending_text(), "b");

        let err = parse_expression_pratt("everything.select(1)", ParseMode::Query).unwrap_err();
        assert!(matches!(err, ParseError::InvalidExpression { position: 0, .. }));

        let err = parse_expression_pratt("everything.bogus()", ParseMode::Query).unwrap_err();
        assert!(matches!(err, ParseError::InvalidExpression { .. }));

        let err = parse_expression_pratt("x ~= /[/", ParseMode::Query).unwrap_err();
        assert!(matches!(err, ParseError::InvalidLiteral { position: 5, .. }));
    }
}
