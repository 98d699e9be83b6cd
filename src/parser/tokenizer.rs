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

//! Byte-level tokenizer for query expressions
//!
//! Identifiers are zero-copy slices of the input. String literals have their
//! escapes processed here so the parser only sees final text. A `/` starts a
//! regex literal whenever the previous token cannot end an operand, which is
//! how `a / b` and `x ~= /a.*b/` are told apart.

use super::error::{ParseError, ParseResult};
use super::span::{Spanned, char_offset};
use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;

/// Lexical token
#[derive(Debug, Clone, PartialEq)]
pub enum Token<'input> {
    /// Integer literal
    Integer(i64),
    /// `9223372036854775808`, representable only after unary `-`
    MinIntegerMagnitude,
    /// String literal with escapes processed
    String(String),
    /// Regex literal source, `\/` unescaped
    Regex(String),
    /// Identifier
    Identifier(&'input str),
    /// `$0`, `$1`, ...
    IndexedParameter(usize),
    /// `$name`
    KeyedParameter(&'input str),
    /// `true`
    True,
    /// `false`
    False,
    /// `null`
    Null,

    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `/`
    Slash,
    /// `%`
    Percent,
    /// `==`
    EqualEqual,
    /// `!=`
    NotEqual,
    /// `<`
    Less,
    /// `<=`
    LessEqual,
    /// `>`
    Greater,
    /// `>=`
    GreaterEqual,
    /// `~=`
    Matches,
    /// `&&`
    AndAnd,
    /// `||`
    OrOr,
    /// `!`
    Bang,
    /// `?`
    Question,
    /// `:`
    Colon,
    /// `|` (lambda separator)
    Pipe,
    /// `=` (curried assignment)
    Assign,
    /// `.`
    Dot,
    /// `,`
    Comma,
    /// `(`
    LeftParen,
    /// `)`
    RightParen,
    /// `[`
    LeftBracket,
    /// `]`
    RightBracket,
    /// `{`
    LeftBrace,
    /// `}`
    RightBrace,
}

impl Token<'_> {
    /// Whether this token can end an operand
    pub fn ends_operand(&self) -> bool {
        matches!(
            self,
            Token::Integer(_)
                | Token::MinIntegerMagnitude
                | Token::String(_)
                | Token::Regex(_)
                | Token::Identifier(_)
                | Token::IndexedParameter(_)
                | Token::KeyedParameter(_)
                | Token::True
                | Token::False
                | Token::Null
                | Token::RightParen
                | Token::RightBracket
        )
    }
}

/// Keyword lookup table
static KEYWORD_TABLE: Lazy<FxHashMap<&'static str, Token<'static>>> = Lazy::new(|| {
    let mut map = FxHashMap::default();
    map.insert("true", Token::True);
    map.insert("false", Token::False);
    map.insert("null", Token::Null);
    map
});

/// Tokenizer over a query string
pub struct Tokenizer<'input> {
    input: &'input str,
    bytes: &'input [u8],
    pos: usize,
    previous_ends_operand: bool,
}

impl<'input> Tokenizer<'input> {
    /// Create a tokenizer
    pub fn new(input: &'input str) -> Self {
        Self {
            input,
            bytes: input.as_bytes(),
            pos: 0,
            previous_ends_operand: false,
        }
    }

    fn is_id_start(ch: u8) -> bool {
        ch.is_ascii_alphabetic() || ch == b'_'
    }

    fn is_id_continue(ch: u8) -> bool {
        ch.is_ascii_alphanumeric() || ch == b'_'
    }

    fn skip_whitespace(&mut self) {
        while self.pos < self.bytes.len() && self.bytes[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    fn char_position(&self, byte: usize) -> usize {
        char_offset(self.input, byte)
    }

    fn rest_from(&self, byte: usize) -> String {
        self.input.get(byte..).unwrap_or_default().to_string()
    }

    fn parse_identifier(&mut self) -> &'input str {
        let start = self.pos;
        while self.pos < self.bytes.len() && Self::is_id_continue(self.bytes[self.pos]) {
            self.pos += 1;
        }
        &self.input[start..self.pos]
    }

    fn parse_integer(&mut self) -> ParseResult<Token<'input>> {
        let start = self.pos;
        while self.pos < self.bytes.len() && self.bytes[self.pos].is_ascii_digit() {
            self.pos += 1;
        }
        let text = &self.input[start..self.pos];
        if text.parse::<u64>() == Ok(i64::MIN.unsigned_abs()) {
            return Ok(Token::MinIntegerMagnitude);
        }
        text.parse::<i64>()
            .map(Token::Integer)
            .map_err(|e| ParseError::InvalidLiteral {
                literal: text.to_string(),
                message: e.to_string(),
                position: self.char_position(start),
            })
    }

    fn parse_string_literal(&mut self, quote: u8) -> ParseResult<Token<'input>> {
        let start = self.pos;
        self.pos += 1;
        let mut value = String::new();
        let mut segment = self.pos;

        while self.pos < self.bytes.len() {
            match self.bytes[self.pos] {
                b if b == quote => {
                    value.push_str(&self.input[segment..self.pos]);
                    self.pos += 1;
                    return Ok(Token::String(value));
                }
                b'\\' => {
                    value.push_str(&self.input[segment..self.pos]);
                    let escape_start = self.pos;
                    let escaped = self.input[self.pos + 1..].chars().next();
                    let replacement = match escaped {
                        Some('\\') => '\\',
                        Some('\'') => '\'',
                        Some('"') => '"',
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some('r') => '\r',
                        Some(other) => {
                            return Err(ParseError::InvalidEscape {
                                sequence: format!("\\{other}"),
                                position: self.char_position(escape_start),
                            });
                        }
                        None => break,
                    };
                    value.push(replacement);
                    self.pos += 1 + replacement_len(escaped);
                    segment = self.pos;
                }
                _ => self.pos += 1,
            }
        }

        Err(ParseError::UnclosedString {
            text: self.rest_from(start),
            position: self.char_position(start),
        })
    }

    fn parse_regex_literal(&mut self) -> ParseResult<Token<'input>> {
        let start = self.pos;
        self.pos += 1;
        let mut source = String::new();
        let mut segment = self.pos;

        while self.pos < self.bytes.len() {
            match self.bytes[self.pos] {
                b'/' => {
                    source.push_str(&self.input[segment..self.pos]);
                    self.pos += 1;
                    return Ok(Token::Regex(source));
                }
                b'\\' if self.bytes.get(self.pos + 1) == Some(&b'/') => {
                    source.push_str(&self.input[segment..self.pos]);
                    source.push('/');
                    self.pos += 2;
                    segment = self.pos;
                }
                b'\\' if self.pos + 1 < self.bytes.len() => {
                    // Keep other escapes for the regex engine; skip the escaped
                    // byte only when it is ASCII so we stay on a char boundary
                    self.pos += if self.bytes[self.pos + 1].is_ascii() { 2 } else { 1 };
                }
                _ => self.pos += 1,
            }
        }

        Err(ParseError::UnclosedRegex {
            text: self.rest_from(start),
            position: self.char_position(start),
        })
    }

    fn parse_parameter(&mut self) -> ParseResult<Token<'input>> {
        let start = self.pos;
        self.pos += 1;
        match self.bytes.get(self.pos) {
            Some(b) if b.is_ascii_digit() => {
                let digits_start = self.pos;
                while self.pos < self.bytes.len() && self.bytes[self.pos].is_ascii_digit() {
                    self.pos += 1;
                }
                let text = &self.input[digits_start..self.pos];
                text.parse::<usize>()
                    .map(Token::IndexedParameter)
                    .map_err(|e| ParseError::InvalidLiteral {
                        literal: self.input[start..self.pos].to_string(),
                        message: e.to_string(),
                        position: self.char_position(start),
                    })
            }
            Some(b) if Self::is_id_start(*b) => Ok(Token::KeyedParameter(self.parse_identifier())),
            _ => Err(ParseError::UnexpectedToken {
                token: "$".to_string(),
                expected: "parameter index or name".to_string(),
                position: self.char_position(start),
            }),
        }
    }

    fn operator(&mut self, width: usize, token: Token<'input>) -> Token<'input> {
        self.pos += width;
        token
    }

    /// Next token with its byte span, or `None` at end of input
    pub fn next_token(&mut self) -> ParseResult<Option<Spanned<Token<'input>>>> {
        self.skip_whitespace();
        if self.pos >= self.bytes.len() {
            return Ok(None);
        }

        let start = self.pos;
        let next = self.bytes.get(self.pos + 1).copied();
        let token = match self.bytes[self.pos] {
            b'.' => self.operator(1, Token::Dot),
            b'(' => self.operator(1, Token::LeftParen),
            b')' => self.operator(1, Token::RightParen),
            b'[' => self.operator(1, Token::LeftBracket),
            b']' => self.operator(1, Token::RightBracket),
            b'{' => self.operator(1, Token::LeftBrace),
            b'}' => self.operator(1, Token::RightBrace),
            b',' => self.operator(1, Token::Comma),
            b'+' => self.operator(1, Token::Plus),
            b'-' => self.operator(1, Token::Minus),
            b'*' => self.operator(1, Token::Star),
            b'%' => self.operator(1, Token::Percent),
            b'?' => self.operator(1, Token::Question),
            b':' => self.operator(1, Token::Colon),
            b'=' if next == Some(b'=') => self.operator(2, Token::EqualEqual),
            b'=' => self.operator(1, Token::Assign),
            b'!' if next == Some(b'=') => self.operator(2, Token::NotEqual),
            b'!' => self.operator(1, Token::Bang),
            b'<' if next == Some(b'=') => self.operator(2, Token::LessEqual),
            b'<' => self.operator(1, Token::Less),
            b'>' if next == Some(b'=') => self.operator(2, Token::GreaterEqual),
            b'>' => self.operator(1, Token::Greater),
            b'~' if next == Some(b'=') => self.operator(2, Token::Matches),
            b'&' if next == Some(b'&') => self.operator(2, Token::AndAnd),
            b'|' if next == Some(b'|') => self.operator(2, Token::OrOr),
            b'|' => self.operator(1, Token::Pipe),
            b'/' if self.previous_ends_operand => self.operator(1, Token::Slash),
            b'/' => self.parse_regex_literal()?,
            b'\'' => self.parse_string_literal(b'\'')?,
            b'"' => self.parse_string_literal(b'"')?,
            b'$' => self.parse_parameter()?,
            b if b.is_ascii_digit() => self.parse_integer()?,
            b if Self::is_id_start(b) => {
                let ident = self.parse_identifier();
                KEYWORD_TABLE
                    .get(ident)
                    .cloned()
                    .unwrap_or(Token::Identifier(ident))
            }
            _ => {
                let unexpected = self.input[start..].chars().next().unwrap_or_default();
                return Err(ParseError::UnexpectedToken {
                    token: unexpected.to_string(),
                    expected: "a token".to_string(),
                    position: self.char_position(start),
                });
            }
        };

        self.previous_ends_operand = token.ends_operand();
        Ok(Some(Spanned::new(token, start, self.pos)))
    }

    /// Tokenize the whole input
    pub fn tokenize_all(&mut self) -> ParseResult<Vec<Spanned<Token<'input>>>> {
        let mut tokens = Vec::with_capacity(self.input.len() / 3 + 1);
        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }
        Ok(tokens)
    }
}

fn replacement_len(escaped: Option<char>) -> usize {
    escaped.map_or(0, char::len_utf8)
}

/// Tokenize `input` into spanned tokens
pub fn tokenize(input: &str) -> ParseResult<Vec<Spanned<Token<'_>>>> {
    Tokenizer::new(input).tokenize_all()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<Token<'_>> {
        tokenize(input)
            .unwrap()
            .into_iter()
            .map(|t| t.value)
            .collect()
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            tokens("a == b != c ~= d && e || !f"),
            vec![
                Token::Identifier("a"),
                Token::EqualEqual,
                Token::Identifier("b"),
                Token::NotEqual,
                Token::Identifier("c"),
                Token::Matches,
                Token::Identifier("d"),
                Token::AndAnd,
                Token::Identifier("e"),
                Token::OrOr,
                Token::Bang,
                Token::Identifier("f"),
            ]
        );
    }

    #[test]
    fn test_slash_is_division_after_operand() {
        assert_eq!(
            tokens("a / 2"),
            vec![Token::Identifier("a"), Token::Slash, Token::Integer(2)]
        );
        assert_eq!(
            tokens("a ~= /x\\/y.*/"),
            vec![
                Token::Identifier("a"),
                Token::Matches,
                Token::Regex("x/y.*".to_string())
            ]
        );
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(
            tokens(r#"'it\'s' "a\"b\n""#),
            vec![
                Token::String("it's".to_string()),
                Token::String("a\"b\n".to_string())
            ]
        );
    }

    #[test]
    fn test_parameters_and_keywords() {
        assert_eq!(
            tokens("$0 $name null true"),
            vec![
                Token::IndexedParameter(0),
                Token::KeyedParameter("name"),
                Token::Null,
                Token::True
            ]
        );
    }

    #[test]
    fn test_errors_carry_char_offsets() {
        let err = tokenize("'é' == 'abc").unwrap_err();
        assert_eq!(err.position(), 7);
        assert_eq!(err.offending_text(), "'abc");

        let err = tokenize("'a\\q'").unwrap_err();
        assert!(matches!(err, ParseError::InvalidEscape { position: 2, .. }));

        let err = tokenize("a # b").unwrap_err();
        assert_eq!(err.position(), 2);
        assert_eq!(err.offending_text(), "#");
    }
}
