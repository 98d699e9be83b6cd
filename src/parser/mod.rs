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

//! Query expression parser
//!
//! Converts query text into an expression tree. Two entry points exist:
//! [`parse_predicate`] binds `item` (and reads unknown bare identifiers as
//! members of it), [`parse_query`] binds `everything`.

pub mod error;
pub mod pratt;
pub mod span;
pub mod tokenizer;

pub use error::{ParseError, ParseResult};
pub use pratt::{ParseMode, PrattParser, parse_expression_pratt};
pub use span::Spanned;

use crate::ast::{Expression, ExpressionFactory};

/// Parser bound to a particular expression factory
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryParser {
    factory: ExpressionFactory,
}

impl QueryParser {
    /// Create a parser using `factory`
    pub const fn new(factory: ExpressionFactory) -> Self {
        Self { factory }
    }

    /// Parse a per-element predicate
    pub fn parse_predicate(&self, input: &str) -> ParseResult<Expression> {
        self.parse(input, ParseMode::Predicate)
    }

    /// Parse a whole-collection query
    pub fn parse_query(&self, input: &str) -> ParseResult<Expression> {
        self.parse(input, ParseMode::Query)
    }

    /// Parse in an explicit mode
    pub fn parse(&self, input: &str, mode: ParseMode) -> ParseResult<Expression> {
        log::debug!("parsing {mode:?}: {input}");
        PrattParser::new(input, mode, self.factory)?.parse()
    }
}

/// Parse a per-element predicate with the default factory
pub fn parse_predicate(input: &str) -> ParseResult<Expression> {
    QueryParser::default().parse_predicate(input)
}

/// Parse a whole-collection query with the default factory
pub fn parse_query(input: &str) -> ParseResult<Expression> {
    QueryParser::default().parse_query(input)
}
