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

//! Parser error types
//!
//! Every variant carries the offending source text and the character offset
//! (not byte offset) where it starts.

use thiserror::Error;

/// Result type for parsing operations
pub type ParseResult<T> = Result<T, ParseError>;

/// Malformed query text
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    /// A token that cannot appear here
    #[error("Unexpected '{token}' at position {position}, expected {expected}")]
    UnexpectedToken {
        /// Token text
        token: String,
        /// What the parser was looking for
        expected: String,
        /// Character offset
        position: usize,
    },

    /// Input ended in the middle of an expression
    #[error("Unexpected end of input at position {position}, expected {expected}")]
    UnexpectedEndOfInput {
        /// What the parser was looking for
        expected: String,
        /// Character offset (the input length)
        position: usize,
    },

    /// String literal without a closing quote
    #[error("Unclosed string literal at position {position}")]
    UnclosedString {
        /// Text from the opening quote to the end of input
        text: String,
        /// Character offset of the opening quote
        position: usize,
    },

    /// Regex literal without a closing slash
    #[error("Unclosed regular expression at position {position}")]
    UnclosedRegex {
        /// Text from the opening slash to the end of input
        text: String,
        /// Character offset of the opening slash
        position: usize,
    },

    /// Literal that cannot be represented (integer overflow, bad regex)
    #[error("Invalid literal '{literal}' at position {position}: {message}")]
    InvalidLiteral {
        /// Literal text
        literal: String,
        /// Why it was rejected
        message: String,
        /// Character offset
        position: usize,
    },

    /// Unknown escape sequence in a string literal
    #[error("Invalid escape sequence '{sequence}' at position {position}")]
    InvalidEscape {
        /// The escape sequence, backslash included
        sequence: String,
        /// Character offset of the backslash
        position: usize,
    },

    /// Well-formed syntax that the expression factory rejects
    #[error("Invalid expression '{text}' at position {position}: {message}")]
    InvalidExpression {
        /// Source text of the rejected construct
        text: String,
        /// Factory message
        message: String,
        /// Character offset
        position: usize,
    },
}

impl ParseError {
    /// Character offset where the problem starts
    pub fn position(&self) -> usize {
        match self {
            Self::UnexpectedToken { position, .. }
            | Self::UnexpectedEndOfInput { position, .. }
            | Self::UnclosedString { position, .. }
            | Self::UnclosedRegex { position, .. }
            | Self::InvalidLiteral { position, .. }
            | Self::InvalidEscape { position, .. }
            | Self::InvalidExpression { position, .. } => *position,
        }
    }

    /// The source text the error refers to; empty at end of input
    pub fn offending_text(&self) -> &str {
        match self {
            Self::UnexpectedToken { token, .. } => token,
            Self::UnexpectedEndOfInput { .. } => "",
            Self::UnclosedString { text, .. } | Self::UnclosedRegex { text, .. } => text,
            Self::InvalidLiteral { literal, .. } => literal,
            Self::InvalidEscape { sequence, .. } => sequence,
            Self::InvalidExpression { text, .. } => text,
        }
    }

    /// Human-readable description
    pub fn message(&self) -> String {
        self.to_string()
    }
}
