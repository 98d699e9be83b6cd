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

//! Error types for query construction and execution
//!
//! [`QueryError`] is what callers of the query layer see. Cancellation has
//! its own variant so it can be told apart from a failed query.

use crate::ast::ExpressionError;
use crate::evaluator::EvaluationError;
use crate::parser::ParseError;
use thiserror::Error;

/// Result type alias for query operations
pub type Result<T> = std::result::Result<T, QueryError>;

/// Errors surfaced by the query layer
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    /// Malformed query text
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Expression tree that fails validation
    #[error("Invalid expression: {0}")]
    Expression(#[from] ExpressionError),

    /// Failure while evaluating a query
    #[error("Evaluation error: {0}")]
    Evaluation(EvaluationError),

    /// The progress monitor cancelled the query
    #[error("Query cancelled")]
    Cancelled,
}

impl QueryError {
    /// Whether the query was interrupted rather than failed
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl From<EvaluationError> for QueryError {
    fn from(error: EvaluationError) -> Self {
        if error.is_cancellation() {
            Self::Cancelled
        } else {
            Self::Evaluation(error)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancellation_keeps_its_identity() {
        let error = QueryError::from(EvaluationError::Cancelled);
        assert!(error.is_cancelled());
        assert_eq!(error, QueryError::Cancelled);
    }

    #[test]
    fn test_evaluation_errors_are_wrapped() {
        let error = QueryError::from(EvaluationError::UnboundVariable {
            name: "x".to_string(),
        });
        assert!(!error.is_cancelled());
        assert_eq!(error.to_string(), "Evaluation error: Unbound variable 'x'");
    }
}
