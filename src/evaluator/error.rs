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

//! Evaluation error types

use thiserror::Error;

/// Result type for evaluation operations
pub type EvaluationResult<T> = Result<T, EvaluationError>;

/// Errors raised while walking an expression tree
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvaluationError {
    /// Variable referenced but not bound in any enclosing scope
    #[error("Unbound variable '{name}'")]
    UnboundVariable {
        /// Variable name
        name: String,
    },

    /// Positional or keyed parameter that was not supplied
    #[error("Parameter {parameter} was not supplied")]
    UnknownParameter {
        /// Parameter reference as written (`$0`, `$name`)
        parameter: String,
    },

    /// Operator applied to operands of incompatible runtime types
    #[error("Type mismatch in {operation}: expected {expected}, got {actual}")]
    TypeMismatch {
        /// Operator or operation name
        operation: String,
        /// Expected type description
        expected: String,
        /// Actual type found
        actual: String,
    },

    /// Member that the receiver's type does not expose
    #[error("{type_name} has no member '{member}'")]
    UnknownMember {
        /// Member name
        member: String,
        /// Receiver type
        type_name: String,
    },

    /// Integer overflow or division by zero
    #[error("Arithmetic error: {message}")]
    Arithmetic {
        /// Error message
        message: String,
    },

    /// Argument with an acceptable type but an unusable value
    #[error("Invalid argument to {function}: {message}")]
    InvalidArgument {
        /// Function or operator name
        function: String,
        /// Error message
        message: String,
    },

    /// Pattern that does not compile
    #[error("Invalid regular expression '{pattern}': {message}")]
    InvalidRegex {
        /// Pattern source
        pattern: String,
        /// Compiler message
        message: String,
    },

    /// The progress monitor asked evaluation to stop
    #[error("Evaluation cancelled")]
    Cancelled,
}

impl EvaluationError {
    /// Create a type mismatch error
    pub fn type_mismatch(
        operation: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::TypeMismatch {
            operation: operation.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create an invalid argument error
    pub fn invalid_argument(function: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            function: function.into(),
            message: message.into(),
        }
    }

    /// Whether this error is a cancellation signal rather than a failure
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
