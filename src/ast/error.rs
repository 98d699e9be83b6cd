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

//! Expression construction errors

use thiserror::Error;

/// Result type for factory operations
pub type ExpressionResult<T> = Result<T, ExpressionError>;

/// A tree that the factory refuses to build
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExpressionError {
    /// Wrong number of operands or arguments
    #[error("{operator} expects {expected} argument(s), got {actual}")]
    InvalidArity {
        /// Operator or function name
        operator: String,
        /// Accepted count, human readable
        expected: String,
        /// Count supplied
        actual: usize,
    },

    /// A lambda argument is missing
    #[error("{operator} requires a lambda argument")]
    LambdaRequired {
        /// Operator name
        operator: String,
    },

    /// A lambda appears where a value is expected
    #[error("{operator} does not accept a lambda argument here")]
    UnexpectedLambda {
        /// Operator or function name
        operator: String,
    },

    /// Call to a function that does not exist
    #[error("Unknown function '{name}'")]
    UnknownFunction {
        /// Function name
        name: String,
    },

    /// Attempt to rebind a reserved variable
    #[error("'{name}' is reserved and cannot be rebound")]
    ReservedName {
        /// Variable name
        name: String,
    },
}
