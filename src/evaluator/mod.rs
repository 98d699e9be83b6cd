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

//! Expression evaluator
//!
//! Walks an expression tree against an [`EvaluationContext`]. Evaluation
//! never mutates the tree, so one parsed expression can be evaluated from
//! several threads as long as each call has its own context.

mod collections;
mod context;
mod engine;
mod error;
mod operators;

pub use collections::iterate;
pub use context::{Binding, EvaluationContext, Parameters, VariableScope};
pub use engine::{evaluate, evaluate_boolean};
pub use error::{EvaluationError, EvaluationResult};
pub use operators::{binary, compare, equals, matches, truthy, unary};
