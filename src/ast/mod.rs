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

//! Abstract Syntax Tree (AST) definitions for query expressions
//!
//! Trees are immutable and shared through [`Expression`] handles. Build them
//! with [`ExpressionFactory`] (or the parser, which uses it) so that arity
//! rules are enforced at construction time.

mod display;
mod error;
mod expression;
mod factory;
mod operator;
mod visitor;

pub use error::{ExpressionError, ExpressionResult};
pub use expression::*;
pub use factory::ExpressionFactory;
pub use operator::*;
pub use visitor::{Visitor, parameters, references_variable, walk};
