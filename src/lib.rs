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

//! Query language and engine for installable units
//!
//! Queries are written in a small expression language, parsed into
//! immutable expression trees and evaluated lazily against collections of
//! units. Predicates over identity and capabilities can be answered from
//! indexes without changing results.

pub mod ast;
pub mod config;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod index;
pub mod iter;
pub mod model;
pub mod parser;
pub mod progress;
pub mod query;
pub mod registry;

// Re-export main types
pub use config::EngineConfig;
pub use engine::QueryEngine;
pub use error::{QueryError, Result};
pub use evaluator::{EvaluationContext, Parameters};
pub use index::UnitCollection;
pub use model::{InstallableUnit, ProvidedCapability, Requirement, Value, Version, VersionRange};
pub use parser::{ParseError, parse_predicate, parse_query};
pub use progress::{CancellationToken, NullMonitor, ProgressMonitor};
pub use query::{
    CompoundQuery, CompoundQueryable, ExpressionMatchQuery, ExpressionQuery, LimitQuery, MatchQuery,
    PipedQuery, Query, QueryInput, QueryResult, Queryable,
};
