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

//! Queries and the things they run against
//!
//! A [`Query`] turns a [`QueryInput`] into a [`QueryResult`]. Match queries
//! additionally decide membership one element at a time and can be combined
//! without evaluating whole inputs. A [`Queryable`] owns data and knows how
//! to present it as query input.

mod compound;
mod expression;
mod limit;
mod piped;
mod queryable;
mod result;

pub use compound::{CompoundMatchQuery, CompoundQuery};
pub use expression::{ExpressionMatchQuery, ExpressionQuery};
pub use limit::LimitQuery;
pub use piped::PipedQuery;
pub use queryable::CompoundQueryable;
pub use result::{Collector, QueryResult, ValueIndexSet};

use crate::error::Result;
use crate::index::IndexProvider;
use crate::iter::RepeatableIterator;
use crate::model::Value;
use crate::progress::{ProgressMonitor, monitor_or_null};
use std::fmt;
use std::sync::Arc;

/// What a query runs against
#[derive(Clone)]
pub enum QueryInput {
    /// A replayable element stream
    Values(RepeatableIterator<Value>),
    /// A universe that may answer index lookups
    Indexed(Arc<dyn IndexProvider>),
}

impl QueryInput {
    /// Input over `values`
    pub fn from_values(values: Vec<Value>) -> Self {
        Self::Values(RepeatableIterator::from_vec(values))
    }

    /// Fresh cursor over the elements
    pub fn values(&self) -> RepeatableIterator<Value> {
        match self {
            Self::Values(values) => values.copy(),
            Self::Indexed(provider) => RepeatableIterator::from_arc(provider.everything()),
        }
    }

    /// Same input, rewound
    pub fn fresh(&self) -> Self {
        match self {
            Self::Values(values) => Self::Values(values.copy()),
            Self::Indexed(provider) => Self::Indexed(Arc::clone(provider)),
        }
    }

    /// Input that can be replayed without re-running its source
    pub(crate) fn materialized(&self) -> Self {
        match self {
            Self::Values(values) => Self::Values(RepeatableIterator::from_arc(values.materialize())),
            Self::Indexed(provider) => Self::Indexed(Arc::clone(provider)),
        }
    }
}

impl fmt::Debug for QueryInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Values(values) => f.debug_tuple("Values").field(values).finish(),
            Self::Indexed(_) => f.write_str("Indexed"),
        }
    }
}

impl From<Vec<Value>> for QueryInput {
    fn from(values: Vec<Value>) -> Self {
        Self::from_values(values)
    }
}

/// A query over a collection of values
pub trait Query: Send + Sync {
    /// Evaluate against `input`
    fn perform(&self, input: QueryInput, monitor: Arc<dyn ProgressMonitor>) -> Result<QueryResult>;

    /// This query as a per-element match, if it is one
    fn into_match(self: Arc<Self>) -> Option<Arc<dyn MatchQuery>> {
        None
    }

    /// The expression form of this query, if it has one
    fn as_expression(&self) -> Option<ExpressionQuery> {
        None
    }
}

/// A query that decides membership element by element
///
/// `is_match` may be called from several threads at once on the same query.
pub trait MatchQuery: Query {
    /// Whether `candidate` belongs to the result
    fn is_match(&self, candidate: &Value) -> Result<bool>;

    /// Called before a batch of `is_match` calls
    fn pre_perform(&self) {}

    /// Called after a batch of `is_match` calls
    fn post_perform(&self) {}
}

/// A source of values that queries can run against
pub trait Queryable: Send + Sync {
    /// The data presented as query input
    fn query_input(&self) -> QueryInput;

    /// Run `query`; a missing monitor never cancels
    fn query(&self, query: &dyn Query, monitor: Option<Arc<dyn ProgressMonitor>>) -> Result<QueryResult> {
        log::debug!("performing query against {}", std::any::type_name::<Self>());
        query.perform(self.query_input(), monitor_or_null(monitor))
    }

    /// Whether `element` is part of this queryable
    fn contains(&self, element: &Value) -> bool;

    /// Index provider over this queryable's elements, if it keeps indexes
    fn index_provider(&self) -> Option<Arc<dyn IndexProvider>> {
        None
    }
}
