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

//! AND / OR composition of queries

use super::{Collector, MatchQuery, Query, QueryInput, QueryResult, ValueIndexSet};
use crate::error::{QueryError, Result};
use crate::model::Value;
use crate::progress::ProgressMonitor;
use std::sync::Arc;

/// Several queries combined with AND or OR over whole results
///
/// The input is materialized once and every sub-query runs against its own
/// cursor over it. OR unions the results; AND intersects them in the order
/// of the first sub-query's output.
pub struct CompoundQuery {
    queries: Vec<Arc<dyn Query>>,
    and: bool,
}

impl CompoundQuery {
    /// Combine `queries`
    ///
    /// No queries give a query with an empty result and a single query is
    /// returned as is. When every query is a match query the combination is
    /// a [`CompoundMatchQuery`] that short-circuits per element.
    pub fn create(mut queries: Vec<Arc<dyn Query>>, and: bool) -> Arc<dyn Query> {
        if queries.len() == 1 {
            if let Some(query) = queries.pop() {
                return query;
            }
        }
        if !queries.is_empty() {
            let matches: Option<Vec<Arc<dyn MatchQuery>>> =
                queries.iter().map(|query| Arc::clone(query).into_match()).collect();
            if let Some(matches) = matches {
                return Arc::new(CompoundMatchQuery::new(matches, and));
            }
        }
        Arc::new(Self { queries, and })
    }

    /// Whether results are intersected rather than unioned
    pub fn is_and(&self) -> bool {
        self.and
    }
}

impl Query for CompoundQuery {
    fn perform(&self, input: QueryInput, monitor: Arc<dyn ProgressMonitor>) -> Result<QueryResult> {
        if self.queries.is_empty() {
            return Ok(QueryResult::empty());
        }
        let input = input.materialized();
        let mut combined: Option<ValueIndexSet> = None;
        for query in &self.queries {
            if monitor.is_cancelled() {
                log::debug!("compound query cancelled");
                return Err(QueryError::Cancelled);
            }
            let result = query.perform(input.fresh(), Arc::clone(&monitor))?.to_set()?;
            let next = match combined.take() {
                None => result,
                Some(acc) if self.and => acc.into_iter().filter(|value| result.contains(value)).collect(),
                Some(mut acc) => {
                    acc.extend(result);
                    acc
                }
            };
            let exhausted = self.and && next.is_empty();
            combined = Some(next);
            if exhausted {
                break;
            }
        }
        Ok(QueryResult::from_values(
            combined.unwrap_or_default().into_iter().collect(),
        ))
    }
}

/// Match queries combined element by element
///
/// AND stops at the first sub-query that rejects a candidate, OR at the
/// first that accepts it.
pub struct CompoundMatchQuery {
    queries: Vec<Arc<dyn MatchQuery>>,
    and: bool,
}

impl CompoundMatchQuery {
    /// Combine match queries
    pub fn new(queries: Vec<Arc<dyn MatchQuery>>, and: bool) -> Self {
        Self { queries, and }
    }
}

impl Query for CompoundMatchQuery {
    fn perform(&self, input: QueryInput, monitor: Arc<dyn ProgressMonitor>) -> Result<QueryResult> {
        self.pre_perform();
        let mut collector = Collector::new();
        let outcome = input.values().try_for_each(|candidate| {
            if monitor.is_cancelled() {
                return Err(QueryError::Cancelled);
            }
            if self.is_match(&candidate)? {
                collector.accept(candidate);
            }
            monitor.worked(1);
            Ok(())
        });
        self.post_perform();
        outcome.map(|()| collector.into_result())
    }

    fn into_match(self: Arc<Self>) -> Option<Arc<dyn MatchQuery>> {
        Some(self)
    }
}

impl MatchQuery for CompoundMatchQuery {
    fn is_match(&self, candidate: &Value) -> Result<bool> {
        for query in &self.queries {
            if query.is_match(candidate)? != self.and {
                return Ok(!self.and);
            }
        }
        Ok(self.and)
    }

    fn pre_perform(&self) {
        self.queries.iter().for_each(|query| query.pre_perform());
    }

    fn post_perform(&self) {
        self.queries.iter().for_each(|query| query.post_perform());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::{EvaluationError, Parameters};
    use crate::progress::{CancellationToken, NullMonitor};
    use crate::query::ExpressionQuery;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        accept: bool,
        calls: AtomicUsize,
    }

    impl Counting {
        fn new(accept: bool) -> Arc<Self> {
            Arc::new(Self {
                accept,
                calls: AtomicUsize::new(0),
            })
        }
    }

    impl Query for Counting {
        fn perform(&self, input: QueryInput, _monitor: Arc<dyn ProgressMonitor>) -> Result<QueryResult> {
            let values = input.values().filter(|_| self.accept).collect();
            Ok(QueryResult::from_values(values))
        }

        fn into_match(self: Arc<Self>) -> Option<Arc<dyn MatchQuery>> {
            Some(self)
        }
    }

    impl MatchQuery for Counting {
        fn is_match(&self, _candidate: &Value) -> Result<bool> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.accept)
        }
    }

    fn context(text: &str) -> Arc<dyn Query> {
        Arc::new(ExpressionQuery::parse(text, Parameters::new()).unwrap())
    }

    fn numbers() -> QueryInput {
        QueryInput::from_values((1..=4).map(Value::Integer).collect())
    }

    fn perform(query: &Arc<dyn Query>) -> Vec<Value> {
        query
            .perform(numbers(), Arc::new(NullMonitor))
            .unwrap()
            .to_vec()
            .unwrap()
    }

    #[test]
    fn test_and_short_circuits_per_element() {
        let first = Counting::new(false);
        let second = Counting::new(true);
        let query = CompoundQuery::create(vec![first.clone() as Arc<dyn Query>, second.clone()], true);
        let matcher = Arc::clone(&query).into_match().unwrap();

        assert!(!matcher.is_match(&Value::Integer(1)).unwrap());
        assert_eq!(first.calls.load(Ordering::SeqCst), 1);
        assert_eq!(second.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_or_short_circuits_per_element() {
        let first = Counting::new(true);
        let second = Counting::new(false);
        let query = CompoundQuery::create(vec![first.clone() as Arc<dyn Query>, second.clone()], false);

        assert_eq!(perform(&query).len(), 4);
        assert_eq!(first.calls.load(Ordering::SeqCst), 4);
        assert_eq!(second.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_context_queries_intersect_and_union() {
        let lower = "everything.select(x | x < 4)";
        let upper = "everything.select(x | x > 1)";

        let and = CompoundQuery::create(vec![context(lower), context(upper)], true);
        assert_eq!(perform(&and), vec![Value::Integer(2), Value::Integer(3)]);

        let or = CompoundQuery::create(vec![context(lower), context(upper)], false);
        assert_eq!(
            perform(&or),
            (1..=4).map(Value::Integer).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_degenerate_compositions() {
        assert!(perform(&CompoundQuery::create(Vec::new(), true)).is_empty());

        let single = context("everything.select(x | x == 2)");
        let same = CompoundQuery::create(vec![Arc::clone(&single)], false);
        assert!(Arc::ptr_eq(&single, &same));
    }

    #[test]
    fn test_sub_query_errors_propagate() {
        let failing = context("everything.select(x | x.id == 'a')");
        let query = CompoundQuery::create(vec![context("everything"), failing], false);
        let error = query.perform(numbers(), Arc::new(NullMonitor)).unwrap_err();
        assert!(matches!(
            error,
            QueryError::Evaluation(EvaluationError::UnknownMember { .. })
        ));
    }

    #[test]
    fn test_cancellation_stops_remaining_sub_queries() {
        let token = CancellationToken::new();
        token.cancel();
        let query = CompoundQuery::create(vec![context("everything"), context("everything")], true);
        let error = query.perform(numbers(), Arc::new(token)).unwrap_err();
        assert!(error.is_cancelled());
    }
}
