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

//! Query results and collectors

use crate::error::{QueryError, Result};
use crate::evaluator::{EvaluationError, EvaluationResult, iterate};
use crate::iter::RepeatableIterator;
use crate::model::{Sequence, Value, ValueType};
use indexmap::IndexSet;
use once_cell::sync::OnceCell;
use rustc_hash::FxBuildHasher;
use std::fmt;
use std::sync::Arc;

/// Ordered set of result values
pub type ValueIndexSet = IndexSet<Value, FxBuildHasher>;

/// The outcome of performing a query
///
/// Elements are produced lazily and buffered as they are pulled, so the
/// result can be inspected and iterated any number of times while the
/// underlying evaluation runs at most once. Evaluation errors, cancellation
/// included, surface from whichever accessor first reaches them.
#[derive(Clone)]
pub struct QueryResult {
    values: RepeatableIterator<EvaluationResult<Value>>,
    frozen: Arc<OnceCell<Arc<ValueIndexSet>>>,
}

impl QueryResult {
    /// Result over a stream of evaluation results
    pub fn from_results<I>(results: I) -> Self
    where
        I: IntoIterator<Item = EvaluationResult<Value>>,
        I::IntoIter: Send + 'static,
    {
        Self {
            values: RepeatableIterator::from_iter(results),
            frozen: Arc::new(OnceCell::new()),
        }
    }

    /// Result holding `values`
    pub fn from_values(values: Vec<Value>) -> Self {
        Self {
            values: RepeatableIterator::from_vec(values.into_iter().map(Ok).collect()),
            frozen: Arc::new(OnceCell::new()),
        }
    }

    /// Result with no elements
    pub fn empty() -> Self {
        Self::from_values(Vec::new())
    }

    /// Result of evaluating a query expression
    ///
    /// Collections contribute their elements, `null` nothing, and any other
    /// value is a single element.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Null => Self::empty(),
            collection if collection.is_collection() => match iterate("query", collection) {
                Ok(elements) => Self::from_results(elements),
                Err(e) => Self::from_results(std::iter::once(Err(e))),
            },
            scalar => Self::from_values(vec![scalar]),
        }
    }

    /// Fresh cursor over the raw evaluation results
    pub(crate) fn results(&self) -> RepeatableIterator<EvaluationResult<Value>> {
        self.values.copy()
    }

    /// Whether there are no elements; evaluates at most one
    pub fn is_empty(&self) -> Result<bool> {
        match self.values.copy().next() {
            None => Ok(true),
            Some(Ok(_)) => Ok(false),
            Some(Err(e)) => Err(e.into()),
        }
    }

    /// Iterate from the start
    pub fn iter(&self) -> impl Iterator<Item = Result<Value>> + Send + 'static {
        self.values.copy().map(|item| item.map_err(QueryError::from))
    }

    /// Lazy view usable as an expression value
    pub fn stream(&self) -> Sequence {
        Sequence::new(self.values.copy())
    }

    /// All elements in order
    pub fn to_vec(&self) -> Result<Vec<Value>> {
        self.iter().collect()
    }

    /// First element, if any
    pub fn first(&self) -> Result<Option<Value>> {
        self.iter().next().transpose()
    }

    /// Number of elements
    pub fn len(&self) -> Result<usize> {
        self.iter().try_fold(0, |count, item| item.map(|_| count + 1))
    }

    /// Elements as an array, each checked against `element_type`
    pub fn to_array(&self, element_type: ValueType) -> Result<Vec<Value>> {
        self.iter()
            .map(|item| {
                let value = item?;
                if value.is_instance_of(element_type) {
                    Ok(value)
                } else {
                    Err(EvaluationError::type_mismatch(
                        "to_array",
                        element_type.name(),
                        value.type_name(),
                    )
                    .into())
                }
            })
            .collect()
    }

    /// Independent, mutable copy of the elements
    pub fn to_set(&self) -> Result<ValueIndexSet> {
        self.iter().collect()
    }

    /// Shared read-only set, computed once per result
    pub fn to_unmodifiable_set(&self) -> Result<Arc<ValueIndexSet>> {
        self.frozen
            .get_or_try_init(|| self.to_set().map(Arc::new))
            .cloned()
    }
}

impl fmt::Debug for QueryResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryResult")
            .field("values", &self.values)
            .finish()
    }
}

/// Accumulates accepted elements, dropping repeats
#[derive(Debug, Default)]
pub struct Collector {
    values: ValueIndexSet,
}

impl Collector {
    /// Create an empty collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer an element; returns `true` while the caller should keep going
    pub fn accept(&mut self, value: Value) -> bool {
        self.values.insert(value);
        true
    }

    /// Number of distinct elements accepted
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether nothing was accepted
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Finish collecting
    pub fn into_result(self) -> QueryResult {
        QueryResult::from_values(self.values.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_result_replays_without_reevaluating() {
        let pulls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&pulls);
        let result = QueryResult::from_results((1..=3).map(move |i| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Value::Integer(i))
        }));
        assert!(!result.is_empty().unwrap());
        assert_eq!(pulls.load(Ordering::SeqCst), 1);
        assert_eq!(result.len().unwrap(), 3);
        assert_eq!(result.to_vec().unwrap().len(), 3);
        assert_eq!(pulls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_to_set_is_independent_copy() {
        let result = QueryResult::from_values(vec![Value::Integer(1), Value::Integer(2)]);
        let mut copy = result.to_set().unwrap();
        copy.insert(Value::Integer(9));
        assert_eq!(result.to_set().unwrap().len(), 2);

        let frozen = result.to_unmodifiable_set().unwrap();
        assert!(Arc::ptr_eq(&frozen, &result.to_unmodifiable_set().unwrap()));
    }

    #[test]
    fn test_errors_surface_from_accessors() {
        let result = QueryResult::from_results(vec![
            Ok(Value::Integer(1)),
            Err(EvaluationError::Cancelled),
        ]);
        assert_eq!(result.first().unwrap(), Some(Value::Integer(1)));
        assert_eq!(result.to_vec(), Err(QueryError::Cancelled));
    }

    #[test]
    fn test_to_array_checks_element_type() {
        let result = QueryResult::from_values(vec![Value::Integer(1), Value::from("x")]);
        let error = result.to_array(ValueType::Integer).unwrap_err();
        assert!(!error.is_cancelled());
        assert_eq!(
            QueryResult::from_values(vec![Value::Integer(1)])
                .to_array(ValueType::Integer)
                .unwrap(),
            vec![Value::Integer(1)]
        );
    }

    #[test]
    fn test_scalar_and_null_values() {
        assert!(QueryResult::from_value(Value::Null).is_empty().unwrap());
        assert_eq!(
            QueryResult::from_value(Value::Boolean(true)).to_vec().unwrap(),
            vec![Value::Boolean(true)]
        );
    }

    #[test]
    fn test_collector_deduplicates() {
        let mut collector = Collector::new();
        assert!(collector.accept(Value::Integer(1)));
        assert!(collector.accept(Value::Integer(1)));
        assert_eq!(collector.len(), 1);
        assert_eq!(collector.into_result().len().unwrap(), 1);
    }
}
