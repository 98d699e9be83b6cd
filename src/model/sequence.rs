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

//! Lazy one-shot value sequences
//!
//! Collection operators produce a [`Sequence`] instead of a materialized list.
//! Elements are computed when pulled. Clones share the same cursor, so a
//! sequence is consumed at most once no matter how many handles exist; replay
//! is layered on top by [`crate::iter::RepeatableIterator`].

use super::value::Value;
use crate::evaluator::EvaluationResult;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// Boxed iterator of evaluation results
pub type ValueIter = Box<dyn Iterator<Item = EvaluationResult<Value>> + Send>;

/// A lazily produced, single-pass sequence of values
#[derive(Clone)]
pub struct Sequence {
    inner: Arc<Mutex<ValueIter>>,
}

impl Sequence {
    /// Wrap an iterator of results
    pub fn new<I>(iter: I) -> Self
    where
        I: Iterator<Item = EvaluationResult<Value>> + Send + 'static,
    {
        Self {
            inner: Arc::new(Mutex::new(Box::new(iter))),
        }
    }

    /// Wrap an iterator of plain values
    pub fn from_values<I>(values: I) -> Self
    where
        I: IntoIterator<Item = Value>,
        I::IntoIter: Send + 'static,
    {
        Self::new(values.into_iter().map(Ok))
    }

    /// A sequence with no elements
    pub fn empty() -> Self {
        Self::new(std::iter::empty())
    }

    /// Drain the remaining elements, stopping at the first error
    pub fn collect_values(&self) -> EvaluationResult<Vec<Value>> {
        self.clone().collect()
    }

    /// Whether two handles share the same cursor
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn addr(&self) -> usize {
        Arc::as_ptr(&self.inner) as *const () as usize
    }
}

impl Iterator for Sequence {
    type Item = EvaluationResult<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.lock().next()
    }
}

impl fmt::Debug for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sequence({:#x})", self.addr())
    }
}
