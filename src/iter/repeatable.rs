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

//! Replayable iteration over one-shot sources
//!
//! A [`RepeatableIterator`] is a cursor over a shared buffer. Every cursor
//! obtained through [`RepeatableIterator::copy`] starts at the beginning and
//! sees the same elements in the same order. The underlying source is pulled
//! incrementally, only as far as the furthest cursor has advanced, and at most
//! once per element. When the source is exhausted its elements are published
//! as an immutable `Arc<[T]>` and later reads take no lock.

use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

type Source<T> = Box<dyn Iterator<Item = T> + Send>;

struct Pending<T> {
    buffer: Vec<T>,
    source: Option<Source<T>>,
}

struct Shared<T> {
    materialized: OnceCell<Arc<[T]>>,
    pending: Mutex<Pending<T>>,
}

/// Cursor over a lazily materialized, replayable sequence
pub struct RepeatableIterator<T> {
    shared: Arc<Shared<T>>,
    position: usize,
}

impl<T> RepeatableIterator<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Wrap a one-shot iterator
    pub fn from_iter<I>(source: I) -> Self
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: Send + 'static,
    {
        Self {
            shared: Arc::new(Shared {
                materialized: OnceCell::new(),
                pending: Mutex::new(Pending {
                    buffer: Vec::new(),
                    source: Some(Box::new(source.into_iter())),
                }),
            }),
            position: 0,
        }
    }

    /// Wrap elements that are already available; no copying takes place
    pub fn from_arc(values: Arc<[T]>) -> Self {
        Self {
            shared: Arc::new(Shared {
                materialized: OnceCell::with_value(values),
                pending: Mutex::new(Pending {
                    buffer: Vec::new(),
                    source: None,
                }),
            }),
            position: 0,
        }
    }

    /// Wrap a vector
    pub fn from_vec(values: Vec<T>) -> Self {
        Self::from_arc(values.into())
    }

    /// A fresh cursor positioned at the first element
    pub fn copy(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            position: 0,
        }
    }

    /// Drain the source if needed and return every element
    pub fn materialize(&self) -> Arc<[T]> {
        if let Some(values) = self.shared.materialized.get() {
            return Arc::clone(values);
        }
        let mut pending = self.shared.pending.lock();
        if let Some(values) = self.shared.materialized.get() {
            return Arc::clone(values);
        }
        if let Some(source) = pending.source.take() {
            pending.buffer.extend(source);
        }
        let values: Arc<[T]> = std::mem::take(&mut pending.buffer).into();
        let _ = self.shared.materialized.set(Arc::clone(&values));
        values
    }

    /// Whether the source has been fully drained
    pub fn is_materialized(&self) -> bool {
        self.shared.materialized.get().is_some()
    }

    /// Whether the sequence has no elements; pulls at most one element
    pub fn is_empty(&self) -> bool {
        self.copy().next().is_none()
    }

    /// Number of elements, materializing if needed
    pub fn len(&self) -> usize {
        self.materialize().len()
    }

    fn pull(&mut self) -> Option<T> {
        let mut pending = self.shared.pending.lock();
        // Another cursor may have finished the source while we waited
        if let Some(values) = self.shared.materialized.get() {
            return values.get(self.position).cloned();
        }
        if let Some(item) = pending.buffer.get(self.position) {
            return Some(item.clone());
        }
        let next = pending.source.as_mut().and_then(|source| source.next());
        match next {
            Some(item) => {
                pending.buffer.push(item.clone());
                Some(item)
            }
            None => {
                pending.source = None;
                let values: Arc<[T]> = std::mem::take(&mut pending.buffer).into();
                let _ = self.shared.materialized.set(values);
                None
            }
        }
    }
}

impl<T> Iterator for RepeatableIterator<T>
where
    T: Clone + Send + Sync + 'static,
{
    type Item = T;

    fn next(&mut self) -> Option<T> {
        let item = match self.shared.materialized.get() {
            Some(values) => values.get(self.position).cloned(),
            None => self.pull(),
        };
        if item.is_some() {
            self.position += 1;
        }
        item
    }
}

impl<T> Clone for RepeatableIterator<T> {
    /// Clones keep their position; use [`RepeatableIterator::copy`] to restart
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            position: self.position,
        }
    }
}

impl<T> fmt::Debug for RepeatableIterator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepeatableIterator")
            .field("position", &self.position)
            .field("materialized", &self.shared.materialized.get().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_interleaved_cursors() {
        let source = RepeatableIterator::from_iter(vec![1, 2, 3]);
        let mut a = source.copy();
        let mut b = source.copy();
        assert_eq!(a.next(), Some(1));
        assert_eq!(b.next(), Some(1));
        assert_eq!(b.next(), Some(2));
        assert_eq!(a.next(), Some(2));
        assert_eq!(a.by_ref().collect::<Vec<_>>(), vec![3]);
        assert!(source.is_materialized());
        assert_eq!(b.collect::<Vec<_>>(), vec![3]);
    }

    #[test]
    fn test_pulls_only_what_is_consumed() {
        let pulled = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&pulled);
        let source = RepeatableIterator::from_iter((0..100).inspect(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(source.copy().take(3).count(), 3);
        assert_eq!(pulled.load(Ordering::SeqCst), 3);
        assert!(!source.is_empty());
        assert_eq!(source.len(), 100);
        assert_eq!(pulled.load(Ordering::SeqCst), 100);
    }

    #[test]
    fn test_materialize_after_partial_read() {
        let source = RepeatableIterator::from_iter(vec!['a', 'b', 'c']);
        let mut cursor = source.copy();
        assert_eq!(cursor.next(), Some('a'));
        assert_eq!(&*source.materialize(), &['a', 'b', 'c']);
        assert_eq!(cursor.collect::<String>(), "bc");
    }
}
