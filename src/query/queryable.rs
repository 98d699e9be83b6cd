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

//! Several queryables presented as one

use super::{QueryInput, Queryable};
use crate::index::{CompoundIndexProvider, Index, IndexProvider};
use crate::iter::RepeatableIterator;
use crate::model::Value;
use once_cell::sync::OnceCell;
use std::sync::Arc;

/// Universe of a constituent that keeps no indexes
struct Scanned(Arc<[Value]>);

impl IndexProvider for Scanned {
    fn index(&self, _member: &str) -> Option<Arc<dyn Index>> {
        None
    }

    fn everything(&self) -> Arc<[Value]> {
        Arc::clone(&self.0)
    }
}

/// Queryables searched in order, as if they were one
///
/// Queries see a [`CompoundIndexProvider`]. Constituents without indexes are
/// materialized once and passed through unfiltered, so an index offered by
/// any constituent is still used for the others.
pub struct CompoundQueryable {
    queryables: Vec<Arc<dyn Queryable>>,
    provider: OnceCell<Option<Arc<dyn IndexProvider>>>,
}

impl CompoundQueryable {
    /// Combine `queryables`
    pub fn new(queryables: Vec<Arc<dyn Queryable>>) -> Self {
        Self {
            queryables,
            provider: OnceCell::new(),
        }
    }

    fn compound_provider(&self) -> Option<Arc<dyn IndexProvider>> {
        self.provider
            .get_or_init(|| {
                if self.queryables.is_empty() {
                    return None;
                }
                let providers = self
                    .queryables
                    .iter()
                    .map(|queryable| {
                        queryable.index_provider().unwrap_or_else(|| {
                            log::trace!("scanning constituent without indexes");
                            Arc::new(Scanned(queryable.query_input().values().materialize())) as Arc<dyn IndexProvider>
                        })
                    })
                    .collect();
                Some(Arc::new(CompoundIndexProvider::new(providers)) as Arc<dyn IndexProvider>)
            })
            .clone()
    }
}

impl Queryable for CompoundQueryable {
    fn query_input(&self) -> QueryInput {
        match self.compound_provider() {
            Some(provider) => QueryInput::Indexed(provider),
            None => QueryInput::Values(RepeatableIterator::from_vec(Vec::new())),
        }
    }

    fn contains(&self, element: &Value) -> bool {
        self.queryables.iter().any(|queryable| queryable.contains(element))
    }

    fn index_provider(&self) -> Option<Arc<dyn IndexProvider>> {
        self.compound_provider()
    }
}
