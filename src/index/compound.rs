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

//! Indexes spanning several providers

use super::{Index, IndexProvider};
use crate::model::Value;
use std::sync::Arc;

/// One constituent's slot in the combined universe
#[derive(Clone)]
struct Part {
    provider: Arc<dyn IndexProvider>,
    offset: usize,
    len: usize,
}

/// Concatenation of several providers' universes
///
/// An index is offered for a member path when at least one constituent has
/// one. Constituents without it contribute all of their positions, so the
/// candidates stay complete.
pub struct CompoundIndexProvider {
    parts: Vec<Part>,
    everything: Arc<[Value]>,
}

impl CompoundIndexProvider {
    /// Combine `providers`, in order
    pub fn new(providers: Vec<Arc<dyn IndexProvider>>) -> Self {
        let mut parts = Vec::with_capacity(providers.len());
        let mut everything = Vec::new();
        for provider in providers {
            let values = provider.everything();
            parts.push(Part {
                provider,
                offset: everything.len(),
                len: values.len(),
            });
            everything.extend(values.iter().cloned());
        }
        Self {
            parts,
            everything: everything.into(),
        }
    }

    /// Number of constituents
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// Whether there are no constituents
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

impl IndexProvider for CompoundIndexProvider {
    fn index(&self, member: &str) -> Option<Arc<dyn Index>> {
        let indexes: Vec<_> = self
            .parts
            .iter()
            .map(|part| (part.provider.index(member), part.offset, part.len))
            .collect();
        if indexes.iter().all(|(index, _, _)| index.is_none()) {
            return None;
        }
        Some(Arc::new(CompoundIndex { indexes }))
    }

    fn everything(&self) -> Arc<[Value]> {
        Arc::clone(&self.everything)
    }
}

struct CompoundIndex {
    indexes: Vec<(Option<Arc<dyn Index>>, usize, usize)>,
}

impl Index for CompoundIndex {
    fn lookup(&self, key: &Value) -> Option<Vec<usize>> {
        let mut positions = Vec::new();
        for (index, offset, len) in &self.indexes {
            match index {
                Some(index) => positions.extend(index.lookup(key)?.into_iter().map(|p| p + offset)),
                // passthrough
                None => positions.extend(*offset..offset + len),
            }
        }
        Some(positions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{ID_MEMBER, UnitCollection};
    use crate::model::{InstallableUnit, Version};

    struct Plain(Arc<[Value]>);

    impl IndexProvider for Plain {
        fn index(&self, _member: &str) -> Option<Arc<dyn Index>> {
            None
        }

        fn everything(&self) -> Arc<[Value]> {
            Arc::clone(&self.0)
        }
    }

    fn unit(id: &str) -> InstallableUnit {
        InstallableUnit::builder(id, Version::new(1, 0, 0)).build()
    }

    #[test]
    fn test_offsets_and_passthrough() {
        let indexed: Arc<dyn IndexProvider> = Arc::new(UnitCollection::new(vec![unit("a"), unit("b")]));
        let plain: Arc<dyn IndexProvider> = Arc::new(Plain(vec![Value::from(unit("c")), Value::from(unit("b"))].into()));
        let compound = CompoundIndexProvider::new(vec![plain, indexed]);

        assert_eq!(compound.everything().len(), 4);
        let index = compound.index(ID_MEMBER).unwrap();
        assert_eq!(index.lookup(&Value::from("b")), Some(vec![0, 1, 3]));
        assert_eq!(index.lookup(&Value::Integer(1)), None);
    }

    #[test]
    fn test_no_index_when_no_constituent_has_one() {
        let plain: Arc<dyn IndexProvider> = Arc::new(Plain(vec![Value::from(unit("a"))].into()));
        let compound = CompoundIndexProvider::new(vec![plain]);
        assert!(compound.index(ID_MEMBER).is_none());
    }
}
