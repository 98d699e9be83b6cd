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

//! In-memory unit collections

use super::{CAPABILITY_MEMBER, CapabilityIndex, ID_MEMBER, IdIndex, Index, IndexProvider};
use crate::iter::{CompoundIterator, UnitFilter};
use crate::model::{InstallableUnit, Value};
use crate::query::{QueryInput, Queryable};
use indexmap::IndexSet;
use once_cell::sync::OnceCell;
use rustc_hash::FxBuildHasher;
use std::sync::Arc;

/// Universe and lazily built indexes, shared with running queries
struct Indexes {
    everything: Arc<[Value]>,
    ids: OnceCell<Arc<IdIndex>>,
    capabilities: OnceCell<Arc<CapabilityIndex>>,
}

impl IndexProvider for Indexes {
    fn index(&self, member: &str) -> Option<Arc<dyn Index>> {
        match member {
            ID_MEMBER => {
                let index = self.ids.get_or_init(|| {
                    log::trace!("building id index over {} units", self.everything.len());
                    Arc::new(IdIndex::build(&self.everything))
                });
                Some(Arc::clone(index) as Arc<dyn Index>)
            }
            CAPABILITY_MEMBER => {
                let index = self.capabilities.get_or_init(|| {
                    log::trace!("building capability index over {} units", self.everything.len());
                    Arc::new(CapabilityIndex::build(&self.everything))
                });
                Some(Arc::clone(index) as Arc<dyn Index>)
            }
            _ => None,
        }
    }

    fn everything(&self) -> Arc<[Value]> {
        Arc::clone(&self.everything)
    }
}

/// A fixed set of installable units with id and capability indexes
///
/// Duplicate units are dropped; otherwise insertion order is kept and is
/// the order queries see.
pub struct UnitCollection {
    members: IndexSet<Value, FxBuildHasher>,
    indexes: Arc<Indexes>,
}

impl UnitCollection {
    /// Collect `units`
    pub fn new(units: impl IntoIterator<Item = InstallableUnit>) -> Self {
        let members: IndexSet<Value, FxBuildHasher> = units.into_iter().map(Value::from).collect();
        let everything: Arc<[Value]> = members.iter().cloned().collect();
        Self {
            members,
            indexes: Arc::new(Indexes {
                everything,
                ids: OnceCell::new(),
                capabilities: OnceCell::new(),
            }),
        }
    }

    /// Read a JSON array of units
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        let units: Vec<InstallableUnit> = serde_json::from_str(json)?;
        Ok(Self::new(units))
    }

    /// Number of units
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the collection holds no units
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Units accepted by `filter`, in collection order
    pub fn find(&self, filter: UnitFilter) -> CompoundIterator<Value> {
        let everything = self.indexes.everything();
        let source = (0..everything.len()).filter_map(move |i| everything.get(i).cloned());
        CompoundIterator::filtered(vec![Box::new(source)], filter)
    }
}

impl IndexProvider for UnitCollection {
    fn index(&self, member: &str) -> Option<Arc<dyn Index>> {
        self.indexes.index(member)
    }

    fn everything(&self) -> Arc<[Value]> {
        self.indexes.everything()
    }
}

impl Queryable for UnitCollection {
    fn query_input(&self) -> QueryInput {
        QueryInput::Indexed(Arc::clone(&self.indexes) as Arc<dyn IndexProvider>)
    }

    fn contains(&self, element: &Value) -> bool {
        self.members.contains(element)
    }

    fn index_provider(&self) -> Option<Arc<dyn IndexProvider>> {
        Some(Arc::clone(&self.indexes) as Arc<dyn IndexProvider>)
    }
}

impl FromIterator<InstallableUnit> for UnitCollection {
    fn from_iter<I: IntoIterator<Item = InstallableUnit>>(units: I) -> Self {
        Self::new(units)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Version, VersionRange};

    fn collection() -> UnitCollection {
        UnitCollection::new(vec![
            InstallableUnit::builder("a", Version::new(1, 0, 0)).build(),
            InstallableUnit::builder("b", Version::new(1, 0, 0)).build(),
            InstallableUnit::builder("a", Version::new(2, 0, 0)).build(),
            InstallableUnit::builder("a", Version::new(1, 0, 0)).build(),
        ])
    }

    #[test]
    fn test_duplicates_are_dropped() {
        let units = collection();
        assert_eq!(units.len(), 3);
        let a = Value::from(InstallableUnit::builder("a", Version::new(2, 0, 0)).build());
        assert!(units.contains(&a));
    }

    #[test]
    fn test_indexes_are_built_once() {
        let units = collection();
        let first = units.index(ID_MEMBER).unwrap();
        let second = units.index(ID_MEMBER).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.lookup(&Value::from("a")), Some(vec![0, 2]));
        assert!(units.index("version").is_none());
    }

    #[test]
    fn test_find_with_filter() {
        let units = collection();
        let found: Vec<_> = units
            .find(UnitFilter::all().with_id("a").with_range(VersionRange::at_least(Version::new(2, 0, 0))))
            .collect();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].as_unit().unwrap().version(), &Version::new(2, 0, 0));
    }

    #[test]
    fn test_from_json() {
        let units = UnitCollection::from_json(r#"[{"id": "x", "version": "1.2.3"}]"#).unwrap();
        assert_eq!(units.len(), 1);
    }
}
