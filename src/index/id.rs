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

//! Unit id index

use super::Index;
use crate::model::Value;
use rustc_hash::FxHashMap;

/// Positions of units grouped by id
#[derive(Debug, Default)]
pub struct IdIndex {
    by_id: FxHashMap<String, Vec<usize>>,
}

impl IdIndex {
    /// Index the units in `values`; other elements are ignored
    pub fn build(values: &[Value]) -> Self {
        let mut by_id: FxHashMap<String, Vec<usize>> = FxHashMap::default();
        for (position, value) in values.iter().enumerate() {
            if let Some(unit) = value.as_unit() {
                by_id.entry(unit.id().to_string()).or_default().push(position);
            }
        }
        Self { by_id }
    }

    /// Number of distinct ids
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Whether no unit was indexed
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

impl Index for IdIndex {
    /// Answers string keys only
    fn lookup(&self, key: &Value) -> Option<Vec<usize>> {
        let id = key.as_str()?;
        Some(self.by_id.get(id).cloned().unwrap_or_default())
    }
}
