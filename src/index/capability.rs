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

//! Provided-capability index
//!
//! Capabilities are bucketed by `(namespace, name)`. A lookup scans one
//! bucket and checks versions, which is the same test `~=` performs per unit.

use super::Index;
use crate::model::{ProvidedCapability, Value};
use rustc_hash::FxHashMap;
use std::sync::Arc;

type Bucket = Vec<(usize, Arc<ProvidedCapability>)>;

/// Units grouped by the capabilities they provide
#[derive(Debug, Default)]
pub struct CapabilityIndex {
    by_name: FxHashMap<(String, String), Bucket>,
}

impl CapabilityIndex {
    /// Index the capabilities of the units in `values`
    pub fn build(values: &[Value]) -> Self {
        let mut by_name: FxHashMap<(String, String), Bucket> = FxHashMap::default();
        for (position, value) in values.iter().enumerate() {
            let Some(unit) = value.as_unit() else {
                continue;
            };
            for capability in unit.provided_capabilities() {
                by_name
                    .entry((capability.namespace.clone(), capability.name.clone()))
                    .or_default()
                    .push((position, Arc::clone(capability)));
            }
        }
        Self { by_name }
    }

    fn positions<F>(&self, namespace: &str, name: &str, accept: F) -> Vec<usize>
    where
        F: Fn(&ProvidedCapability) -> bool,
    {
        let key = (namespace.to_string(), name.to_string());
        let mut positions: Vec<usize> = self
            .by_name
            .get(&key)
            .map(|bucket| {
                bucket
                    .iter()
                    .filter(|(_, capability)| accept(capability))
                    .map(|(position, _)| *position)
                    .collect()
            })
            .unwrap_or_default();
        positions.dedup();
        positions
    }
}

impl Index for CapabilityIndex {
    /// Answers requirement keys (units satisfying it) and capability keys
    /// (units providing exactly that capability)
    fn lookup(&self, key: &Value) -> Option<Vec<usize>> {
        match key {
            Value::Requirement(requirement) => Some(self.positions(
                &requirement.namespace,
                &requirement.name,
                |capability| requirement.range.includes(&capability.version),
            )),
            Value::Capability(wanted) => Some(self.positions(&wanted.namespace, &wanted.name, |capability| {
                capability == wanted.as_ref()
            })),
            _ => None,
        }
    }
}
