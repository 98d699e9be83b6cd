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

//! Chained iteration over several sources with element filtering

use crate::model::{InstallableUnit, Requirement, Value, VersionRange};
use std::collections::VecDeque;
use std::sync::Arc;

/// Element types a [`UnitFilter`] can inspect
pub trait FilterTarget {
    /// The unit behind this element, if any
    fn as_installable_unit(&self) -> Option<&InstallableUnit>;
}

impl FilterTarget for Value {
    fn as_installable_unit(&self) -> Option<&InstallableUnit> {
        self.as_unit().map(|unit| unit.as_ref())
    }
}

impl FilterTarget for Arc<InstallableUnit> {
    fn as_installable_unit(&self) -> Option<&InstallableUnit> {
        Some(self.as_ref())
    }
}

/// Element-level filter on unit id, version range and requirement
///
/// Each configured criterion is tested separately. With `match_all` every
/// criterion must hold; otherwise one is enough. A filter with no criteria
/// accepts every unit. Non-unit elements never pass a filter that has
/// criteria.
#[derive(Debug, Clone, Default)]
pub struct UnitFilter {
    id: Option<String>,
    range: Option<VersionRange>,
    requirement: Option<Arc<Requirement>>,
    match_all: bool,
}

impl UnitFilter {
    /// Filter that requires every criterion
    pub fn all() -> Self {
        Self {
            match_all: true,
            ..Self::default()
        }
    }

    /// Filter that requires any criterion
    pub fn any() -> Self {
        Self::default()
    }

    /// Unit id must equal `id`
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Unit version must fall in `range`
    pub fn with_range(mut self, range: VersionRange) -> Self {
        self.range = Some(range);
        self
    }

    /// Unit must provide a capability satisfying `requirement`
    pub fn with_requirement(mut self, requirement: Requirement) -> Self {
        self.requirement = Some(Arc::new(requirement));
        self
    }

    fn has_criteria(&self) -> bool {
        self.id.is_some() || self.range.is_some() || self.requirement.is_some()
    }

    /// Whether `element` passes
    pub fn matches<T: FilterTarget>(&self, element: &T) -> bool {
        if !self.has_criteria() {
            return true;
        }
        let Some(unit) = element.as_installable_unit() else {
            return false;
        };

        let checks = [
            self.id.as_deref().map(|id| unit.id() == id),
            self.range.as_ref().map(|range| range.includes(unit.version())),
            self.requirement.as_deref().map(|req| unit.satisfies(req)),
        ];
        let mut present = checks.into_iter().flatten();
        if self.match_all {
            present.all(|ok| ok)
        } else {
            present.any(|ok| ok)
        }
    }
}

/// Iterates several sources end to end
///
/// [`CompoundIterator::has_next`] buffers one element ahead, so it may be
/// called any number of times without losing an element.
pub struct CompoundIterator<T> {
    sources: VecDeque<Box<dyn Iterator<Item = T> + Send>>,
    filter: Option<UnitFilter>,
    lookahead: Option<T>,
}

impl<T: FilterTarget> CompoundIterator<T> {
    /// Chain `sources` without filtering
    pub fn new(sources: Vec<Box<dyn Iterator<Item = T> + Send>>) -> Self {
        Self {
            sources: sources.into(),
            filter: None,
            lookahead: None,
        }
    }

    /// Chain `sources`, yielding only elements accepted by `filter`
    pub fn filtered(sources: Vec<Box<dyn Iterator<Item = T> + Send>>, filter: UnitFilter) -> Self {
        Self {
            sources: sources.into(),
            filter: Some(filter),
            lookahead: None,
        }
    }

    /// Whether another element is available
    pub fn has_next(&mut self) -> bool {
        if self.lookahead.is_none() {
            self.lookahead = self.advance();
        }
        self.lookahead.is_some()
    }

    fn advance(&mut self) -> Option<T> {
        while let Some(source) = self.sources.front_mut() {
            for element in source.by_ref() {
                let accepted = self
                    .filter
                    .as_ref()
                    .is_none_or(|filter| filter.matches(&element));
                if accepted {
                    return Some(element);
                }
            }
            self.sources.pop_front();
        }
        None
    }
}

impl<T: FilterTarget> Iterator for CompoundIterator<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.lookahead.take().or_else(|| self.advance())
    }
}
