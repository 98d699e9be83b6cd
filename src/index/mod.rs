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

//! Index acceleration for predicate evaluation
//!
//! An [`IndexProvider`] exposes the full candidate universe as a slice and,
//! per member path, an optional [`Index`]. The evaluator asks for an index
//! when a predicate has a recognizable shape (`x.id == K`, `x ~= K`) and
//! only evaluates the candidates the index returns. Indexes never change
//! results: a candidate list must contain every element for which the
//! indexed sub-expression holds.

mod capability;
mod collection;
mod compound;
mod id;

pub use capability::CapabilityIndex;
pub use collection::UnitCollection;
pub use compound::CompoundIndexProvider;
pub use id::IdIndex;

use crate::model::Value;
use std::sync::Arc;

/// Member path answered by [`IdIndex`]
pub const ID_MEMBER: &str = "id";

/// Member path answered by [`CapabilityIndex`]
pub const CAPABILITY_MEMBER: &str = "providedCapabilities";

/// Precomputed lookup for one member path
pub trait Index: Send + Sync {
    /// Positions in [`IndexProvider::everything`] that may match `key`
    ///
    /// Positions are ascending. `None` means the index cannot answer for this
    /// kind of key and the caller must scan.
    fn lookup(&self, key: &Value) -> Option<Vec<usize>>;
}

/// Source of indexes over a fixed universe of values
pub trait IndexProvider: Send + Sync {
    /// Index for `member`, or `None` when the path is unindexed
    fn index(&self, member: &str) -> Option<Arc<dyn Index>>;

    /// Every element, in the order positions refer to
    fn everything(&self) -> Arc<[Value]>;
}
