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

//! Engine configuration options

use serde::Deserialize;

/// Configuration for parsing and evaluation behavior
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Maximum number of parsed expressions kept by the engine
    pub expression_cache_size: usize,

    /// Elements pulled between cancellation checks (0 is treated as 1)
    pub cancellation_check_interval: usize,

    /// Whether the evaluator may answer predicates from an index provider
    pub use_indexes: bool,
}

impl EngineConfig {
    /// Create a configuration with custom settings
    pub fn new(expression_cache_size: usize, cancellation_check_interval: usize, use_indexes: bool) -> Self {
        Self {
            expression_cache_size,
            cancellation_check_interval,
            use_indexes,
        }
    }

    /// Large cache, coarse cancellation checks
    pub fn high_performance() -> Self {
        Self {
            expression_cache_size: 4_096,
            cancellation_check_interval: 64,
            use_indexes: true,
        }
    }

    /// Never consult indexes; every predicate is a full scan
    pub fn unindexed() -> Self {
        Self {
            use_indexes: false,
            ..Self::default()
        }
    }

    /// Configuration for testing
    pub fn testing() -> Self {
        Self {
            expression_cache_size: 16,
            cancellation_check_interval: 1,
            use_indexes: true,
        }
    }

    /// Effective check interval, never zero
    pub fn check_interval(&self) -> usize {
        self.cancellation_check_interval.max(1)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            expression_cache_size: 256,
            cancellation_check_interval: 1,
            use_indexes: true,
        }
    }
}
