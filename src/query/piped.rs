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

//! Sequential query stages

use super::{Query, QueryInput, QueryResult};
use crate::error::{QueryError, Result};
use crate::progress::ProgressMonitor;
use std::sync::Arc;

/// Queries run one after another, each fed the previous result
///
/// Intermediate results are materialized. Later stages are skipped once a
/// stage comes back empty.
pub struct PipedQuery {
    stages: Vec<Arc<dyn Query>>,
}

impl PipedQuery {
    /// Chain `stages`; a single stage is returned as is
    pub fn create(mut stages: Vec<Arc<dyn Query>>) -> Arc<dyn Query> {
        if stages.len() == 1 {
            if let Some(stage) = stages.pop() {
                return stage;
            }
        }
        Arc::new(Self { stages })
    }
}

impl Query for PipedQuery {
    fn perform(&self, input: QueryInput, monitor: Arc<dyn ProgressMonitor>) -> Result<QueryResult> {
        let mut input = input;
        let mut result = QueryResult::empty();
        for (stage, query) in self.stages.iter().enumerate() {
            if monitor.is_cancelled() {
                return Err(QueryError::Cancelled);
            }
            result = query.perform(input, Arc::clone(&monitor))?;
            let values = result.to_vec()?;
            if values.is_empty() {
                log::trace!("piped query empty after stage {stage}");
                return Ok(QueryResult::empty());
            }
            input = QueryInput::from_values(values);
        }
        Ok(result)
    }
}
