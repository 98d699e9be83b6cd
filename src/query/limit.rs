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

//! Result size limits

use super::{Query, QueryInput, QueryResult};
use crate::error::Result;
use crate::progress::ProgressMonitor;
use std::sync::Arc;

/// At most `limit` elements of another query
///
/// Expression queries are rewritten to end in `.limit(n)` so the evaluator
/// stops pulling early. Other queries are truncated as their result is read.
pub struct LimitQuery {
    query: Arc<dyn Query>,
    limit: usize,
}

impl LimitQuery {
    /// Limit `query` to `limit` elements
    pub fn create(query: Arc<dyn Query>, limit: usize) -> Arc<dyn Query> {
        match query.as_expression().and_then(|expression| expression.limited(limit)) {
            Some(limited) => Arc::new(limited),
            None => Arc::new(Self { query, limit }),
        }
    }
}

impl Query for LimitQuery {
    fn perform(&self, input: QueryInput, monitor: Arc<dyn ProgressMonitor>) -> Result<QueryResult> {
        let result = self.query.perform(input, monitor)?;
        Ok(QueryResult::from_results(result.results().take(self.limit)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::Parameters;
    use crate::model::Value;
    use crate::progress::NullMonitor;
    use crate::query::{CompoundQuery, ExpressionMatchQuery, ExpressionQuery};

    fn numbers() -> QueryInput {
        QueryInput::from_values((1..=10).map(Value::Integer).collect())
    }

    fn count(query: &Arc<dyn Query>) -> usize {
        query.perform(numbers(), Arc::new(NullMonitor)).unwrap().len().unwrap()
    }

    #[test]
    fn test_expression_queries_are_rewritten() {
        let inner: Arc<dyn Query> = Arc::new(ExpressionQuery::parse("everything", Parameters::new()).unwrap());
        let limited = LimitQuery::create(inner, 3);
        let expression = limited.as_expression().unwrap();
        assert_eq!(expression.expression().to_string(), "everything.limit(3)");
        assert_eq!(count(&limited), 3);

        let predicate: Arc<dyn Query> = Arc::new(ExpressionMatchQuery::parse("item > 5", Parameters::new()).unwrap());
        assert_eq!(count(&LimitQuery::create(predicate, 2)), 2);
    }

    #[test]
    fn test_other_queries_are_truncated() {
        let compound = CompoundQuery::create(
            vec![
                Arc::new(ExpressionQuery::parse("everything.select(x | x < 8)", Parameters::new()).unwrap())
                    as Arc<dyn Query>,
                Arc::new(ExpressionQuery::parse("everything.select(x | x > 2)", Parameters::new()).unwrap()),
            ],
            true,
        );
        let limited = LimitQuery::create(compound, 4);
        assert!(limited.as_expression().is_none());
        let values = limited.perform(numbers(), Arc::new(NullMonitor)).unwrap().to_vec().unwrap();
        assert_eq!(values, (3..=6).map(Value::Integer).collect::<Vec<_>>());
    }
}
