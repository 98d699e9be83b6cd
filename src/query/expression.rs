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

//! Queries backed by parsed expressions

use super::{MatchQuery, Query, QueryInput, QueryResult};
use crate::ast::{Expression, ExpressionFactory, ITEM};
use crate::config::EngineConfig;
use crate::error::Result;
use crate::evaluator::{EvaluationContext, Parameters, truthy};
use crate::model::Value;
use crate::parser;
use crate::progress::{NullMonitor, ProgressMonitor};
use std::sync::Arc;

/// Evaluate a whole-input expression against `input`
fn perform_expression(
    expression: &Expression,
    input: QueryInput,
    parameters: &Parameters,
    config: &EngineConfig,
    monitor: Arc<dyn ProgressMonitor>,
) -> Result<QueryResult> {
    let context = match input {
        QueryInput::Values(values) => {
            EvaluationContext::for_query(values, None, parameters.clone(), monitor, config.clone())
        }
        QueryInput::Indexed(provider) => {
            EvaluationContext::for_provider(provider, parameters.clone(), monitor, config.clone())
        }
    };
    let value = expression.evaluate(&context)?;
    Ok(QueryResult::from_value(value))
}

/// Per-element predicate query
///
/// Performing it selects every input element the predicate accepts, which
/// lets the evaluator answer from an index when one fits the predicate.
#[derive(Debug, Clone)]
pub struct ExpressionMatchQuery {
    predicate: Expression,
    context: Expression,
    parameters: Parameters,
    config: EngineConfig,
}

impl ExpressionMatchQuery {
    /// Wrap a predicate parsed in predicate mode
    pub fn new(predicate: Expression, parameters: Parameters) -> Result<Self> {
        let factory = ExpressionFactory::new();
        let lambda = factory.lambda(ITEM, Arc::clone(&predicate))?;
        let context = factory.select(factory.everything(), lambda)?;
        Ok(Self {
            predicate,
            context,
            parameters,
            config: EngineConfig::default(),
        })
    }

    /// Parse `text` as a predicate
    pub fn parse(text: &str, parameters: Parameters) -> Result<Self> {
        Self::new(parser::parse_predicate(text)?, parameters)
    }

    /// Replace the engine configuration
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// The predicate, with `item` as the candidate
    pub fn predicate(&self) -> &Expression {
        &self.predicate
    }

    /// The supplied parameters
    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }
}

impl Query for ExpressionMatchQuery {
    fn perform(&self, input: QueryInput, monitor: Arc<dyn ProgressMonitor>) -> Result<QueryResult> {
        self.pre_perform();
        let result = perform_expression(&self.context, input, &self.parameters, &self.config, monitor);
        self.post_perform();
        result
    }

    fn into_match(self: Arc<Self>) -> Option<Arc<dyn MatchQuery>> {
        Some(self)
    }

    fn as_expression(&self) -> Option<ExpressionQuery> {
        Some(ExpressionQuery {
            expression: Arc::clone(&self.context),
            parameters: self.parameters.clone(),
            config: self.config.clone(),
        })
    }
}

impl MatchQuery for ExpressionMatchQuery {
    fn is_match(&self, candidate: &Value) -> Result<bool> {
        // Each call gets its own context; nothing is shared between threads
        // except the immutable tree and parameters.
        let context = EvaluationContext::for_predicate(
            self.parameters.clone(),
            Arc::new(NullMonitor),
            self.config.clone(),
        )
        .with_binding(ITEM, candidate.clone());
        let value = self.predicate.evaluate(&context)?;
        Ok(truthy("match", &value)?)
    }
}

/// Whole-input query
#[derive(Debug, Clone)]
pub struct ExpressionQuery {
    expression: Expression,
    parameters: Parameters,
    config: EngineConfig,
}

impl ExpressionQuery {
    /// Wrap an expression parsed in query mode
    pub fn new(expression: Expression, parameters: Parameters) -> Self {
        Self {
            expression,
            parameters,
            config: EngineConfig::default(),
        }
    }

    /// Parse `text` as a query
    pub fn parse(text: &str, parameters: Parameters) -> Result<Self> {
        Ok(Self::new(parser::parse_query(text)?, parameters))
    }

    /// Replace the engine configuration
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// The query expression, with `everything` as the input
    pub fn expression(&self) -> &Expression {
        &self.expression
    }

    /// The same query wrapped in `limit(count)`
    pub fn limited(&self, count: usize) -> Option<Self> {
        let factory = ExpressionFactory::new();
        let count = i64::try_from(count).ok()?;
        let expression = factory
            .limit(Arc::clone(&self.expression), factory.integer(count))
            .ok()?;
        Some(Self {
            expression,
            parameters: self.parameters.clone(),
            config: self.config.clone(),
        })
    }
}

impl Query for ExpressionQuery {
    fn perform(&self, input: QueryInput, monitor: Arc<dyn ProgressMonitor>) -> Result<QueryResult> {
        log::debug!("performing query {}", self.expression);
        perform_expression(&self.expression, input, &self.parameters, &self.config, monitor)
    }

    fn as_expression(&self) -> Option<ExpressionQuery> {
        Some(self.clone())
    }
}
