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

//! Query engine entry point

use crate::ast::Expression;
use crate::config::EngineConfig;
use crate::error::Result;
use crate::evaluator::Parameters;
use crate::parser::{ParseMode, QueryParser};
use crate::query::{ExpressionMatchQuery, ExpressionQuery};
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;

/// Parses query text into queries, caching parsed expressions
///
/// The engine can be shared between threads; the cache is the only mutable
/// state and sits behind a mutex.
pub struct QueryEngine {
    config: EngineConfig,
    parser: QueryParser,
    cache: Mutex<LruCache<(String, ParseMode), Expression>>,
}

impl Default for QueryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryEngine {
    /// Create an engine with the default configuration
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Create an engine with `config`
    pub fn with_config(config: EngineConfig) -> Self {
        let capacity = NonZeroUsize::new(config.expression_cache_size).unwrap_or(NonZeroUsize::MIN);
        Self {
            config,
            parser: QueryParser::default(),
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Parse a per-element predicate
    pub fn parse_predicate(&self, text: &str) -> Result<Expression> {
        self.parse(text, ParseMode::Predicate)
    }

    /// Parse a whole-input query
    pub fn parse_query(&self, text: &str) -> Result<Expression> {
        self.parse(text, ParseMode::Query)
    }

    fn parse(&self, text: &str, mode: ParseMode) -> Result<Expression> {
        let key = (text.to_string(), mode);
        if let Some(expression) = self.cache.lock().get(&key) {
            log::trace!("expression cache hit: {text}");
            return Ok(expression.clone());
        }
        let expression = self.parser.parse(text, mode)?;
        self.cache.lock().put(key, expression.clone());
        Ok(expression)
    }

    /// Build a match query from predicate text
    pub fn match_query(&self, text: &str, parameters: Parameters) -> Result<ExpressionMatchQuery> {
        let predicate = self.parse_predicate(text)?;
        Ok(ExpressionMatchQuery::new(predicate, parameters)?.with_config(self.config.clone()))
    }

    /// Build a context query from query text
    pub fn context_query(&self, text: &str, parameters: Parameters) -> Result<ExpressionQuery> {
        let expression = self.parse_query(text)?;
        Ok(ExpressionQuery::new(expression, parameters).with_config(self.config.clone()))
    }

    /// Number of cached expressions
    pub fn cached_expressions(&self) -> usize {
        self.cache.lock().len()
    }
}
