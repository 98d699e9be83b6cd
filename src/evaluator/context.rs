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

//! Evaluation context and variable scoping
//!
//! A context is a cheap handle: the scope chain and the environment are both
//! reference counted, so deriving a child context for one lambda application
//! allocates a single small map and never touches the parent.
//!
//! # Variable Resolution Order
//!
//! 1. Variables bound in the current scope
//! 2. Parent scopes, walking outward
//! 3. Failure with [`EvaluationError::UnboundVariable`]

use super::error::{EvaluationError, EvaluationResult};
use crate::ast::{EVERYTHING, ITEM, ParameterRef};
use crate::config::EngineConfig;
use crate::index::IndexProvider;
use crate::iter::RepeatableIterator;
use crate::model::{Sequence, Value};
use crate::progress::{NullMonitor, ProgressMonitor};
use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// What a variable name is bound to
#[derive(Debug, Clone)]
pub enum Binding {
    /// A plain value
    Value(Value),
    /// A collection that every read replays from the start
    Replay(RepeatableIterator<EvaluationResult<Value>>),
    /// The candidate universe of a query
    Everything(RepeatableIterator<Value>),
    /// Declared but not yet given a value
    Unset,
}

impl Binding {
    /// Bind `value`, wrapping lazy sequences so that they can be read repeatedly
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Collection(sequence) => Self::Replay(RepeatableIterator::from_iter(sequence)),
            other => Self::Value(other),
        }
    }

    fn read(&self, name: &str) -> EvaluationResult<Value> {
        match self {
            Self::Value(value) => Ok(value.clone()),
            Self::Replay(values) => Ok(Value::Collection(Sequence::new(values.copy()))),
            Self::Everything(values) => Ok(Value::Collection(Sequence::from_values(values.copy()))),
            Self::Unset => Err(EvaluationError::UnboundVariable {
                name: name.to_string(),
            }),
        }
    }
}

/// One level of variable bindings
#[derive(Debug, Clone, Default)]
pub struct VariableScope {
    /// Variables defined in this scope
    pub variables: FxHashMap<String, Binding>,

    /// Enclosing scope
    pub parent: Option<Arc<VariableScope>>,
}

impl VariableScope {
    /// Create a new root scope
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty child of `parent`
    pub fn child_from_shared(parent: Arc<VariableScope>) -> Self {
        Self {
            variables: FxHashMap::default(),
            parent: Some(parent),
        }
    }

    /// Bind a variable in this scope
    pub fn set_variable(&mut self, name: impl Into<String>, binding: Binding) {
        self.variables.insert(name.into(), binding);
    }

    /// Find the innermost binding for `name`
    pub fn get_variable(&self, name: &str) -> Option<&Binding> {
        let mut scope = self;
        loop {
            if let Some(binding) = scope.variables.get(name) {
                return Some(binding);
            }
            scope = scope.parent.as_deref()?;
        }
    }
}

/// Caller-supplied query parameters
#[derive(Debug, Clone, Default)]
pub struct Parameters {
    positional: Vec<Value>,
    keyed: IndexMap<String, Value>,
}

impl Parameters {
    /// No parameters
    pub fn new() -> Self {
        Self::default()
    }

    /// Positional parameters `$0`, `$1`, ...
    pub fn positional(values: Vec<Value>) -> Self {
        Self {
            positional: values,
            keyed: IndexMap::new(),
        }
    }

    /// Add a keyed parameter `$name`
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.keyed.insert(key.into(), value.into());
        self
    }

    /// Append a positional parameter
    pub fn push(&mut self, value: impl Into<Value>) {
        self.positional.push(value.into());
    }

    /// Resolve a reference
    pub fn get(&self, parameter: &ParameterRef) -> Option<&Value> {
        match parameter {
            ParameterRef::Index(index) => self.positional.get(*index),
            ParameterRef::Key(key) => self.keyed.get(key),
        }
    }
}

impl From<Vec<Value>> for Parameters {
    fn from(values: Vec<Value>) -> Self {
        Self::positional(values)
    }
}

/// State shared by every context derived from one query execution
struct Environment {
    parameters: Parameters,
    monitor: Arc<dyn ProgressMonitor>,
    config: EngineConfig,
    pulled: AtomicUsize,
}

/// Context for evaluating one expression
///
/// Cloning is cheap. Each lambda application derives a child with
/// [`EvaluationContext::with_binding`].
#[derive(Clone)]
pub struct EvaluationContext {
    scope: Arc<VariableScope>,
    environment: Arc<Environment>,
    index_provider: Option<Arc<dyn IndexProvider>>,
}

impl EvaluationContext {
    fn create(
        scope: VariableScope,
        parameters: Parameters,
        monitor: Arc<dyn ProgressMonitor>,
        config: EngineConfig,
        index_provider: Option<Arc<dyn IndexProvider>>,
    ) -> Self {
        Self {
            scope: Arc::new(scope),
            environment: Arc::new(Environment {
                parameters,
                monitor,
                config,
                pulled: AtomicUsize::new(0),
            }),
            index_provider,
        }
    }

    /// Context for predicate evaluation; `item` is declared but unset
    pub fn for_predicate(
        parameters: Parameters,
        monitor: Arc<dyn ProgressMonitor>,
        config: EngineConfig,
    ) -> Self {
        let mut scope = VariableScope::new();
        scope.set_variable(ITEM, Binding::Unset);
        Self::create(scope, parameters, monitor, config, None)
    }

    /// Context for whole-query evaluation with `everything` bound to `input`
    pub fn for_query(
        input: RepeatableIterator<Value>,
        index_provider: Option<Arc<dyn IndexProvider>>,
        parameters: Parameters,
        monitor: Arc<dyn ProgressMonitor>,
        config: EngineConfig,
    ) -> Self {
        let mut scope = VariableScope::new();
        scope.set_variable(EVERYTHING, Binding::Everything(input));
        Self::create(scope, parameters, monitor, config, index_provider)
    }

    /// Context for whole-query evaluation over an index provider's universe
    pub fn for_provider(
        provider: Arc<dyn IndexProvider>,
        parameters: Parameters,
        monitor: Arc<dyn ProgressMonitor>,
        config: EngineConfig,
    ) -> Self {
        let input = RepeatableIterator::from_arc(provider.everything());
        Self::for_query(input, Some(provider), parameters, monitor, config)
    }

    /// Bare context with default configuration, useful for constant expressions
    pub fn empty() -> Self {
        Self::create(
            VariableScope::new(),
            Parameters::new(),
            Arc::new(NullMonitor),
            EngineConfig::default(),
            None,
        )
    }

    /// Child context with one extra binding
    pub fn with_binding(&self, name: &str, value: Value) -> Self {
        self.with_bindings(std::iter::once((name.to_string(), Binding::from_value(value))))
    }

    /// Child context with several bindings
    pub fn with_bindings(&self, bindings: impl IntoIterator<Item = (String, Binding)>) -> Self {
        let mut scope = VariableScope::child_from_shared(Arc::clone(&self.scope));
        for (name, binding) in bindings {
            scope.set_variable(name, binding);
        }
        Self {
            scope: Arc::new(scope),
            environment: Arc::clone(&self.environment),
            index_provider: self.index_provider.clone(),
        }
    }

    /// Context for a pipe stage: `everything` becomes `value` and indexes
    /// no longer describe it
    pub fn with_everything(&self, value: Value) -> Self {
        let mut scope = VariableScope::child_from_shared(Arc::clone(&self.scope));
        scope.set_variable(EVERYTHING, Binding::from_value(value));
        Self {
            scope: Arc::new(scope),
            environment: Arc::clone(&self.environment),
            index_provider: None,
        }
    }

    /// Read a variable
    pub fn lookup(&self, name: &str) -> EvaluationResult<Value> {
        match self.scope.get_variable(name) {
            Some(binding) => binding.read(name),
            None => Err(EvaluationError::UnboundVariable {
                name: name.to_string(),
            }),
        }
    }

    /// Read a parameter
    pub fn parameter(&self, parameter: &ParameterRef) -> EvaluationResult<Value> {
        self.environment
            .parameters
            .get(parameter)
            .cloned()
            .ok_or_else(|| EvaluationError::UnknownParameter {
                parameter: parameter.to_string(),
            })
    }

    /// Index provider describing the current `everything`, if indexes are enabled
    pub fn index_provider(&self) -> Option<&Arc<dyn IndexProvider>> {
        if self.environment.config.use_indexes {
            self.index_provider.as_ref()
        } else {
            None
        }
    }

    /// Engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.environment.config
    }

    /// Progress monitor
    pub fn monitor(&self) -> &Arc<dyn ProgressMonitor> {
        &self.environment.monitor
    }

    /// Record one pulled element, checking for cancellation every interval
    pub fn checkpoint(&self) -> EvaluationResult<()> {
        let pulled = self.environment.pulled.fetch_add(1, Ordering::Relaxed) + 1;
        let interval = self.environment.config.check_interval();
        if pulled % interval == 0 {
            let monitor = &self.environment.monitor;
            if monitor.is_cancelled() {
                log::debug!("evaluation cancelled after {pulled} elements");
                return Err(EvaluationError::Cancelled);
            }
            monitor.worked(interval as u64);
        }
        Ok(())
    }
}

impl fmt::Debug for EvaluationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvaluationContext")
            .field("scope", &self.scope)
            .field("indexed", &self.index_provider.is_some())
            .finish()
    }
}
