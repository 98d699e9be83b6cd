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

//! Runtime value representation
//!
//! [`Value`] is the tagged union every expression evaluates to. Scalars are
//! held inline, domain objects behind `Arc` so that cloning a value never
//! copies a unit. Collections come in three shapes: `List` (materialized,
//! immutable), `Collection` (lazy, single pass) and `Set` (shared mutable
//! identity set used as a `unique`/`traverse` cache).

use super::sequence::Sequence;
use super::unit::{InstallableUnit, ProvidedCapability, Requirement};
use super::version::{Version, VersionRange};
use crate::evaluator::{EvaluationError, EvaluationResult};
use indexmap::{IndexMap, IndexSet};
use parking_lot::Mutex;
use regex::Regex;
use rustc_hash::FxBuildHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Type tag of a runtime value, also the payload of `class(...)` literals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    /// `null`
    Null,
    /// `true` / `false`
    Boolean,
    /// 64-bit signed integer
    Integer,
    /// Text
    String,
    /// Component version
    Version,
    /// Version interval
    VersionRange,
    /// Compiled regular expression
    Pattern,
    /// Type reference
    Type,
    /// Installable unit
    InstallableUnit,
    /// Provided capability
    Capability,
    /// Requirement
    Requirement,
    /// String-keyed map
    Map,
    /// Materialized list
    List,
    /// Lazy sequence
    Collection,
    /// Identity set
    Set,
}

impl ValueType {
    /// Canonical name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Null => "Null",
            Self::Boolean => "Boolean",
            Self::Integer => "Integer",
            Self::String => "String",
            Self::Version => "Version",
            Self::VersionRange => "VersionRange",
            Self::Pattern => "Pattern",
            Self::Type => "Type",
            Self::InstallableUnit => "InstallableUnit",
            Self::Capability => "ProvidedCapability",
            Self::Requirement => "Requirement",
            Self::Map => "Map",
            Self::List => "List",
            Self::Collection => "Collection",
            Self::Set => "Set",
        }
    }

    /// Resolve a class name used in `class('...')`
    pub fn from_class_name(name: &str) -> Option<Self> {
        let ty = match name {
            "Null" => Self::Null,
            "Boolean" => Self::Boolean,
            "Integer" => Self::Integer,
            "String" => Self::String,
            "Version" => Self::Version,
            "VersionRange" => Self::VersionRange,
            "Pattern" | "Regex" => Self::Pattern,
            "Type" | "Class" => Self::Type,
            "InstallableUnit" | "IInstallableUnit" | "Unit" => Self::InstallableUnit,
            "ProvidedCapability" | "IProvidedCapability" | "Capability" => Self::Capability,
            "Requirement" | "IRequirement" => Self::Requirement,
            "Map" => Self::Map,
            "List" => Self::List,
            "Collection" => Self::Collection,
            "Set" => Self::Set,
            _ => return None,
        };
        Some(ty)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A compiled regular expression compared by its source text
#[derive(Debug, Clone)]
pub struct Pattern(Regex);

impl Pattern {
    /// Compile `source`
    pub fn new(source: &str) -> EvaluationResult<Self> {
        Regex::new(source)
            .map(Self)
            .map_err(|e| EvaluationError::InvalidRegex {
                pattern: source.to_string(),
                message: e.to_string(),
            })
    }

    /// Compile a glob where `*` matches any run and `?` a single character
    pub fn from_glob(glob: &str) -> EvaluationResult<Self> {
        let mut source = String::with_capacity(glob.len() + 2);
        source.push('^');
        for c in glob.chars() {
            match c {
                '*' => source.push_str(".*"),
                '?' => source.push('.'),
                other => source.push_str(&regex::escape(&other.to_string())),
            }
        }
        source.push('$');
        Self::new(&source)
    }

    /// Pattern source
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Whether the pattern matches anywhere in `text`
    pub fn is_match(&self, text: &str) -> bool {
        self.0.is_match(text)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for Pattern {}

impl Hash for Pattern {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_str().hash(state);
    }
}

/// Shared insertion-ordered identity set
///
/// Clones share storage. Used to carry visited elements across nested
/// `unique` and `traverse` calls.
#[derive(Clone, Default)]
pub struct ValueSet {
    inner: Arc<Mutex<IndexSet<Value, FxBuildHasher>>>,
}

impl ValueSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert, returning `true` if the value was not yet present
    pub fn insert(&self, value: Value) -> bool {
        self.inner.lock().insert(value)
    }

    /// Membership test
    pub fn contains(&self, value: &Value) -> bool {
        self.inner.lock().contains(value)
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Whether the set has no elements
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Elements in insertion order at the time of the call
    pub fn snapshot(&self) -> Vec<Value> {
        self.inner.lock().iter().cloned().collect()
    }

    /// Whether two handles share storage
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn addr(&self) -> usize {
        Arc::as_ptr(&self.inner) as *const () as usize
    }
}

impl fmt::Debug for ValueSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ValueSet({:#x})", self.addr())
    }
}

/// Runtime value produced by evaluation
#[derive(Debug, Clone)]
pub enum Value {
    /// Absent value
    Null,
    /// Boolean
    Boolean(bool),
    /// Integer
    Integer(i64),
    /// String
    String(String),
    /// Version
    Version(Version),
    /// Version range
    VersionRange(VersionRange),
    /// Regular expression
    Pattern(Pattern),
    /// Type reference
    Type(ValueType),
    /// Installable unit
    Unit(Arc<InstallableUnit>),
    /// Provided capability
    Capability(Arc<ProvidedCapability>),
    /// Requirement
    Requirement(Arc<Requirement>),
    /// String-keyed map
    Map(Arc<IndexMap<String, Value>>),
    /// Materialized list
    List(Arc<Vec<Value>>),
    /// Lazy single-pass sequence
    Collection(Sequence),
    /// Shared identity set
    Set(ValueSet),
}

impl Value {
    /// Runtime type tag
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Null => ValueType::Null,
            Self::Boolean(_) => ValueType::Boolean,
            Self::Integer(_) => ValueType::Integer,
            Self::String(_) => ValueType::String,
            Self::Version(_) => ValueType::Version,
            Self::VersionRange(_) => ValueType::VersionRange,
            Self::Pattern(_) => ValueType::Pattern,
            Self::Type(_) => ValueType::Type,
            Self::Unit(_) => ValueType::InstallableUnit,
            Self::Capability(_) => ValueType::Capability,
            Self::Requirement(_) => ValueType::Requirement,
            Self::Map(_) => ValueType::Map,
            Self::List(_) => ValueType::List,
            Self::Collection(_) => ValueType::Collection,
            Self::Set(_) => ValueType::Set,
        }
    }

    /// Type name for error messages
    pub fn type_name(&self) -> &'static str {
        self.value_type().name()
    }

    /// `instanceof` check; `Collection` accepts every collection shape
    pub fn is_instance_of(&self, ty: ValueType) -> bool {
        match ty {
            ValueType::Collection => matches!(
                self,
                Self::Collection(_) | Self::List(_) | Self::Set(_)
            ),
            other => self.value_type() == other,
        }
    }

    /// Whether this is `null`
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Whether this value can be iterated
    pub fn is_collection(&self) -> bool {
        matches!(self, Self::Collection(_) | Self::List(_) | Self::Set(_))
    }

    /// Boolean payload
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Integer payload
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// String payload
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Unit payload
    pub fn as_unit(&self) -> Option<&Arc<InstallableUnit>> {
        match self {
            Self::Unit(unit) => Some(unit),
            _ => None,
        }
    }

    /// Build a list value
    pub fn list(values: Vec<Value>) -> Self {
        Self::List(Arc::new(values))
    }

    /// Convert to JSON for display, draining lazy sequences
    pub fn to_json(&self) -> EvaluationResult<serde_json::Value> {
        use serde_json::Value as Json;

        let serialized = |result: Result<Json, serde_json::Error>| {
            result.map_err(|e| EvaluationError::invalid_argument("to_json", e.to_string()))
        };

        Ok(match self {
            Self::Null => Json::Null,
            Self::Boolean(b) => Json::Bool(*b),
            Self::Integer(i) => Json::from(*i),
            Self::String(s) => Json::String(s.clone()),
            Self::Version(v) => Json::String(v.to_string()),
            Self::VersionRange(r) => Json::String(r.to_string()),
            Self::Pattern(p) => Json::String(format!("/{}/", p.as_str())),
            Self::Type(t) => Json::String(t.name().to_string()),
            Self::Unit(unit) => serialized(serde_json::to_value(unit.as_ref()))?,
            Self::Capability(c) => serialized(serde_json::to_value(c.as_ref()))?,
            Self::Requirement(r) => serialized(serde_json::to_value(r.as_ref()))?,
            Self::Map(map) => {
                let mut object = serde_json::Map::with_capacity(map.len());
                for (key, value) in map.iter() {
                    object.insert(key.clone(), value.to_json()?);
                }
                Json::Object(object)
            }
            Self::List(values) => Json::Array(
                values
                    .iter()
                    .map(Value::to_json)
                    .collect::<EvaluationResult<_>>()?,
            ),
            Self::Collection(seq) => Json::Array(
                seq.clone()
                    .map(|item| item.and_then(|v| v.to_json()))
                    .collect::<EvaluationResult<_>>()?,
            ),
            Self::Set(set) => Json::Array(
                set.snapshot()
                    .iter()
                    .map(Value::to_json)
                    .collect::<EvaluationResult<_>>()?,
            ),
        })
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Version(a), Self::Version(b)) => a == b,
            (Self::VersionRange(a), Self::VersionRange(b)) => a == b,
            (Self::Pattern(a), Self::Pattern(b)) => a == b,
            (Self::Type(a), Self::Type(b)) => a == b,
            (Self::Unit(a), Self::Unit(b)) => Arc::ptr_eq(a, b) || a == b,
            (Self::Capability(a), Self::Capability(b)) => a == b,
            (Self::Requirement(a), Self::Requirement(b)) => a == b,
            (Self::Map(a), Self::Map(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            (Self::Collection(a), Self::Collection(b)) => a.ptr_eq(b),
            (Self::Set(a), Self::Set(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Null => {}
            Self::Boolean(b) => b.hash(state),
            Self::Integer(i) => i.hash(state),
            Self::String(s) => s.hash(state),
            Self::Version(v) => v.hash(state),
            Self::VersionRange(r) => r.hash(state),
            Self::Pattern(p) => p.hash(state),
            Self::Type(t) => t.hash(state),
            Self::Unit(unit) => unit.hash(state),
            Self::Capability(c) => c.hash(state),
            Self::Requirement(r) => r.hash(state),
            // Map equality ignores entry order
            Self::Map(map) => map.len().hash(state),
            Self::List(values) => values.hash(state),
            Self::Collection(seq) => seq.addr().hash(state),
            Self::Set(set) => set.addr().hash(state),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Version> for Value {
    fn from(value: Version) -> Self {
        Self::Version(value)
    }
}

impl From<VersionRange> for Value {
    fn from(value: VersionRange) -> Self {
        Self::VersionRange(value)
    }
}

impl From<InstallableUnit> for Value {
    fn from(value: InstallableUnit) -> Self {
        Self::Unit(Arc::new(value))
    }
}

impl From<Arc<InstallableUnit>> for Value {
    fn from(value: Arc<InstallableUnit>) -> Self {
        Self::Unit(value)
    }
}

impl From<Requirement> for Value {
    fn from(value: Requirement) -> Self {
        Self::Requirement(Arc::new(value))
    }
}

impl From<ProvidedCapability> for Value {
    fn from(value: ProvidedCapability) -> Self {
        Self::Capability(Arc::new(value))
    }
}
