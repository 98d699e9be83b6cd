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

//! Closed member table for `.name` access
//!
//! Members are resolved by `(runtime type, name)` through a table built once.
//! Maps are open: any key is a member and a missing key reads as `null`.

use crate::evaluator::{EvaluationError, EvaluationResult};
use crate::model::{Value, ValueType};
use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Reads one member from a value of the registered type
pub type MemberGetter = fn(&Value) -> Value;

/// Registry of member accessors keyed by receiver type and member name
#[derive(Default)]
pub struct MemberRegistry {
    getters: FxHashMap<ValueType, FxHashMap<&'static str, MemberGetter>>,
}

impl MemberRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a getter
    pub fn register(&mut self, ty: ValueType, name: &'static str, getter: MemberGetter) {
        self.getters.entry(ty).or_default().insert(name, getter);
    }

    /// Getter for `name` on `ty`
    pub fn get(&self, ty: ValueType, name: &str) -> Option<MemberGetter> {
        self.getters.get(&ty)?.get(name).copied()
    }

    /// Member names registered for `ty`, sorted
    pub fn members_of(&self, ty: ValueType) -> Vec<&'static str> {
        let mut names: Vec<_> = self
            .getters
            .get(&ty)
            .map(|members| members.keys().copied().collect())
            .unwrap_or_default();
        names.sort_unstable();
        names
    }

    /// Read `name` from `target`
    pub fn access(&self, target: &Value, name: &str) -> EvaluationResult<Value> {
        match target {
            Value::Null => Ok(Value::Null),
            Value::Map(map) => Ok(map.get(name).cloned().unwrap_or(Value::Null)),
            other => match self.get(other.value_type(), name) {
                Some(getter) => Ok(getter(other)),
                None => Err(EvaluationError::UnknownMember {
                    member: name.to_string(),
                    type_name: other.type_name().to_string(),
                }),
            },
        }
    }
}

fn list<T>(items: &[Arc<T>], wrap: fn(Arc<T>) -> Value) -> Value {
    Value::list(items.iter().cloned().map(wrap).collect())
}

/// Register the built-in members
pub fn register_builtin_members(registry: &mut MemberRegistry) {
    use ValueType::*;

    registry.register(InstallableUnit, "id", |v| match v {
        Value::Unit(unit) => Value::from(unit.id()),
        _ => Value::Null,
    });
    registry.register(InstallableUnit, "version", |v| match v {
        Value::Unit(unit) => Value::Version(unit.version().clone()),
        _ => Value::Null,
    });
    registry.register(InstallableUnit, "providedCapabilities", |v| match v {
        Value::Unit(unit) => list(unit.provided_capabilities(), Value::Capability),
        _ => Value::Null,
    });
    registry.register(InstallableUnit, "requirements", |v| match v {
        Value::Unit(unit) => list(unit.requirements(), Value::Requirement),
        _ => Value::Null,
    });
    registry.register(InstallableUnit, "metaRequirements", |v| match v {
        Value::Unit(unit) => list(unit.meta_requirements(), Value::Requirement),
        _ => Value::Null,
    });
    registry.register(InstallableUnit, "properties", |v| match v {
        Value::Unit(unit) => Value::Map(Arc::new(
            unit.properties()
                .iter()
                .map(|(k, v)| (k.clone(), Value::from(v.as_str())))
                .collect(),
        )),
        _ => Value::Null,
    });
    registry.register(InstallableUnit, "singleton", |v| match v {
        Value::Unit(unit) => Value::Boolean(unit.is_singleton()),
        _ => Value::Null,
    });

    registry.register(Capability, "namespace", |v| match v {
        Value::Capability(c) => Value::from(c.namespace.as_str()),
        _ => Value::Null,
    });
    registry.register(Capability, "name", |v| match v {
        Value::Capability(c) => Value::from(c.name.as_str()),
        _ => Value::Null,
    });
    registry.register(Capability, "version", |v| match v {
        Value::Capability(c) => Value::Version(c.version.clone()),
        _ => Value::Null,
    });

    registry.register(Requirement, "namespace", |v| match v {
        Value::Requirement(r) => Value::from(r.namespace.as_str()),
        _ => Value::Null,
    });
    registry.register(Requirement, "name", |v| match v {
        Value::Requirement(r) => Value::from(r.name.as_str()),
        _ => Value::Null,
    });
    registry.register(Requirement, "range", |v| match v {
        Value::Requirement(r) => Value::VersionRange(r.range.clone()),
        _ => Value::Null,
    });
    registry.register(Requirement, "min", |v| match v {
        Value::Requirement(r) => Value::Integer(i64::from(r.min)),
        _ => Value::Null,
    });
    registry.register(Requirement, "max", |v| match v {
        Value::Requirement(r) => Value::Integer(i64::from(r.max)),
        _ => Value::Null,
    });
    registry.register(Requirement, "greedy", |v| match v {
        Value::Requirement(r) => Value::Boolean(r.greedy),
        _ => Value::Null,
    });
    registry.register(Requirement, "optional", |v| match v {
        Value::Requirement(r) => Value::Boolean(r.is_optional()),
        _ => Value::Null,
    });

    registry.register(Version, "major", |v| match v {
        Value::Version(version) => Value::Integer(i64::from(version.major())),
        _ => Value::Null,
    });
    registry.register(Version, "minor", |v| match v {
        Value::Version(version) => Value::Integer(i64::from(version.minor())),
        _ => Value::Null,
    });
    registry.register(Version, "micro", |v| match v {
        Value::Version(version) => Value::Integer(i64::from(version.micro())),
        _ => Value::Null,
    });
    registry.register(Version, "qualifier", |v| match v {
        Value::Version(version) => Value::from(version.qualifier()),
        _ => Value::Null,
    });

    registry.register(VersionRange, "minimum", |v| match v {
        Value::VersionRange(range) => Value::Version(range.minimum().clone()),
        _ => Value::Null,
    });
    registry.register(VersionRange, "maximum", |v| match v {
        Value::VersionRange(range) => range
            .maximum()
            .map_or(Value::Null, |max| Value::Version(max.clone())),
        _ => Value::Null,
    });
    registry.register(VersionRange, "includeMinimum", |v| match v {
        Value::VersionRange(range) => Value::Boolean(range.include_minimum()),
        _ => Value::Null,
    });
    registry.register(VersionRange, "includeMaximum", |v| match v {
        Value::VersionRange(range) => Value::Boolean(range.include_maximum()),
        _ => Value::Null,
    });

    registry.register(String, "length", |v| match v {
        Value::String(s) => Value::Integer(s.chars().count() as i64),
        _ => Value::Null,
    });
    registry.register(List, "size", |v| match v {
        Value::List(items) => Value::Integer(items.len() as i64),
        _ => Value::Null,
    });
    registry.register(Set, "size", |v| match v {
        Value::Set(set) => Value::Integer(set.len() as i64),
        _ => Value::Null,
    });
}

static STANDARD_MEMBERS: Lazy<MemberRegistry> = Lazy::new(|| {
    let mut registry = MemberRegistry::new();
    register_builtin_members(&mut registry);
    registry
});

/// The process-wide built-in member table
pub fn standard_members() -> &'static MemberRegistry {
    &STANDARD_MEMBERS
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{InstallableUnit as Unit, Requirement as Req, Version as Ver, VersionRange as Range};
    use indexmap::IndexMap;

    fn unit() -> Value {
        Value::from(
            Unit::builder("a", Ver::new(1, 2, 3))
                .property("vendor", "acme")
                .requires_unit("b", Range::any())
                .build(),
        )
    }

    #[test]
    fn test_unit_members() {
        let members = standard_members();
        let unit = unit();
        assert_eq!(members.access(&unit, "id").unwrap(), Value::from("a"));
        assert_eq!(
            members.access(&unit, "version").unwrap(),
            Value::Version(Ver::new(1, 2, 3))
        );
        let Value::List(requirements) = members.access(&unit, "requirements").unwrap() else {
            panic!("requirements should be a list");
        };
        assert_eq!(requirements.len(), 1);
        let Value::Map(props) = members.access(&unit, "properties").unwrap() else {
            panic!("properties should be a map");
        };
        assert_eq!(props.get("vendor"), Some(&Value::from("acme")));
    }

    #[test]
    fn test_unknown_member_on_known_type_fails() {
        let err = standard_members().access(&unit(), "colour").unwrap_err();
        assert_eq!(
            err,
            EvaluationError::UnknownMember {
                member: "colour".to_string(),
                type_name: "InstallableUnit".to_string(),
            }
        );
    }

    #[test]
    fn test_null_and_map_members_are_lenient() {
        let members = standard_members();
        assert_eq!(members.access(&Value::Null, "anything").unwrap(), Value::Null);
        let map = Value::Map(Arc::new(IndexMap::from([("k".to_string(), Value::Integer(1))])));
        assert_eq!(members.access(&map, "k").unwrap(), Value::Integer(1));
        assert_eq!(members.access(&map, "missing").unwrap(), Value::Null);
    }

    #[test]
    fn test_requirement_optional_member() {
        let req = Value::from(Req::unit("x", Range::any()).optional());
        assert_eq!(
            standard_members().access(&req, "optional").unwrap(),
            Value::Boolean(true)
        );
        assert_eq!(standard_members().access(&req, "min").unwrap(), Value::Integer(0));
    }

    #[test]
    fn test_members_of_lists_registered_names() {
        let names = standard_members().members_of(ValueType::Version);
        assert_eq!(names, vec!["major", "micro", "minor", "qualifier"]);
    }
}
