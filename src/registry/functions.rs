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

//! Constructor functions (`version(...)`, `range(...)`, ...)

use crate::ast::Function;
use crate::evaluator::{EvaluationError, EvaluationResult};
use crate::model::{ProvidedCapability, Requirement, Value, ValueSet, ValueType, Version, VersionRange};
use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;

/// Implementation of a constructor function over evaluated arguments
pub type FunctionImpl = fn(&[Value]) -> EvaluationResult<Value>;

/// Registry mapping functions to implementations
#[derive(Default)]
pub struct FunctionRegistry {
    functions: FxHashMap<Function, FunctionImpl>,
}

impl FunctionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an implementation
    pub fn register(&mut self, function: Function, implementation: FunctionImpl) {
        self.functions.insert(function, implementation);
    }

    /// Implementation of `function`
    pub fn get(&self, function: Function) -> Option<FunctionImpl> {
        self.functions.get(&function).copied()
    }

    /// Invoke `function` with already evaluated arguments
    pub fn call(&self, function: Function, args: &[Value]) -> EvaluationResult<Value> {
        let implementation = self.get(function).ok_or_else(|| {
            EvaluationError::invalid_argument(function.name(), "function is not registered")
        })?;
        implementation(args)
    }
}

fn string_arg<'a>(function: Function, args: &'a [Value], index: usize) -> EvaluationResult<&'a str> {
    let value = argument(args, index);
    value
        .as_str()
        .ok_or_else(|| EvaluationError::type_mismatch(function.name(), "String", value.type_name()))
}

fn version_arg(function: Function, value: &Value) -> EvaluationResult<Version> {
    match value {
        Value::Version(version) => Ok(version.clone()),
        Value::String(text) => Version::parse(text)
            .map_err(|e| EvaluationError::invalid_argument(function.name(), e.to_string())),
        other => Err(EvaluationError::type_mismatch(
            function.name(),
            "Version or String",
            other.type_name(),
        )),
    }
}

fn range_arg(function: Function, value: &Value) -> EvaluationResult<VersionRange> {
    match value {
        Value::Null => Ok(VersionRange::any()),
        Value::VersionRange(range) => Ok(range.clone()),
        Value::Version(version) => Ok(VersionRange::at_least(version.clone())),
        Value::String(text) => VersionRange::parse(text)
            .map_err(|e| EvaluationError::invalid_argument(function.name(), e.to_string())),
        other => Err(EvaluationError::type_mismatch(
            function.name(),
            "VersionRange or String",
            other.type_name(),
        )),
    }
}

fn argument(args: &[Value], index: usize) -> &Value {
    args.get(index).unwrap_or(&Value::Null)
}

fn version(args: &[Value]) -> EvaluationResult<Value> {
    version_arg(Function::Version, argument(args, 0)).map(Value::Version)
}

fn range(args: &[Value]) -> EvaluationResult<Value> {
    range_arg(Function::Range, argument(args, 0)).map(Value::VersionRange)
}

fn class(args: &[Value]) -> EvaluationResult<Value> {
    let name = string_arg(Function::Class, args, 0)?;
    ValueType::from_class_name(name)
        .map(Value::Type)
        .ok_or_else(|| EvaluationError::invalid_argument("class", format!("unknown class '{name}'")))
}

fn set(args: &[Value]) -> EvaluationResult<Value> {
    let set = ValueSet::new();
    for arg in args {
        set.insert(arg.clone());
    }
    Ok(Value::Set(set))
}

fn requirement(args: &[Value]) -> EvaluationResult<Value> {
    let namespace = string_arg(Function::Requirement, args, 0)?;
    let name = string_arg(Function::Requirement, args, 1)?;
    let range = range_arg(Function::Requirement, argument(args, 2))?;
    Ok(Value::from(Requirement::new(namespace, name, range)))
}

fn capability(args: &[Value]) -> EvaluationResult<Value> {
    let namespace = string_arg(Function::Capability, args, 0)?;
    let name = string_arg(Function::Capability, args, 1)?;
    let version = version_arg(Function::Capability, argument(args, 2))?;
    Ok(Value::from(ProvidedCapability::new(namespace, name, version)))
}

/// Register the built-in constructor functions
///
/// Missing arguments read as `null`, so a call that bypassed the factory's
/// arity check fails with an evaluation error.
pub fn register_builtin_functions(registry: &mut FunctionRegistry) {
    registry.register(Function::Version, version);
    registry.register(Function::Range, range);
    registry.register(Function::Class, class);
    registry.register(Function::Set, set);
    registry.register(Function::Requirement, requirement);
    registry.register(Function::Capability, capability);
}

static STANDARD_FUNCTIONS: Lazy<FunctionRegistry> = Lazy::new(|| {
    let mut registry = FunctionRegistry::new();
    register_builtin_functions(&mut registry);
    registry
});

/// The process-wide built-in function table
pub fn standard_functions() -> &'static FunctionRegistry {
    &STANDARD_FUNCTIONS
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Function::Version, vec![Value::from("1.2")], Value::Version(Version::new(1, 2, 0)))]
    #[case(Function::Class, vec![Value::from("IInstallableUnit")], Value::Type(ValueType::InstallableUnit))]
    #[case(
        Function::Range,
        vec![Value::from("[1.0,2.0)")],
        Value::VersionRange(VersionRange::parse("[1.0,2.0)").unwrap())
    )]
    fn test_constructors(#[case] function: Function, #[case] args: Vec<Value>, #[case] expected: Value) {
        assert_eq!(standard_functions().call(function, &args).unwrap(), expected);
    }

    #[test]
    fn test_requirement_defaults_to_any_range() {
        let value = standard_functions()
            .call(Function::Requirement, &[Value::from("osgi.bundle"), Value::from("b")])
            .unwrap();
        assert_eq!(
            value,
            Value::from(Requirement::new("osgi.bundle", "b", VersionRange::any()))
        );
    }

    #[test]
    fn test_bad_version_is_invalid_argument() {
        let err = standard_functions()
            .call(Function::Version, &[Value::from("x.y")])
            .unwrap_err();
        assert!(matches!(err, EvaluationError::InvalidArgument { .. }));
    }

    #[test]
    fn test_set_deduplicates() {
        let value = standard_functions()
            .call(Function::Set, &[Value::Integer(1), Value::Integer(1), Value::Integer(2)])
            .unwrap();
        let Value::Set(set) = value else {
            panic!("expected a set");
        };
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_class_requires_string() {
        let err = standard_functions()
            .call(Function::Class, &[Value::Integer(3)])
            .unwrap_err();
        assert!(matches!(err, EvaluationError::TypeMismatch { .. }));
    }

    #[test]
    fn test_missing_arguments_are_errors() {
        let functions = standard_functions();
        assert!(matches!(
            functions.call(Function::Version, &[]),
            Err(EvaluationError::TypeMismatch { .. })
        ));
        assert!(matches!(
            functions.call(Function::Capability, &[Value::from("osgi.bundle"), Value::from("b")]),
            Err(EvaluationError::TypeMismatch { .. })
        ));
        assert_eq!(
            functions.call(Function::Range, &[]).unwrap(),
            Value::VersionRange(VersionRange::any())
        );
    }
}
