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

//! Binary and unary operator semantics
//!
//! Operands are already evaluated. `null` compares equal only to `null`;
//! strings coerce to versions when compared with one. Any other pairing of
//! different types is a type mismatch, never a silent `false`.

use super::error::{EvaluationError, EvaluationResult};
use crate::ast::{BinaryOperator, UnaryOperator};
use crate::model::{Pattern, Value, Version, VersionRange};
use std::cmp::Ordering;

/// Apply a non-short-circuit binary operator
pub fn binary(op: BinaryOperator, left: &Value, right: &Value) -> EvaluationResult<Value> {
    use BinaryOperator::*;

    match op {
        Add | Subtract | Multiply | Divide | Modulo => arithmetic(op, left, right),
        Equal => equals(left, right).map(Value::Boolean),
        NotEqual => equals(left, right).map(|eq| Value::Boolean(!eq)),
        Less => compare(op, left, right).map(|o| Value::Boolean(o.is_lt())),
        LessOrEqual => compare(op, left, right).map(|o| Value::Boolean(o.is_le())),
        Greater => compare(op, left, right).map(|o| Value::Boolean(o.is_gt())),
        GreaterOrEqual => compare(op, left, right).map(|o| Value::Boolean(o.is_ge())),
        Matches => matches(left, right).map(Value::Boolean),
    }
}

/// Apply a unary operator
pub fn unary(op: UnaryOperator, operand: &Value) -> EvaluationResult<Value> {
    match (op, operand) {
        (UnaryOperator::Not, Value::Boolean(b)) => Ok(Value::Boolean(!b)),
        (UnaryOperator::Negate, Value::Integer(i)) => i
            .checked_neg()
            .map(Value::Integer)
            .ok_or_else(|| EvaluationError::Arithmetic {
                message: format!("cannot negate {i}"),
            }),
        (UnaryOperator::Not, other) => Err(EvaluationError::type_mismatch(
            op.symbol(),
            "Boolean",
            other.type_name(),
        )),
        (UnaryOperator::Negate, other) => Err(EvaluationError::type_mismatch(
            op.symbol(),
            "Integer",
            other.type_name(),
        )),
    }
}

fn parse_version(text: &str) -> Option<Version> {
    Version::parse(text).ok()
}

/// `left == right`
pub fn equals(left: &Value, right: &Value) -> EvaluationResult<bool> {
    match (left, right) {
        (Value::Null, _) | (_, Value::Null) => Ok(left.is_null() && right.is_null()),
        (Value::Version(v), Value::String(s)) | (Value::String(s), Value::Version(v)) => {
            Ok(parse_version(s).is_some_and(|parsed| &parsed == v))
        }
        (l, r) if l.value_type() == r.value_type() => Ok(l == r),
        (l, r) => Err(EvaluationError::type_mismatch(
            "==",
            l.type_name(),
            r.type_name(),
        )),
    }
}

/// Total order for `<`, `<=`, `>`, `>=`
pub fn compare(op: BinaryOperator, left: &Value, right: &Value) -> EvaluationResult<Ordering> {
    let mismatch = || EvaluationError::type_mismatch(op.symbol(), left.type_name(), right.type_name());
    let coerce = |text: &str| {
        parse_version(text).ok_or_else(|| {
            EvaluationError::invalid_argument(op.symbol(), format!("'{text}' is not a version"))
        })
    };

    match (left, right) {
        (Value::Integer(a), Value::Integer(b)) => Ok(a.cmp(b)),
        (Value::String(a), Value::String(b)) => Ok(a.cmp(b)),
        (Value::Version(a), Value::Version(b)) => Ok(a.cmp(b)),
        (Value::Version(a), Value::String(b)) => Ok(a.cmp(&coerce(b)?)),
        (Value::String(a), Value::Version(b)) => Ok(coerce(a)?.cmp(b)),
        _ => Err(mismatch()),
    }
}

fn arithmetic(op: BinaryOperator, left: &Value, right: &Value) -> EvaluationResult<Value> {
    let (a, b) = match (left, right) {
        (Value::String(a), Value::String(b)) if op == BinaryOperator::Add => {
            return Ok(Value::String(format!("{a}{b}")));
        }
        (Value::Integer(a), Value::Integer(b)) => (*a, *b),
        _ => {
            return Err(EvaluationError::type_mismatch(
                op.symbol(),
                "Integer",
                format!("{} and {}", left.type_name(), right.type_name()),
            ));
        }
    };

    let result = match op {
        BinaryOperator::Add => a.checked_add(b),
        BinaryOperator::Subtract => a.checked_sub(b),
        BinaryOperator::Multiply => a.checked_mul(b),
        BinaryOperator::Divide => a.checked_div(b),
        BinaryOperator::Modulo => a.checked_rem(b),
        _ => None,
    };
    result.map(Value::Integer).ok_or_else(|| EvaluationError::Arithmetic {
        message: if b == 0 && matches!(op, BinaryOperator::Divide | BinaryOperator::Modulo) {
            "division by zero".to_string()
        } else {
            format!("{a} {} {b} overflows", op.symbol())
        },
    })
}

/// `left ~= right`, dispatched on the runtime type of `right`
///
/// | right        | meaning                                   |
/// |--------------|-------------------------------------------|
/// | Type         | `left` is an instance of the type         |
/// | Pattern      | regex search in a string                  |
/// | Requirement  | unit or capability satisfies it           |
/// | Capability   | unit provides it, or requirement accepts it |
/// | VersionRange | version lies in the range                 |
/// | String       | glob match (`*`, `?`)                     |
pub fn matches(left: &Value, right: &Value) -> EvaluationResult<bool> {
    let mismatch = |expected: &str| EvaluationError::type_mismatch("~=", expected, left.type_name());

    match right {
        Value::Null => Ok(false),
        Value::Type(ty) => Ok(left.is_instance_of(*ty)),
        Value::Pattern(pattern) => match left {
            Value::Null => Ok(false),
            Value::String(text) => Ok(pattern.is_match(text)),
            _ => Err(mismatch("String")),
        },
        Value::Requirement(requirement) => match left {
            Value::Null => Ok(false),
            Value::Unit(unit) => Ok(unit.satisfies(requirement)),
            Value::Capability(capability) => Ok(requirement.is_satisfied_by(capability)),
            _ => Err(mismatch("InstallableUnit or ProvidedCapability")),
        },
        Value::Capability(capability) => match left {
            Value::Null => Ok(false),
            Value::Unit(unit) => Ok(unit
                .provided_capabilities()
                .iter()
                .any(|provided| provided.as_ref() == capability.as_ref())),
            Value::Requirement(requirement) => Ok(requirement.is_satisfied_by(capability)),
            _ => Err(mismatch("InstallableUnit or Requirement")),
        },
        Value::VersionRange(range) => match left {
            Value::Null => Ok(false),
            Value::Version(version) => Ok(range.includes(version)),
            Value::String(text) => Ok(in_range(range, text)),
            _ => Err(mismatch("Version")),
        },
        Value::String(glob) => match left {
            Value::Null => Ok(false),
            Value::String(text) => Ok(Pattern::from_glob(glob)?.is_match(text)),
            _ => Err(mismatch("String")),
        },
        other => Err(EvaluationError::type_mismatch(
            "~=",
            "Type, Pattern, Requirement, ProvidedCapability, VersionRange or String",
            other.type_name(),
        )),
    }
}

fn in_range(range: &VersionRange, text: &str) -> bool {
    parse_version(text).is_some_and(|version| range.includes(&version))
}

/// Coerce a predicate result; `null` counts as false
pub fn truthy(operation: &str, value: &Value) -> EvaluationResult<bool> {
    match value {
        Value::Boolean(b) => Ok(*b),
        Value::Null => Ok(false),
        other => Err(EvaluationError::type_mismatch(operation, "Boolean", other.type_name())),
    }
}
