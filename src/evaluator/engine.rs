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

//! Tree-walking interpreter
//!
//! [`evaluate`] dispatches on the node kind. Scalars are computed eagerly;
//! collection operators return lazy sequences (see `collections`).

use super::collections::{self, iterate};
use super::context::EvaluationContext;
use super::error::{EvaluationError, EvaluationResult};
use super::operators::{self, truthy};
use crate::ast::{ExpressionNode, LiteralValue};
use crate::model::Value;
use crate::registry::{standard_functions, standard_members};

impl ExpressionNode {
    /// Evaluate this node against `ctx`
    pub fn evaluate(&self, ctx: &EvaluationContext) -> EvaluationResult<Value> {
        evaluate(self, ctx)
    }
}

/// Evaluate `node` against `ctx`
pub fn evaluate(node: &ExpressionNode, ctx: &EvaluationContext) -> EvaluationResult<Value> {
    match node {
        ExpressionNode::Literal(literal) => Ok(literal_value(literal)),
        ExpressionNode::Variable(name) => ctx.lookup(name),
        ExpressionNode::Parameter(parameter) => ctx.parameter(parameter),
        ExpressionNode::Member { target, name } => {
            let target = evaluate(target, ctx)?;
            standard_members().access(&target, name)
        }
        ExpressionNode::At { target, key } => {
            let target = evaluate(target, ctx)?;
            let key = evaluate(key, ctx)?;
            at(target, &key)
        }
        ExpressionNode::Array(items) => {
            let values = items
                .iter()
                .map(|item| evaluate(item, ctx))
                .collect::<EvaluationResult<Vec<_>>>()?;
            Ok(Value::list(values))
        }
        ExpressionNode::Unary { op, operand } => {
            let operand = evaluate(operand, ctx)?;
            operators::unary(*op, &operand)
        }
        ExpressionNode::Binary(data) => {
            let left = evaluate(&data.left, ctx)?;
            let right = evaluate(&data.right, ctx)?;
            operators::binary(data.op, &left, &right)
        }
        ExpressionNode::And(operands) => {
            for operand in operands {
                if !boolean("&&", &evaluate(operand, ctx)?)? {
                    return Ok(Value::Boolean(false));
                }
            }
            Ok(Value::Boolean(true))
        }
        ExpressionNode::Or(operands) => {
            for operand in operands {
                if boolean("||", &evaluate(operand, ctx)?)? {
                    return Ok(Value::Boolean(true));
                }
            }
            Ok(Value::Boolean(false))
        }
        ExpressionNode::Conditional(data) => {
            if truthy("?:", &evaluate(&data.condition, ctx)?)? {
                evaluate(&data.then_expr, ctx)
            } else {
                evaluate(&data.else_expr, ctx)
            }
        }
        ExpressionNode::Lambda(_) => Err(EvaluationError::invalid_argument(
            "lambda",
            "a lambda can only be applied by a collection operator",
        )),
        ExpressionNode::Function(data) => {
            let args = data
                .args
                .iter()
                .map(|arg| evaluate(arg, ctx))
                .collect::<EvaluationResult<Vec<_>>>()?;
            standard_functions().call(data.function, &args)
        }
        ExpressionNode::Collection(data) => collections::evaluate_collection(data, ctx),
        ExpressionNode::Pipe(stages) => {
            let mut stages = stages.iter();
            let mut result = match stages.next() {
                Some(first) => evaluate(first, ctx)?,
                None => return Ok(Value::Null),
            };
            for stage in stages {
                result = evaluate(stage, &ctx.with_everything(result))?;
            }
            Ok(result)
        }
    }
}

/// Evaluate `node` and require a boolean result
pub fn evaluate_boolean(node: &ExpressionNode, ctx: &EvaluationContext) -> EvaluationResult<bool> {
    let value = evaluate(node, ctx)?;
    boolean("predicate", &value)
}

fn boolean(operation: &str, value: &Value) -> EvaluationResult<bool> {
    value
        .as_bool()
        .ok_or_else(|| EvaluationError::type_mismatch(operation, "Boolean", value.type_name()))
}

fn literal_value(literal: &LiteralValue) -> Value {
    match literal {
        LiteralValue::Null => Value::Null,
        LiteralValue::Boolean(b) => Value::Boolean(*b),
        LiteralValue::Integer(i) => Value::Integer(*i),
        LiteralValue::String(s) => Value::String(s.clone()),
        LiteralValue::Pattern(p) => Value::Pattern(p.clone()),
    }
}

/// `target[key]`; a missing key or an index out of range reads as `null`
fn at(target: Value, key: &Value) -> EvaluationResult<Value> {
    match (target, key) {
        (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
        (Value::Map(map), Value::String(k)) => Ok(map.get(k.as_str()).cloned().unwrap_or(Value::Null)),
        (Value::List(items), Value::Integer(i)) => Ok(usize::try_from(*i)
            .ok()
            .and_then(|i| items.get(i).cloned())
            .unwrap_or(Value::Null)),
        (collection @ (Value::Collection(_) | Value::Set(_)), Value::Integer(i)) => {
            let Ok(index) = usize::try_from(*i) else {
                return Ok(Value::Null);
            };
            iterate("[]", collection)?
                .nth(index)
                .transpose()
                .map(|found| found.unwrap_or(Value::Null))
        }
        (Value::String(s), Value::Integer(i)) => Ok(usize::try_from(*i)
            .ok()
            .and_then(|i| s.chars().nth(i))
            .map_or(Value::Null, |c| Value::String(c.to_string()))),
        (target, key) => Err(EvaluationError::type_mismatch(
            "[]",
            "List with Integer or Map with String",
            format!("{} with {}", target.type_name(), key.type_name()),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{ExpressionFactory, ParameterRef};
    use crate::config::EngineConfig;
    use crate::evaluator::Parameters;
    use crate::progress::NullMonitor;
    use indexmap::IndexMap;
    use std::sync::Arc;

    const F: ExpressionFactory = ExpressionFactory::new();

    fn ctx() -> EvaluationContext {
        EvaluationContext::for_predicate(
            Parameters::positional(vec![Value::from("x")]),
            Arc::new(NullMonitor),
            EngineConfig::testing(),
        )
    }

    #[test]
    fn test_and_short_circuits_before_type_errors() {
        // The second operand would be a type mismatch if evaluated
        let expr = F
            .and(vec![F.boolean(false), F.integer(1)])
            .unwrap();
        assert_eq!(evaluate(&expr, &ctx()).unwrap(), Value::Boolean(false));

        let expr = F.or(vec![F.boolean(true), F.integer(1)]).unwrap();
        assert_eq!(evaluate(&expr, &ctx()).unwrap(), Value::Boolean(true));

        let expr = F.and(vec![F.boolean(true), F.integer(1)]).unwrap();
        assert!(evaluate(&expr, &ctx()).is_err());
    }

    #[test]
    fn test_parameter_and_conditional() {
        let expr = F.conditional(
            F.equals(F.indexed_parameter(0), F.string("x")),
            F.integer(1),
            F.integer(2),
        );
        assert_eq!(expr.evaluate(&ctx()).unwrap(), Value::Integer(1));
        assert!(matches!(
            evaluate(&F.keyed_parameter("missing"), &ctx()),
            Err(EvaluationError::UnknownParameter { .. })
        ));
        assert_eq!(
            crate::ast::parameters(&expr),
            vec![ParameterRef::Index(0)]
        );
    }

    #[test]
    fn test_at_returns_null_when_absent() {
        let list = Value::list(vec![Value::Integer(10), Value::Integer(20)]);
        assert_eq!(at(list.clone(), &Value::Integer(1)).unwrap(), Value::Integer(20));
        assert_eq!(at(list.clone(), &Value::Integer(5)).unwrap(), Value::Null);
        assert_eq!(at(list, &Value::Integer(-1)).unwrap(), Value::Null);

        let map = Value::Map(Arc::new(IndexMap::from([("a".to_string(), Value::Integer(1))])));
        assert_eq!(at(map.clone(), &Value::from("a")).unwrap(), Value::Integer(1));
        assert_eq!(at(map, &Value::from("b")).unwrap(), Value::Null);

        assert!(at(Value::Integer(1), &Value::Integer(0)).is_err());
    }

    #[test]
    fn test_lambda_outside_operator_is_rejected() {
        let lambda = F.lambda("x", F.variable("x")).unwrap();
        assert!(evaluate(&lambda, &ctx()).is_err());
    }

    #[test]
    fn test_unset_item_fails() {
        let expr = F.member(F.item(), "id");
        assert_eq!(
            evaluate(&expr, &ctx()),
            Err(EvaluationError::UnboundVariable {
                name: "item".to_string()
            })
        );
    }
}
