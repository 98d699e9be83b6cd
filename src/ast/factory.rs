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

//! Validating constructor for expression trees
//!
//! Every tree the parser produces goes through [`ExpressionFactory`], so the
//! arity rules below hold for any tree that reaches the evaluator. Programmatic
//! callers get the same guarantees.

use super::error::{ExpressionError, ExpressionResult};
use super::expression::*;
use super::operator::{BinaryOperator, CollectionOperator, Function, UnaryOperator};
use crate::model::Pattern;
use smallvec::SmallVec;
use std::sync::Arc;

/// Stateless expression builder
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpressionFactory;

impl ExpressionFactory {
    /// Create a factory
    pub const fn new() -> Self {
        Self
    }

    /// Literal expression
    pub fn literal(&self, value: LiteralValue) -> Expression {
        Arc::new(ExpressionNode::Literal(value))
    }

    /// `null`
    pub fn null(&self) -> Expression {
        self.literal(LiteralValue::Null)
    }

    /// Boolean literal
    pub fn boolean(&self, value: bool) -> Expression {
        self.literal(LiteralValue::Boolean(value))
    }

    /// Integer literal
    pub fn integer(&self, value: i64) -> Expression {
        self.literal(LiteralValue::Integer(value))
    }

    /// String literal
    pub fn string(&self, value: impl Into<String>) -> Expression {
        self.literal(LiteralValue::String(value.into()))
    }

    /// Regex literal
    pub fn pattern(&self, pattern: Pattern) -> Expression {
        self.literal(LiteralValue::Pattern(pattern))
    }

    /// Variable reference
    pub fn variable(&self, name: impl Into<String>) -> Expression {
        Arc::new(ExpressionNode::Variable(name.into()))
    }

    /// The `item` variable
    pub fn item(&self) -> Expression {
        self.variable(ITEM)
    }

    /// The `everything` variable
    pub fn everything(&self) -> Expression {
        self.variable(EVERYTHING)
    }

    /// `$index`
    pub fn indexed_parameter(&self, index: usize) -> Expression {
        Arc::new(ExpressionNode::Parameter(ParameterRef::Index(index)))
    }

    /// `$key`
    pub fn keyed_parameter(&self, key: impl Into<String>) -> Expression {
        Arc::new(ExpressionNode::Parameter(ParameterRef::Key(key.into())))
    }

    /// `target.name`
    pub fn member(&self, target: Expression, name: impl Into<String>) -> Expression {
        Arc::new(ExpressionNode::Member {
            target,
            name: name.into(),
        })
    }

    /// `target[key]`
    pub fn at(&self, target: Expression, key: Expression) -> Expression {
        Arc::new(ExpressionNode::At { target, key })
    }

    /// `[a, b, ...]`
    pub fn array(&self, items: Vec<Expression>) -> ExpressionResult<Expression> {
        reject_lambdas("array", &items)?;
        Ok(Arc::new(ExpressionNode::Array(items)))
    }

    /// `!operand`
    pub fn not(&self, operand: Expression) -> Expression {
        Arc::new(ExpressionNode::Unary {
            op: UnaryOperator::Not,
            operand,
        })
    }

    /// `-operand`; integer literals fold into a negative literal
    pub fn negate(&self, operand: Expression) -> Expression {
        if let ExpressionNode::Literal(LiteralValue::Integer(value)) = operand.as_ref() {
            if let Some(negated) = value.checked_neg() {
                return self.integer(negated);
            }
        }
        Arc::new(ExpressionNode::Unary {
            op: UnaryOperator::Negate,
            operand,
        })
    }

    /// Binary operation
    pub fn binary(&self, op: BinaryOperator, left: Expression, right: Expression) -> Expression {
        Arc::new(ExpressionNode::Binary(Box::new(BinaryOpData { op, left, right })))
    }

    /// `left == right`
    pub fn equals(&self, left: Expression, right: Expression) -> Expression {
        self.binary(BinaryOperator::Equal, left, right)
    }

    /// `left ~= right`
    pub fn matches(&self, left: Expression, right: Expression) -> Expression {
        self.binary(BinaryOperator::Matches, left, right)
    }

    /// Conjunction; nested conjunctions are flattened
    pub fn and(&self, operands: Vec<Expression>) -> ExpressionResult<Expression> {
        self.junction("&&", operands, true)
    }

    /// Disjunction; nested disjunctions are flattened
    pub fn or(&self, operands: Vec<Expression>) -> ExpressionResult<Expression> {
        self.junction("||", operands, false)
    }

    fn junction(
        &self,
        operator: &str,
        operands: Vec<Expression>,
        is_and: bool,
    ) -> ExpressionResult<Expression> {
        reject_lambdas(operator, &operands)?;
        let mut flat = Vec::with_capacity(operands.len());
        for operand in operands {
            match (operand.as_ref(), is_and) {
                (ExpressionNode::And(inner), true) | (ExpressionNode::Or(inner), false) => {
                    flat.extend(inner.iter().cloned())
                }
                _ => flat.push(operand),
            }
        }
        match flat.len() {
            0 => Err(ExpressionError::InvalidArity {
                operator: operator.to_string(),
                expected: "at least 1".to_string(),
                actual: 0,
            }),
            1 => Ok(flat.remove(0)),
            _ if is_and => Ok(Arc::new(ExpressionNode::And(flat))),
            _ => Ok(Arc::new(ExpressionNode::Or(flat))),
        }
    }

    /// `condition ? then_expr : else_expr`
    pub fn conditional(
        &self,
        condition: Expression,
        then_expr: Expression,
        else_expr: Expression,
    ) -> Expression {
        Arc::new(ExpressionNode::Conditional(Box::new(ConditionalData {
            condition,
            then_expr,
            else_expr,
        })))
    }

    /// `variable | body`
    pub fn lambda(&self, variable: impl Into<String>, body: Expression) -> ExpressionResult<Expression> {
        self.curried_lambda(Vec::new(), variable, body)
    }

    /// `{a = e1, b = e2, variable | body}`
    pub fn curried_lambda(
        &self,
        assignments: Vec<(String, Expression)>,
        variable: impl Into<String>,
        body: Expression,
    ) -> ExpressionResult<Expression> {
        let variable = variable.into();
        check_rebindable(&variable)?;
        let mut bound = Vec::with_capacity(assignments.len());
        for (name, value) in assignments {
            check_rebindable(&name)?;
            if value.is_lambda() {
                return Err(ExpressionError::UnexpectedLambda {
                    operator: format!("assignment to {name}"),
                });
            }
            bound.push(Assignment {
                variable: name,
                value,
            });
        }
        if body.is_lambda() {
            return Err(ExpressionError::UnexpectedLambda {
                operator: "lambda body".to_string(),
            });
        }
        Ok(Arc::new(ExpressionNode::Lambda(Box::new(LambdaData {
            assignments: bound,
            variable,
            body,
        }))))
    }

    /// Constructor function call by name
    pub fn function(&self, name: &str, args: Vec<Expression>) -> ExpressionResult<Expression> {
        if name == "pipe" {
            return self.pipe(args);
        }
        let function = Function::from_name(name).ok_or_else(|| ExpressionError::UnknownFunction {
            name: name.to_string(),
        })?;
        let (min, max) = function.arity();
        if args.len() < min || max.is_some_and(|max| args.len() > max) {
            let expected = match max {
                Some(max) if max == min => min.to_string(),
                Some(max) => format!("{min} to {max}"),
                None => format!("at least {min}"),
            };
            return Err(ExpressionError::InvalidArity {
                operator: name.to_string(),
                expected,
                actual: args.len(),
            });
        }
        reject_lambdas(name, &args)?;
        Ok(Arc::new(ExpressionNode::Function(Box::new(FunctionCallData {
            function,
            args: args.into(),
        }))))
    }

    /// `pipe(stage, ...)`
    pub fn pipe(&self, stages: Vec<Expression>) -> ExpressionResult<Expression> {
        if stages.is_empty() {
            return Err(ExpressionError::InvalidArity {
                operator: "pipe".to_string(),
                expected: "at least 1".to_string(),
                actual: 0,
            });
        }
        reject_lambdas("pipe", &stages)?;
        Ok(Arc::new(ExpressionNode::Pipe(stages)))
    }

    /// `source.op(args)` with the operator's arity rules
    pub fn collection(
        &self,
        op: CollectionOperator,
        source: Expression,
        args: Vec<Expression>,
    ) -> ExpressionResult<Expression> {
        use CollectionOperator::*;

        if source.is_lambda() {
            return Err(ExpressionError::UnexpectedLambda {
                operator: op.name().to_string(),
            });
        }

        let arity = |expected: &str| ExpressionError::InvalidArity {
            operator: op.name().to_string(),
            expected: expected.to_string(),
            actual: args.len(),
        };
        let lambda_required = || ExpressionError::LambdaRequired {
            operator: op.name().to_string(),
        };

        match op {
            Select | Reject | Collect | Exists | All | First => {
                if args.len() != 1 {
                    return Err(arity("1"));
                }
                if !args[0].is_lambda() {
                    return Err(lambda_required());
                }
            }
            Flatten | Latest => {
                if !args.is_empty() {
                    return Err(arity("0"));
                }
            }
            Limit => {
                if args.len() != 1 {
                    return Err(arity("1"));
                }
                reject_lambdas(op.name(), &args)?;
            }
            Unique => {
                if args.len() > 1 {
                    return Err(arity("0 or 1"));
                }
                reject_lambdas(op.name(), &args)?;
            }
            Traverse => {
                if args.is_empty() || args.len() > 2 {
                    return Err(arity("1 or 2"));
                }
                if !args[args.len() - 1].is_lambda() {
                    return Err(lambda_required());
                }
                reject_lambdas(op.name(), &args[..args.len() - 1])?;
            }
        }

        let args: SmallVec<[Expression; 2]> = args.into();
        Ok(Arc::new(ExpressionNode::Collection(Box::new(CollectionOpData {
            op,
            source,
            args,
        }))))
    }

    /// `source.select(lambda)`
    pub fn select(&self, source: Expression, lambda: Expression) -> ExpressionResult<Expression> {
        self.collection(CollectionOperator::Select, source, vec![lambda])
    }

    /// `source.collect(lambda)`
    pub fn collect(&self, source: Expression, lambda: Expression) -> ExpressionResult<Expression> {
        self.collection(CollectionOperator::Collect, source, vec![lambda])
    }

    /// `source.exists(lambda)`
    pub fn exists(&self, source: Expression, lambda: Expression) -> ExpressionResult<Expression> {
        self.collection(CollectionOperator::Exists, source, vec![lambda])
    }

    /// `source.limit(count)`
    pub fn limit(&self, source: Expression, count: Expression) -> ExpressionResult<Expression> {
        self.collection(CollectionOperator::Limit, source, vec![count])
    }

    /// `source.traverse(lambda)`
    pub fn traverse(&self, source: Expression, lambda: Expression) -> ExpressionResult<Expression> {
        self.collection(CollectionOperator::Traverse, source, vec![lambda])
    }

    /// `source.latest()`
    pub fn latest(&self, source: Expression) -> ExpressionResult<Expression> {
        self.collection(CollectionOperator::Latest, source, Vec::new())
    }
}

fn check_rebindable(name: &str) -> ExpressionResult<()> {
    if name == EVERYTHING {
        return Err(ExpressionError::ReservedName {
            name: name.to_string(),
        });
    }
    Ok(())
}

fn reject_lambdas(operator: &str, args: &[Expression]) -> ExpressionResult<()> {
    if args.iter().any(|arg| arg.is_lambda()) {
        return Err(ExpressionError::UnexpectedLambda {
            operator: operator.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const F: ExpressionFactory = ExpressionFactory::new();

    fn is_even() -> Expression {
        let x = F.variable("x");
        let rem = F.binary(BinaryOperator::Modulo, x, F.integer(2));
        F.lambda("x", F.equals(rem, F.integer(0))).unwrap()
    }

    #[test]
    fn test_select_requires_lambda() {
        let err = F
            .collection(CollectionOperator::Select, F.everything(), vec![F.integer(1)])
            .unwrap_err();
        assert!(matches!(err, ExpressionError::LambdaRequired { .. }));

        let err = F
            .collection(CollectionOperator::Select, F.everything(), vec![])
            .unwrap_err();
        assert!(matches!(err, ExpressionError::InvalidArity { actual: 0, .. }));

        assert!(F.select(F.everything(), is_even()).is_ok());
    }

    #[test]
    fn test_limit_rejects_lambda() {
        let err = F.limit(F.everything(), is_even()).unwrap_err();
        assert!(matches!(err, ExpressionError::UnexpectedLambda { .. }));
    }

    #[test]
    fn test_traverse_cache_then_lambda() {
        let cache = F.function("set", vec![]).unwrap();
        assert!(
            F.collection(CollectionOperator::Traverse, F.everything(), vec![cache.clone(), is_even()])
                .is_ok()
        );
        let err = F
            .collection(CollectionOperator::Traverse, F.everything(), vec![is_even(), cache])
            .unwrap_err();
        assert!(matches!(err, ExpressionError::LambdaRequired { .. }));
    }

    #[test]
    fn test_everything_cannot_be_rebound() {
        let err = F.lambda(EVERYTHING, F.boolean(true)).unwrap_err();
        assert_eq!(
            err,
            ExpressionError::ReservedName {
                name: EVERYTHING.to_string()
            }
        );
    }

    #[test]
    fn test_junctions_flatten() {
        let a = F.variable("a");
        let b = F.variable("b");
        let c = F.variable("c");
        let inner = F.and(vec![b.clone(), c.clone()]).unwrap();
        let outer = F.and(vec![a.clone(), inner]).unwrap();
        assert_eq!(*outer, ExpressionNode::And(vec![a.clone(), b, c]));
        assert_eq!(F.or(vec![a.clone()]).unwrap(), a);
        assert!(F.or(vec![]).is_err());
    }

    #[test]
    fn test_function_arity() {
        assert!(matches!(
            F.function("version", vec![]).unwrap_err(),
            ExpressionError::InvalidArity { .. }
        ));
        assert!(matches!(
            F.function("nope", vec![]).unwrap_err(),
            ExpressionError::UnknownFunction { .. }
        ));
        assert!(F.function("requirement", vec![F.string("ns"), F.string("n")]).is_ok());
    }

    #[test]
    fn test_negative_literal_folds() {
        assert_eq!(F.negate(F.integer(5)), F.integer(-5));
        assert!(matches!(
            F.negate(F.variable("x")).as_ref(),
            ExpressionNode::Unary { .. }
        ));
    }
}
