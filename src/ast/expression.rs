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

//! Expression AST node definitions

use super::operator::{BinaryOperator, CollectionOperator, Function, UnaryOperator};
use crate::model::Pattern;
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

/// Shared, immutable expression tree
///
/// Trees are built once and evaluated many times, possibly from several
/// threads, so children are reference counted instead of boxed.
pub type Expression = Arc<ExpressionNode>;

/// Name of the variable bound to the candidate in predicates
pub const ITEM: &str = "item";

/// Name of the variable bound to the whole input in queries
pub const EVERYTHING: &str = "everything";

/// AST representation of query expressions
///
/// Large variants are boxed to keep the enum small.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ExpressionNode {
    /// Literal value
    Literal(LiteralValue),

    /// Variable reference (`item`, `everything`, lambda parameters)
    Variable(String),

    /// Query parameter (`$0`, `$name`)
    Parameter(ParameterRef),

    /// Member access (`target.name`)
    Member {
        /// Receiver
        target: Expression,
        /// Member name
        name: String,
    },

    /// Index or key access (`target[key]`)
    At {
        /// Receiver
        target: Expression,
        /// Integer index or string key
        key: Expression,
    },

    /// Array literal (`[a, b]`)
    Array(Vec<Expression>),

    /// Unary operation
    Unary {
        /// The operator
        op: UnaryOperator,
        /// The operand
        operand: Expression,
    },

    /// Binary operation (boxed for size optimization)
    Binary(Box<BinaryOpData>),

    /// Short-circuit conjunction over two or more operands
    And(Vec<Expression>),

    /// Short-circuit disjunction over two or more operands
    Or(Vec<Expression>),

    /// Conditional expression (`c ? a : b`)
    Conditional(Box<ConditionalData>),

    /// Lambda, only valid as a collection-operator argument
    Lambda(Box<LambdaData>),

    /// Constructor function call
    Function(Box<FunctionCallData>),

    /// Collection operator (`source.op(args)`)
    Collection(Box<CollectionOpData>),

    /// Sequential stages, each fed the previous result as `everything`
    Pipe(Vec<Expression>),
}

/// Literal values
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LiteralValue {
    /// `null`
    Null,
    /// `true` / `false`
    Boolean(bool),
    /// Integer literal
    Integer(i64),
    /// String literal, escapes already processed
    String(String),
    /// `/regex/`, compiled once at construction
    Pattern(Pattern),
}

/// Reference to a caller-supplied parameter
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParameterRef {
    /// `$0`, `$1`, ...
    Index(usize),
    /// `$name`
    Key(String),
}

impl fmt::Display for ParameterRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(index) => write!(f, "${index}"),
            Self::Key(key) => write!(f, "${key}"),
        }
    }
}

/// Binary operation data
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BinaryOpData {
    /// The operator
    pub op: BinaryOperator,
    /// Left operand
    pub left: Expression,
    /// Right operand
    pub right: Expression,
}

/// Conditional expression data
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConditionalData {
    /// Condition
    pub condition: Expression,
    /// Value when the condition is true
    pub then_expr: Expression,
    /// Value when the condition is false
    pub else_expr: Expression,
}

/// `name = value` binding in a curried lambda
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Assignment {
    /// Bound name
    pub variable: String,
    /// Value, evaluated once per operator invocation
    pub value: Expression,
}

/// Lambda expression data
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LambdaData {
    /// Curried bindings, in declaration order
    pub assignments: Vec<Assignment>,
    /// Parameter bound to each element
    pub variable: String,
    /// Lambda body
    pub body: Expression,
}

/// Function call data
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionCallData {
    /// Function
    pub function: Function,
    /// Arguments
    pub args: SmallVec<[Expression; 4]>,
}

/// Collection operator data
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionOpData {
    /// The operator
    pub op: CollectionOperator,
    /// Collection the operator runs over
    pub source: Expression,
    /// Operator arguments (lambda, limit, cache)
    pub args: SmallVec<[Expression; 2]>,
}

impl CollectionOpData {
    /// The lambda argument, always last when present
    pub fn lambda(&self) -> Option<&LambdaData> {
        self.args.last().and_then(|arg| arg.as_lambda())
    }

    /// The first non-lambda argument (limit count or cache)
    pub fn operand(&self) -> Option<&Expression> {
        self.args.first().filter(|arg| !arg.is_lambda())
    }
}

impl ExpressionNode {
    /// Check if this expression is a literal
    pub fn is_literal(&self) -> bool {
        matches!(self, Self::Literal(_))
    }

    /// Check if this expression is a lambda
    pub fn is_lambda(&self) -> bool {
        matches!(self, Self::Lambda(_))
    }

    /// Get the lambda data if this is a lambda
    pub fn as_lambda(&self) -> Option<&LambdaData> {
        match self {
            Self::Lambda(data) => Some(data),
            _ => None,
        }
    }

    /// Get the variable name if this is a variable reference
    pub fn as_variable(&self) -> Option<&str> {
        match self {
            Self::Variable(name) => Some(name),
            _ => None,
        }
    }

    /// Get the literal value if this is a literal
    pub fn as_literal(&self) -> Option<&LiteralValue> {
        match self {
            Self::Literal(value) => Some(value),
            _ => None,
        }
    }

    /// Direct children in evaluation order
    pub fn children(&self) -> SmallVec<[&Expression; 4]> {
        let mut out = SmallVec::new();
        match self {
            Self::Literal(_) | Self::Variable(_) | Self::Parameter(_) => {}
            Self::Member { target, .. } => out.push(target),
            Self::At { target, key } => {
                out.push(target);
                out.push(key);
            }
            Self::Array(items) | Self::And(items) | Self::Or(items) | Self::Pipe(items) => {
                out.extend(items.iter())
            }
            Self::Unary { operand, .. } => out.push(operand),
            Self::Binary(data) => {
                out.push(&data.left);
                out.push(&data.right);
            }
            Self::Conditional(data) => {
                out.push(&data.condition);
                out.push(&data.then_expr);
                out.push(&data.else_expr);
            }
            Self::Lambda(data) => {
                out.extend(data.assignments.iter().map(|a| &a.value));
                out.push(&data.body);
            }
            Self::Function(data) => out.extend(data.args.iter()),
            Self::Collection(data) => {
                out.push(&data.source);
                out.extend(data.args.iter());
            }
        }
        out
    }

    /// Binding strength of this node when printed
    pub fn precedence(&self) -> super::operator::Precedence {
        use super::operator::Precedence;
        match self {
            Self::Literal(LiteralValue::Integer(i)) if *i < 0 => Precedence::Unary,
            Self::Literal(_)
            | Self::Variable(_)
            | Self::Parameter(_)
            | Self::Array(_)
            | Self::Function(_)
            | Self::Pipe(_) => Precedence::Primary,
            Self::Member { .. } | Self::At { .. } | Self::Collection(_) => Precedence::Postfix,
            Self::Unary { .. } => Precedence::Unary,
            Self::Binary(data) => data.op.precedence(),
            Self::And(_) => Precedence::And,
            Self::Or(_) => Precedence::Or,
            Self::Conditional(_) => Precedence::Conditional,
            Self::Lambda(_) => Precedence::Lowest,
        }
    }
}
