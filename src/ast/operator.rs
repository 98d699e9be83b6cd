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

//! Operator, collection-operator and function kinds

use std::fmt;

/// Binding strength of an expression form (higher binds tighter)
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
    /// Lambdas and anything that must stand alone
    Lowest = 0,
    /// `c ? a : b` (right associative)
    Conditional = 1,
    /// `||`
    Or = 2,
    /// `&&`
    And = 3,
    /// `==`, `!=`, `~=`
    Equality = 4,
    /// `<`, `<=`, `>`, `>=`
    Relational = 5,
    /// `+`, `-`
    Additive = 6,
    /// `*`, `/`, `%`
    Multiplicative = 7,
    /// `!`, unary `-`
    Unary = 8,
    /// `.member`, `[key]`, `.op(...)`
    Postfix = 9,
    /// Literals, variables, calls, parenthesized groups
    Primary = 10,
}

impl Precedence {
    /// The next tighter level, used for left-associative operands
    pub const fn next_level(self) -> Self {
        match self {
            Self::Lowest => Self::Conditional,
            Self::Conditional => Self::Or,
            Self::Or => Self::And,
            Self::And => Self::Equality,
            Self::Equality => Self::Relational,
            Self::Relational => Self::Additive,
            Self::Additive => Self::Multiplicative,
            Self::Multiplicative => Self::Unary,
            Self::Unary => Self::Postfix,
            Self::Postfix | Self::Primary => Self::Primary,
        }
    }
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    /// `+`
    Add,
    /// `-`
    Subtract,
    /// `*`
    Multiply,
    /// `/`
    Divide,
    /// `%`
    Modulo,
    /// `==`
    Equal,
    /// `!=`
    NotEqual,
    /// `<`
    Less,
    /// `<=`
    LessOrEqual,
    /// `>`
    Greater,
    /// `>=`
    GreaterOrEqual,
    /// `~=`: instanceof, regex match, satisfies or range inclusion
    Matches,
}

impl BinaryOperator {
    /// Source symbol
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::Modulo => "%",
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::Less => "<",
            Self::LessOrEqual => "<=",
            Self::Greater => ">",
            Self::GreaterOrEqual => ">=",
            Self::Matches => "~=",
        }
    }

    /// Binding strength
    pub fn precedence(&self) -> Precedence {
        match self {
            Self::Multiply | Self::Divide | Self::Modulo => Precedence::Multiplicative,
            Self::Add | Self::Subtract => Precedence::Additive,
            Self::Less | Self::LessOrEqual | Self::Greater | Self::GreaterOrEqual => {
                Precedence::Relational
            }
            Self::Equal | Self::NotEqual | Self::Matches => Precedence::Equality,
        }
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOperator {
    /// `!`
    Not,
    /// `-`
    Negate,
}

impl UnaryOperator {
    /// Source symbol
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Not => "!",
            Self::Negate => "-",
        }
    }
}

/// Operators invoked as `source.op(args)` over a collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionOperator {
    /// Keep elements for which the lambda is true
    Select,
    /// Drop elements for which the lambda is true
    Reject,
    /// Map each element through the lambda
    Collect,
    /// True if any element satisfies the lambda
    Exists,
    /// True if every element satisfies the lambda
    All,
    /// First element satisfying the lambda, or `null`
    First,
    /// Concatenate nested collections
    Flatten,
    /// Highest version per id
    Latest,
    /// At most `n` elements
    Limit,
    /// Drop repeated elements, optionally against a shared set
    Unique,
    /// Breadth-first closure under the lambda
    Traverse,
}

impl CollectionOperator {
    /// Every collection operator
    pub const ALL: [CollectionOperator; 11] = [
        Self::Select,
        Self::Reject,
        Self::Collect,
        Self::Exists,
        Self::All,
        Self::First,
        Self::Flatten,
        Self::Latest,
        Self::Limit,
        Self::Unique,
        Self::Traverse,
    ];

    /// Name as written after the dot
    pub fn name(&self) -> &'static str {
        match self {
            Self::Select => "select",
            Self::Reject => "reject",
            Self::Collect => "collect",
            Self::Exists => "exists",
            Self::All => "all",
            Self::First => "first",
            Self::Flatten => "flatten",
            Self::Latest => "latest",
            Self::Limit => "limit",
            Self::Unique => "unique",
            Self::Traverse => "traverse",
        }
    }

    /// Look up an operator by name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.name() == name)
    }
}

impl fmt::Display for CollectionOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Built-in constructor functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Function {
    /// `version(s)`
    Version,
    /// `range(s)`
    Range,
    /// `class(name)`
    Class,
    /// `set(e...)`
    Set,
    /// `requirement(namespace, name[, range])`
    Requirement,
    /// `capability(namespace, name, version)`
    Capability,
}

impl Function {
    /// Every function
    pub const ALL: [Function; 6] = [
        Self::Version,
        Self::Range,
        Self::Class,
        Self::Set,
        Self::Requirement,
        Self::Capability,
    ];

    /// Name as written in calls
    pub fn name(&self) -> &'static str {
        match self {
            Self::Version => "version",
            Self::Range => "range",
            Self::Class => "class",
            Self::Set => "set",
            Self::Requirement => "requirement",
            Self::Capability => "capability",
        }
    }

    /// Accepted argument counts, inclusive; `None` means unbounded
    pub fn arity(&self) -> (usize, Option<usize>) {
        match self {
            Self::Version | Self::Range | Self::Class => (1, Some(1)),
            Self::Set => (0, None),
            Self::Requirement => (2, Some(3)),
            Self::Capability => (3, Some(3)),
        }
    }

    /// Look up a function by name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
