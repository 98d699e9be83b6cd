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

//! Canonical textual form of expression trees
//!
//! The output parses back to a structurally equal tree: operands are wrapped
//! in parentheses only when their precedence is lower than the position
//! requires.

use super::expression::*;
use super::operator::Precedence;
use std::fmt::{self, Display, Formatter, Write};

impl Display for ExpressionNode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(value) => value.fmt(f),
            Self::Variable(name) => f.write_str(name),
            Self::Parameter(parameter) => parameter.fmt(f),
            Self::Member { target, name } => {
                operand(f, target, Precedence::Postfix)?;
                write!(f, ".{name}")
            }
            Self::At { target, key } => {
                operand(f, target, Precedence::Postfix)?;
                write!(f, "[{key}]")
            }
            Self::Array(items) => {
                f.write_char('[')?;
                list(f, items)?;
                f.write_char(']')
            }
            Self::Unary { op, operand: inner } => {
                f.write_str(op.symbol())?;
                operand(f, inner, Precedence::Unary)
            }
            Self::Binary(data) => {
                let precedence = data.op.precedence();
                operand(f, &data.left, precedence)?;
                write!(f, " {} ", data.op)?;
                operand(f, &data.right, precedence.next_level())
            }
            Self::And(operands) => junction(f, operands, " && ", Precedence::And),
            Self::Or(operands) => junction(f, operands, " || ", Precedence::Or),
            Self::Conditional(data) => {
                operand(f, &data.condition, Precedence::Or)?;
                f.write_str(" ? ")?;
                operand(f, &data.then_expr, Precedence::Conditional)?;
                f.write_str(" : ")?;
                operand(f, &data.else_expr, Precedence::Conditional)
            }
            Self::Lambda(data) => {
                if data.assignments.is_empty() {
                    return write!(f, "{} | {}", data.variable, data.body);
                }
                f.write_char('{')?;
                for assignment in &data.assignments {
                    write!(f, "{} = ", assignment.variable)?;
                    operand(f, &assignment.value, Precedence::Conditional)?;
                    f.write_str(", ")?;
                }
                write!(f, "{} | {}}}", data.variable, data.body)
            }
            Self::Function(data) => {
                write!(f, "{}(", data.function)?;
                list(f, &data.args)?;
                f.write_char(')')
            }
            Self::Collection(data) => {
                operand(f, &data.source, Precedence::Postfix)?;
                write!(f, ".{}(", data.op)?;
                list(f, &data.args)?;
                f.write_char(')')
            }
            Self::Pipe(stages) => {
                f.write_str("pipe(")?;
                list(f, stages)?;
                f.write_char(')')
            }
        }
    }
}

impl Display for LiteralValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::String(s) => {
                f.write_char('\'')?;
                for c in s.chars() {
                    match c {
                        '\'' => f.write_str("\\'")?,
                        '\\' => f.write_str("\\\\")?,
                        '\n' => f.write_str("\\n")?,
                        '\t' => f.write_str("\\t")?,
                        '\r' => f.write_str("\\r")?,
                        other => f.write_char(other)?,
                    }
                }
                f.write_char('\'')
            }
            Self::Pattern(pattern) => {
                f.write_char('/')?;
                for c in pattern.as_str().chars() {
                    if c == '/' {
                        f.write_char('\\')?;
                    }
                    f.write_char(c)?;
                }
                f.write_char('/')
            }
        }
    }
}

fn operand(f: &mut Formatter<'_>, expr: &Expression, minimum: Precedence) -> fmt::Result {
    if expr.precedence() < minimum {
        write!(f, "({expr})")
    } else {
        write!(f, "{expr}")
    }
}

fn list(f: &mut Formatter<'_>, items: &[Expression]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        if item.is_lambda() {
            write!(f, "{item}")?;
        } else {
            operand(f, item, Precedence::Conditional)?;
        }
    }
    Ok(())
}

fn junction(
    f: &mut Formatter<'_>,
    operands: &[Expression],
    separator: &str,
    precedence: Precedence,
) -> fmt::Result {
    for (i, item) in operands.iter().enumerate() {
        if i > 0 {
            f.write_str(separator)?;
        }
        operand(f, item, precedence.next_level())?;
    }
    Ok(())
}
