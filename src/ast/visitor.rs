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

//! Visitor pattern for AST traversal

use super::expression::{EVERYTHING, ExpressionNode, ParameterRef};

/// Trait for visiting AST nodes in pre-order
pub trait Visitor {
    /// Called before a node's children; return `false` to skip them
    fn enter(&mut self, node: &ExpressionNode) -> bool;

    /// Called after a node's children
    fn leave(&mut self, _node: &ExpressionNode) {}
}

/// Walk `node` and its descendants
pub fn walk<V: Visitor + ?Sized>(visitor: &mut V, node: &ExpressionNode) {
    if visitor.enter(node) {
        for child in node.children() {
            walk(visitor, child);
        }
    }
    visitor.leave(node);
}

#[derive(Default)]
struct ParameterCollector {
    found: Vec<ParameterRef>,
}

impl Visitor for ParameterCollector {
    fn enter(&mut self, node: &ExpressionNode) -> bool {
        if let ExpressionNode::Parameter(parameter) = node {
            if !self.found.contains(parameter) {
                self.found.push(parameter.clone());
            }
        }
        true
    }
}

/// Parameters referenced anywhere in `node`, in first-use order
pub fn parameters(node: &ExpressionNode) -> Vec<ParameterRef> {
    let mut collector = ParameterCollector::default();
    walk(&mut collector, node);
    collector.found
}

/// Whether `node` reads the variable `name` as bound in the enclosing scope
///
/// Lambda parameters and curried assignments that reuse `name` shadow it in
/// the lambda body. Pipe stages after the first rebind `everything`.
pub fn references_variable(node: &ExpressionNode, name: &str) -> bool {
    match node {
        ExpressionNode::Variable(variable) => variable == name,
        ExpressionNode::Lambda(data) => {
            if data
                .assignments
                .iter()
                .any(|assignment| references_variable(&assignment.value, name))
            {
                return true;
            }
            let shadowed = data.variable == name
                || data.assignments.iter().any(|a| a.variable == name);
            !shadowed && references_variable(&data.body, name)
        }
        ExpressionNode::Pipe(stages) if name == EVERYTHING => stages
            .first()
            .is_some_and(|stage| references_variable(stage, name)),
        other => other
            .children()
            .into_iter()
            .any(|child| references_variable(child, name)),
    }
}
