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

//! Collection operators
//!
//! `select`, `reject`, `collect`, `flatten`, `limit`, `unique` and `traverse`
//! return lazy sequences: the lambda runs when an element is pulled, never
//! ahead of it. `exists`, `all` and `first` stop at the first deciding
//! element. `latest` has to see the whole input.
//!
//! When the source is `everything` and an index provider is present,
//! `select`, `reject`, `first` and `exists` narrow the scan to the
//! candidates an index returns for the lambda body (see [`narrow`]).

use super::context::EvaluationContext;
use super::engine::evaluate;
use super::error::{EvaluationError, EvaluationResult};
use super::operators::truthy;
use crate::ast::{
    BinaryOperator, CollectionOpData, CollectionOperator, EVERYTHING, Expression, ExpressionNode,
    LambdaData, Visitor, references_variable, walk,
};
use crate::index::{CAPABILITY_MEMBER, ID_MEMBER, IndexProvider};
use crate::model::{Sequence, Value, ValueIter, ValueSet, Version};
use indexmap::IndexMap;
use rustc_hash::{FxBuildHasher, FxHashSet};
use std::collections::VecDeque;
use std::sync::Arc;

/// Stream the elements of a collection value; `null` is empty
pub fn iterate(operation: &str, value: Value) -> EvaluationResult<ValueIter> {
    match value {
        Value::Collection(sequence) => Ok(Box::new(sequence)),
        Value::List(items) => Ok(Box::new(
            (0..items.len()).filter_map(move |i| items.get(i).cloned().map(Ok)),
        )),
        Value::Set(set) => Ok(Box::new(set.snapshot().into_iter().map(Ok))),
        Value::Null => Ok(Box::new(std::iter::empty())),
        other => Err(EvaluationError::type_mismatch(
            operation,
            "Collection",
            other.type_name(),
        )),
    }
}

/// End the stream after the first error
fn stop_after_error<I>(iter: I) -> impl Iterator<Item = EvaluationResult<Value>> + Send
where
    I: Iterator<Item = EvaluationResult<Value>> + Send,
{
    let mut failed = false;
    iter.take_while(move |item| {
        if failed {
            return false;
        }
        failed = item.is_err();
        true
    })
}

fn lazy<I>(iter: I) -> Value
where
    I: Iterator<Item = EvaluationResult<Value>> + Send + 'static,
{
    Value::Collection(Sequence::new(stop_after_error(iter)))
}

/// A lambda ready for application, curried bindings already evaluated
#[derive(Clone)]
struct Lambda {
    variable: String,
    body: Expression,
    ctx: EvaluationContext,
}

impl Lambda {
    /// Evaluate the assignments once, each seeing the ones before it
    fn prepare(data: &LambdaData, ctx: &EvaluationContext) -> EvaluationResult<Self> {
        let mut scope = ctx.clone();
        for assignment in &data.assignments {
            let value = evaluate(&assignment.value, &scope)?;
            scope = scope.with_binding(&assignment.variable, value);
        }
        Ok(Self {
            variable: data.variable.clone(),
            body: Arc::clone(&data.body),
            ctx: scope,
        })
    }

    fn apply(&self, element: Value) -> EvaluationResult<Value> {
        evaluate(&self.body, &self.ctx.with_binding(&self.variable, element))
    }

    fn test(&self, operation: &str, element: &Value) -> EvaluationResult<bool> {
        truthy(operation, &self.apply(element.clone())?)
    }
}

/// Evaluate a collection operator node
pub fn evaluate_collection(
    data: &CollectionOpData,
    ctx: &EvaluationContext,
) -> EvaluationResult<Value> {
    use CollectionOperator::*;

    let op = data.op;
    let name = op.name();

    match op {
        Select | Reject => {
            let (lambda, lambda_data) = prepare_lambda(data, ctx)?;
            let keep = op == Select;
            if let Some((everything, positions)) = indexed_candidates(data, lambda_data, &lambda, ctx) {
                if keep {
                    return Ok(indexed_select(everything, positions, lambda, ctx.clone()));
                }
                return Ok(indexed_reject(everything, positions, lambda, ctx.clone()));
            }
            let source = source(data, ctx)?;
            let ctx = ctx.clone();
            Ok(lazy(source.filter_map(move |item| {
                item.and_then(|element| {
                    ctx.checkpoint()?;
                    Ok((lambda.test(name, &element)? == keep).then_some(element))
                })
                .transpose()
            })))
        }
        Collect => {
            let (lambda, _) = prepare_lambda(data, ctx)?;
            let source = source(data, ctx)?;
            let ctx = ctx.clone();
            Ok(lazy(source.map(move |item| {
                item.and_then(|element| {
                    ctx.checkpoint()?;
                    lambda.apply(element)
                })
            })))
        }
        Exists | First => {
            let (lambda, lambda_data) = prepare_lambda(data, ctx)?;
            let candidates: ValueIter = match indexed_candidates(data, lambda_data, &lambda, ctx) {
                Some((everything, positions)) => Box::new(
                    positions
                        .into_iter()
                        .filter_map(move |p| everything.get(p).cloned().map(Ok)),
                ),
                None => source(data, ctx)?,
            };
            for item in candidates {
                let element = item?;
                ctx.checkpoint()?;
                if lambda.test(name, &element)? {
                    return Ok(if op == Exists {
                        Value::Boolean(true)
                    } else {
                        element
                    });
                }
            }
            Ok(if op == Exists {
                Value::Boolean(false)
            } else {
                Value::Null
            })
        }
        All => {
            let (lambda, _) = prepare_lambda(data, ctx)?;
            for item in source(data, ctx)? {
                let element = item?;
                ctx.checkpoint()?;
                if !lambda.test(name, &element)? {
                    return Ok(Value::Boolean(false));
                }
            }
            Ok(Value::Boolean(true))
        }
        Flatten => {
            let source = source(data, ctx)?;
            let ctx = ctx.clone();
            Ok(lazy(source.flat_map(move |item| -> ValueIter {
                let element = match item.and_then(|element| ctx.checkpoint().map(|_| element)) {
                    Ok(element) => element,
                    Err(e) => return Box::new(std::iter::once(Err(e))),
                };
                if element.is_collection() || element.is_null() {
                    match iterate(name, element) {
                        Ok(inner) => inner,
                        Err(e) => Box::new(std::iter::once(Err(e))),
                    }
                } else {
                    Box::new(std::iter::once(Ok(element)))
                }
            })))
        }
        Latest => latest(source(data, ctx)?, ctx),
        Limit => {
            let count = match data.operand() {
                Some(expr) => evaluate(expr, ctx)?,
                None => Value::Null,
            };
            let limit = match count {
                Value::Integer(n) => usize::try_from(n).map_err(|_| {
                    EvaluationError::invalid_argument(name, format!("limit must not be negative, got {n}"))
                })?,
                other => {
                    return Err(EvaluationError::type_mismatch(name, "Integer", other.type_name()));
                }
            };
            let source = source(data, ctx)?;
            Ok(lazy(source.take(limit)))
        }
        Unique => {
            let cache = cache_operand(data, ctx)?;
            let source = source(data, ctx)?;
            let ctx = ctx.clone();
            Ok(lazy(source.filter_map(move |item| {
                item.and_then(|element| {
                    ctx.checkpoint()?;
                    Ok(cache.insert(element.clone()).then_some(element))
                })
                .transpose()
            })))
        }
        Traverse => {
            let (lambda, _) = prepare_lambda(data, ctx)?;
            let visited = cache_operand(data, ctx)?;
            let roots = source(data, ctx)?;
            Ok(Value::Collection(Sequence::new(Traversal {
                roots: Some(roots),
                expand: VecDeque::new(),
                ready: VecDeque::new(),
                visited,
                lambda,
                ctx: ctx.clone(),
                depth: 0,
                failed: false,
            })))
        }
    }
}

fn source(data: &CollectionOpData, ctx: &EvaluationContext) -> EvaluationResult<ValueIter> {
    iterate(data.op.name(), evaluate(&data.source, ctx)?)
}

fn prepare_lambda<'a>(
    data: &'a CollectionOpData,
    ctx: &EvaluationContext,
) -> EvaluationResult<(Lambda, &'a LambdaData)> {
    let lambda_data = data.lambda().ok_or_else(|| {
        EvaluationError::invalid_argument(data.op.name(), "a lambda argument is required")
    })?;
    Ok((Lambda::prepare(lambda_data, ctx)?, lambda_data))
}

fn cache_operand(data: &CollectionOpData, ctx: &EvaluationContext) -> EvaluationResult<ValueSet> {
    let Some(expr) = data.operand() else {
        return Ok(ValueSet::new());
    };
    match evaluate(expr, ctx)? {
        Value::Set(set) => Ok(set),
        Value::Null => Ok(ValueSet::new()),
        other => Err(EvaluationError::type_mismatch(
            data.op.name(),
            "Set",
            other.type_name(),
        )),
    }
}

#[derive(Debug, Hash, PartialEq, Eq)]
enum LatestKey {
    Unit(String),
    Capability(String, String),
}

fn latest_key(value: &Value) -> EvaluationResult<(LatestKey, &Version)> {
    match value {
        Value::Unit(unit) => Ok((LatestKey::Unit(unit.id().to_string()), unit.version())),
        Value::Capability(capability) => Ok((
            LatestKey::Capability(capability.namespace.clone(), capability.name.clone()),
            &capability.version,
        )),
        other => Err(EvaluationError::type_mismatch(
            "latest",
            "InstallableUnit or ProvidedCapability",
            other.type_name(),
        )),
    }
}

/// Keep the highest version per id; on equal versions the first one seen wins.
/// Output follows the order in which each id first appeared.
fn latest(source: ValueIter, ctx: &EvaluationContext) -> EvaluationResult<Value> {
    let mut best: IndexMap<LatestKey, Value, FxBuildHasher> = IndexMap::default();
    for item in source {
        let element = item?;
        ctx.checkpoint()?;
        let (key, version) = latest_key(&element)?;
        let replace = match best.get(&key) {
            Some(current) => latest_key(current).map(|(_, current)| version > current)?,
            None => true,
        };
        if replace {
            best.insert(key, element.clone());
        }
    }
    Ok(Value::Collection(Sequence::from_values(best.into_values().collect::<Vec<_>>())))
}

/// Lazy breadth-first closure over `lambda`
///
/// Roots are yielded first, then each level of newly discovered elements.
/// Every element is visited once: it enters `visited` when discovered and the
/// lambda runs on it exactly once.
struct Traversal {
    roots: Option<ValueIter>,
    expand: VecDeque<(Value, usize)>,
    ready: VecDeque<Value>,
    visited: ValueSet,
    lambda: Lambda,
    ctx: EvaluationContext,
    depth: usize,
    failed: bool,
}

impl Traversal {
    fn discover(&mut self, element: Value, depth: usize) {
        if self.visited.insert(element.clone()) {
            self.expand.push_back((element.clone(), depth));
            self.ready.push_back(element);
        }
    }

    fn advance(&mut self) -> EvaluationResult<Option<Value>> {
        loop {
            if let Some(element) = self.ready.pop_front() {
                return Ok(Some(element));
            }
            if let Some(roots) = self.roots.as_mut() {
                match roots.next() {
                    Some(root) => {
                        let root = root?;
                        self.ctx.checkpoint()?;
                        self.discover(root, 0);
                        continue;
                    }
                    None => self.roots = None,
                }
            }
            let Some((element, depth)) = self.expand.pop_front() else {
                return Ok(None);
            };
            if depth != self.depth {
                self.depth = depth;
                log::trace!(
                    "traverse reached depth {depth} with {} elements to expand",
                    self.expand.len() + 1
                );
            }
            self.ctx.checkpoint()?;
            let children = match self.lambda.apply(element)? {
                value if value.is_collection() || value.is_null() => iterate("traverse", value)?,
                scalar => Box::new(std::iter::once(Ok(scalar))),
            };
            for child in children {
                self.discover(child?, depth + 1);
            }
        }
    }
}

impl Iterator for Traversal {
    type Item = EvaluationResult<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.advance() {
            Ok(next) => next.map(Ok),
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

fn indexed_select(
    everything: Arc<[Value]>,
    positions: Vec<usize>,
    lambda: Lambda,
    ctx: EvaluationContext,
) -> Value {
    lazy(positions.into_iter().filter_map(move |p| {
        let element = everything.get(p)?.clone();
        ctx.checkpoint()
            .and_then(|_| lambda.test("select", &element))
            .map(|keep| keep.then_some(element))
            .transpose()
    }))
}

/// Elements outside the candidate set cannot match and pass through untested
fn indexed_reject(
    everything: Arc<[Value]>,
    positions: Vec<usize>,
    lambda: Lambda,
    ctx: EvaluationContext,
) -> Value {
    let candidates: FxHashSet<usize> = positions.into_iter().collect();
    lazy((0..everything.len()).filter_map(move |p| {
        let element = everything.get(p)?.clone();
        let result = ctx.checkpoint().and_then(|_| {
            if candidates.contains(&p) {
                lambda.test("reject", &element).map(|matched| !matched)
            } else {
                Ok(true)
            }
        });
        result.map(|keep| keep.then_some(element)).transpose()
    }))
}

/// Candidate positions for a predicate over `everything`, when an index
/// can answer for the lambda body
fn indexed_candidates(
    data: &CollectionOpData,
    lambda_data: &LambdaData,
    lambda: &Lambda,
    ctx: &EvaluationContext,
) -> Option<(Arc<[Value]>, Vec<usize>)> {
    if data.source.as_variable() != Some(EVERYTHING) {
        return None;
    }
    let provider = ctx.index_provider()?;
    match narrow(&lambda_data.body, &lambda_data.variable, provider.as_ref(), &lambda.ctx) {
        Some(positions) => {
            let everything = provider.everything();
            log::trace!(
                "{} narrowed by index to {} of {} elements",
                data.op,
                positions.len(),
                everything.len()
            );
            Some((everything, positions))
        }
        None => {
            log::trace!("{} found no usable index, scanning", data.op);
            None
        }
    }
}

/// Positions that may satisfy `body` with `variable` bound to an element
///
/// Recognized shapes:
/// - `x.id == K` or `K == x.id` through the `id` index
/// - `x ~= K` through the `providedCapabilities` index
/// - a conjunction whose first operand narrows
/// - a disjunction whose every operand narrows (union)
///
/// `K` must not depend on `x`. Every element outside the result makes the
/// body evaluate to `false` without error, so scanning only the result is
/// indistinguishable from a full scan.
fn narrow(
    body: &ExpressionNode,
    variable: &str,
    provider: &dyn IndexProvider,
    ctx: &EvaluationContext,
) -> Option<Vec<usize>> {
    match body {
        ExpressionNode::Binary(data) => match data.op {
            BinaryOperator::Equal => {
                let key = if is_member_of(&data.left, variable, ID_MEMBER) {
                    &data.right
                } else if is_member_of(&data.right, variable, ID_MEMBER) {
                    &data.left
                } else {
                    return None;
                };
                lookup(provider, ID_MEMBER, key, variable, ctx)
            }
            BinaryOperator::Matches if data.left.as_variable() == Some(variable) => {
                lookup(provider, CAPABILITY_MEMBER, &data.right, variable, ctx)
            }
            _ => None,
        },
        ExpressionNode::And(operands) => narrow(operands.first()?, variable, provider, ctx),
        ExpressionNode::Or(operands) => {
            let mut union = Vec::new();
            for operand in operands {
                union.extend(narrow(operand, variable, provider, ctx)?);
            }
            union.sort_unstable();
            union.dedup();
            Some(union)
        }
        _ => None,
    }
}

fn is_member_of(node: &ExpressionNode, variable: &str, member: &str) -> bool {
    matches!(
        node,
        ExpressionNode::Member { target, name }
            if name == member && target.as_variable() == Some(variable)
    )
}

fn lookup(
    provider: &dyn IndexProvider,
    member: &str,
    key: &Expression,
    variable: &str,
    ctx: &EvaluationContext,
) -> Option<Vec<usize>> {
    if references_variable(key, variable) || !is_simple(key) {
        return None;
    }
    let index = provider.index(member)?;
    let key = evaluate(key, ctx).ok()?;
    let mut positions = index.lookup(&key)?;
    positions.sort_unstable();
    positions.dedup();
    Some(positions)
}

/// Key expressions evaluated ahead of the scan must be free of collection
/// operators, whose caches could observe the extra evaluation
struct SimpleKey(bool);

impl Visitor for SimpleKey {
    fn enter(&mut self, node: &ExpressionNode) -> bool {
        if matches!(
            node,
            ExpressionNode::Collection(_) | ExpressionNode::Lambda(_) | ExpressionNode::Pipe(_)
        ) {
            self.0 = false;
        }
        self.0
    }
}

fn is_simple(node: &ExpressionNode) -> bool {
    let mut visitor = SimpleKey(true);
    walk(&mut visitor, node);
    visitor.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::ExpressionFactory;
    use crate::model::InstallableUnit;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const F: ExpressionFactory = ExpressionFactory::new();

    fn ints(values: &[i64]) -> Value {
        Value::list(values.iter().copied().map(Value::Integer).collect())
    }

    fn run(expr: &Expression, ctx: &EvaluationContext) -> Vec<Value> {
        match evaluate(expr, ctx).unwrap() {
            Value::Collection(seq) => seq.collect_values().unwrap(),
            other => panic!("expected a collection, got {other:?}"),
        }
    }

    fn unit(id: &str, major: u32) -> Value {
        Value::from(InstallableUnit::builder(id, Version::new(major, 0, 0)).build())
    }

    #[test]
    fn test_select_is_lazy() {
        let pulled = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&pulled);
        let source = Sequence::new((0..1_000i64).map(move |i| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Value::Integer(i))
        }));
        let ctx = EvaluationContext::empty().with_binding("xs", Value::Collection(source));
        let select = F
            .select(
                F.variable("xs"),
                F.lambda(
                    "x",
                    F.binary(
                        BinaryOperator::Equal,
                        F.binary(BinaryOperator::Modulo, F.variable("x"), F.integer(2)),
                        F.integer(0),
                    ),
                )
                .unwrap(),
            )
            .unwrap();
        let expr = F.limit(select, F.integer(3)).unwrap();
        assert_eq!(run(&expr, &ctx), vec![Value::Integer(0), Value::Integer(2), Value::Integer(4)]);
        assert_eq!(pulled.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn test_first_returns_null_without_match() {
        let ctx = EvaluationContext::empty().with_binding("xs", ints(&[1, 2, 3]));
        let first = |n| {
            F.collection(
                CollectionOperator::First,
                F.variable("xs"),
                vec![F.lambda("x", F.binary(BinaryOperator::Greater, F.variable("x"), F.integer(n))).unwrap()],
            )
            .unwrap()
        };
        assert_eq!(evaluate(&first(1), &ctx).unwrap(), Value::Integer(2));
        assert_eq!(evaluate(&first(9), &ctx).unwrap(), Value::Null);
    }

    #[test]
    fn test_latest_keeps_highest_version_per_id() {
        let units = Value::list(vec![unit("x", 1), unit("x", 2), unit("y", 1)]);
        let ctx = EvaluationContext::empty().with_binding("units", units);
        let expr = F.latest(F.variable("units")).unwrap();
        assert_eq!(run(&expr, &ctx), vec![unit("x", 2), unit("y", 1)]);
    }

    #[test]
    fn test_flatten_preserves_order() {
        let nested = Value::list(vec![ints(&[1, 2]), Value::Null, ints(&[3])]);
        let ctx = EvaluationContext::empty().with_binding("xs", nested);
        let expr = F
            .collection(CollectionOperator::Flatten, F.variable("xs"), vec![])
            .unwrap();
        assert_eq!(run(&expr, &ctx), vec![Value::Integer(1), Value::Integer(2), Value::Integer(3)]);
    }

    #[test]
    fn test_unique_with_shared_cache() {
        let cache = ValueSet::new();
        cache.insert(Value::Integer(1));
        let ctx = EvaluationContext::empty()
            .with_binding("xs", ints(&[1, 2, 2, 3]))
            .with_binding("seen", Value::Set(cache.clone()));
        let expr = F
            .collection(CollectionOperator::Unique, F.variable("xs"), vec![F.variable("seen")])
            .unwrap();
        assert_eq!(run(&expr, &ctx), vec![Value::Integer(2), Value::Integer(3)]);
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_limit_rejects_negative_count() {
        let ctx = EvaluationContext::empty().with_binding("xs", ints(&[1]));
        let expr = F.limit(F.variable("xs"), F.negate(F.integer(1))).unwrap();
        assert!(matches!(
            evaluate(&expr, &ctx),
            Err(EvaluationError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_iterating_a_scalar_is_a_type_mismatch() {
        let ctx = EvaluationContext::empty().with_binding("x", Value::Integer(1));
        let expr = F
            .collection(CollectionOperator::Flatten, F.variable("x"), vec![])
            .unwrap();
        assert!(matches!(
            evaluate(&expr, &ctx),
            Err(EvaluationError::TypeMismatch { .. })
        ));
        let on_null = F
            .collection(CollectionOperator::Flatten, F.null(), vec![])
            .unwrap();
        assert!(run(&on_null, &ctx).is_empty());
    }

    #[test]
    fn test_traverse_visits_each_element_once() {
        // a -> b -> c -> a
        let edges = |id: &str| match id {
            "a" => "b",
            "b" => "c",
            _ => "a",
        };
        let graph: IndexMap<String, Value> = ["a", "b", "c"]
            .iter()
            .map(|id| (id.to_string(), Value::from(edges(id))))
            .collect();
        let ctx = EvaluationContext::empty()
            .with_binding("roots", Value::list(vec![Value::from("a")]))
            .with_binding("graph", Value::Map(Arc::new(graph)));
        let expr = F
            .traverse(
                F.variable("roots"),
                F.lambda("n", F.at(F.variable("graph"), F.variable("n"))).unwrap(),
            )
            .unwrap();
        assert_eq!(
            run(&expr, &ctx),
            vec![Value::from("a"), Value::from("b"), Value::from("c")]
        );
    }

    #[test]
    fn test_select_requires_boolean_predicate() {
        let ctx = EvaluationContext::empty().with_binding("xs", ints(&[1]));
        let expr = F
            .select(F.variable("xs"), F.lambda("x", F.variable("x")).unwrap())
            .unwrap();
        let Value::Collection(seq) = evaluate(&expr, &ctx).unwrap() else {
            panic!("select is lazy");
        };
        assert!(matches!(
            seq.collect_values(),
            Err(EvaluationError::TypeMismatch { .. })
        ));
    }

    struct IdsOnly(Arc<[Value]>);

    struct ById(Arc<[Value]>);

    impl crate::index::Index for ById {
        fn lookup(&self, key: &Value) -> Option<Vec<usize>> {
            let id = key.as_str()?;
            Some(
                self.0
                    .iter()
                    .enumerate()
                    .filter(|(_, v)| v.as_unit().is_some_and(|u| u.id() == id))
                    .map(|(i, _)| i)
                    .collect(),
            )
        }
    }

    impl IndexProvider for IdsOnly {
        fn index(&self, member: &str) -> Option<Arc<dyn crate::index::Index>> {
            (member == ID_MEMBER).then(|| Arc::new(ById(Arc::clone(&self.0))) as Arc<dyn crate::index::Index>)
        }

        fn everything(&self) -> Arc<[Value]> {
            Arc::clone(&self.0)
        }
    }

    #[test]
    fn test_narrow_recognizes_indexable_shapes() {
        let provider = IdsOnly(vec![unit("a", 1), unit("b", 1), unit("a", 2)].into());
        let ctx = EvaluationContext::empty();
        let id_is = |id: &str| F.equals(F.member(F.variable("x"), "id"), F.string(id));

        assert_eq!(narrow(&id_is("a"), "x", &provider, &ctx), Some(vec![0, 2]));

        let reversed = F.equals(F.string("b"), F.member(F.variable("x"), "id"));
        assert_eq!(narrow(&reversed, "x", &provider, &ctx), Some(vec![1]));

        let either = F.or(vec![id_is("b"), id_is("a")]).unwrap();
        assert_eq!(narrow(&either, "x", &provider, &ctx), Some(vec![0, 1, 2]));

        let conj = F
            .and(vec![id_is("a"), F.boolean(true)])
            .unwrap();
        assert_eq!(narrow(&conj, "x", &provider, &ctx), Some(vec![0, 2]));

        // Only the leading conjunct may narrow
        let trailing = F.and(vec![F.boolean(true), id_is("a")]).unwrap();
        assert_eq!(narrow(&trailing, "x", &provider, &ctx), None);

        let dependent = F.equals(F.member(F.variable("x"), "id"), F.member(F.variable("x"), "id"));
        assert_eq!(narrow(&dependent, "x", &provider, &ctx), None);

        let unindexed = F.matches(F.variable("x"), F.string("a*"));
        assert_eq!(narrow(&unindexed, "x", &provider, &ctx), None);
    }

    #[test]
    fn test_key_with_collection_operator_is_not_simple() {
        let with_select = F
            .select(F.everything(), F.lambda("y", F.boolean(true)).unwrap())
            .unwrap();
        assert!(!is_simple(&with_select));
        assert!(is_simple(&F.function("range", vec![F.string("1.0")]).unwrap()));
    }
}
