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

//! Composition of queries and the result contract

mod common;

use common::{labels, repository, shared, unit};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use unit_query::model::ValueType;
use unit_query::{
    CompoundQuery, CompoundQueryable, LimitQuery, NullMonitor, Parameters, PipedQuery, Query, QueryEngine,
    QueryInput, Queryable, UnitCollection, Value,
};

fn context(text: &str) -> Arc<dyn Query> {
    Arc::new(QueryEngine::new().context_query(text, Parameters::new()).unwrap())
}

fn predicate(text: &str) -> Arc<dyn Query> {
    Arc::new(QueryEngine::new().match_query(text, Parameters::new()).unwrap())
}

fn numbers() -> QueryInput {
    QueryInput::from_values((1..=4).map(Value::Integer).collect())
}

fn integers(query: &Arc<dyn Query>) -> Vec<i64> {
    query
        .perform(numbers(), Arc::new(NullMonitor))
        .unwrap()
        .to_vec()
        .unwrap()
        .iter()
        .filter_map(Value::as_integer)
        .collect()
}

#[test]
fn test_compound_context_queries() {
    let first = || context("everything.select(x | x <= 3)");
    let second = || context("everything.select(x | x >= 2)");

    assert_eq!(integers(&CompoundQuery::create(vec![first(), second()], true)), vec![2, 3]);
    assert_eq!(integers(&CompoundQuery::create(vec![first(), second()], false)), vec![1, 2, 3, 4]);
}

#[test]
fn test_mixed_match_and_context_queries() {
    let units = repository();
    let query = CompoundQuery::create(vec![predicate("id == 'x'"), context("everything.latest()")], true);
    assert!(Arc::clone(&query).into_match().is_none());
    assert_eq!(labels(&units.query(query.as_ref(), None).unwrap()), vec!["x/2.0.0"]);
}

#[test]
fn test_compound_match_queries_over_units() {
    let units = repository();
    let query = CompoundQuery::create(vec![predicate("id == 'x'"), predicate("version >= '2.0'")], false);
    let matcher = Arc::clone(&query).into_match().unwrap();
    assert!(matcher.is_match(&Value::from(unit("d", "3.0"))).unwrap());
    assert!(!matcher.is_match(&Value::from(unit("d", "1.0"))).unwrap());
    assert_eq!(
        labels(&units.query(query.as_ref(), None).unwrap()),
        vec!["x/1.0.0", "x/2.0.0"]
    );
}

#[test]
fn test_piped_and_limited_queries() {
    let units = repository();
    let piped = PipedQuery::create(vec![predicate("id == 'x' || id == 'y'"), context("everything.latest()")]);
    assert_eq!(labels(&units.query(piped.as_ref(), None).unwrap()), vec!["x/2.0.0", "y/1.0.0"]);

    let limited = LimitQuery::create(piped, 1);
    assert_eq!(labels(&units.query(limited.as_ref(), None).unwrap()), vec!["x/2.0.0"]);
}

#[test]
fn test_compound_queryable_spans_collections() {
    let left = UnitCollection::new(vec![unit("a", "1.0"), unit("b", "1.0")]);
    let right = UnitCollection::new(vec![unit("a", "2.0"), unit("c", "1.0")]);
    let both = CompoundQueryable::new(vec![shared(left), shared(right)]);

    let query = QueryEngine::new().match_query("id == 'a'", Parameters::new()).unwrap();
    assert_eq!(labels(&both.query(&query, None).unwrap()), vec!["a/1.0.0", "a/2.0.0"]);

    let latest = QueryEngine::new().context_query("everything.latest()", Parameters::new()).unwrap();
    assert_eq!(
        labels(&both.query(&latest, None).unwrap()),
        vec!["a/2.0.0", "b/1.0.0", "c/1.0.0"]
    );
    assert!(both.contains(&Value::from(unit("c", "1.0"))));
}

#[test]
fn test_result_contract() {
    let units = repository();
    let query = QueryEngine::new().match_query("id == 'x'", Parameters::new()).unwrap();
    let result = units.query(&query, None).unwrap();

    assert!(!result.is_empty().unwrap());
    assert_eq!(result.len().unwrap(), 2);
    assert_eq!(result.to_array(ValueType::InstallableUnit).unwrap().len(), 2);
    assert!(result.to_array(ValueType::String).is_err());

    let mut copy = result.to_set().unwrap();
    copy.clear();
    assert_eq!(result.to_set().unwrap().len(), 2);

    let shared_set = result.to_unmodifiable_set().unwrap();
    assert!(Arc::ptr_eq(&shared_set, &result.to_unmodifiable_set().unwrap()));

    let streamed: Vec<Value> = result.stream().collect::<Result<_, _>>().unwrap();
    assert_eq!(streamed, result.to_vec().unwrap());
}
