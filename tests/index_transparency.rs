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

//! Index use never changes query results

mod common;

use common::{generated, repository, shared};
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::sync::Arc;
use unit_query::index::{ID_MEMBER, IndexProvider};
use unit_query::{
    CompoundQueryable, EngineConfig, NullMonitor, Parameters, Query, QueryEngine, QueryError, QueryInput,
    Queryable, UnitCollection, Value,
};

fn outcome(queryable: &dyn Queryable, query: &dyn Query) -> Result<Vec<Value>, QueryError> {
    queryable.query(query, None)?.to_vec()
}

fn scanned(queryable: &dyn Queryable, query: &dyn Query) -> Result<Vec<Value>, QueryError> {
    let input = QueryInput::Values(queryable.query_input().values());
    query.perform(input, Arc::new(NullMonitor))?.to_vec()
}

fn assert_transparent(units: &dyn Queryable, text: &str, predicate: bool, parameters: Parameters) {
    let indexed = QueryEngine::with_config(EngineConfig::default());
    let unindexed = QueryEngine::with_config(EngineConfig::unindexed());
    let (with_index, without_index): (Box<dyn Query>, Box<dyn Query>) = if predicate {
        (
            Box::new(indexed.match_query(text, parameters.clone()).unwrap()),
            Box::new(unindexed.match_query(text, parameters).unwrap()),
        )
    } else {
        (
            Box::new(indexed.context_query(text, parameters.clone()).unwrap()),
            Box::new(unindexed.context_query(text, parameters).unwrap()),
        )
    };
    let expected = outcome(units, without_index.as_ref());
    assert_eq!(outcome(units, with_index.as_ref()), expected, "{text}");
    assert_eq!(scanned(units, with_index.as_ref()), expected, "{text}");
}

#[rstest]
#[case("id == 'bundle.42'")]
#[case("'bundle.42' == id")]
#[case("id == 'missing'")]
#[case("id == $0")]
#[case("id == 'bundle.7' || id == 'bundle.9' || id == 'bundle.7'")]
#[case("id == 'bundle.8' && version >= '1.3'")]
#[case("id == 'bundle.8' && version >= 3")]
#[case("item ~= requirement('java.package', 'org.acme.p4', '[1.1,2.0)')")]
#[case("item ~= requirement('java.package', 'org.acme.p4')")]
#[case("item ~= capability('java.package', 'org.acme.p4', version('1.2'))")]
#[case("item ~= $0 || id == 'bundle.3'")]
#[case("item ~= class('InstallableUnit')")]
#[case("item ~= 'bundle.1*'")]
#[case("id == null")]
#[case("id == 42")]
fn test_predicates_are_transparent(#[case] text: &str) {
    let units = generated(300);
    let parameter = Value::from(unit_query::Requirement::unit(
        "bundle.11",
        unit_query::VersionRange::any(),
    ));
    let parameters = Parameters::positional(vec![
        if text.contains("item ~= $0") { parameter } else { Value::from("bundle.100") },
    ]);
    assert_transparent(&units, text, true, parameters);
}

#[rstest]
#[case("everything.select(x | x.id == 'bundle.5')")]
#[case("everything.reject(x | x.id == 'bundle.5').limit(5)")]
#[case("everything.first(x | x.id == 'bundle.12')")]
#[case("everything.exists(x | x.id == 'nope')")]
#[case("everything.select(x | x.id == 'bundle.40').traverse(u | everything.select(r | u.requirements.exists(q | r ~= q)))")]
#[case("everything.select(x | x ~= requirement('java.package', 'org.acme.p2')).latest()")]
#[case("pipe(everything.select(x | x.id == 'bundle.2' || x.id == 'bundle.3'), everything.select(x | x.id == 'bundle.3'))")]
fn test_context_queries_are_transparent(#[case] text: &str) {
    assert_transparent(&generated(300), text, false, Parameters::new());
}

#[test]
fn test_compound_queryable_is_transparent() {
    let mixed = CompoundQueryable::new(vec![shared(repository()), shared(generated(50))]);
    for text in ["id == 'x'", "id == 'bundle.3' || id == 'a'", "item ~= requirement('java.package', 'org.x')"] {
        assert_transparent(&mixed, text, true, Parameters::new());
    }
}

struct Unindexed(Vec<Value>);

impl Queryable for Unindexed {
    fn query_input(&self) -> QueryInput {
        QueryInput::from_values(self.0.clone())
    }

    fn contains(&self, element: &Value) -> bool {
        self.0.contains(element)
    }
}

#[test]
fn test_partially_indexed_compound_is_transparent() {
    let plain = Unindexed(repository().everything().to_vec());
    let mixed = CompoundQueryable::new(vec![shared(generated(50)), Arc::new(plain)]);
    assert!(matches!(mixed.query_input(), QueryInput::Indexed(_)));
    for text in ["id == 'x'", "id == 'bundle.3' || id == 'a'", "item ~= requirement('java.package', 'org.x')"] {
        assert_transparent(&mixed, text, true, Parameters::new());
    }
}

#[test]
fn test_index_candidates_are_a_superset() {
    let units: UnitCollection = generated(100);
    let index = units.index(ID_MEMBER).unwrap();
    let everything = units.everything();
    let candidates = index.lookup(&Value::from("bundle.9")).unwrap();
    assert!(candidates
        .iter()
        .all(|&p| everything[p].as_unit().is_some_and(|unit| unit.id() == "bundle.9")));
    assert_eq!(candidates.len(), 1);
}
