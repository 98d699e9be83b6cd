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

//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::sync::Arc;
use unit_query::{
    InstallableUnit, Parameters, QueryEngine, QueryResult, Queryable, UnitCollection, Value, Version,
    VersionRange,
};

/// Unit with no requirements
pub fn unit(id: &str, version_text: &str) -> InstallableUnit {
    InstallableUnit::builder(id, version(version_text)).build()
}

/// Parse a version literal
pub fn version(text: &str) -> Version {
    Version::parse(text).unwrap()
}

/// Unit requiring each of `requires` in any version
pub fn unit_requiring(id: &str, version_text: &str, requires: &[&str]) -> InstallableUnit {
    requires
        .iter()
        .fold(InstallableUnit::builder(id, version(version_text)), |builder, required| {
            builder.requires_unit(required, VersionRange::any())
        })
        .build()
}

/// A small repository with a requirement cycle and several versions
///
/// `a` and `b` require each other, `c` requires `d`, and `x` exists in
/// two versions. Every unit provides a `java.package` capability.
pub fn repository() -> UnitCollection {
    UnitCollection::new(vec![
        unit_requiring("a", "1.0", &["b"]),
        unit_requiring("b", "1.0", &["a"]),
        unit_requiring("c", "1.0", &["d"]),
        unit("d", "1.0"),
        InstallableUnit::builder("x", version("1.0"))
            .provides("java.package", "org.x", version("1.0"))
            .build(),
        InstallableUnit::builder("x", version("2.0"))
            .provides("java.package", "org.x", version("2.0"))
            .build(),
        InstallableUnit::builder("y", version("1.0"))
            .provides("java.package", "org.y", version("1.0"))
            .property("category", "tools")
            .build(),
    ])
}

/// A larger generated repository; unit `n` requires unit `n / 2`
pub fn generated(size: u32) -> UnitCollection {
    (0..size)
        .map(|i| {
            let builder = InstallableUnit::builder(format!("bundle.{i}"), Version::new(1, i % 7, 0))
                .provides("java.package", &format!("org.acme.p{}", i % 13), Version::new(1, i % 3, 0));
            if i == 0 {
                builder.build()
            } else {
                builder.requires_unit(&format!("bundle.{}", i / 2), VersionRange::any()).build()
            }
        })
        .collect()
}

/// `id/version` labels, in result order
pub fn labels(result: &QueryResult) -> Vec<String> {
    result
        .to_vec()
        .unwrap()
        .iter()
        .map(|value| {
            let unit = value.as_unit().expect("result element is a unit");
            format!("{}/{}", unit.id(), unit.version())
        })
        .collect()
}

/// Positional parameters
pub fn params(values: Vec<Value>) -> Parameters {
    Parameters::positional(values)
}

/// Run a context query against `queryable`
pub fn context(queryable: &dyn Queryable, text: &str, parameters: Parameters) -> QueryResult {
    let query = QueryEngine::new().context_query(text, parameters).unwrap();
    queryable.query(&query, None).unwrap()
}

/// Run a predicate against `queryable`
pub fn matching(queryable: &dyn Queryable, text: &str, parameters: Parameters) -> QueryResult {
    let query = QueryEngine::new().match_query(text, parameters).unwrap();
    queryable.query(&query, None).unwrap()
}

/// Shared handle for composing queryables
pub fn shared(collection: UnitCollection) -> Arc<dyn Queryable> {
    Arc::new(collection)
}
