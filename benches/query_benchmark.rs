use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use unit_query::parser::tokenizer::Tokenizer;
use unit_query::{
    EngineConfig, InstallableUnit, Parameters, QueryEngine, Queryable, UnitCollection, Value, Version,
    VersionRange, parse_query,
};

fn collection(size: u32) -> UnitCollection {
    (0..size)
        .map(|i| {
            let builder = InstallableUnit::builder(format!("bundle.{i}"), Version::new(1, i % 10, 0))
                .provides("java.package", &format!("org.acme.p{}", i % 100), Version::new(1, 0, 0));
            if i > 0 {
                builder
                    .requires_unit(&format!("bundle.{}", i / 2), VersionRange::any())
                    .build()
            } else {
                builder.build()
            }
        })
        .collect()
}

fn benchmark_parser(c: &mut Criterion) {
    let expression = "everything.select(x | x.id == $0 && x.version >= '1.2').traverse(u | everything.select(r | u.requirements.exists(q | r ~= q))).limit(10)";

    c.bench_function("parser", |b| b.iter(|| black_box(parse_query(black_box(expression)))));

    c.bench_function("tokenizer_complete", |b| {
        b.iter(|| {
            let mut tokenizer = Tokenizer::new(black_box(expression));
            black_box(tokenizer.tokenize_all())
        })
    });
}

fn benchmark_id_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("id_lookup");
    for size in [1_000u32, 10_000] {
        let units = collection(size);
        let target = format!("bundle.{}", size / 3);
        for (label, config) in [("indexed", EngineConfig::default()), ("unindexed", EngineConfig::unindexed())] {
            let engine = QueryEngine::with_config(config);
            let query = engine
                .match_query("id == $0", Parameters::positional(vec![Value::from(target.as_str())]))
                .unwrap();
            group.bench_with_input(BenchmarkId::new(label, size), &units, |b, units| {
                b.iter(|| black_box(units.query(&query, None).unwrap().len().unwrap()))
            });
        }
    }
    group.finish();
}

fn benchmark_traverse(c: &mut Criterion) {
    let units = collection(2_000);
    let engine = QueryEngine::new();
    let query = engine
        .context_query(
            "everything.select(x | x.id == $0).traverse({cache = set(), u | everything.select(r | u.requirements.exists(q | r ~= q)).unique(cache)})",
            Parameters::positional(vec![Value::from("bundle.1999")]),
        )
        .unwrap();

    c.bench_function("traverse_requirements", |b| {
        b.iter(|| black_box(units.query(&query, None).unwrap().len().unwrap()))
    });
}

criterion_group!(benches, benchmark_parser, benchmark_id_lookup, benchmark_traverse);
criterion_main!(benches);
