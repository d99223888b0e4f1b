use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use myorm::qb::{self, Direction, SqlQb};
use myorm::{Match, escape_id};

/// SELECT col0, col1, ... FROM t WHERE col0 = ? AND col1 = ? ...
fn build_select(n: usize) -> qb::SelectQb {
    let cols: Vec<String> = (0..n).map(|i| format!("col{i}")).collect();
    let mut q = qb::select("t").fields(&cols);
    for (i, col) in cols.iter().enumerate() {
        q = q.where_match(col, i as i64);
    }
    q.order("col0", Direction::Asc).offset(10)
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("sql_builder/build");

    for n in [1, 5, 10, 50, 100] {
        let q = build_select(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &q, |b, q| {
            b.iter(|| black_box(q.build()));
        });
    }

    group.finish();
}

fn bench_construct_and_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("sql_builder/construct_and_build");

    for n in [1, 5, 10, 50, 100] {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter(|| black_box(build_select(n).build()));
        });
    }

    group.finish();
}

fn bench_in_list(c: &mut Criterion) {
    let mut group = c.benchmark_group("sql_builder/in_list");

    for n in [5, 20, 100, 500] {
        let values: Vec<i64> = (0..n).collect();
        group.bench_with_input(BenchmarkId::from_parameter(n), &values, |b, values| {
            b.iter(|| {
                let q = qb::select("t").where_match("id", Match::in_list(values.iter().copied()));
                black_box(q.build());
            });
        });
    }

    group.finish();
}

fn bench_escape_id(c: &mut Criterion) {
    c.bench_function("sql_builder/escape_id", |b| {
        b.iter(|| {
            black_box(escape_id(black_box("app.users")));
            black_box(escape_id(black_box("weird`name")));
            black_box(escape_id(black_box("t1.*")));
        });
    });
}

criterion_group!(
    benches,
    bench_build,
    bench_construct_and_build,
    bench_in_list,
    bench_escape_id
);
criterion_main!(benches);
