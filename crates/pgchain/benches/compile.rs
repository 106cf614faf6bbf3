use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use pgchain::{Query, Record, raw, sq, sql};

/// select * from t where col0 = $1 and col1 = $2 ... order by col0 limit $n
fn build_select(n: usize) -> Query {
    let row: Record = (0..n).map(|i| (format!("col{i}"), i as i64)).collect();
    sq().from("t").filter(row).order_by("col0").limit(10)
}

/// An update whose where clause embeds a sub-query with `n` conditions.
fn build_update_with_subquery(n: usize) -> Query {
    let mut sub = sq().from("s").select("id");
    for i in 0..n {
        sub = sub.filter(sql("v > ?").bind(i as i64));
    }
    sq().from("t")
        .set(Record::new().set("touched", raw("now()")))
        .filter(sql("id in ?").bind(sub))
}

fn bench_compile_select(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile/select");

    for n in [1, 5, 10, 50, 100] {
        let q = build_select(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &q, |b, q| {
            b.iter(|| black_box(q.compile()));
        });
    }

    group.finish();
}

fn bench_build_and_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile/build_and_compile");

    for n in [1, 5, 10, 50] {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter(|| black_box(build_update_with_subquery(n).compile()));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_compile_select, bench_build_and_compile);
criterion_main!(benches);
