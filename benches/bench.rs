use criterion::{Criterion, criterion_group, criterion_main};
use knf_extract::bdd::{DEFAULT_SEED, bdd_analyze};
use knf_extract::extract::config::ExtractorConfig;
use knf_extract::extract::extract;
use knf_extract::knf::formula::Formula;
use knf_extract::knf::literal::Lit;
use std::hint::black_box;
use std::time::Duration;

/// Pairwise AMO over `first..first + n`.
fn pairwise(first: Lit, n: Lit) -> Vec<Vec<Lit>> {
    let vars: Vec<Lit> = (first..first + n).collect();
    let mut clauses = Vec::new();
    for (i, &a) in vars.iter().enumerate() {
        for &b in &vars[i + 1..] {
            clauses.push(vec![-a, -b]);
        }
    }
    clauses
}

/// Sequential-counter AMO over `1..=n` with auxiliaries `n + 1..2n`.
fn sequential(n: Lit) -> Vec<Vec<Lit>> {
    let s = |i: Lit| n + i;
    let mut clauses = vec![vec![-1, s(1)]];
    for i in 2..n {
        clauses.push(vec![-i, s(i)]);
        clauses.push(vec![-s(i - 1), s(i)]);
        clauses.push(vec![-i, -s(i - 1)]);
    }
    clauses.push(vec![-n, -s(n - 1)]);
    clauses
}

/// Many independent pairwise AMO groups of `size` literals.
fn pairwise_groups(groups: Lit, size: Lit) -> Formula {
    Formula::from_clauses((0..groups).flat_map(|g| pairwise(g * size + 1, size)))
}

fn bench_extraction(c: &mut Criterion) {
    let mut group = c.benchmark_group("extraction");
    group.sample_size(50);
    group.measurement_time(Duration::from_secs(10));

    let config = ExtractorConfig::default();

    let formula = pairwise_groups(50, 12);
    group.bench_function("Direct AMO 50x12", |b| {
        b.iter(|| black_box(extract(formula.clone(), &config)));
    });

    let formula = pairwise_groups(200, 4);
    group.bench_function("Direct AMO small 200x4", |b| {
        b.iter(|| black_box(extract(formula.clone(), &config)));
    });

    let formula = Formula::from_clauses(sequential(40));
    group.bench_function("Encoded AMO sequential 40", |b| {
        b.iter(|| black_box(extract(formula.clone(), &config)));
    });

    group.finish();

    let mut group = c.benchmark_group("bdd_analyze");
    group.sample_size(50);

    for n in [8, 16, 32] {
        let clauses = sequential(n);
        let nvar = usize::try_from(2 * n - 1).unwrap_or(0);
        let ndata = usize::try_from(n).unwrap_or(0);
        group.bench_function(format!("sequential {n}"), |b| {
            b.iter(|| black_box(bdd_analyze(nvar, ndata, &clauses, DEFAULT_SEED)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_extraction);

criterion_main!(benches);
