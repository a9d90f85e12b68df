use cohort_sim::seeding::{seed_synthetic_cell, SyntheticCellSpec};
use cohort_sim::{CohortMerger, GridCellCohorts, MergeRng};
use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use rand::{rngs::SmallRng, SeedableRng};

fn synthetic_cell(cohorts_per_group: usize, duplicate_fraction: f64) -> GridCellCohorts {
    let spec = SyntheticCellSpec {
        functional_groups: 4,
        cohorts_per_group,
        duplicate_fraction,
        ..SyntheticCellSpec::default()
    };
    let mut rng = SmallRng::seed_from_u64(cohorts_per_group as u64);
    let mut next_id = 0;
    seed_synthetic_cell(&spec, &mut rng, &mut next_id)
}

fn bench_reduce_to_target(c: &mut Criterion) {
    let mut group = c.benchmark_group("reduce_to_target");

    for size in [16usize, 32, 64, 128, 256] {
        group.bench_with_input(BenchmarkId::new("cohorts_per_group", size), &size, |b, &size| {
            b.iter_batched(
                || synthetic_cell(size, 0.0),
                |mut cohorts| {
                    let totals = cohorts.live_cohort_counts();
                    let targets = vec![size / 2; totals.len()];
                    CohortMerger::new(MergeRng::seeded(4000))
                        .reduce_to_target(&mut cohorts, &totals, &targets)
                        .expect("synthetic cohorts are valid")
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

fn bench_merge_exact_duplicates(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge_exact_duplicates");

    for size in [16usize, 64, 256] {
        group.bench_with_input(BenchmarkId::new("cohorts_per_group", size), &size, |b, &size| {
            b.iter_batched(
                || synthetic_cell(size, 0.5),
                |mut cohorts| {
                    CohortMerger::new(MergeRng::seeded(4000))
                        .merge_exact_duplicates(&mut cohorts)
                        .expect("synthetic cohorts are valid")
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

criterion_group!(merge_benches, bench_reduce_to_target, bench_merge_exact_duplicates);
criterion_main!(merge_benches);
