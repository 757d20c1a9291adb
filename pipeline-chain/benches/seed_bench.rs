//! Benchmarks for seed graph construction.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use pipeline_chain::core::{Pipeline, ProjectId};
use pipeline_chain::processor::{JobAttributes, StageAttributes};
use pipeline_chain::seed::{PipelineSeed, SeedLimits};

/// `stages` stages of `jobs` jobs, each job needing every job of the
/// previous stage.
fn layered(stages: usize, jobs: usize) -> Vec<StageAttributes> {
    (0..stages)
        .map(|stage| {
            let builds = (0..jobs)
                .map(|job| {
                    let mut attrs = JobAttributes::new(format!("job-{stage}-{job}"));
                    if stage > 0 {
                        for dep in 0..jobs {
                            attrs = attrs.needs(format!("job-{}-{dep}", stage - 1).as_str());
                        }
                    }
                    attrs
                })
                .collect();
            StageAttributes::new(format!("stage-{stage}"), builds)
        })
        .collect()
}

fn seed_benchmark(c: &mut Criterion) {
    let pipeline = Pipeline::new(ProjectId(1), "main");
    let limits = SeedLimits::default();
    let mut group = c.benchmark_group("pipeline_seed");

    for (stages, jobs) in [(3, 5), (10, 10), (20, 25)] {
        let attributes = layered(stages, jobs);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{stages}x{jobs}")),
            &attributes,
            |b, attributes| b.iter(|| black_box(PipelineSeed::new(&pipeline, attributes, &limits))),
        );
    }

    group.finish();
}

criterion_group!(benches, seed_benchmark);
criterion_main!(benches);
