use cm_core::{Dbscan, PipelineConfig, RawEmbedding, Record, fill_noise, l2_normalize, run};
use cm_core::Family;
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

const DIM: usize = 384;

fn random_unit_vectors(n: usize, rng: &mut SmallRng) -> Vec<Vec<f64>> {
    (0..n)
        .map(|_| {
            let mut v: Vec<f64> = (0..DIM).map(|_| rng.random_range(-1.0..1.0)).collect();
            l2_normalize(&mut v);
            v
        })
        .collect()
}

fn bench_dbscan(c: &mut Criterion) {
    let mut group = c.benchmark_group("dbscan_fit");
    let dbscan = Dbscan::new(0.9, 1).unwrap();
    for n in [50, 150, 300] {
        let mut rng = SmallRng::seed_from_u64(7);
        let points = random_unit_vectors(n, &mut rng);
        group.bench_with_input(BenchmarkId::from_parameter(n), &points, |b, points| {
            b.iter(|| fill_noise(dbscan.fit(black_box(points)), points.len()))
        });
    }
    group.finish();
}

fn bench_pipeline(c: &mut Criterion) {
    let mut rng = SmallRng::seed_from_u64(11);
    let records: Vec<Record> = (0..150)
        .map(|i| {
            let mut record = Record::new(format!("r{i}"));
            for family in Family::ALL {
                let v = random_unit_vectors(1, &mut rng).remove(0);
                record = record
                    .with_text(family, format!("{family} {i}"))
                    .with_embedding(family, RawEmbedding::from_vec(v));
            }
            record
        })
        .collect();
    let config = PipelineConfig::default();

    c.bench_function("pipeline_150_records", |b| {
        b.iter(|| run(black_box(&records), &config).unwrap())
    });
}

criterion_group!(benches, bench_dbscan, bench_pipeline);
criterion_main!(benches);
