//! Buffered sample writer throughput for several buffer budgets.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use ncraster::store::{ArrayFileMut, MemoryArrayFile};
use ncraster::types::DataType;
use ncraster::variables::{BandStorage, SampleWriter, VariableGroup};
use ndarray::Array3;
use std::hint::black_box;

const BANDS: usize = 3;
const HEIGHT: usize = 360;
const WIDTH: usize = 720;

fn target_file() -> MemoryArrayFile {
    let mut file = MemoryArrayFile::create();
    file.add_dimension("band", BANDS).unwrap();
    file.add_dimension("y", HEIGHT).unwrap();
    file.add_dimension("x", WIDTH).unwrap();
    let dims = ["band".to_string(), "y".to_string(), "x".to_string()];
    file.add_variable("data", &dims, DataType::F32).unwrap();
    file.end_define().unwrap();
    file
}

fn bench_budgets(c: &mut Criterion) {
    let group_layout = VariableGroup {
        variables: vec!["data".to_string()],
        dimensions: vec!["band".into(), "y".into(), "x".into()],
        shape: vec![BANDS, HEIGHT, WIDTH],
        band_storage: BandStorage::Internal {
            dimension: "band".to_string(),
        },
    };
    let samples = Array3::from_shape_fn((BANDS, HEIGHT, WIDTH), |(b, r, c)| {
        (b * 7 + r * 3 + c) as f64
    });

    let mut group = c.benchmark_group("sample_writer");
    for budget in [WIDTH, 16_384, 65_536, BANDS * HEIGHT * WIDTH] {
        group.bench_with_input(BenchmarkId::from_parameter(budget), &budget, |b, &budget| {
            b.iter_batched(
                target_file,
                |mut file| {
                    let mut writer =
                        SampleWriter::new(&group_layout, samples.view(), true, budget).unwrap();
                    writer.write_all(&mut file).unwrap();
                    black_box(writer.remaining())
                },
                criterion::BatchSize::LargeInput,
            )
        });
    }
    group.finish();
}

criterion_group!(benches, bench_budgets);
criterion_main!(benches);
