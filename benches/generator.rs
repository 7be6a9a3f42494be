use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use timeline_fishbone::config::{Config, LayoutConfig};
use timeline_fishbone::ir::{Dataset, Record};
use timeline_fishbone::layout::calculate_layout;
use timeline_fishbone::render::generate;
use timeline_fishbone::sample::sample_dataset;

const CATEGORIES: [&str; 8] = [
    "singleproto",
    "multiproto",
    "dense",
    "attention",
    "adaptive",
    "vl",
    "hybrid",
    "other",
];

fn dense_dataset(years: i32, per_year: usize) -> Dataset {
    let mut records = Vec::new();
    for offset in 0..years {
        let year = 1990 + offset;
        for i in 0..per_year {
            let category = CATEGORIES[(offset as usize + i) % CATEGORIES.len()];
            records.push(Record::new(
                year,
                category,
                &format!("M{year}_{i}"),
                &format!("Key{year}x{i}"),
            ));
        }
    }
    Dataset::new(records)
}

fn bench_layout(c: &mut Criterion) {
    let mut group = c.benchmark_group("calculate_layout");
    let mut smart = LayoutConfig::default();
    smart.smart_spacing = true;
    for (years, per_year) in [(7, 3), (35, 6), (100, 12)] {
        let dataset = dense_dataset(years, per_year);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{years}x{per_year}")),
            &dataset,
            |b, data| {
                b.iter(|| {
                    let params = calculate_layout(black_box(data), &smart);
                    black_box(params.total_width);
                });
            },
        );
    }
    group.finish();
}

fn bench_generate(c: &mut Criterion) {
    let mut group = c.benchmark_group("generate");
    let config = Config::default();

    let sample = sample_dataset();
    group.bench_function("sample", |b| {
        b.iter(|| {
            let tex = generate(black_box(&sample), &config);
            black_box(tex.len());
        });
    });

    let mut smart = Config::default();
    smart.layout.smart_spacing = true;
    smart.time_logic.upper_years = "odd".to_string();
    for (years, per_year) in [(35, 6), (100, 12)] {
        let dataset = dense_dataset(years, per_year);
        group.bench_with_input(
            BenchmarkId::new("dense", format!("{years}x{per_year}")),
            &dataset,
            |b, data| {
                b.iter(|| {
                    let tex = generate(black_box(data), &smart);
                    black_box(tex.len());
                });
            },
        );
    }
    group.finish();
}

criterion_group!(
    name = benches;
    config = Criterion::default();
    targets = bench_layout, bench_generate
);
criterion_main!(benches);
