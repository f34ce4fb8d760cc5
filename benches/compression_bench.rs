use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use schemapress::compression::{CompressionInstance, GreedyCompressor};
use schemapress::{Column, CompressorConfig, Method, Schema, SchemaCompressor, Table};
use std::hint::black_box;
use std::time::Duration;

fn synthetic_schema(tables: usize) -> Schema {
    let types = ["INTEGER", "VARCHAR(255)", "TIMESTAMP", "DECIMAL(10,2)", "BOOLEAN"];
    let tables = (0..tables)
        .map(|t| {
            let mut table = Table::new(format!("app_entity_{}", t));
            let id =
                Column::new(format!("entity_{}_id", t), "INTEGER").with_constraint("PRIMARY KEY");
            table = table.with_column(id);
            for c in 0..6 {
                let data_type = types[(t + c) % types.len()];
                let mut column = Column::new(format!("entity_{}_attr_{}", t, c), data_type);
                if c % 2 == 0 {
                    column = column.with_constraint("NOT NULL");
                }
                table = table.with_column(column);
            }
            table.with_column(Column::new("created_at", "TIMESTAMP").with_constraint("NOT NULL"))
        })
        .collect();
    Schema::new("synthetic", tables)
}

fn bench_candidate_generation(c: &mut Criterion) {
    let config = CompressorConfig::default();
    let mut group = c.benchmark_group("candidate_generation");
    for tables in [10, 50] {
        let schema = synthetic_schema(tables);
        group.bench_with_input(BenchmarkId::from_parameter(tables), &schema, |b, schema| {
            b.iter(|| CompressionInstance::build(black_box(schema), &config))
        });
    }
    group.finish();
}

fn bench_greedy(c: &mut Criterion) {
    let config = CompressorConfig::default();
    let mut group = c.benchmark_group("greedy");
    for tables in [10, 50] {
        let instance = CompressionInstance::build(&synthetic_schema(tables), &config);
        group.bench_with_input(BenchmarkId::from_parameter(tables), &instance, |b, instance| {
            b.iter(|| {
                GreedyCompressor::new().assign(black_box(&instance.groups), &instance.candidates)
            })
        });
    }
    group.finish();
}

fn bench_ilp(c: &mut Criterion) {
    let config = CompressorConfig::default().with_time_limit(Duration::from_secs(2));
    let compressor = SchemaCompressor::new(config);
    let schema = synthetic_schema(10);

    let mut group = c.benchmark_group("ilp");
    group.sample_size(10);
    group.bench_function("10_tables", |b| {
        b.iter(|| compressor.compress(black_box(&schema), Method::Ilp))
    });
    group.finish();
}

criterion_group!(benches, bench_candidate_generation, bench_greedy, bench_ilp);
criterion_main!(benches);
