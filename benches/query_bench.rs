//! Benchmarks for compilation and result pivoting
//!
//! Run with: cargo bench

use chronosql::schema::{DateTimeFieldSpec, TableSchema, TransformConfig};
use chronosql::series::{extract_metrics, pivot, ColumnType, ExtractionParams, ResultTable};
use chronosql::sql::{DerivedTimeColumns, MacroContext, MacroEngine};
use chronosql::time::{DateTimeFormat, Granularity, TimeRange};
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use serde_json::json;

fn create_result_table(rows: usize, hosts: usize) -> ResultTable {
    ResultTable::new(
        vec!["host".into(), "region".into(), "__time".into(), "__metric".into()],
        vec![ColumnType::String, ColumnType::String, ColumnType::Long, ColumnType::Double],
        (0..rows)
            .map(|i| {
                vec![
                    json!(format!("host-{}", i % hosts)),
                    json!(if i % 2 == 0 { "eu" } else { "us" }),
                    json!((i / hosts) as i64 * 60_000),
                    json!(i as f64 * 0.5),
                ]
            })
            .collect(),
    )
}

fn bench_pivot(c: &mut Criterion) {
    let mut group = c.benchmark_group("pivot");
    let params = ExtractionParams {
        time_column: "__time".to_string(),
        metric_column: "__metric".to_string(),
        time_format: DateTimeFormat::millis(),
    };

    for size in [1_000, 10_000, 100_000] {
        let table = create_result_table(size, 50);
        group.throughput(Throughput::Elements(size as u64));

        group.bench_function(format!("extract_{}", size), |b| {
            b.iter(|| extract_metrics(black_box(&table), &params).unwrap())
        });

        let metrics = extract_metrics(&table, &params).unwrap();
        group.bench_function(format!("pivot_{}", size), |b| {
            b.iter(|| pivot(black_box(&metrics), "{{host}} ({{region}})", "__metric"))
        });
    }

    group.finish();
}

fn bench_macros(c: &mut Criterion) {
    let schema = TableSchema {
        schema_name: "metrics".to_string(),
        date_time_fields: vec![DateTimeFieldSpec::new("ts", "LONG", "1:MILLISECONDS:EPOCH", "1:MILLISECONDS")],
        ..TableSchema::default()
    };
    let derived = DerivedTimeColumns::from_transform_configs(&[TransformConfig {
        column_name: "ts_1m".to_string(),
        transform_function: "FromEpochMinutesBucket(ToEpochMinutesBucket(ts, 1), 1)".to_string(),
    }]);
    let sql = "SELECT $__timeGroup(ts) AS $__timeAlias(), SUM(v) AS $__metricAlias() \
               FROM $__table() WHERE $__timeFilter(ts) AND ts < $__timeToMillis() \
               GROUP BY $__timeAlias() LIMIT 1000";

    c.bench_function("expand_macros", |b| {
        b.iter(|| {
            let mut engine = MacroEngine::new(MacroContext {
                table_name: "metrics",
                schema: Some(&schema),
                derived: &derived,
                range: TimeRange::from_millis(0, 3_600_000).unwrap(),
                granularity: Granularity::parse("1:MINUTES").unwrap(),
            });
            engine.expand(black_box(sql)).unwrap()
        })
    });
}

criterion_group!(benches, bench_pivot, bench_macros);
criterion_main!(benches);
