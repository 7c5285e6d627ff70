//! Criterion benchmarks for master_logger

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use master_logger::prelude::*;
use master_logger::sinks::BackgroundSink;
use master_logger::{LogRecord, OverflowPolicy, RecordFactory};
use std::sync::Arc;
use std::thread;

/// Sink that discards everything, isolating logger overhead from I/O
struct NullSink;

impl Sink for NullSink {
    fn emit(&mut self, record: &LogRecord) -> Result<()> {
        black_box(record);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "null"
    }
}

fn logger_with_level(dir: &tempfile::TempDir, level: Severity) -> MasterLogger {
    let logger = MasterLogger::builder(dir.path().join("bench.log"))
        .level(level)
        .build()
        .expect("Failed to create logger");
    logger.add_sink("null", Box::new(NullSink), None);
    logger
}

// ============================================================================
// Logging Performance Benchmarks
// ============================================================================

fn bench_file_logging(c: &mut Criterion) {
    let mut group = c.benchmark_group("file_logging");
    group.throughput(Throughput::Elements(1));

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let logger = logger_with_level(&dir, Severity::Debug);

    group.bench_function("info", |b| {
        b.iter(|| logger.info(black_box("Info message")));
    });

    group.bench_function("template", |b| {
        b.iter(|| {
            logger.log_template(
                Severity::Info,
                black_box("User {} performed {}"),
                &[&42, &"login"],
            )
        });
    });

    group.bench_function("exception", |b| {
        let err = "x".parse::<i32>().unwrap_err();
        b.iter(|| logger.log_exception(black_box("parse failed"), &err));
    });

    group.finish();
}

fn bench_level_filtering(c: &mut Criterion) {
    let mut group = c.benchmark_group("level_filtering");
    group.throughput(Throughput::Elements(1));

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let logger = logger_with_level(&dir, Severity::Error);

    group.bench_function("filtered_debug", |b| {
        b.iter(|| logger.debug(black_box("Filtered message")));
    });

    group.bench_function("filtered_under_override", |b| {
        let _guard = logger.temporary_log_level(Severity::Critical).unwrap();
        b.iter(|| logger.warning(black_box("Filtered message")));
    });

    group.bench_function("push_pop_override", |b| {
        b.iter(|| {
            let guard = logger.temporary_log_level(black_box(Severity::Debug)).unwrap();
            black_box(&guard);
        });
    });

    group.finish();
}

fn bench_background_sink(c: &mut Criterion) {
    let mut group = c.benchmark_group("background_sink");
    group.throughput(Throughput::Elements(1));

    let mut sink = BackgroundSink::spawn(Box::new(NullSink), 8192, OverflowPolicy::DropNewest)
        .expect("Failed to spawn background sink");
    let record = RecordFactory::build_message("bench", Severity::Info, "queued message");

    group.bench_function("enqueue", |b| {
        b.iter(|| sink.emit(black_box(&record)));
    });

    group.finish();
}

fn bench_concurrent_logging(c: &mut Criterion) {
    let mut group = c.benchmark_group("concurrent_logging");

    for threads in [2usize, 4] {
        group.throughput(Throughput::Elements((threads * 100) as u64));
        group.bench_function(format!("{}_threads", threads), |b| {
            let dir = tempfile::tempdir().expect("Failed to create temp dir");
            let logger = Arc::new(logger_with_level(&dir, Severity::Info));
            b.iter(|| {
                let handles: Vec<_> = (0..threads)
                    .map(|t| {
                        let handle = logger.get_logger(format!("t{}", t));
                        thread::spawn(move || {
                            for i in 0..100 {
                                handle.info(format!("message {}", i));
                            }
                        })
                    })
                    .collect();
                for handle in handles {
                    handle.join().expect("Thread panicked");
                }
            });
        });
    }

    group.finish();
}

fn bench_instrumentation(c: &mut Criterion) {
    let mut group = c.benchmark_group("instrumentation");
    group.throughput(Throughput::Elements(1));

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let logger = logger_with_level(&dir, Severity::Info);
    let add = logger.log_function_call().wrap("add", |(a, b): (u64, u64)| a + b);
    let quiet_add = logger
        .log_function_call()
        .level(Severity::Debug)
        .wrap("add", |(a, b): (u64, u64)| a + b);

    group.bench_function("logged_call", |b| {
        b.iter(|| add.call(black_box((1, 2))));
    });

    group.bench_function("filtered_call", |b| {
        b.iter(|| quiet_add.call(black_box((1, 2))));
    });

    group.finish();
}

fn bench_formatting(c: &mut Criterion) {
    let mut group = c.benchmark_group("formatting");
    group.throughput(Throughput::Elements(1));

    let record = RecordFactory::build_message("bench", Severity::Warning, "Formatted message");
    let timestamps = TimestampFormat::default();

    for format in [OutputFormat::Text, OutputFormat::Json, OutputFormat::Logfmt] {
        group.bench_function(format!("{:?}", format), |b| {
            b.iter(|| format.format(black_box(&record), &timestamps));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_file_logging,
    bench_level_filtering,
    bench_background_sink,
    bench_concurrent_logging,
    bench_instrumentation,
    bench_formatting,
);

criterion_main!(benches);
