//! Benchmarks for batch load deduplication.
//!
//! Run with: cargo bench -p nodeload-server
//!
//! Measures load_many throughput over the in-memory store as the share of
//! duplicate items in a request grows, and concurrent same-key loads
//! through one scope.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tokio::runtime::Runtime;

use nodeload_domain::model::{LookupKey, RequestContext};
use nodeload_server::app::{build_handler, MemoryLoadHandler};
use nodeload_server::{LoadItem, LoadRequest, NodeloadConfig};
use nodeload_storage::{
    DataStore, MemoryDataStore, StoredAccount, StoredCourse, StoredEnrollment, StoredOutcome,
    StoredRecord,
};

const ROOT: u64 = 1;
const COURSE: u64 = 10;
const STUDENT: u64 = 20;
const OUTCOMES: u64 = 100;

// =============================================================================
// Setup helpers
// =============================================================================

/// One course with a student and `OUTCOMES` course-owned outcomes.
fn create_handler(rt: &Runtime) -> MemoryLoadHandler {
    let store = Arc::new(MemoryDataStore::new());

    rt.block_on(async {
        let mut records = vec![
            StoredRecord::Account(StoredAccount {
                id: ROOT,
                parent_account_id: None,
                name: "Bench Root".to_string(),
                workflow_state: "active".to_string(),
            }),
            StoredRecord::Course(StoredCourse {
                id: COURSE,
                root_account_id: ROOT,
                account_id: ROOT,
                name: "Bench Course".to_string(),
                sis_source_id: None,
                workflow_state: "available".to_string(),
            }),
            StoredRecord::Enrollment(StoredEnrollment {
                id: 1,
                user_id: STUDENT,
                course_id: COURSE,
                enrollment_type: "StudentEnrollment".to_string(),
                workflow_state: "active".to_string(),
            }),
        ];
        records.extend((1..=OUTCOMES).map(|id| {
            StoredRecord::Outcome(StoredOutcome {
                id,
                context_type: "Course".to_string(),
                context_id: COURSE,
                root_account_id: ROOT,
                short_description: format!("Outcome {id}"),
                workflow_state: "active".to_string(),
            })
        }));
        for record in records {
            store.insert(record).await.expect("bench fixture must insert");
        }
    });

    let mut config = NodeloadConfig::default();
    config.metrics.enabled = false;
    build_handler(&config, store)
}

/// Generate load items with a specified duplicate ratio.
fn generate_loads_with_duplicates(batch_size: usize, duplicate_ratio: f64) -> Vec<LoadItem> {
    let unique_count = ((1.0 - duplicate_ratio) * batch_size as f64).ceil() as usize;
    let unique_count = unique_count.max(1);

    (0..batch_size)
        .map(|i| LoadItem::new("LearningOutcome", (i % unique_count) as u64 + 1))
        .collect()
}

// =============================================================================
// Benchmarks
// =============================================================================

fn bench_load_many_deduplication(c: &mut Criterion) {
    let rt = Runtime::new().expect("runtime");
    let handler = create_handler(&rt);
    let batch_size = 100;

    let mut group = c.benchmark_group("load_many_deduplication");
    group.throughput(Throughput::Elements(batch_size as u64));

    for (label, ratio) in [
        ("0%_duplicates", 0.0),
        ("50%_duplicates", 0.50),
        ("90%_duplicates", 0.90),
    ] {
        let loads = generate_loads_with_duplicates(batch_size, ratio);
        let request = LoadRequest::new(ROOT, Some(STUDENT), loads);
        let (total, unique) = handler.dedup_stats(&request);
        println!("{label}: {total} total, {unique} unique");

        group.bench_with_input(
            BenchmarkId::new("throughput", label),
            &request,
            |b, request| {
                b.to_async(&rt).iter(|| async {
                    let result = handler.load_many(black_box(request.clone())).await;
                    black_box(result)
                })
            },
        );
    }

    group.finish();
}

fn bench_scope_same_key(c: &mut Criterion) {
    let rt = Runtime::new().expect("runtime");
    let handler = create_handler(&rt);
    let context = RequestContext::for_user(ROOT, STUDENT);
    let key = LookupKey::from(1u64);

    let mut group = c.benchmark_group("scope_same_key");

    for concurrency in [1, 10, 50] {
        group.throughput(Throughput::Elements(concurrency as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(concurrency),
            &concurrency,
            |b, &concurrency| {
                b.to_async(&rt).iter(|| async {
                    let scope = handler.scope();
                    let loads =
                        (0..concurrency).map(|_| scope.load("LearningOutcome", &key, &context));
                    black_box(futures::future::join_all(loads).await)
                })
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_load_many_deduplication, bench_scope_same_key);
criterion_main!(benches);
