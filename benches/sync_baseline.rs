//! Sync layer performance benchmarks
//!
//! Baselines for error channel fan-out and snapshot delivery through a
//! watcher, measured against the in-memory store.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use live_sync::test_infrastructure::FakeStore;
use live_sync::{
	AttemptedOperation, CollectionWatcher, DocumentRef, DocumentSnapshot, DocumentWatcher,
	ErrorChannel, EventKind, FailureEvent, QueryRef, QuerySnapshot, Watcher,
};
use serde_json::{json, Map, Value};

fn fields(value: Value) -> Map<String, Value> {
	match value {
		Value::Object(map) => map,
		_ => Map::new(),
	}
}

// Benchmark publishing one event to a growing number of listeners
fn bench_publish_fan_out(c: &mut Criterion) {
	let mut group = c.benchmark_group("publish_fan_out");
	let event = FailureEvent::permission_denied("users/42", AttemptedOperation::ReadOne);

	for listeners in [1, 10, 100].iter() {
		let channel = ErrorChannel::new();
		for _ in 0..*listeners {
			channel.subscribe(EventKind::PermissionDenied, |event| {
				black_box(event.target_description.len());
			});
		}

		group.bench_with_input(BenchmarkId::new("listeners", listeners), listeners, |b, _| {
			b.iter(|| channel.publish(EventKind::PermissionDenied, black_box(&event)))
		});
	}

	group.finish();
}

// Benchmark delivering a document snapshot to a live watcher
fn bench_document_snapshot(c: &mut Criterion) {
	let store = FakeStore::new();
	let reference = DocumentRef::parse("users/42").unwrap();
	let watcher: DocumentWatcher = Watcher::new(store.clone(), ErrorChannel::new(), Some(reference));
	let id = store.last_opened().unwrap();
	let snapshot = DocumentSnapshot::found("42", fields(json!({ "name": "Ana", "role": "dispatcher" })));

	c.bench_function("document_snapshot", |b| {
		b.iter(|| {
			store.emit_document(id, black_box(snapshot.clone()));
			black_box(watcher.state());
		})
	});
}

// Benchmark query result delivery by result size
fn bench_query_snapshot(c: &mut Criterion) {
	let mut group = c.benchmark_group("query_snapshot");

	for size in [10, 100, 1000].iter() {
		let store = FakeStore::new();
		let query = QueryRef::collection("incidents").unwrap();
		let watcher: CollectionWatcher = Watcher::new(store.clone(), ErrorChannel::new(), Some(query));
		let id = store.last_opened().unwrap();
		let docs = (0..*size)
			.map(|i| DocumentSnapshot::found(format!("inc-{i}"), fields(json!({ "severity": i % 5 }))))
			.collect::<Vec<_>>();

		group.bench_with_input(BenchmarkId::new("docs", size), size, |b, _| {
			b.iter(|| {
				store.emit_query(id, QuerySnapshot::new(black_box(docs.clone())));
				black_box(watcher.state());
			})
		});
	}

	group.finish();
}

// Benchmark switching between two references
fn bench_reference_switch(c: &mut Criterion) {
	let store = FakeStore::new();
	let first = DocumentRef::parse("users/1").unwrap();
	let second = DocumentRef::parse("users/2").unwrap();
	let watcher: DocumentWatcher = Watcher::new(store.clone(), ErrorChannel::new(), Some(first.clone()));

	c.bench_function("reference_switch", |b| {
		b.iter(|| {
			watcher.set_reference(Some(black_box(second.clone())));
			watcher.set_reference(Some(black_box(first.clone())));
		})
	});
}

criterion_group!(
	benches,
	bench_publish_fan_out,
	bench_document_snapshot,
	bench_query_snapshot,
	bench_reference_switch
);
criterion_main!(benches);
