//! Common test utilities for the live-sync library

#![allow(dead_code)]

use live_sync::test_infrastructure::{EventRecorder, FakeStore};
use live_sync::{DocumentRef, DocumentSnapshot, ErrorChannel, EventKind, QueryRef};
use serde_json::{Map, Value};
use std::sync::Arc;

/// A fresh store and channel, with a recorder attached for permission denials
pub fn setup() -> (Arc<FakeStore>, ErrorChannel, EventRecorder) {
	let store = FakeStore::new();
	let channel = ErrorChannel::new();
	let recorder = EventRecorder::attach(&channel, EventKind::PermissionDenied);
	(store, channel, recorder)
}

pub fn doc_ref(path: &str) -> DocumentRef {
	DocumentRef::parse(path).expect("valid document path")
}

pub fn query(collection: &str) -> QueryRef {
	QueryRef::collection(collection).expect("valid collection path")
}

/// Convert a JSON object literal into document fields
pub fn fields(value: Value) -> Map<String, Value> {
	match value {
		Value::Object(map) => map,
		other => panic!("Expected a JSON object, got {other}"),
	}
}

pub fn found(id: &str, value: Value) -> DocumentSnapshot {
	DocumentSnapshot::found(id, fields(value))
}
