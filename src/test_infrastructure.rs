//! Deterministic store for tests and the demo binary
//!
//! `FakeStore` never delivers anything on its own: tests decide when a
//! snapshot or an error reaches a subscription. It records every open and
//! release, in call order, so subscription lifecycles can be asserted.

use crate::error_channel::ErrorChannel;
use crate::events::{EventKind, FailureEvent};
use crate::reference::{DocumentRef, QueryRef, Reference};
use crate::snapshot::{DocumentSnapshot, QuerySnapshot};
use crate::store::{
	DocumentCallback, ErrorCallback, QueryCallback, Store, StoreError, SubscriptionId,
};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// One call made against the fake store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
	Opened { id: SubscriptionId, target: String },
	Released { id: SubscriptionId },
}

enum Delivery {
	Document(DocumentCallback),
	Query(QueryCallback),
}

struct Watch {
	target: String,
	delivery: Delivery,
	on_error: ErrorCallback,
}

/// Released subscriptions whose callbacks stay reachable for late deliveries
pub const RETIRED_LIMIT: usize = 64;

#[derive(Default)]
struct FakeInner {
	next_id: u64,
	// Opened and not yet released, including callbacks lent out mid-delivery
	active: BTreeSet<SubscriptionId>,
	live: BTreeMap<SubscriptionId, Watch>,
	// Released subscriptions keep their callbacks so tests can simulate
	// deliveries that race with a release. Oldest ids go first past the limit.
	retired: BTreeMap<SubscriptionId, Watch>,
	calls: Vec<StoreCall>,
	max_live: usize,
	documents: HashMap<String, DocumentSnapshot>,
	queries: HashMap<String, QuerySnapshot>,
	denied: HashMap<String, StoreError>,
}

impl FakeInner {
	fn retire(&mut self, id: SubscriptionId, watch: Watch) {
		self.retired.insert(id, watch);
		while self.retired.len() > RETIRED_LIMIT {
			self.retired.pop_first();
		}
	}
}

/// In-memory [`Store`] driven by hand
///
/// Meant to live for one test or one demo run: the call log is kept in full
/// so it can be asserted on, and only the retired callbacks are bounded.
#[derive(Default)]
pub struct FakeStore {
	inner: Mutex<FakeInner>,
}

impl FakeStore {
	pub fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	fn inner(&self) -> MutexGuard<'_, FakeInner> {
		self.inner.lock().unwrap_or_else(PoisonError::into_inner)
	}

	/// Deliver `snapshot` synchronously to every future watch of `reference`
	pub fn put_document(&self, reference: &DocumentRef, snapshot: DocumentSnapshot) {
		self.inner().documents.insert(reference.describe(), snapshot);
	}

	/// Deliver `snapshot` synchronously to every future watch of `reference`
	pub fn put_query(&self, reference: &QueryRef, snapshot: QuerySnapshot) {
		self.inner().queries.insert(reference.describe(), snapshot);
	}

	/// Fail every future watch of the target described by `target` with `error`
	pub fn reject(&self, target: &str, error: StoreError) {
		self.inner().denied.insert(target.to_string(), error);
	}

	fn open(&self, target: String, delivery: Delivery, on_error: ErrorCallback) -> SubscriptionId {
		let mut inner = self.inner();
		inner.next_id += 1;
		let id = SubscriptionId(inner.next_id);
		inner.live.insert(id, Watch { target: target.clone(), delivery, on_error });
		inner.active.insert(id);
		inner.max_live = inner.max_live.max(inner.active.len());
		inner.calls.push(StoreCall::Opened { id, target });
		id
	}

	/// Run `f` against a subscription's callbacks without holding the lock,
	/// so callbacks may call back into the store.
	fn with_watch(&self, id: SubscriptionId, f: impl FnOnce(&mut Watch)) -> bool {
		let taken = {
			let mut inner = self.inner();
			inner.live.remove(&id).or_else(|| inner.retired.remove(&id))
		};
		let Some(mut watch) = taken else {
			return false;
		};

		f(&mut watch);

		let mut inner = self.inner();
		if !inner.active.contains(&id) {
			inner.retire(id, watch);
		} else {
			inner.live.insert(id, watch);
		}
		true
	}

	/// Push a document snapshot to a subscription. Returns `false` for an
	/// unknown id or a subscription that watches a query.
	pub fn emit_document(&self, id: SubscriptionId, snapshot: DocumentSnapshot) -> bool {
		let mut delivered = false;
		self.with_watch(id, |watch| {
			if let Delivery::Document(on_snapshot) = &mut watch.delivery {
				on_snapshot(snapshot);
				delivered = true;
			}
		});
		delivered
	}

	/// Push a query snapshot to a subscription
	pub fn emit_query(&self, id: SubscriptionId, snapshot: QuerySnapshot) -> bool {
		let mut delivered = false;
		self.with_watch(id, |watch| {
			if let Delivery::Query(on_snapshot) = &mut watch.delivery {
				on_snapshot(snapshot);
				delivered = true;
			}
		});
		delivered
	}

	/// Report an error on a subscription
	pub fn emit_error(&self, id: SubscriptionId, error: StoreError) -> bool {
		self.with_watch(id, |watch| (watch.on_error)(error))
	}

	/// Every open and release, in call order
	pub fn calls(&self) -> Vec<StoreCall> {
		self.inner().calls.clone()
	}

	pub fn opened(&self) -> Vec<(SubscriptionId, String)> {
		self.inner()
			.calls
			.iter()
			.filter_map(|call| match call {
				StoreCall::Opened { id, target } => Some((*id, target.clone())),
				StoreCall::Released { .. } => None,
			})
			.collect()
	}

	pub fn released(&self) -> Vec<SubscriptionId> {
		self.inner()
			.calls
			.iter()
			.filter_map(|call| match call {
				StoreCall::Released { id } => Some(*id),
				StoreCall::Opened { .. } => None,
			})
			.collect()
	}

	pub fn live_subscriptions(&self) -> Vec<SubscriptionId> {
		self.inner().active.iter().copied().collect()
	}

	/// Most recently opened subscription, live or not
	pub fn last_opened(&self) -> Option<SubscriptionId> {
		self.opened().last().map(|(id, _)| *id)
	}

	/// Live subscription watching the target described by `target`
	pub fn subscription_for(&self, target: &str) -> Option<SubscriptionId> {
		self.inner()
			.live
			.iter()
			.find(|(_, watch)| watch.target == target)
			.map(|(id, _)| *id)
	}

	/// Highest number of subscriptions that were live at the same time
	pub fn max_live(&self) -> usize {
		self.inner().max_live
	}
}

impl Store for FakeStore {
	fn watch_document(
		&self, reference: &DocumentRef, on_snapshot: DocumentCallback, on_error: ErrorCallback,
	) -> SubscriptionId {
		let target = reference.describe();
		let id = self.open(target.clone(), Delivery::Document(on_snapshot), on_error);

		let (preset, denied) = {
			let inner = self.inner();
			(inner.documents.get(&target).cloned(), inner.denied.get(&target).cloned())
		};
		if let Some(error) = denied {
			self.emit_error(id, error);
		} else if let Some(snapshot) = preset {
			self.emit_document(id, snapshot);
		}
		id
	}

	fn watch_collection(
		&self, reference: &QueryRef, on_snapshot: QueryCallback, on_error: ErrorCallback,
	) -> SubscriptionId {
		let target = reference.describe();
		let id = self.open(target.clone(), Delivery::Query(on_snapshot), on_error);

		let (preset, denied) = {
			let inner = self.inner();
			(inner.queries.get(&target).cloned(), inner.denied.get(&target).cloned())
		};
		if let Some(error) = denied {
			self.emit_error(id, error);
		} else if let Some(snapshot) = preset {
			self.emit_query(id, snapshot);
		}
		id
	}

	fn release(&self, id: SubscriptionId) {
		// Every call is recorded, so a double release shows up in `released()`.
		let mut inner = self.inner();
		inner.calls.push(StoreCall::Released { id });
		inner.active.remove(&id);
		if let Some(watch) = inner.live.remove(&id) {
			inner.retire(id, watch);
		}
	}
}

/// Collects every event published on a channel for one kind
pub struct EventRecorder {
	events: Arc<Mutex<Vec<FailureEvent>>>,
}

impl EventRecorder {
	pub fn attach(channel: &ErrorChannel, kind: EventKind) -> Self {
		let events = Arc::new(Mutex::new(Vec::new()));
		let sink = events.clone();
		channel.subscribe(kind, move |event| {
			sink.lock().unwrap_or_else(PoisonError::into_inner).push(event.clone());
		});
		Self { events }
	}

	pub fn events(&self) -> Vec<FailureEvent> {
		self.events.lock().unwrap_or_else(PoisonError::into_inner).clone()
	}

	pub fn len(&self) -> usize {
		self.events.lock().unwrap_or_else(PoisonError::into_inner).len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}
