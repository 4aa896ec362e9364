//! Watching a single document

use crate::events::AttemptedOperation;
use crate::reference::DocumentRef;
use crate::snapshot::{DocumentSnapshot, Record};
use crate::store::{ErrorCallback, Store, SubscriptionId};
use crate::watcher::machine::{WatchTarget, Watcher};
use serde::de::DeserializeOwned;
use std::marker::PhantomData;

/// One document, decoded as `T`
pub struct Single<T>(PhantomData<fn() -> T>);

impl<T> WatchTarget for Single<T>
where T: DeserializeOwned + Clone + Send + Sync + 'static
{
	type Ref = DocumentRef;
	type Snapshot = DocumentSnapshot;
	type Output = T;

	const OPERATION: AttemptedOperation = AttemptedOperation::ReadOne;

	fn open(
		store: &dyn Store, reference: &DocumentRef,
		on_snapshot: Box<dyn FnMut(DocumentSnapshot) + Send>, on_error: ErrorCallback,
	) -> SubscriptionId {
		store.watch_document(reference, on_snapshot, on_error)
	}

	fn decode(snapshot: &DocumentSnapshot) -> serde_json::Result<Option<T>> {
		snapshot.decode()
	}
}

/// Live view of one document: its fields plus identifier, or `None` when absent
pub type DocumentWatcher<T = Record> = Watcher<Single<T>>;
