//! Watching the result set of a query

use crate::events::AttemptedOperation;
use crate::reference::QueryRef;
use crate::snapshot::{QuerySnapshot, Record};
use crate::store::{ErrorCallback, Store, SubscriptionId};
use crate::watcher::machine::{WatchTarget, Watcher};
use serde::de::DeserializeOwned;
use std::marker::PhantomData;

/// Every document matching a query, each decoded as `T`
pub struct Many<T>(PhantomData<fn() -> T>);

impl<T> WatchTarget for Many<T>
where T: DeserializeOwned + Clone + Send + Sync + 'static
{
	type Ref = QueryRef;
	type Snapshot = QuerySnapshot;
	type Output = Vec<T>;

	const OPERATION: AttemptedOperation = AttemptedOperation::ReadMany;

	fn open(
		store: &dyn Store, reference: &QueryRef, on_snapshot: Box<dyn FnMut(QuerySnapshot) + Send>,
		on_error: ErrorCallback,
	) -> SubscriptionId {
		store.watch_collection(reference, on_snapshot, on_error)
	}

	// Store order is kept as delivered: no sorting, no deduplication.
	fn decode(snapshot: &QuerySnapshot) -> serde_json::Result<Option<Vec<T>>> {
		snapshot.decode().map(Some)
	}
}

/// Live view of a query. An empty result is `Some(vec![])`, never `None`.
///
/// Records arrive in store order without sorting or deduplication; entries
/// the store marks as missing are skipped.
pub type CollectionWatcher<T = Record> = Watcher<Many<T>>;
