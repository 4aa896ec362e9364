use crate::store::{Store, SubscriptionId};
use std::sync::Arc;
use tracing::debug;

/// Exclusive owner of a store subscription
///
/// The subscription is released exactly once: either by [`release`](Self::release)
/// or when the guard is dropped.
pub struct SubscriptionGuard {
	store: Arc<dyn Store>,
	id: Option<SubscriptionId>,
}

impl SubscriptionGuard {
	pub fn new(store: Arc<dyn Store>, id: SubscriptionId) -> Self {
		Self { store, id: Some(id) }
	}

	pub fn id(&self) -> Option<SubscriptionId> {
		self.id
	}

	pub fn release(mut self) {
		self.release_once();
	}

	fn release_once(&mut self) {
		if let Some(id) = self.id.take() {
			debug!("Releasing subscription {}", id);
			self.store.release(id);
		}
	}
}

impl Drop for SubscriptionGuard {
	fn drop(&mut self) {
		self.release_once();
	}
}

impl std::fmt::Debug for SubscriptionGuard {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SubscriptionGuard").field("id", &self.id).finish()
	}
}
