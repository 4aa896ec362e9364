//! State machine shared by document and collection watchers
//!
//! A watcher owns at most one store subscription. Every subscription it opens
//! gets a new generation number; callbacks carry the generation they were
//! opened for plus a weak handle to the watcher, and are dropped on the floor
//! once either is stale. Nothing is ever locked while the store or the error
//! channel is being called.
//!
//! A store may run callbacks before `open` has returned an id, and a callback
//! (or an error channel listener) may change the reference from inside one.
//! Such a change is recorded and left to the call that is opening: it stores
//! the new guard, releases it, and only then opens the replacement.

use crate::config::WatcherConfig;
use crate::error::{FailureKind, Result, SyncError, WatchError};
use crate::error_channel::ErrorChannel;
use crate::events::{AttemptedOperation, EventKind, FailureEvent};
use crate::reference::Reference;
use crate::store::{ErrorCallback, Store, StoreError, SubscriptionId};
use crate::subscription::SubscriptionGuard;
use crate::watcher::state::{Phase, WatcherState};
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// What a watcher observes: one document or a query's result set
pub trait WatchTarget: Send + Sync + 'static {
	type Ref: Reference;
	type Snapshot: Send + 'static;
	type Output: Clone + Send + Sync + 'static;

	/// Operation reported in failure events
	const OPERATION: AttemptedOperation;

	fn open(
		store: &dyn Store, reference: &Self::Ref,
		on_snapshot: Box<dyn FnMut(Self::Snapshot) + Send>, on_error: ErrorCallback,
	) -> SubscriptionId;

	/// Turn a snapshot into the watcher's data; `None` means "absent"
	fn decode(snapshot: &Self::Snapshot) -> serde_json::Result<Option<Self::Output>>;
}

struct Control<K: WatchTarget> {
	generation: u64,
	phase: Phase,
	reference: Option<K::Ref>,
	guard: Option<SubscriptionGuard>,
	/// A `switch` is inside `K::open` and owns the next guard
	opening: bool,
	_target: PhantomData<fn() -> K>,
}

impl<K: WatchTarget> Control<K> {
	fn target(&self) -> String {
		self.reference.as_ref().map_or_else(|| "<none>".to_string(), Reference::describe)
	}
}

struct Shared<K: WatchTarget> {
	control: Mutex<Control<K>>,
	state: watch::Sender<WatcherState<K::Output>>,
	channel: ErrorChannel,
	config: WatcherConfig,
}

impl<K: WatchTarget> Shared<K> {
	fn control(&self) -> MutexGuard<'_, Control<K>> {
		self.control.lock().unwrap_or_else(PoisonError::into_inner)
	}

	fn label(&self) -> &str {
		self.config.display_label()
	}

	fn apply_snapshot(&self, generation: u64, snapshot: K::Snapshot) {
		let mut control = self.control();
		if control.generation != generation {
			debug!("[{}] Ignoring snapshot from stale generation {}", self.label(), generation);
			return;
		}
		if control.phase == Phase::Failed {
			debug!("[{}] Ignoring snapshot after failure on {}", self.label(), control.target());
			return;
		}

		match K::decode(&snapshot) {
			Ok(data) => {
				debug!(
					"[{}] Snapshot for {} (present: {})",
					self.label(),
					control.target(),
					data.is_some()
				);
				control.phase = Phase::Live;
				self.state.send_replace(WatcherState::ready(data));
			}
			Err(e) => {
				let target = control.target();
				warn!("[{}] Failed to decode snapshot of {}: {}", self.label(), target, e);
				control.phase = Phase::Failed;
				self.state
					.send_replace(WatcherState::failed(WatchError::Decode { target, message: e.to_string() }));
			}
		}
	}

	fn apply_error(&self, generation: u64, store_error: StoreError) {
		let event = {
			let mut control = self.control();
			if control.generation != generation {
				debug!("[{}] Ignoring error from stale generation {}", self.label(), generation);
				return;
			}
			if control.phase == Phase::Failed {
				debug!("[{}] Ignoring repeated error on {}", self.label(), control.target());
				return;
			}

			let target = control.target();
			let kind = store_error.classify();
			let watch_error = if kind == FailureKind::PermissionDenied {
				error!("[{}] Permission denied: {} on {}", self.label(), K::OPERATION, target);
				WatchError::PermissionDenied { target: target.clone(), operation: K::OPERATION }
			} else {
				warn!("[{}] Store failure on {}: {}", self.label(), target, store_error);
				WatchError::Store {
					kind,
					target: target.clone(),
					message: store_error.message.clone(),
				}
			};

			control.phase = Phase::Failed;
			self.state.send_replace(WatcherState::failed(watch_error));

			(kind == FailureKind::PermissionDenied && self.config.publish_failures).then(|| {
				FailureEvent::permission_denied(target, K::OPERATION).with_message(store_error.message)
			})
		};

		// Local state is settled first, so listeners that look at this
		// watcher see the failure.
		if let Some(event) = event {
			self.channel.publish(EventKind::PermissionDenied, &event);
		}
	}
}

/// Turns a possibly-absent reference into continuously updated state
pub struct Watcher<K: WatchTarget> {
	shared: Arc<Shared<K>>,
	store: Option<Arc<dyn Store>>,
}

impl<K: WatchTarget> Watcher<K> {
	/// Create a watcher and start watching `reference` (if any)
	pub fn new(store: Arc<dyn Store>, channel: ErrorChannel, reference: Option<K::Ref>) -> Self {
		Self::build(Some(store), channel, WatcherConfig::default(), reference)
	}

	/// Create a watcher with an explicit configuration
	pub fn with_config(
		store: Arc<dyn Store>, channel: ErrorChannel, config: WatcherConfig,
		reference: Option<K::Ref>,
	) -> Result<Self> {
		config.validate().map_err(|reason| SyncError::configuration("watcher", &reason))?;
		Ok(Self::build(Some(store), channel, config, reference))
	}

	/// Create a watcher with no store behind it
	///
	/// Any reference settles immediately to "no data, not loading"; nothing
	/// is ever subscribed.
	pub fn detached(channel: ErrorChannel) -> Self {
		Self::build(None, channel, WatcherConfig::default(), None)
	}

	fn build(
		store: Option<Arc<dyn Store>>, channel: ErrorChannel, config: WatcherConfig,
		reference: Option<K::Ref>,
	) -> Self {
		let (state, _) = watch::channel(WatcherState::loading());
		let control = Control {
			generation: 0,
			phase: Phase::Init,
			reference: None,
			guard: None,
			opening: false,
			_target: PhantomData,
		};
		let watcher = Self {
			shared: Arc::new(Shared { control: Mutex::new(control), state, channel, config }),
			store,
		};
		watcher.switch(reference, false);
		watcher
	}

	/// Point the watcher at a new reference, or at nothing
	///
	/// A reference equal to the current one is ignored. Otherwise the current
	/// subscription is released before the new one is opened.
	///
	/// Called from inside one of this watcher's own callbacks while its
	/// subscription is still being opened, the change is applied to the state
	/// at once and the store calls are made by the outer call once the store
	/// hands back the subscription id.
	pub fn set_reference(&self, reference: Option<K::Ref>) {
		self.switch(reference, false);
	}

	/// Stop watching. Equivalent to `set_reference(None)`.
	pub fn clear(&self) {
		self.switch(None, false);
	}

	/// Release and reopen the subscription for the current reference
	///
	/// Nothing retries on its own; callers use this after the condition that
	/// made the store fail (for example an expired sign-in) has been fixed.
	pub fn resubscribe(&self) {
		let reference = self.reference();
		self.switch(reference, true);
	}

	fn switch(&self, reference: Option<K::Ref>, force: bool) {
		let label = self.shared.label();
		let (mut generation, previous) = {
			let mut control = self.shared.control();
			if !force && control.phase != Phase::Init && control.reference == reference {
				debug!("[{}] Reference unchanged ({}), keeping subscription", label, control.target());
				return;
			}

			control.generation += 1;
			control.reference = reference.clone();
			let watching = reference.is_some() && self.store.is_some();
			self.enter(&mut control, watching);

			if control.opening {
				// The opening call sees the generation change and finishes the switch
				debug!("[{}] Switch to {} deferred until open returns", label, control.target());
				return;
			}
			control.opening = watching;
			(control.generation, control.guard.take())
		};

		if let Some(guard) = previous {
			guard.release();
		}

		let Some(store) = &self.store else {
			if let Some(reference) = &reference {
				debug!("[{}] No store available, not watching {}", label, reference.describe());
			}
			return;
		};

		let mut reference = reference;
		while let Some(current) = reference {
			let guard = self.open(store, &current, generation);

			{
				let mut control = self.shared.control();
				if control.generation == generation {
					control.guard = Some(guard);
					control.opening = false;
					return;
				}
			}

			// Superseded while opening: release before opening the replacement.
			// `opening` stays set, so later switches keep deferring to this call.
			guard.release();
			let mut control = self.shared.control();
			generation = control.generation;
			reference = control.reference.clone();
			control.opening = reference.is_some();
		}
		debug!("[{}] No reference, nothing to watch", label);
	}

	fn enter(&self, control: &mut Control<K>, watching: bool) {
		if watching {
			control.phase = Phase::Subscribing;
			self.shared.state.send_replace(WatcherState::loading());
		} else {
			control.phase = Phase::Settled;
			self.shared.state.send_replace(WatcherState::settled());
		}
	}

	fn open(
		&self, store: &Arc<dyn Store>, reference: &K::Ref, generation: u64,
	) -> SubscriptionGuard {
		let label = self.shared.label();
		info!("[{}] Watching {} ({})", label, reference.describe(), K::OPERATION);

		let on_snapshot = {
			let shared = Arc::downgrade(&self.shared);
			Box::new(move |snapshot: K::Snapshot| {
				if let Some(shared) = Weak::upgrade(&shared) {
					shared.apply_snapshot(generation, snapshot);
				}
			})
		};
		let on_error: ErrorCallback = {
			let shared = Arc::downgrade(&self.shared);
			Box::new(move |error: StoreError| {
				if let Some(shared) = Weak::upgrade(&shared) {
					shared.apply_error(generation, error);
				}
			})
		};

		// Callbacks may already have run by the time `open` returns.
		let id = K::open(store.as_ref(), reference, on_snapshot, on_error);
		debug!("[{}] Opened subscription {} for {}", label, id, reference.describe());
		SubscriptionGuard::new(store.clone(), id)
	}

	/// Snapshot of the current state
	pub fn state(&self) -> WatcherState<K::Output> {
		self.shared.state.borrow().clone()
	}

	/// Receiver that observes every state change
	pub fn subscribe_state(&self) -> watch::Receiver<WatcherState<K::Output>> {
		self.shared.state.subscribe()
	}

	pub fn phase(&self) -> Phase {
		self.shared.control().phase
	}

	pub fn reference(&self) -> Option<K::Ref> {
		self.shared.control().reference.clone()
	}

	/// Id of the subscription currently held, if any
	pub fn subscription_id(&self) -> Option<SubscriptionId> {
		self.shared.control().guard.as_ref().and_then(SubscriptionGuard::id)
	}

	pub fn is_subscribed(&self) -> bool {
		self.subscription_id().is_some()
	}
}

impl<K: WatchTarget> Drop for Watcher<K> {
	fn drop(&mut self) {
		let guard = {
			let mut control = self.shared.control();
			control.generation += 1;
			control.phase = Phase::Settled;
			self.shared.state.send_replace(WatcherState::settled());
			control.guard.take()
		};
		if let Some(guard) = guard {
			debug!("[{}] Watcher dropped, releasing subscription", self.shared.label());
			guard.release();
		}
	}
}

impl<K: WatchTarget> std::fmt::Debug for Watcher<K> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let control = self.shared.control();
		f.debug_struct("Watcher")
			.field("label", &self.shared.label())
			.field("phase", &control.phase)
			.field("reference", &control.reference)
			.field("subscription", &control.guard)
			.finish()
	}
}
