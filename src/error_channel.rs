//! Process-wide publish/subscribe bus for failure events
//!
//! Watchers publish here when the store denies them access; consumers that
//! have no handle on the failing watcher (logging, notifications) subscribe
//! here. Publishers and consumers never reference each other.

use crate::events::{EventKind, FailureEvent};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, error};

/// Callback invoked for each published event
pub type FailureHandler = Arc<dyn Fn(&FailureEvent) + Send + Sync>;

/// Token identifying one registered handler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerToken {
	kind: EventKind,
	id: u64,
}

impl ListenerToken {
	pub fn kind(&self) -> EventKind {
		self.kind
	}
}

#[derive(Default)]
struct Registry {
	next_id: u64,
	listeners: HashMap<EventKind, Vec<(u64, FailureHandler)>>,
}

static GLOBAL: Lazy<ErrorChannel> = Lazy::new(ErrorChannel::new);

/// Listener registry shared by every clone of the channel
#[derive(Clone, Default)]
pub struct ErrorChannel {
	registry: Arc<Mutex<Registry>>,
}

impl ErrorChannel {
	/// Create an independent channel with no listeners
	pub fn new() -> Self {
		Self::default()
	}

	/// The process-wide channel, created on first use and never torn down
	pub fn global() -> &'static ErrorChannel {
		&GLOBAL
	}

	fn registry(&self) -> MutexGuard<'_, Registry> {
		// Handlers never run under this lock, so poisoning can only come from
		// a panic inside the registry bookkeeping itself.
		self.registry.lock().unwrap_or_else(PoisonError::into_inner)
	}

	/// Register `handler` for every future event of `kind`
	///
	/// Handlers run synchronously, in registration order, on the publishing
	/// thread.
	pub fn subscribe<F>(&self, kind: EventKind, handler: F) -> ListenerToken
	where F: Fn(&FailureEvent) + Send + Sync + 'static {
		let handler: FailureHandler = Arc::new(handler);
		let mut registry = self.registry();
		let id = registry.next_id;
		registry.next_id += 1;
		registry.listeners.entry(kind).or_default().push((id, handler));

		debug!("Registered {:?} listener {}", kind, id);
		ListenerToken { kind, id }
	}

	/// Remove a handler. Returns `false` if it was not registered.
	pub fn unsubscribe(&self, token: ListenerToken) -> bool {
		let mut registry = self.registry();
		let Some(listeners) = registry.listeners.get_mut(&token.kind) else {
			return false;
		};

		let before = listeners.len();
		listeners.retain(|(id, _)| *id != token.id);
		let removed = listeners.len() != before;

		if removed {
			debug!("Removed {:?} listener {}", token.kind, token.id);
		}
		removed
	}

	/// Deliver `event` to every handler registered for `kind`
	///
	/// The handler list is copied before dispatch: handlers added during the
	/// dispatch do not receive this event, and handlers may unsubscribe
	/// (themselves or others) without disturbing it. A panicking handler is
	/// logged and skipped. Returns the number of handlers invoked.
	pub fn publish(&self, kind: EventKind, event: &FailureEvent) -> usize {
		let handlers: Vec<(u64, FailureHandler)> =
			self.registry().listeners.get(&kind).cloned().unwrap_or_default();

		debug!(
			"Publishing {:?} for {} to {} listener(s)",
			kind,
			event.target_description,
			handlers.len()
		);

		for (id, handler) in &handlers {
			if catch_unwind(AssertUnwindSafe(|| handler(event))).is_err() {
				error!("Listener {} panicked while handling {:?} event {}", id, kind, event.id);
			}
		}

		handlers.len()
	}

	/// Number of handlers currently registered for `kind`
	pub fn listener_count(&self, kind: EventKind) -> usize {
		self.registry().listeners.get(&kind).map_or(0, Vec::len)
	}
}

impl std::fmt::Debug for ErrorChannel {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let registry = self.registry();
		let counts: HashMap<EventKind, usize> =
			registry.listeners.iter().map(|(kind, list)| (*kind, list.len())).collect();
		f.debug_struct("ErrorChannel").field("listeners", &counts).finish()
	}
}
