use crate::error::WatchError;
use serde::Serialize;

/// State a watcher exposes to its consumers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WatcherState<T> {
	/// Latest decoded value. `None` before the first snapshot, for a missing
	/// document, and after a failure.
	pub data: Option<T>,
	/// `true` until the first snapshot or error of the current reference
	pub loading: bool,
	pub error: Option<WatchError>,
}

impl<T> WatcherState<T> {
	/// Waiting for the first snapshot
	pub fn loading() -> Self {
		Self { data: None, loading: true, error: None }
	}

	/// Nothing to watch
	pub fn settled() -> Self {
		Self { data: None, loading: false, error: None }
	}

	pub fn ready(data: Option<T>) -> Self {
		Self { data, loading: false, error: None }
	}

	pub fn failed(error: WatchError) -> Self {
		Self { data: None, loading: false, error: Some(error) }
	}

	pub fn is_failed(&self) -> bool {
		self.error.is_some()
	}

	pub fn is_permission_denied(&self) -> bool {
		self.error.as_ref().is_some_and(WatchError::is_permission_denied)
	}
}

impl<T> Default for WatcherState<T> {
	fn default() -> Self {
		Self::loading()
	}
}

/// Where a watcher is in its subscription lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
	/// Constructed, no reference applied yet
	Init,
	/// Subscription opened, no snapshot yet
	Subscribing,
	/// At least one snapshot received
	Live,
	/// The current subscription reported an error
	Failed,
	/// No reference (or no store): nothing is watched
	Settled,
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::events::AttemptedOperation;

	#[test]
	fn test_initial_state_is_loading() {
		let state: WatcherState<String> = WatcherState::default();
		assert_eq!(state, WatcherState::loading());
		assert!(state.loading);
		assert!(state.data.is_none());
	}

	#[test]
	fn test_empty_collection_differs_from_unloaded() {
		let empty: WatcherState<Vec<u8>> = WatcherState::ready(Some(Vec::new()));
		assert_ne!(empty, WatcherState::loading());
		assert_ne!(empty, WatcherState::settled());
	}

	#[test]
	fn test_failed_state() {
		let state: WatcherState<()> = WatcherState::failed(WatchError::PermissionDenied {
			target: "users/42".to_string(),
			operation: AttemptedOperation::ReadOne,
		});
		assert!(state.is_failed());
		assert!(state.is_permission_denied());
		assert!(!state.loading);
		assert!(state.data.is_none());
	}
}
