//! The document store as seen by watchers
//!
//! Only the narrow watch/release surface is modelled. The store may invoke
//! the callbacks synchronously from inside `watch_*` or later from any
//! thread; watchers cope with both.

use crate::error::FailureKind;
use crate::reference::{DocumentRef, QueryRef};
use crate::snapshot::{DocumentSnapshot, QuerySnapshot};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type DocumentCallback = Box<dyn FnMut(DocumentSnapshot) + Send>;
pub type QueryCallback = Box<dyn FnMut(QuerySnapshot) + Send>;
pub type ErrorCallback = Box<dyn FnMut(StoreError) + Send>;

/// Handle for an active watch, issued by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubscriptionId(pub u64);

impl std::fmt::Display for SubscriptionId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "sub-{}", self.0)
	}
}

/// Store-native error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StoreErrorCode {
	PermissionDenied,
	Unauthenticated,
	Unavailable,
	DeadlineExceeded,
	InvalidArgument,
	NotFound,
	Internal,
	Unknown,
}

/// Error reported by the store through a watch's error callback
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{code:?}: {message}")]
pub struct StoreError {
	pub code: StoreErrorCode,
	pub message: String,
}

impl StoreError {
	pub fn new(code: StoreErrorCode, message: impl Into<String>) -> Self {
		Self { code, message: message.into() }
	}

	pub fn permission_denied(message: impl Into<String>) -> Self {
		Self::new(StoreErrorCode::PermissionDenied, message)
	}

	/// Map the store's code onto the failure taxonomy watchers act on
	pub fn classify(&self) -> FailureKind {
		match self.code {
			StoreErrorCode::PermissionDenied | StoreErrorCode::Unauthenticated => {
				FailureKind::PermissionDenied
			}
			StoreErrorCode::Unavailable | StoreErrorCode::DeadlineExceeded => FailureKind::Unavailable,
			StoreErrorCode::InvalidArgument | StoreErrorCode::NotFound => {
				FailureKind::InvalidReference
			}
			StoreErrorCode::Internal | StoreErrorCode::Unknown => FailureKind::Other,
		}
	}
}

/// Live-query surface of a document store
pub trait Store: Send + Sync {
	/// Start watching one document
	fn watch_document(
		&self, reference: &DocumentRef, on_snapshot: DocumentCallback, on_error: ErrorCallback,
	) -> SubscriptionId;

	/// Start watching the result set of a query
	fn watch_collection(
		&self, reference: &QueryRef, on_snapshot: QueryCallback, on_error: ErrorCallback,
	) -> SubscriptionId;

	/// Stop delivery for a subscription
	fn release(&self, id: SubscriptionId);
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_classification() {
		assert_eq!(
			StoreError::permission_denied("no access").classify(),
			FailureKind::PermissionDenied
		);
		assert_eq!(
			StoreError::new(StoreErrorCode::Unauthenticated, "signed out").classify(),
			FailureKind::PermissionDenied
		);
		assert_eq!(
			StoreError::new(StoreErrorCode::Unavailable, "offline").classify(),
			FailureKind::Unavailable
		);
		assert_eq!(
			StoreError::new(StoreErrorCode::InvalidArgument, "bad path").classify(),
			FailureKind::InvalidReference
		);
		assert_eq!(StoreError::new(StoreErrorCode::Internal, "boom").classify(), FailureKind::Other);
	}

	#[test]
	fn test_store_error_display() {
		let err = StoreError::permission_denied("missing or insufficient permissions");
		assert_eq!(err.to_string(), "PermissionDenied: missing or insufficient permissions");
	}
}
