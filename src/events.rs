use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kinds of events carried by the error channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
	PermissionDenied,
}

/// The read a watcher was performing when it failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AttemptedOperation {
	/// Single document watch
	ReadOne,
	/// Collection (query) watch
	ReadMany,
}

impl AttemptedOperation {
	pub fn as_str(&self) -> &'static str {
		match self {
			AttemptedOperation::ReadOne => "read-one",
			AttemptedOperation::ReadMany => "read-many",
		}
	}
}

impl std::fmt::Display for AttemptedOperation {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

/// An authorization failure observed by a watcher
///
/// Built at the moment the store rejects a subscription and handed to every
/// listener registered on the error channel. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureEvent {
	pub id: Uuid,
	pub kind: EventKind,
	pub target_description: String,
	pub attempted_operation: AttemptedOperation,
	pub message: String,
	pub timestamp: DateTime<Utc>,
}

impl FailureEvent {
	pub fn permission_denied(
		target_description: impl Into<String>, attempted_operation: AttemptedOperation,
	) -> Self {
		Self {
			id: Uuid::new_v4(),
			kind: EventKind::PermissionDenied,
			target_description: target_description.into(),
			attempted_operation,
			message: String::new(),
			timestamp: Utc::now(),
		}
	}

	/// Attach the store's own message
	pub fn with_message(mut self, message: impl Into<String>) -> Self {
		self.message = message.into();
		self
	}

	pub fn to_json(&self) -> serde_json::Result<String> {
		serde_json::to_string_pretty(self)
	}
}
