use crate::events::AttemptedOperation;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Crate-level error types
///
/// These cover fallible construction (parsing references, validating
/// configuration, loading scripts). Failures of a live subscription never
/// surface here: they arrive asynchronously as [`WatchError`] on the watcher
/// state, and permission denials are additionally published on the
/// [`ErrorChannel`](crate::ErrorChannel).
#[derive(Error, Debug)]
pub enum SyncError {
	#[error("Invalid reference: {path} - {reason}")]
	InvalidReference { path: String, reason: String },

	#[error("Configuration error: {parameter} - {reason}")]
	Configuration { parameter: String, reason: String },

	#[error("JSON serialization error: {0}")]
	Json(#[from] serde_json::Error),
}

impl SyncError {
	/// Create an invalid reference error
	pub fn invalid_reference(path: &str, reason: &str) -> Self {
		SyncError::InvalidReference {
			path: path.to_string(),
			reason: reason.to_string(),
		}
	}

	/// Create a configuration error
	pub fn configuration(parameter: &str, reason: &str) -> Self {
		SyncError::Configuration {
			parameter: parameter.to_string(),
			reason: reason.to_string(),
		}
	}

	/// Get error category for logging
	pub fn category(&self) -> &'static str {
		match self {
			SyncError::InvalidReference { .. } => "reference",
			SyncError::Configuration { .. } => "configuration",
			SyncError::Json(_) => "serialization",
		}
	}
}

pub type Result<T> = std::result::Result<T, SyncError>;

/// Classification of a store failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureKind {
	PermissionDenied,
	Unavailable,
	InvalidReference,
	Decode,
	Other,
}

impl FailureKind {
	pub fn as_str(&self) -> &'static str {
		match self {
			FailureKind::PermissionDenied => "permission-denied",
			FailureKind::Unavailable => "unavailable",
			FailureKind::InvalidReference => "invalid-reference",
			FailureKind::Decode => "decode",
			FailureKind::Other => "other",
		}
	}
}

impl std::fmt::Display for FailureKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Error recorded on a watcher's state
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WatchError {
	#[error("Permission denied: {operation} on {target}")]
	PermissionDenied {
		target: String,
		operation: AttemptedOperation,
	},

	#[error("Store failure ({kind}) on {target}: {message}")]
	Store {
		kind: FailureKind,
		target: String,
		message: String,
	},

	#[error("Failed to decode snapshot of {target}: {message}")]
	Decode { target: String, message: String },
}

impl WatchError {
	pub fn kind(&self) -> FailureKind {
		match self {
			WatchError::PermissionDenied { .. } => FailureKind::PermissionDenied,
			WatchError::Store { kind, .. } => *kind,
			WatchError::Decode { .. } => FailureKind::Decode,
		}
	}

	pub fn is_permission_denied(&self) -> bool {
		matches!(self, WatchError::PermissionDenied { .. })
	}

	/// Description of the reference the failure was observed on
	pub fn target(&self) -> &str {
		match self {
			WatchError::PermissionDenied { target, .. }
			| WatchError::Store { target, .. }
			| WatchError::Decode { target, .. } => target,
		}
	}

	/// Check if supplying the same reference again may succeed
	///
	/// Nothing in this crate retries; this only informs callers deciding
	/// whether a `resubscribe` is worth attempting.
	pub fn is_retryable(&self) -> bool {
		match self {
			WatchError::PermissionDenied { .. } => false,
			WatchError::Store { kind, .. } => {
				matches!(kind, FailureKind::Unavailable | FailureKind::Other)
			}
			WatchError::Decode { .. } => false,
		}
	}

	/// Get error category for logging
	pub fn category(&self) -> &'static str {
		match self {
			WatchError::PermissionDenied { .. } => "permission",
			WatchError::Store { .. } => "store",
			WatchError::Decode { .. } => "decode",
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_sync_error_variants() {
		let invalid = SyncError::invalid_reference("users", "odd number of segments");
		let config = SyncError::configuration("label", "must not be empty");

		assert!(invalid.to_string().contains("Invalid reference"));
		assert!(invalid.to_string().contains("users"));
		assert_eq!(invalid.category(), "reference");
		assert_eq!(config.category(), "configuration");
	}

	#[test]
	fn test_from_conversions() {
		let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
		let sync_err: SyncError = json_err.into();

		match sync_err {
			SyncError::Json(_) => (), // Expected
			_ => panic!("Expected JSON error variant"),
		}
	}

	#[test]
	fn test_watch_error_categorization() {
		let denied = WatchError::PermissionDenied {
			target: "users/42".to_string(),
			operation: AttemptedOperation::ReadOne,
		};
		assert!(denied.is_permission_denied());
		assert!(!denied.is_retryable());
		assert_eq!(denied.kind(), FailureKind::PermissionDenied);
		assert_eq!(denied.target(), "users/42");
		assert_eq!(denied.to_string(), "Permission denied: read-one on users/42");

		let offline = WatchError::Store {
			kind: FailureKind::Unavailable,
			target: "incidents".to_string(),
			message: "backend offline".to_string(),
		};
		assert!(!offline.is_permission_denied());
		assert!(offline.is_retryable());
		assert_eq!(offline.category(), "store");
	}

	#[test]
	fn test_failure_kind_display() {
		assert_eq!(FailureKind::PermissionDenied.to_string(), "permission-denied");
		assert_eq!(FailureKind::Decode.as_str(), "decode");
	}
}
