//! Identity used to scope references to the signed-in user

use crate::error::{Result, SyncError};
use crate::reference::{DocumentRef, QueryRef};

/// A signed-in user
///
/// Watchers of per-user data take `session.map(...)` as their reference, so a
/// signed-out caller naturally watches nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
	uid: String,
}

impl AuthSession {
	pub fn new(uid: &str) -> Result<Self> {
		if uid.is_empty() || uid.contains('/') {
			return Err(SyncError::invalid_reference(uid, "user id must be a single path segment"));
		}
		Ok(Self { uid: uid.to_string() })
	}

	pub fn uid(&self) -> &str {
		&self.uid
	}

	/// The user's own profile document, `users/{uid}`
	pub fn profile(&self) -> Result<DocumentRef> {
		DocumentRef::parse(&format!("users/{}", self.uid))
	}

	/// A document in one of the user's sub-collections
	pub fn user_document(&self, collection: &str, id: &str) -> Result<DocumentRef> {
		DocumentRef::parse(&format!("users/{}/{}/{}", self.uid, collection, id))
	}

	/// One of the user's sub-collections, `users/{uid}/{collection}`
	pub fn user_collection(&self, collection: &str) -> Result<QueryRef> {
		QueryRef::collection(&format!("users/{}/{}", self.uid, collection))
	}
}
