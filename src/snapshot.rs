//! Point-in-time materialisations delivered by the store

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Latest state of a single document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSnapshot {
	pub id: String,
	pub exists: bool,
	#[serde(default)]
	pub fields: Map<String, Value>,
}

impl DocumentSnapshot {
	pub fn found(id: impl Into<String>, fields: Map<String, Value>) -> Self {
		Self { id: id.into(), exists: true, fields }
	}

	pub fn missing(id: impl Into<String>) -> Self {
		Self { id: id.into(), exists: false, fields: Map::new() }
	}

	/// Fields plus the identifier as a single JSON object
	///
	/// The identifier is written last, so a stored `id` field never masks it.
	pub fn to_value(&self) -> Value {
		let mut object = self.fields.clone();
		object.insert("id".to_string(), Value::String(self.id.clone()));
		Value::Object(object)
	}

	/// Decode into `T`, or `None` when the document does not exist
	pub fn decode<T: DeserializeOwned>(&self) -> serde_json::Result<Option<T>> {
		if !self.exists {
			return Ok(None);
		}
		serde_json::from_value(self.to_value()).map(Some)
	}
}

/// Latest result set of a query, in store order
///
/// Order and duplicates are whatever the store delivered. Entries marked as
/// not existing are dropped on decode; a query result never reports a
/// document as absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuerySnapshot {
	#[serde(default)]
	pub docs: Vec<DocumentSnapshot>,
}

impl QuerySnapshot {
	pub fn new(docs: Vec<DocumentSnapshot>) -> Self {
		Self { docs }
	}

	pub fn empty() -> Self {
		Self::default()
	}

	pub fn len(&self) -> usize {
		self.docs.len()
	}

	pub fn is_empty(&self) -> bool {
		self.docs.is_empty()
	}

	/// Decode every present document, keeping store order and duplicates as
	/// delivered. Entries with `exists == false` carry no fields and are
	/// skipped, so the result only ever holds records.
	pub fn decode<T: DeserializeOwned>(&self) -> serde_json::Result<Vec<T>> {
		self.docs
			.iter()
			.filter(|doc| doc.exists)
			.map(|doc| serde_json::from_value(doc.to_value()))
			.collect()
	}
}

/// A document's identifier together with its fields
///
/// Serialises flat: `{"id": "42", "name": "Ana"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
	pub id: String,
	#[serde(flatten)]
	pub fields: Map<String, Value>,
}

impl Record {
	pub fn get(&self, field: &str) -> Option<&Value> {
		self.fields.get(field)
	}
}
