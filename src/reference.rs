//! References naming what a watcher observes
//!
//! References compare by value: two references built independently over the
//! same target are equal, and a watcher handed an equal reference keeps its
//! existing subscription.

use crate::error::{Result, SyncError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Common behaviour of document and query references
pub trait Reference: Clone + PartialEq + fmt::Debug + Send + Sync + 'static {
	/// Human readable description of the target, used in logs and failure events
	fn describe(&self) -> String;
}

fn split_path(path: &str) -> Vec<&str> {
	path.trim_matches('/').split('/').collect()
}

fn validate_segments(path: &str, segments: &[&str]) -> Result<()> {
	if segments.iter().any(|s| s.is_empty()) {
		return Err(SyncError::invalid_reference(path, "path contains an empty segment"));
	}
	Ok(())
}

/// Address of a single document, e.g. `users/42` or `users/42/incidents/7`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentRef {
	path: String,
}

impl DocumentRef {
	/// Parse a document path. It must have an even, non-zero number of segments.
	pub fn parse(path: &str) -> Result<Self> {
		let segments = split_path(path);
		validate_segments(path, &segments)?;
		if segments.len() % 2 != 0 {
			return Err(SyncError::invalid_reference(
				path,
				"document paths need an even number of segments",
			));
		}
		Ok(Self { path: segments.join("/") })
	}

	pub fn path(&self) -> &str {
		&self.path
	}

	/// Identifier of the document (last path segment)
	pub fn id(&self) -> &str {
		self.path.rsplit('/').next().unwrap_or(&self.path)
	}

	/// Path of the collection holding this document
	pub fn collection_path(&self) -> &str {
		self.path.rsplit_once('/').map_or("", |(parent, _)| parent)
	}
}

impl Reference for DocumentRef {
	fn describe(&self) -> String {
		self.path.clone()
	}
}

impl fmt::Display for DocumentRef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.path)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
	Eq,
	NotEq,
	Lt,
	Lte,
	Gt,
	Gte,
	In,
	ArrayContains,
}

impl FilterOp {
	pub fn as_str(&self) -> &'static str {
		match self {
			FilterOp::Eq => "==",
			FilterOp::NotEq => "!=",
			FilterOp::Lt => "<",
			FilterOp::Lte => "<=",
			FilterOp::Gt => ">",
			FilterOp::Gte => ">=",
			FilterOp::In => "in",
			FilterOp::ArrayContains => "array-contains",
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
	pub field: String,
	pub op: FilterOp,
	pub value: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
	Ascending,
	Descending,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
	pub field: String,
	pub direction: Direction,
}

/// A query over the documents of one collection
///
/// Equality is structural over the collection path, filters, ordering and
/// limit, in the order they were added.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRef {
	collection: String,
	#[serde(default)]
	filters: Vec<Filter>,
	#[serde(default)]
	order_by: Vec<OrderBy>,
	#[serde(default)]
	limit: Option<usize>,
}

impl QueryRef {
	/// Query every document of a collection. The path must have an odd number of segments.
	pub fn collection(path: &str) -> Result<Self> {
		let segments = split_path(path);
		validate_segments(path, &segments)?;
		if segments.len() % 2 != 1 {
			return Err(SyncError::invalid_reference(
				path,
				"collection paths need an odd number of segments",
			));
		}
		Ok(Self {
			collection: segments.join("/"),
			filters: Vec::new(),
			order_by: Vec::new(),
			limit: None,
		})
	}

	pub fn where_field(mut self, field: &str, op: FilterOp, value: impl Into<Value>) -> Self {
		self.filters.push(Filter { field: field.to_string(), op, value: value.into() });
		self
	}

	pub fn order_by(mut self, field: &str, direction: Direction) -> Self {
		self.order_by.push(OrderBy { field: field.to_string(), direction });
		self
	}

	pub fn limit(mut self, limit: usize) -> Self {
		self.limit = Some(limit);
		self
	}

	pub fn collection_path(&self) -> &str {
		&self.collection
	}

	pub fn filters(&self) -> &[Filter] {
		&self.filters
	}

	pub fn ordering(&self) -> &[OrderBy] {
		&self.order_by
	}

	pub fn max_results(&self) -> Option<usize> {
		self.limit
	}

	/// Reference to a document inside the queried collection
	pub fn document(&self, id: &str) -> Result<DocumentRef> {
		DocumentRef::parse(&format!("{}/{}", self.collection, id))
	}
}

impl Reference for QueryRef {
	fn describe(&self) -> String {
		let mut description = self.collection.clone();

		for (i, filter) in self.filters.iter().enumerate() {
			description.push_str(if i == 0 { " where " } else { " and " });
			description.push_str(&format!("{} {} {}", filter.field, filter.op.as_str(), filter.value));
		}

		for (i, order) in self.order_by.iter().enumerate() {
			description.push_str(if i == 0 { " order by " } else { ", " });
			description.push_str(&order.field);
			if order.direction == Direction::Descending {
				description.push_str(" desc");
			}
		}

		if let Some(limit) = self.limit {
			description.push_str(&format!(" limit {limit}"));
		}

		description
	}
}

impl fmt::Display for QueryRef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.describe())
	}
}
